use thiserror::Error;

#[derive(Error, Debug)]
pub enum GroupsError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Backend returned {status}: {message}")]
    BackendError { status: u16, message: String },

    #[error("Authentication required for {operation}")]
    Unauthenticated { operation: String },

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("Unexpected backend response: {message}")]
    UnexpectedResponse { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Backend,
    Authentication,
    Configuration,
    Input,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl GroupsError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GroupsError::HttpError(_) => ErrorCategory::Network,
            GroupsError::BackendError { .. } | GroupsError::UnexpectedResponse { .. } => {
                ErrorCategory::Backend
            }
            GroupsError::Unauthenticated { .. } | GroupsError::AuthError { .. } => {
                ErrorCategory::Authentication
            }
            GroupsError::ConfigValidationError { .. }
            | GroupsError::InvalidConfigValueError { .. }
            | GroupsError::MissingConfigError { .. } => ErrorCategory::Configuration,
            GroupsError::ValidationError { .. } => ErrorCategory::Input,
            GroupsError::IoError(_) | GroupsError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Backend => ErrorSeverity::Medium,
            ErrorCategory::Authentication | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// Network hiccups and 5xx responses are worth retrying; everything else is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            GroupsError::HttpError(e) => e.is_timeout() || e.is_connect(),
            GroupsError::BackendError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            GroupsError::HttpError(_) => {
                "Check the network connection and the backend URL, then retry".to_string()
            }
            GroupsError::BackendError { status, .. } if *status >= 500 => {
                "The backend is having trouble; retry in a moment".to_string()
            }
            GroupsError::BackendError { .. } => {
                "Check table names and row-level security policies in the backend".to_string()
            }
            GroupsError::UnexpectedResponse { .. } => {
                "Make sure the backend schema matches the configured tables".to_string()
            }
            GroupsError::Unauthenticated { .. } => {
                "Sign in with --email and --password first".to_string()
            }
            GroupsError::AuthError { .. } => "Verify the email and password".to_string(),
            GroupsError::ConfigValidationError { field, .. }
            | GroupsError::InvalidConfigValueError { field, .. }
            | GroupsError::MissingConfigError { field } => {
                format!("Fix '{}' in the configuration file", field)
            }
            GroupsError::ValidationError { .. } => "Adjust the request parameters".to_string(),
            GroupsError::IoError(_) => "Check file paths and permissions".to_string(),
            GroupsError::SerializationError(_) => {
                "The backend sent data in an unexpected shape".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the backend: {}", self),
            ErrorCategory::Backend => format!("The backend rejected the request: {}", self),
            ErrorCategory::Authentication => format!("Not signed in: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Invalid request: {}", self),
            ErrorCategory::System => format!("Internal error: {}", self),
        }
    }

    /// Process exit status for the CLI, derived from severity.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 2,
            ErrorSeverity::Medium => 3,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 4,
        }
    }
}

pub type Result<T> = std::result::Result<T, GroupsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_category() {
        let err = GroupsError::ValidationError {
            message: "page must be at least 1".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::Low);

        let err = GroupsError::MissingConfigError {
            field: "backend.url".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.recovery_suggestion().contains("backend.url"));
    }

    #[test]
    fn test_only_server_errors_are_retryable() {
        let server = GroupsError::BackendError {
            status: 503,
            message: "unavailable".to_string(),
        };
        let client = GroupsError::BackendError {
            status: 400,
            message: "bad filter".to_string(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
    }

    #[test]
    fn test_exit_code_follows_severity() {
        let bad_config = GroupsError::ConfigValidationError {
            field: "backend.url".to_string(),
            message: "must be a valid URL".to_string(),
        };
        let bad_page = GroupsError::ValidationError {
            message: "page must be at least 1".to_string(),
        };
        let outage = GroupsError::BackendError {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(bad_config.exit_code(), 1);
        assert_eq!(bad_page.exit_code(), 2);
        assert_eq!(outage.exit_code(), 3);
    }
}
