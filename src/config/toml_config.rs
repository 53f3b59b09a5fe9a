use crate::core::directory::{DirectorySettings, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::utils::error::{GroupsError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_GROUPS_TABLE: &str = "study_groups";
const DEFAULT_MEMBERSHIPS_TABLE: &str = "group_members";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub discovery: Option<DiscoveryConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    pub access_token: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub groups_table: Option<String>,
    pub memberships_table: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub default_page_size: Option<u64>,
    pub max_page_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl BackendConfig {
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    pub fn groups_table(&self) -> &str {
        self.groups_table.as_deref().unwrap_or(DEFAULT_GROUPS_TABLE)
    }

    pub fn memberships_table(&self) -> &str {
        self.memberships_table
            .as_deref()
            .unwrap_or(DEFAULT_MEMBERSHIPS_TABLE)
    }
}

impl AppConfig {
    /// Loads and parses a TOML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GroupsError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| GroupsError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR_NAME}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("backend.url", &self.backend.url)?;
        validation::validate_non_empty_string("backend.anon_key", &self.backend.anon_key)?;
        if self.backend.anon_key.contains("${") {
            return Err(GroupsError::ConfigValidationError {
                field: "backend.anon_key".to_string(),
                message: "environment variable was not set".to_string(),
            });
        }
        validation::validate_positive_number(
            "backend.timeout_seconds",
            self.backend.timeout_seconds(),
            1,
        )?;
        validation::validate_identifier("backend.groups_table", self.backend.groups_table())?;
        validation::validate_identifier(
            "backend.memberships_table",
            self.backend.memberships_table(),
        )?;

        let settings = self.directory_settings();
        validation::validate_range("discovery.max_page_size", settings.max_page_size, 1, 1000)?;
        validation::validate_range(
            "discovery.default_page_size",
            settings.default_page_size,
            1,
            settings.max_page_size,
        )?;

        if let Some(level) = self.logging.as_ref().and_then(|l| l.level.as_deref()) {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            if !valid_levels.contains(&level) {
                return Err(GroupsError::InvalidConfigValueError {
                    field: "logging.level".to_string(),
                    value: level.to_string(),
                    reason: format!("Valid levels: {}", valid_levels.join(", ")),
                });
            }
        }

        Ok(())
    }

    pub fn directory_settings(&self) -> DirectorySettings {
        let discovery = self.discovery.as_ref();
        DirectorySettings {
            default_page_size: discovery
                .and_then(|d| d.default_page_size)
                .unwrap_or(DEFAULT_PAGE_SIZE),
            max_page_size: discovery
                .and_then(|d| d.max_page_size)
                .unwrap_or(MAX_PAGE_SIZE),
        }
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
