use crate::domain::model::Identity;
use crate::domain::ports::Backend;
use crate::utils::error::Result;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectorySettings {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

/// Entry point for the study-group screens. Every call runs its backend
/// requests one after another and keeps no state between calls.
pub struct GroupDirectory<B: Backend> {
    pub(crate) backend: B,
    pub(crate) settings: DirectorySettings,
}

impl<B: Backend> GroupDirectory<B> {
    pub fn new(backend: B) -> Self {
        Self::with_settings(backend, DirectorySettings::default())
    }

    pub fn with_settings(backend: B, settings: DirectorySettings) -> Self {
        Self { backend, settings }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> DirectorySettings {
        self.settings
    }

    pub(crate) async fn resolve_identity(&self) -> Result<Option<Identity>> {
        let identity = self.backend.current_identity().await.map_err(|e| {
            tracing::error!("Failed to resolve the current identity: {}", e);
            e
        })?;
        if identity.is_none() {
            tracing::debug!("No signed-in identity");
        }
        Ok(identity)
    }
}
