use crate::core::directory::GroupDirectory;
use crate::domain::model::{MembershipStatus, StudyGroup};
use crate::domain::ports::Backend;
use crate::utils::error::Result;

impl<B: Backend> GroupDirectory<B> {
    /// Groups the caller is an active member of, newest first. Empty when
    /// signed out.
    pub async fn my_groups(&self) -> Result<Vec<StudyGroup>> {
        let Some(identity) = self.resolve_identity().await? else {
            return Ok(Vec::new());
        };

        let groups = self
            .backend
            .groups_with_membership(&identity.id, MembershipStatus::Active)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load groups for {}: {}", identity.id, e);
                e
            })?;

        tracing::info!("{} belongs to {} groups", identity.id, groups.len());
        Ok(groups)
    }

    pub async fn my_groups_or_empty(&self) -> Vec<StudyGroup> {
        self.my_groups().await.unwrap_or_else(|e| {
            tracing::error!("Listing joined groups failed, showing none: {}", e);
            Vec::new()
        })
    }
}
