use crate::core::directory::GroupDirectory;
use crate::domain::model::{GroupId, Membership, MembershipStatus};
use crate::domain::ports::Backend;
use crate::utils::error::{GroupsError, Result};

impl<B: Backend> GroupDirectory<B> {
    /// Asks to join `group_id`. A request that is already pending is returned
    /// as-is instead of being inserted twice.
    pub async fn request_to_join(&self, group_id: GroupId) -> Result<Membership> {
        let identity = self
            .resolve_identity()
            .await?
            .ok_or_else(|| GroupsError::Unauthenticated {
                operation: "request_to_join".to_string(),
            })?;

        let active = self
            .backend
            .membership_group_ids(&identity.id, MembershipStatus::Active)
            .await?;
        if active.contains(&group_id) {
            return Err(GroupsError::ValidationError {
                message: format!("already a member of group {}", group_id),
            });
        }

        let pending = self
            .backend
            .membership_group_ids(&identity.id, MembershipStatus::Pending)
            .await?;
        if pending.contains(&group_id) {
            tracing::debug!("Request to join group {} is already pending", group_id);
            return Ok(Membership {
                group_id,
                member_id: identity.id,
                status: MembershipStatus::Pending,
                created_at: None,
            });
        }

        let membership = self
            .backend
            .insert_membership(group_id, &identity.id, MembershipStatus::Pending)
            .await?;
        tracing::info!("{} requested to join group {}", identity.id, group_id);
        Ok(membership)
    }
}

#[cfg(test)]
mod tests {
    use crate::adapters::memory::InMemoryBackend;
    use crate::core::GroupDirectory;
    use crate::domain::model::{GroupId, MembershipStatus, UserId};
    use crate::utils::error::GroupsError;

    #[tokio::test]
    async fn test_request_inserts_pending_row() {
        let backend = InMemoryBackend::new();
        backend.add_group(1, "Databases", true, 1);
        backend.sign_in_as("me");
        let directory = GroupDirectory::new(backend.clone());

        let membership = directory.request_to_join(GroupId(1)).await.unwrap();

        assert_eq!(membership.status, MembershipStatus::Pending);
        assert_eq!(membership.member_id, UserId("me".to_string()));
        assert_eq!(backend.membership_count(), 1);

        let page = directory.discover_groups("", 1, 10).await.unwrap();
        assert!(page.data[0].already_requested);
    }

    #[tokio::test]
    async fn test_repeated_request_does_not_duplicate() {
        let backend = InMemoryBackend::new();
        backend.add_group(1, "Databases", true, 1);
        backend.sign_in_as("me");
        let directory = GroupDirectory::new(backend.clone());

        directory.request_to_join(GroupId(1)).await.unwrap();
        let again = directory.request_to_join(GroupId(1)).await.unwrap();

        assert_eq!(again.status, MembershipStatus::Pending);
        assert_eq!(backend.membership_count(), 1);
    }

    #[tokio::test]
    async fn test_members_cannot_request_again() {
        let backend = InMemoryBackend::new();
        backend.add_group(1, "Databases", true, 1);
        backend.add_membership(1, "me", MembershipStatus::Active);
        backend.sign_in_as("me");
        let directory = GroupDirectory::new(backend);

        assert!(matches!(
            directory.request_to_join(GroupId(1)).await,
            Err(GroupsError::ValidationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_signed_out_request_is_rejected() {
        let directory = GroupDirectory::new(InMemoryBackend::new());

        assert!(matches!(
            directory.request_to_join(GroupId(1)).await,
            Err(GroupsError::Unauthenticated { .. })
        ));
    }
}
