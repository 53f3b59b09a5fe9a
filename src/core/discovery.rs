use crate::core::directory::GroupDirectory;
use crate::core::{pagination, query};
use crate::domain::model::{DiscoveredGroup, GroupId, MembershipStatus, PageEnvelope};
use crate::domain::ports::Backend;
use crate::utils::error::Result;
use std::collections::HashSet;

impl<B: Backend> GroupDirectory<B> {
    /// Public groups the caller has not joined yet, newest first.
    ///
    /// Signed-out callers get an empty page rather than an error. Failures
    /// while resolving the identity, loading active memberships or running
    /// the candidate query are returned to the caller; only the pending
    /// request overlay degrades silently to "no pending requests".
    pub async fn discover_groups(
        &self,
        search: &str,
        page: u64,
        page_size: u64,
    ) -> Result<PageEnvelope<DiscoveredGroup>> {
        pagination::validate_page(page, page_size, self.settings.max_page_size)?;

        let Some(identity) = self.resolve_identity().await? else {
            return Ok(PageEnvelope::empty(page_size));
        };

        let active_ids = self
            .backend
            .membership_group_ids(&identity.id, MembershipStatus::Active)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to load active memberships for {}: {}",
                    identity.id,
                    e
                );
                e
            })?;
        tracing::debug!("Excluding {} joined groups", active_ids.len());

        let candidate_query = query::compose_candidate_query(search, page, page_size, &active_ids);
        let candidates = self
            .backend
            .query_groups(&candidate_query)
            .await
            .map_err(|e| {
                tracing::error!("Failed to query candidate groups: {}", e);
                e
            })?;

        let pending: HashSet<GroupId> = match self
            .backend
            .membership_group_ids(&identity.id, MembershipStatus::Pending)
            .await
        {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                tracing::warn!("Could not load pending requests, assuming none: {}", e);
                HashSet::new()
            }
        };

        let total = candidates.exact_count.unwrap_or(0);
        let data: Vec<DiscoveredGroup> = candidates
            .rows
            .into_iter()
            .map(|group| {
                let already_requested = pending.contains(&group.id);
                DiscoveredGroup::new(group, already_requested)
            })
            .collect();

        tracing::info!(
            "Discovered {} groups (page {}, {} total)",
            data.len(),
            page,
            total
        );

        Ok(PageEnvelope {
            data,
            total,
            page,
            page_size,
            total_pages: pagination::total_pages(total, page_size),
        })
    }

    /// Same as [`discover_groups`](Self::discover_groups) but any failure is
    /// logged and turned into an empty page.
    pub async fn discover_groups_or_empty(
        &self,
        search: &str,
        page: u64,
        page_size: u64,
    ) -> PageEnvelope<DiscoveredGroup> {
        match self.discover_groups(search, page, page_size).await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!("Discovery failed, showing an empty page: {}", e);
                PageEnvelope::empty(page_size)
            }
        }
    }
}
