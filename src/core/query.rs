use crate::core::pagination;
use crate::domain::model::{GroupId, StudyGroup};

/// Filter, order and slice for a study-group listing. Rows are always ordered
/// by `createdAt` descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupQuery {
    pub public_only: bool,
    pub exclude_ids: Vec<GroupId>,
    /// Trimmed, non-empty search text matched case-insensitively against the
    /// group name and description.
    pub search: Option<String>,
    pub offset: u64,
    pub limit: u64,
}

impl GroupQuery {
    /// Evaluates the filter predicates (not the slice) against one row.
    pub fn matches(&self, group: &StudyGroup) -> bool {
        if self.public_only && !group.public_group {
            return false;
        }
        if self.exclude_ids.contains(&group.id) {
            return false;
        }
        match &self.search {
            Some(term) => {
                let needle = term.to_lowercase();
                group.group_name.to_lowercase().contains(&needle)
                    || group
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

/// Trims search text and drops `*`, which the REST filter syntax reserves as
/// a wildcard. Blank input means "no search".
pub fn normalize_search(search: &str) -> Option<String> {
    let cleaned: String = search.chars().filter(|c| *c != '*').collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn compose_candidate_query(
    search: &str,
    page: u64,
    page_size: u64,
    active_ids: &[GroupId],
) -> GroupQuery {
    let mut exclude_ids = active_ids.to_vec();
    exclude_ids.sort_unstable();
    exclude_ids.dedup();

    GroupQuery {
        public_only: true,
        exclude_ids,
        search: normalize_search(search),
        offset: pagination::offset(page, page_size),
        limit: page_size,
    }
}
