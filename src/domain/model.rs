use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The signed-in principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Active,
    Pending,
    Rejected,
    Removed,
    #[serde(other)]
    Unknown,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "active",
            MembershipStatus::Pending => "pending",
            MembershipStatus::Rejected => "rejected",
            MembershipStatus::Removed => "removed",
            MembershipStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub group_id: GroupId,
    pub member_id: UserId,
    pub status: MembershipStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyGroup {
    pub id: GroupId,
    pub group_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub max_members: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub public_group: bool,
    /// Embedded membership rows; the member count is always derived from these.
    #[serde(default)]
    pub members: Vec<Membership>,
}

impl StudyGroup {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// A discovery result row: the group plus fields computed at read time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredGroup {
    #[serde(flatten)]
    pub group: StudyGroup,
    pub member_count: usize,
    pub already_requested: bool,
}

impl DiscoveredGroup {
    pub fn new(group: StudyGroup, already_requested: bool) -> Self {
        let member_count = group.member_count();
        Self {
            group,
            member_count,
            already_requested,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

impl<T> PageEnvelope<T> {
    /// What callers get when there is nothing to show.
    pub fn empty(page_size: u64) -> Self {
        Self {
            data: Vec::new(),
            total: 0,
            page: 1,
            page_size,
            total_pages: 1,
        }
    }
}

/// Rows returned by a candidate query together with the exact count of all
/// matching rows, independent of offset/limit.
#[derive(Debug, Clone, Default)]
pub struct GroupRows {
    pub rows: Vec<StudyGroup>,
    pub exact_count: Option<u64>,
}
