use crate::core::query::GroupQuery;
use crate::domain::model::{
    GroupId, GroupRows, Identity, Membership, MembershipStatus, StudyGroup, UserId,
};
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait AuthClient: Send + Sync {
    /// The identity behind the current session, or `None` when signed out.
    async fn current_identity(&self) -> Result<Option<Identity>>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Identity>;

    /// Ends the current session. Signing out without a session is a no-op.
    async fn sign_out(&self) -> Result<()>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn membership_group_ids(
        &self,
        member: &UserId,
        status: MembershipStatus,
    ) -> Result<Vec<GroupId>>;

    async fn query_groups(&self, query: &GroupQuery) -> Result<GroupRows>;

    /// Groups joined to a membership row for `member` with `status`, newest first.
    async fn groups_with_membership(
        &self,
        member: &UserId,
        status: MembershipStatus,
    ) -> Result<Vec<StudyGroup>>;

    async fn insert_membership(
        &self,
        group: GroupId,
        member: &UserId,
        status: MembershipStatus,
    ) -> Result<Membership>;
}

pub trait Backend: AuthClient + GroupStore {}

impl<T: AuthClient + GroupStore> Backend for T {}
