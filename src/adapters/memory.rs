use crate::core::query::GroupQuery;
use crate::domain::model::{
    GroupId, GroupRows, Identity, Membership, MembershipStatus, StudyGroup, UserId,
};
use crate::domain::ports::{AuthClient, GroupStore};
use crate::utils::error::{GroupsError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Operations that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    CurrentIdentity,
    SignIn,
    ActiveMemberships,
    PendingMemberships,
    QueryGroups,
    GroupsWithMembership,
    InsertMembership,
}

#[derive(Default)]
struct State {
    groups: Vec<StudyGroup>,
    memberships: Vec<Membership>,
    accounts: HashMap<String, (String, UserId)>,
    session: Option<Identity>,
    failures: HashSet<FailPoint>,
}

/// Backend double that keeps every table in memory. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a group created `age_rank` hours after a fixed epoch; a higher
    /// rank is newer.
    pub fn add_group(&self, id: i64, name: &str, public_group: bool, age_rank: i64) {
        let created_at = DateTime::<Utc>::from_timestamp(1_704_067_200 + age_rank * 3600, 0)
            .unwrap_or_default();
        self.insert_group(StudyGroup {
            id: GroupId(id),
            group_name: name.to_string(),
            description: None,
            subject: None,
            max_members: None,
            created_at,
            public_group,
            members: Vec::new(),
        });
    }

    pub fn insert_group(&self, mut group: StudyGroup) {
        group.members.clear();
        let mut state = self.lock();
        state.groups.retain(|g| g.id != group.id);
        state.groups.push(group);
    }

    pub fn add_membership(&self, group_id: i64, member: &str, status: MembershipStatus) {
        self.lock().memberships.push(Membership {
            group_id: GroupId(group_id),
            member_id: UserId(member.to_string()),
            status,
            created_at: None,
        });
    }

    pub fn membership_count(&self) -> usize {
        self.lock().memberships.len()
    }

    pub fn add_account(&self, email: &str, password: &str, user_id: &str) {
        self.lock().accounts.insert(
            email.to_string(),
            (password.to_string(), UserId(user_id.to_string())),
        );
    }

    pub fn sign_in_as(&self, user_id: &str) {
        self.lock().session = Some(Identity {
            id: UserId(user_id.to_string()),
            email: None,
        });
    }

    pub fn sign_out_now(&self) {
        self.lock().session = None;
    }

    pub fn fail_on(&self, point: FailPoint) {
        self.lock().failures.insert(point);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    fn check(&self, point: FailPoint) -> Result<()> {
        if self.lock().failures.contains(&point) {
            return Err(GroupsError::BackendError {
                status: 500,
                message: format!("injected failure at {:?}", point),
            });
        }
        Ok(())
    }

    fn with_members(state: &State, group: &StudyGroup) -> StudyGroup {
        let mut group = group.clone();
        group.members = state
            .memberships
            .iter()
            .filter(|m| m.group_id == group.id)
            .cloned()
            .collect();
        group
    }

    fn newest_first(groups: &mut [StudyGroup]) {
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    }
}

#[async_trait]
impl AuthClient for InMemoryBackend {
    async fn current_identity(&self) -> Result<Option<Identity>> {
        self.check(FailPoint::CurrentIdentity)?;
        Ok(self.lock().session.clone())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Identity> {
        self.check(FailPoint::SignIn)?;
        let mut state = self.lock();
        let user_id = match state.accounts.get(email) {
            Some((expected, user_id)) if expected == password => user_id.clone(),
            _ => {
                return Err(GroupsError::AuthError {
                    message: "Invalid login credentials".to_string(),
                })
            }
        };
        let identity = Identity {
            id: user_id,
            email: Some(email.to_string()),
        };
        state.session = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<()> {
        self.lock().session = None;
        Ok(())
    }
}

#[async_trait]
impl GroupStore for InMemoryBackend {
    async fn membership_group_ids(
        &self,
        member: &UserId,
        status: MembershipStatus,
    ) -> Result<Vec<GroupId>> {
        match status {
            MembershipStatus::Active => self.check(FailPoint::ActiveMemberships)?,
            MembershipStatus::Pending => self.check(FailPoint::PendingMemberships)?,
            _ => {}
        }
        Ok(self
            .lock()
            .memberships
            .iter()
            .filter(|m| &m.member_id == member && m.status == status)
            .map(|m| m.group_id)
            .collect())
    }

    async fn query_groups(&self, query: &GroupQuery) -> Result<GroupRows> {
        self.check(FailPoint::QueryGroups)?;
        let state = self.lock();

        let mut matching: Vec<StudyGroup> = state
            .groups
            .iter()
            .filter(|g| query.matches(g))
            .cloned()
            .collect();
        Self::newest_first(&mut matching);

        let exact_count = matching.len() as u64;
        let rows = matching
            .iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .map(|g| Self::with_members(&state, g))
            .collect();

        Ok(GroupRows {
            rows,
            exact_count: Some(exact_count),
        })
    }

    async fn groups_with_membership(
        &self,
        member: &UserId,
        status: MembershipStatus,
    ) -> Result<Vec<StudyGroup>> {
        self.check(FailPoint::GroupsWithMembership)?;
        let state = self.lock();

        let joined: HashSet<GroupId> = state
            .memberships
            .iter()
            .filter(|m| &m.member_id == member && m.status == status)
            .map(|m| m.group_id)
            .collect();

        let mut groups: Vec<StudyGroup> = state
            .groups
            .iter()
            .filter(|g| joined.contains(&g.id))
            .map(|g| Self::with_members(&state, g))
            .collect();
        Self::newest_first(&mut groups);
        Ok(groups)
    }

    async fn insert_membership(
        &self,
        group: GroupId,
        member: &UserId,
        status: MembershipStatus,
    ) -> Result<Membership> {
        self.check(FailPoint::InsertMembership)?;
        let membership = Membership {
            group_id: group,
            member_id: member.clone(),
            status,
            created_at: Some(Utc::now()),
        };
        self.lock().memberships.push(membership.clone());
        Ok(membership)
    }
}
