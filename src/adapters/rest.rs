use crate::config::toml_config::BackendConfig;
use crate::core::query::GroupQuery;
use crate::domain::model::{
    GroupId, GroupRows, Identity, Membership, MembershipStatus, StudyGroup, UserId,
};
use crate::domain::ports::{AuthClient, GroupStore};
use crate::utils::error::{GroupsError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Session {
    access_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: Identity,
}

#[derive(Deserialize)]
struct MembershipGroupRow {
    #[serde(rename = "groupId")]
    group_id: GroupId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewMembership<'a> {
    group_id: GroupId,
    member_id: &'a UserId,
    status: MembershipStatus,
}

/// Client for the hosted backend's REST (`/rest/v1`) and auth (`/auth/v1`) APIs.
pub struct RestBackend {
    client: Client,
    config: BackendConfig,
    session: RwLock<Option<Session>>,
}

impl RestBackend {
    pub fn new(config: BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds()))
            .build()?;
        let session = config
            .access_token
            .clone()
            .map(|access_token| Session { access_token });

        Ok(Self {
            client,
            config,
            session: RwLock::new(session),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), path)
    }

    fn table(&self, table: &str) -> String {
        self.endpoint(&format!("rest/v1/{}", table))
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let session = self.session.read().await;
        let bearer = session
            .as_ref()
            .map(|s| s.access_token.as_str())
            .unwrap_or(self.config.anon_key.as_str());
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorized(request).await.send().await?;
        tracing::debug!("Backend responded {}", response.status());
        if response.status().is_success() {
            return Ok(response);
        }
        Err(error_from_response(response).await)
    }
}

async fn error_from_response(response: Response) -> GroupsError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or(body);
    GroupsError::BackendError { status, message }
}

/// Total row count from a `Content-Range` header such as `0-9/42` or `*/0`.
pub fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

/// Quoted `ilike` operand matching `term` anywhere in the column. LIKE
/// wildcards in the term are matched literally; `*` cannot be and is dropped.
pub fn ilike_operand(term: &str) -> String {
    let mut pattern = String::from("*");
    for c in term.chars() {
        match c {
            '\\' | '%' | '_' => {
                pattern.push('\\');
                pattern.push(c);
            }
            '*' => {}
            _ => pattern.push(c),
        }
    }
    pattern.push('*');

    let mut quoted = String::from("\"");
    for c in pattern.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// PostgREST query parameters for a candidate listing.
pub fn query_params(query: &GroupQuery, memberships_table: &str) -> Vec<(String, String)> {
    let mut params = vec![(
        "select".to_string(),
        format!("*,members:{}(*)", memberships_table),
    )];

    if query.public_only {
        params.push(("publicGroup".to_string(), "eq.true".to_string()));
    }
    if !query.exclude_ids.is_empty() {
        let ids: Vec<String> = query.exclude_ids.iter().map(|id| id.to_string()).collect();
        params.push(("id".to_string(), format!("not.in.({})", ids.join(","))));
    }
    if let Some(term) = &query.search {
        let operand = ilike_operand(term);
        params.push((
            "or".to_string(),
            format!(
                "(groupName.ilike.{},description.ilike.{})",
                operand, operand
            ),
        ));
    }

    params.push(("order".to_string(), "createdAt.desc".to_string()));
    params.push(("offset".to_string(), query.offset.to_string()));
    params.push(("limit".to_string(), query.limit.to_string()));
    params
}

#[async_trait]
impl AuthClient for RestBackend {
    async fn current_identity(&self) -> Result<Option<Identity>> {
        if self.session.read().await.is_none() {
            return Ok(None);
        }

        let request = self.client.get(self.endpoint("auth/v1/user"));
        let response = self.authorized(request).await.send().await?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::debug!("Session token was rejected");
                Ok(None)
            }
            status if status.is_success() => Ok(Some(response.json::<Identity>().await?)),
            _ => Err(error_from_response(response).await),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Identity> {
        let request = self
            .client
            .post(self.endpoint("auth/v1/token"))
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }));

        let response = request
            .header("apikey", &self.config.anon_key)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(match error_from_response(response).await {
                GroupsError::BackendError { message, .. } => GroupsError::AuthError { message },
                other => other,
            });
        }

        let token: TokenResponse = response.json().await?;
        *self.session.write().await = Some(Session {
            access_token: token.access_token,
        });
        tracing::info!("Signed in as {}", token.user.id);
        Ok(token.user)
    }

    async fn sign_out(&self) -> Result<()> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };

        let response = self
            .client
            .post(self.endpoint("auth/v1/logout"))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // the token already expired, which is as signed out as it gets
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(()),
            _ => Err(error_from_response(response).await),
        }
    }
}

#[async_trait]
impl GroupStore for RestBackend {
    async fn membership_group_ids(
        &self,
        member: &UserId,
        status: MembershipStatus,
    ) -> Result<Vec<GroupId>> {
        let request = self
            .client
            .get(self.table(self.config.memberships_table()))
            .query(&[
                ("select", "groupId".to_string()),
                ("memberId", format!("eq.{}", member)),
                ("status", format!("eq.{}", status)),
            ]);

        let rows: Vec<MembershipGroupRow> = self.send(request).await?.json().await?;
        Ok(rows.into_iter().map(|r| r.group_id).collect())
    }

    async fn query_groups(&self, query: &GroupQuery) -> Result<GroupRows> {
        let params = query_params(query, self.config.memberships_table());
        tracing::debug!("Querying groups with {:?}", params);

        let request = self
            .client
            .get(self.table(self.config.groups_table()))
            .header("Prefer", "count=exact")
            .query(&params);
        let response = self.authorized(request).await.send().await?;
        tracing::debug!("Backend responded {}", response.status());

        let exact_count = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        // an offset past the last row is an empty page, not a failure
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            tracing::debug!("Requested page starts past row {:?}", exact_count);
            return Ok(GroupRows {
                rows: Vec::new(),
                exact_count,
            });
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let rows: Vec<StudyGroup> = response.json().await?;

        Ok(GroupRows { rows, exact_count })
    }

    async fn groups_with_membership(
        &self,
        member: &UserId,
        status: MembershipStatus,
    ) -> Result<Vec<StudyGroup>> {
        let request = self
            .client
            .get(self.table(self.config.groups_table()))
            .query(&[
                (
                    "select",
                    format!("*,members:{}!inner(*)", self.config.memberships_table()),
                ),
                ("members.memberId", format!("eq.{}", member)),
                ("members.status", format!("eq.{}", status)),
                ("order", "createdAt.desc".to_string()),
            ]);

        Ok(self.send(request).await?.json().await?)
    }

    async fn insert_membership(
        &self,
        group: GroupId,
        member: &UserId,
        status: MembershipStatus,
    ) -> Result<Membership> {
        let request = self
            .client
            .post(self.table(self.config.memberships_table()))
            .header("Prefer", "return=representation")
            .json(&NewMembership {
                group_id: group,
                member_id: member,
                status,
            });

        let mut rows: Vec<Membership> = self.send(request).await?.json().await?;
        rows.pop().ok_or_else(|| GroupsError::UnexpectedResponse {
            message: "insert returned no rows".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::compose_candidate_query;
    use httpmock::prelude::*;

    fn config(url: String, access_token: Option<&str>) -> BackendConfig {
        BackendConfig {
            url,
            anon_key: "anon-key".to_string(),
            access_token: access_token.map(str::to_string),
            timeout_seconds: Some(5),
            groups_table: None,
            memberships_table: None,
        }
    }

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-9/42"), Some(42));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-9/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn test_ilike_operand_escapes() {
        assert_eq!(ilike_operand("calc"), "\"*calc*\"");
        assert_eq!(ilike_operand("100%"), "\"*100\\\\%*\"");
        assert_eq!(ilike_operand("a,b(c)"), "\"*a,b(c)*\"");
        assert_eq!(ilike_operand("say \"hi\""), "\"*say \\\"hi\\\"*\"");
        assert_eq!(ilike_operand("wild*card"), "\"*wildcard*\"");
    }

    #[test]
    fn test_query_params_for_full_query() {
        let query = compose_candidate_query("calc", 2, 10, &[GroupId(5), GroupId(2)]);
        let params = query_params(&query, "group_members");

        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("select"), Some("*,members:group_members(*)"));
        assert_eq!(get("publicGroup"), Some("eq.true"));
        assert_eq!(get("id"), Some("not.in.(2,5)"));
        assert_eq!(
            get("or"),
            Some("(groupName.ilike.\"*calc*\",description.ilike.\"*calc*\")")
        );
        assert_eq!(get("order"), Some("createdAt.desc"));
        assert_eq!(get("offset"), Some("10"));
        assert_eq!(get("limit"), Some("10"));
    }

    #[test]
    fn test_query_params_skip_empty_filters() {
        let query = compose_candidate_query("  ", 1, 10, &[]);
        let params = query_params(&query, "group_members");
        assert!(params.iter().all(|(k, _)| k != "id" && k != "or"));
    }

    #[tokio::test]
    async fn test_no_session_means_no_identity_request() {
        let server = MockServer::start();
        let user_mock = server.mock(|when, then| {
            when.method(GET).path("/auth/v1/user");
            then.status(200);
        });

        let backend = RestBackend::new(config(server.base_url(), None)).unwrap();
        assert_eq!(backend.current_identity().await.unwrap(), None);
        user_mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_rejected_token_means_no_identity() {
        let server = MockServer::start();
        let user_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/auth/v1/user")
                .header("authorization", "Bearer stale-token");
            then.status(401)
                .json_body(serde_json::json!({"msg": "invalid JWT"}));
        });

        let backend = RestBackend::new(config(server.base_url(), Some("stale-token"))).unwrap();
        assert_eq!(backend.current_identity().await.unwrap(), None);
        user_mock.assert();
    }

    #[tokio::test]
    async fn test_sign_in_then_sign_out() {
        let server = MockServer::start();
        let token_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "password")
                .header("apikey", "anon-key")
                .json_body(serde_json::json!({"email": "ana@campus.edu", "password": "pw"}));
            then.status(200).json_body(serde_json::json!({
                "access_token": "jwt-ana",
                "token_type": "bearer",
                "expires_in": 3600,
                "user": {"id": "u-ana", "email": "ana@campus.edu"}
            }));
        });
        let logout_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/logout")
                .header("authorization", "Bearer jwt-ana");
            then.status(204);
        });

        let backend = RestBackend::new(config(server.base_url(), None)).unwrap();
        let identity = backend
            .sign_in_with_password("ana@campus.edu", "pw")
            .await
            .unwrap();
        assert_eq!(identity.id, UserId("u-ana".to_string()));

        backend.sign_out().await.unwrap();
        backend.sign_out().await.unwrap();

        token_mock.assert();
        logout_mock.assert_hits(1);
        assert_eq!(backend.current_identity().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bad_credentials_are_auth_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(400).json_body(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            }));
        });

        let backend = RestBackend::new(config(server.base_url(), None)).unwrap();
        let err = backend
            .sign_in_with_password("ana@campus.edu", "wrong")
            .await
            .unwrap_err();

        match err {
            GroupsError::AuthError { message } => assert_eq!(message, "Invalid login credentials"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_groups_reads_exact_count() {
        let server = MockServer::start();
        let groups_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/study_groups")
                .header("prefer", "count=exact")
                .query_param("publicGroup", "eq.true")
                .query_param("order", "createdAt.desc");
            then.status(200)
                .header("Content-Range", "0-0/17")
                .json_body(serde_json::json!([{
                    "id": 3,
                    "groupName": "Operating Systems",
                    "createdAt": "2024-05-01T12:00:00Z",
                    "publicGroup": true,
                    "members": []
                }]));
        });

        let backend = RestBackend::new(config(server.base_url(), Some("jwt"))).unwrap();
        let query = compose_candidate_query("", 1, 1, &[]);
        let rows = backend.query_groups(&query).await.unwrap();

        groups_mock.assert();
        assert_eq!(rows.exact_count, Some(17));
        assert_eq!(rows.rows.len(), 1);
        assert_eq!(rows.rows[0].group_name, "Operating Systems");
    }

    #[tokio::test]
    async fn test_offset_past_last_row_is_an_empty_page() {
        let server = MockServer::start();
        let groups_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/study_groups")
                .query_param("offset", "30");
            then.status(416)
                .header("Content-Range", "*/21")
                .json_body(serde_json::json!({
                    "code": "PGRST103",
                    "message": "Requested range not satisfiable"
                }));
        });

        let backend = RestBackend::new(config(server.base_url(), Some("jwt"))).unwrap();
        let query = compose_candidate_query("", 4, 10, &[]);
        let rows = backend.query_groups(&query).await.unwrap();

        groups_mock.assert();
        assert!(rows.rows.is_empty());
        assert_eq!(rows.exact_count, Some(21));
    }

    #[tokio::test]
    async fn test_backend_errors_carry_status_and_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/rest/v1/group_members");
            then.status(400).json_body(serde_json::json!({
                "code": "42703",
                "message": "column group_members.memberId does not exist"
            }));
        });

        let backend = RestBackend::new(config(server.base_url(), Some("jwt"))).unwrap();
        let err = backend
            .membership_group_ids(&UserId("u-1".to_string()), MembershipStatus::Active)
            .await
            .unwrap_err();

        match err {
            GroupsError::BackendError { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("does not exist"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_insert_membership_returns_row() {
        let server = MockServer::start();
        let insert_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/v1/group_members")
                .header("prefer", "return=representation")
                .json_body(serde_json::json!({
                    "groupId": 4,
                    "memberId": "u-1",
                    "status": "pending"
                }));
            then.status(201).json_body(serde_json::json!([{
                "groupId": 4,
                "memberId": "u-1",
                "status": "pending",
                "createdAt": "2024-05-02T08:30:00Z"
            }]));
        });

        let backend = RestBackend::new(config(server.base_url(), Some("jwt"))).unwrap();
        let membership = backend
            .insert_membership(
                GroupId(4),
                &UserId("u-1".to_string()),
                MembershipStatus::Pending,
            )
            .await
            .unwrap();

        insert_mock.assert();
        assert_eq!(membership.status, MembershipStatus::Pending);
        assert!(membership.created_at.is_some());
    }
}
