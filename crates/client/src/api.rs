//! Typed wrappers over the AccessGuard endpoints.
//!
//! One thin method per endpoint; every call rides the dispatch pipeline in
//! [`crate::transport`], so bearer attachment and the refresh protocol apply
//! uniformly. The server enforces all authorization — these wrappers never
//! pre-filter by role.

use accessguard_auth::{Identity, Permission, UserId, decode_unverified};
use serde_json::json;

use crate::error::ApiResult;
use crate::models::{
    LogEntry, LogListBody, LogQuery, ManagerStats, NewUser, Registered, User, UserAnalytics,
    UserBody, UserListBody, UserUpdate,
};
use crate::store::SessionTokens;
use crate::transport::{ApiClient, ApiRequest};

impl ApiClient {
    // ── Auth ────────────────────────────────────────────────────────────

    /// Sign in and persist the returned token pair.
    ///
    /// The identity comes from the access token's payload, so it is
    /// advisory until [`crate::Session::bootstrap`] confirms it against
    /// `GET /user/me`. `None` means the token payload was undecodable; the
    /// tokens are stored regardless.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<Option<Identity>> {
        let request = ApiRequest::post("/auth/login")
            .json(json!({ "email": email, "password": password }));

        let tokens: SessionTokens = self.request(&request).await?;
        self.store().set(tokens.clone());

        match decode_unverified(&tokens.access_token) {
            Ok(claims) => Ok(Some(Identity::from_claims(&claims))),
            Err(err) => {
                tracing::debug!(error = %err, "login token payload is not decodable");
                Ok(None)
            }
        }
    }

    pub async fn register(&self, new_user: &NewUser) -> ApiResult<Registered> {
        let request = ApiRequest::post("/auth/register").json(json!(new_user));
        self.request(&request).await
    }

    /// Always a generic acknowledgement server-side, to avoid user
    /// enumeration.
    pub async fn forgot_password(&self, email: &str) -> ApiResult<()> {
        let request = ApiRequest::post("/auth/forgot-password").json(json!({ "email": email }));
        self.request_unit(&request).await
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> ApiResult<()> {
        let request = ApiRequest::post("/auth/reset-password")
            .json(json!({ "token": token, "password": password }));
        self.request_unit(&request).await
    }

    // ── Users ───────────────────────────────────────────────────────────

    /// Session validation: the server's view of the signed-in user.
    pub async fn me(&self) -> ApiResult<User> {
        let body: UserBody = self.request(&ApiRequest::get("/user/me")).await?;
        Ok(body.into_user())
    }

    pub async fn list_users(&self) -> ApiResult<Vec<User>> {
        self.user_list(ApiRequest::get("/user")).await
    }

    pub async fn list_admins(&self) -> ApiResult<Vec<User>> {
        self.user_list(ApiRequest::get("/user/admins")).await
    }

    pub async fn list_managers(&self) -> ApiResult<Vec<User>> {
        self.user_list(ApiRequest::get("/user/managers")).await
    }

    pub async fn list_employees(&self) -> ApiResult<Vec<User>> {
        self.user_list(ApiRequest::get("/user/employees")).await
    }

    pub async fn recent_users(&self, limit: u32) -> ApiResult<Vec<User>> {
        self.user_list(ApiRequest::get("/user/recent").query("limit", limit))
            .await
    }

    pub async fn get_user(&self, id: &UserId) -> ApiResult<User> {
        let body: UserBody = self
            .request(&ApiRequest::get(format!("/user/{id}")))
            .await?;
        Ok(body.into_user())
    }

    pub async fn update_user(&self, id: &UserId, update: &UserUpdate) -> ApiResult<()> {
        let request = ApiRequest::put(format!("/user/{id}")).json(json!(update));
        self.request_unit(&request).await
    }

    pub async fn delete_user(&self, id: &UserId) -> ApiResult<()> {
        self.request_unit(&ApiRequest::delete(format!("/user/{id}")))
            .await
    }

    pub async fn activate_user(&self, id: &UserId) -> ApiResult<()> {
        self.request_unit(&ApiRequest::patch(format!("/user/{id}/activate")))
            .await
    }

    pub async fn deactivate_user(&self, id: &UserId) -> ApiResult<()> {
        self.request_unit(&ApiRequest::patch(format!("/user/{id}/deactivate")))
            .await
    }

    pub async fn update_permissions(
        &self,
        id: &UserId,
        permissions: &[Permission],
    ) -> ApiResult<()> {
        let names: Vec<&str> = permissions.iter().map(Permission::as_str).collect();
        let request =
            ApiRequest::patch(format!("/user/{id}/permissions")).json(json!({ "permissions": names }));
        self.request_unit(&request).await
    }

    // ── Teams ───────────────────────────────────────────────────────────

    pub async fn user_team(&self, manager_id: &UserId) -> ApiResult<Vec<User>> {
        self.user_list(ApiRequest::get(format!("/user/{manager_id}/team")))
            .await
    }

    /// The signed-in manager's own team.
    pub async fn my_team(&self) -> ApiResult<Vec<User>> {
        self.user_list(ApiRequest::get("/user/my-team")).await
    }

    /// Assign or (with `None`) unassign a user's manager.
    pub async fn assign_manager(&self, id: &UserId, manager: Option<&UserId>) -> ApiResult<()> {
        let manager_id = match manager {
            Some(id) => json!(id),
            None => serde_json::Value::Null,
        };
        let request = ApiRequest::put(format!("/user/{id}/assign-manager"))
            .json(json!({ "managerId": manager_id }));
        self.request_unit(&request).await
    }

    // ── Analytics ───────────────────────────────────────────────────────

    pub async fn analytics(&self) -> ApiResult<UserAnalytics> {
        self.request(&ApiRequest::get("/user/analytics")).await
    }

    pub async fn manager_stats(&self) -> ApiResult<ManagerStats> {
        self.request(&ApiRequest::get("/user/manager-stats")).await
    }

    // ── Activity log ────────────────────────────────────────────────────

    pub async fn logs(&self, query: &LogQuery) -> ApiResult<Vec<LogEntry>> {
        let mut request = ApiRequest::get("/log");
        for (key, value) in query.query_pairs() {
            request = request.query(key, value);
        }
        let body: LogListBody = self.request(&request).await?;
        Ok(body.into_logs())
    }

    pub async fn clear_logs(&self) -> ApiResult<()> {
        self.request_unit(&ApiRequest::delete("/log/clear")).await
    }

    async fn user_list(&self, request: ApiRequest) -> ApiResult<Vec<User>> {
        let body: UserListBody = self.request(&request).await?;
        Ok(body.into_users())
    }
}
