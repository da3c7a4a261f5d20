//! Wire-faithful models for the AccessGuard API.
//!
//! The API is tolerant about shapes (bare arrays vs `{users: [...]}`
//! wrappers, `_id` vs `id`, `timestamp` vs `createdAt`), so the models are
//! tolerant too: untagged wrapper enums and defaulted fields instead of a
//! strict schema.

use std::collections::HashMap;

use accessguard_auth::{Identity, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Assigned manager, for employees on a team.
    #[serde(default)]
    pub manager: Option<UserId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn role_names(&self) -> Vec<&str> {
        if !self.roles.is_empty() {
            self.roles.iter().map(String::as_str).collect()
        } else {
            self.role.iter().map(String::as_str).collect()
        }
    }

    /// Derive the gate identity from this (server-validated) document.
    pub fn identity(&self) -> Identity {
        Identity::from_parts(
            self.id.clone(),
            self.role_names(),
            self.permissions.iter().map(String::as_str),
            Some(self.name.clone()),
            Some(self.email.clone()),
        )
    }
}

/// Registration payload for `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Response to a registration; the server has sent both `{user}` documents
/// and plain `{message}` acknowledgements.
#[derive(Debug, Clone, Deserialize)]
pub struct Registered {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Partial update for `PUT /user/:id`. `None` fields are omitted from the
/// payload and left unchanged server-side.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalytics {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub active_users: u64,
    #[serde(default)]
    pub inactive_users: u64,
    /// Registrations in the trailing seven days.
    #[serde(default)]
    pub recent_registrations: u64,
    #[serde(default)]
    pub by_role: HashMap<String, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerStats {
    #[serde(default)]
    pub team_member_count: u64,
    #[serde(default)]
    pub active_team_members: u64,
    #[serde(default)]
    pub recent_team_logins: u64,
    #[serde(default)]
    pub completed_tasks: u64,
    #[serde(default)]
    pub role_summary: HashMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(default, rename = "_id", alias = "id")]
    pub id: Option<String>,
    pub action: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    /// Free-form context; older entries nest the actor's name/email here.
    #[serde(default)]
    pub details: Option<serde_json::Value>,
    #[serde(default, alias = "createdAt")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LogEntry {
    /// The acting user's display name, checking `details` for older entries.
    pub fn actor(&self) -> Option<&str> {
        self.user_name
            .as_deref()
            .or_else(|| self.details.as_ref()?.get("userName")?.as_str())
    }
}

/// Filters for `GET /log`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogQuery {
    pub limit: Option<u32>,
    pub action: Option<String>,
}

impl LogQuery {
    pub fn limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(action) = &self.action {
            pairs.push(("action", action.clone()));
        }
        pairs
    }
}

// ── Wrapper shapes ──────────────────────────────────────────────────────────
//
// List endpoints have returned both bare arrays and keyed objects across API
// versions; these accept either.

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum UserListBody {
    Wrapped { users: Vec<User> },
    Team { team: Vec<User> },
    Bare(Vec<User>),
}

impl UserListBody {
    pub(crate) fn into_users(self) -> Vec<User> {
        match self {
            UserListBody::Wrapped { users } => users,
            UserListBody::Team { team } => team,
            UserListBody::Bare(users) => users,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum UserBody {
    Wrapped { user: User },
    Bare(User),
}

impl UserBody {
    pub(crate) fn into_user(self) -> User {
        match self {
            UserBody::Wrapped { user } => user,
            UserBody::Bare(user) => user,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum LogListBody {
    Wrapped { logs: Vec<LogEntry> },
    Bare(Vec<LogEntry>),
}

impl LogListBody {
    pub(crate) fn into_logs(self) -> Vec<LogEntry> {
        match self {
            LogListBody::Wrapped { logs } => logs,
            LogListBody::Bare(logs) => logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_accepts_both_id_spellings() {
        let a: User = serde_json::from_value(serde_json::json!({
            "_id": "u1", "name": "Ada", "email": "ada@example.com"
        }))
        .unwrap();
        let b: User = serde_json::from_value(serde_json::json!({
            "id": "u1", "name": "Ada", "email": "ada@example.com"
        }))
        .unwrap();
        assert_eq!(a.id, b.id);
        assert!(a.is_active);
    }

    #[test]
    fn user_identity_prefers_roles_array() {
        let user: User = serde_json::from_value(serde_json::json!({
            "_id": "u1",
            "name": "Ada",
            "email": "ada@example.com",
            "roles": ["manager"],
            "role": "employee",
            "permissions": ["can_view_reports"],
        }))
        .unwrap();

        let identity = user.identity();
        assert_eq!(identity.role(), accessguard_auth::Role::Manager);
        assert!(identity.has_permission(&accessguard_auth::Permission::VIEW_REPORTS));
    }

    #[test]
    fn list_bodies_accept_wrapped_and_bare() {
        let doc = serde_json::json!([{ "_id": "u1", "name": "A", "email": "a@x.com" }]);
        let bare: UserListBody = serde_json::from_value(doc.clone()).unwrap();
        let wrapped: UserListBody =
            serde_json::from_value(serde_json::json!({ "users": doc })).unwrap();
        let team: UserListBody =
            serde_json::from_value(serde_json::json!({ "team": doc })).unwrap();

        assert_eq!(bare.into_users().len(), 1);
        assert_eq!(wrapped.into_users().len(), 1);
        assert_eq!(team.into_users().len(), 1);
    }

    #[test]
    fn log_entry_actor_falls_back_to_details() {
        let entry: LogEntry = serde_json::from_value(serde_json::json!({
            "action": "login",
            "details": { "userName": "Ada", "userEmail": "ada@example.com" },
            "createdAt": "2025-06-01T12:00:00Z",
        }))
        .unwrap();

        assert_eq!(entry.actor(), Some("Ada"));
        assert!(entry.timestamp.is_some());
    }

    #[test]
    fn log_query_builds_pairs_in_order() {
        let query = LogQuery {
            limit: Some(15),
            action: Some("login".to_string()),
        };
        assert_eq!(
            query.query_pairs(),
            vec![("limit", "15".to_string()), ("action", "login".to_string())]
        );
        assert!(LogQuery::default().query_pairs().is_empty());
    }
}
