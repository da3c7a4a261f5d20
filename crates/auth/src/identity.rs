use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{AccessClaims, Permission, Role};

/// Identifier of an AccessGuard user.
///
/// Identifiers are server-assigned opaque strings; this layer never parses
/// or generates them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The in-memory identity the gate consults.
///
/// # Invariants
/// - An identity is a pure function of its source (a decoded access token or
///   a server-validated user document). It is recomputed whenever the token
///   changes and never mutated independently of a token change.
/// - `roles` preserves source order; the first entry is the UI's singular
///   role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: UserId,
    pub roles: Vec<Role>,
    pub permissions: HashSet<Permission>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    /// Derive an identity from decoded token claims.
    ///
    /// Unknown role names are dropped; if none remain the identity falls
    /// back to [`Role::User`].
    pub fn from_claims(claims: &AccessClaims) -> Self {
        Self::from_parts(
            claims.sub.clone(),
            claims.role_names(),
            claims.permissions.iter().map(String::as_str),
            claims.name.clone(),
            claims.email.clone(),
        )
    }

    /// Derive an identity from raw role/permission names, applying the same
    /// lossy-role and default-role rules as [`Identity::from_claims`].
    pub fn from_parts<'a>(
        subject: UserId,
        role_names: impl IntoIterator<Item = &'a str>,
        permission_names: impl IntoIterator<Item = &'a str>,
        name: Option<String>,
        email: Option<String>,
    ) -> Self {
        let roles: Vec<Role> = role_names.into_iter().filter_map(Role::parse).collect();
        let permissions = permission_names
            .into_iter()
            .map(|p| Permission::new(p.to_string()))
            .collect();

        Self {
            subject,
            roles,
            permissions,
            name,
            email,
        }
    }

    /// The singular role: the first of `roles`, else [`Role::User`].
    pub fn role(&self) -> Role {
        self.roles.first().copied().unwrap_or(Role::User)
    }

    /// True iff the singular role is a member of `allowed`.
    pub fn has_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.role())
    }

    /// True iff the identity holds `permission` explicitly, or its role is
    /// admin (admins implicitly hold every permission).
    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.role().is_admin() || self.permissions.contains(permission)
    }
}
