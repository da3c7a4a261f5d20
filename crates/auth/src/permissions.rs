use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are an open set of opaque names assigned per-user by the API
/// (e.g. `"can_edit_users"`). The admin role implicitly holds every
/// permission; that grant lives in [`crate::Identity::has_permission`], not
/// in a wildcard permission value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const EDIT_USERS: Permission = Permission(Cow::Borrowed("can_edit_users"));
    pub const VIEW_REPORTS: Permission = Permission(Cow::Borrowed("can_view_reports"));
    pub const DELETE_USERS: Permission = Permission(Cow::Borrowed("can_delete_users"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Permission {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
