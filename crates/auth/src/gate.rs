use crate::{Identity, Role};

/// Session state as seen by route boundaries.
///
/// `Loading` covers the window between process start and the completion of
/// session bootstrap (token decode plus server validation). Boundaries
/// re-evaluate from the current state on every navigation; nothing is
/// retained across decisions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Loading,
    Unauthenticated,
    Authenticated(Identity),
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// Verdict of a route-boundary check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Bootstrap has not finished; render nothing yet.
    Pending,
    Allow,
    RedirectToLogin,
    RedirectToUnauthorized,
    RedirectToDashboard,
}

/// Boundary for routes that require a signed-in user.
///
/// An empty `allowed` slice admits any authenticated role; otherwise the
/// identity's singular role must be a member.
pub fn require_authenticated(state: &SessionState, allowed: &[Role]) -> RouteAccess {
    match state {
        SessionState::Loading => RouteAccess::Pending,
        SessionState::Unauthenticated => RouteAccess::RedirectToLogin,
        SessionState::Authenticated(identity) => {
            if allowed.is_empty() || identity.has_role(allowed) {
                RouteAccess::Allow
            } else {
                RouteAccess::RedirectToUnauthorized
            }
        }
    }
}

/// Boundary for routes that only make sense signed-out (login, register,
/// password reset). Signed-in users are sent to the dashboard.
pub fn require_public(state: &SessionState) -> RouteAccess {
    match state {
        SessionState::Loading => RouteAccess::Pending,
        SessionState::Unauthenticated => RouteAccess::Allow,
        SessionState::Authenticated(_) => RouteAccess::RedirectToDashboard,
    }
}
