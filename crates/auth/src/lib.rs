//! `accessguard-auth` — client-side authorization gate (pure, no I/O).
//!
//! Answers "may the current identity see/do X" from in-memory state only.
//! This layer is a UX convenience: the AccessGuard API enforces authorization
//! server-side on every endpoint, and nothing here is a security boundary.

pub mod claims;
pub mod gate;
pub mod identity;
pub mod nav;
pub mod permissions;
pub mod roles;

pub use claims::{AccessClaims, ClaimsError, decode_unverified};
pub use gate::{RouteAccess, SessionState, require_authenticated, require_public};
pub use identity::{Identity, UserId};
pub use nav::{NavLink, nav_links};
pub use permissions::Permission;
pub use roles::{Role, UnknownRole};
