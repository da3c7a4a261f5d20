//! `accessguard-client` — session token manager and typed API surface for
//! the AccessGuard admin API.
//!
//! The load-bearing piece is the dispatch pipeline in [`transport`]: every
//! outbound call attaches the stored bearer token, and a 401 triggers the
//! refresh protocol — at most one refresh round-trip in flight, concurrent
//! callers queued and replayed once against the new token.
//!
//! Authorization predicates live in [`accessguard_auth`] and are re-exported
//! as [`auth`].

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod session;
pub mod store;
pub mod transport;

pub use accessguard_auth as auth;

pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};
pub use events::{SessionEvent, SessionEvents, TerminationReason};
pub use session::Session;
pub use store::{FileTokenStorage, MemoryTokenStorage, SessionStore, SessionTokens, TokenStorage};
pub use transport::{ApiClient, ApiRequest};
