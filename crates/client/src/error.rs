use thiserror::Error;

/// Result type used across the client.
pub type ApiResult<T> = Result<T, ApiError>;

/// Client-side error taxonomy.
///
/// Only one failure is locally recoverable, and that recovery (the single
/// refresh-and-retry) happens inside the dispatch pipeline before an error
/// ever reaches a caller. Everything surfaced here is final for the call.
///
/// `Clone` matters: a failed refresh fans out to every queued waiter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Transport-level failure (DNS, connect, timeout). Not retried.
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status, propagated untouched for the UI to display.
    /// The message is the body's `message` field when the API sent one.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A refresh was required but no refresh token is stored (logged out
    /// here or invalidated from another context).
    #[error("session expired")]
    SessionExpired,

    /// The response body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Parse(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
