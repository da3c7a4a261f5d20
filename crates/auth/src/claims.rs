use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::UserId;

/// Claims carried in an access token's payload segment.
///
/// These are decoded **without signature verification** and are advisory UI
/// hints only — never the input to a security decision. `GET /user/me` is the
/// source of truth for identity; see [`crate::Identity`].
///
/// The shape is deliberately tolerant: the API has shipped tokens with both
/// `roles` (array) and `role` (singular), and with `sub`/`id` for the
/// subject. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(alias = "id", alias = "_id", alias = "userId")]
    pub sub: UserId,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    /// Ordered role names; the first is the UI's singular role.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Singular role, used when `roles` is absent.
    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub permissions: Vec<String>,

    /// Expiry as a unix timestamp (seconds), when present.
    #[serde(default)]
    pub exp: Option<i64>,

    #[serde(default)]
    pub iat: Option<i64>,
}

impl AccessClaims {
    /// Role names in order of precedence: `roles`, then singular `role`.
    pub fn role_names(&self) -> Vec<&str> {
        if !self.roles.is_empty() {
            self.roles.iter().map(String::as_str).collect()
        } else {
            self.role.iter().map(String::as_str).collect()
        }
    }

    /// Advisory freshness check against the `exp` claim.
    ///
    /// Tokens without `exp` are treated as unexpired; the server still
    /// rejects them with a 401 if it disagrees.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.exp {
            Some(exp) => now.timestamp() >= exp,
            None => false,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsError {
    /// The token does not have the three-segment `header.payload.signature` form.
    #[error("malformed token: expected three dot-separated segments")]
    Malformed,

    #[error("payload is not valid base64url: {0}")]
    Encoding(String),

    #[error("payload is not a valid claims document: {0}")]
    Payload(String),
}

/// Decode the payload segment of an access token without verifying its
/// signature.
///
/// This mirrors what the API's own clients do for fast UI bootstrap: the
/// result is trusted only as a display hint until `GET /user/me` confirms it.
pub fn decode_unverified(token: &str) -> Result<AccessClaims, ClaimsError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(ClaimsError::Malformed),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| ClaimsError::Encoding(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| ClaimsError::Payload(e.to_string()))
}
