//! Authorization code and access token records.
//!
//! Expiry is a computed predicate (`created_at + expires_in` against now).
//! The store never transitions a record to an expired state on its own and
//! will return an expired record until it is removed.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::client::Client;

// =============================================================================
// Authorization Code
// =============================================================================

/// One-time authorization code issued to a client on behalf of a user.
///
/// Single use is the caller's responsibility: after a successful exchange the
/// protocol layer must remove the code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeData {
    /// The code itself (primary key).
    pub code: String,

    /// Client the code was issued to.
    pub client: Client,

    /// User who approved the request.
    pub username: String,

    /// Redirect URI presented with the request.
    pub redirect_uri: String,

    /// Lifetime in seconds, counted from `created_at`.
    pub expires_in: i32,

    /// Granted scope string.
    pub scope: String,

    /// Issue time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AuthorizeData {
    /// Instant after which the code is no longer valid.
    #[must_use]
    pub fn expire_at(&self) -> OffsetDateTime {
        self.created_at + Duration::seconds(i64::from(self.expires_in))
    }

    /// Returns `true` if the code has passed its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Returns `true` if the code is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expire_at() < now
    }
}

// =============================================================================
// Access Token
// =============================================================================

/// Issued access token, optionally paired with a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessData {
    /// The access token (unique).
    pub access_token: String,

    /// Refresh token issued alongside, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Client the token was issued to.
    pub client: Client,

    /// User the token acts for.
    pub username: String,

    /// Lifetime in seconds, counted from `created_at`.
    pub expires_in: i32,

    /// Granted scope string.
    pub scope: String,

    /// Frozen tokens are kept but must not be honoured by the caller.
    #[serde(default)]
    pub is_frozen: bool,

    /// Issue time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl AccessData {
    /// Instant after which the token is no longer valid.
    #[must_use]
    pub fn expire_at(&self) -> OffsetDateTime {
        self.created_at + Duration::seconds(i64::from(self.expires_in))
    }

    /// Returns `true` if the token has passed its expiry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc())
    }

    /// Returns `true` if the token is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expire_at() < now
    }

    /// Refresh token if present and non-empty.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}
