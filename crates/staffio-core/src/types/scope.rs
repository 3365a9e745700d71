//! Scope reference data and user grant records.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Named permission a client or token can carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    /// Scope name as it appears in scope strings.
    pub name: String,
    /// Short display label.
    pub label: String,
    /// Longer description shown on consent screens.
    pub description: String,
    /// Granted when a request names no scope.
    pub is_default: bool,
}

/// Proof that a user has approved a client before.
///
/// `client_id` is the client's public code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientUserAuthorization {
    /// Public code of the approved client.
    pub client_id: String,
    /// User who approved it.
    pub username: String,
    /// When the approval was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
