//! OAuth 2.0 client registration types.
//!
//! A client has two identifiers that must never be mixed up: the internal
//! numeric [`ClientId`] assigned by the database, and the public `code` the
//! OAuth protocol layer uses to address it. Token and code rows reference
//! clients by their public code.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

// =============================================================================
// Client Id
// =============================================================================

/// Internal numeric identifier of a persisted client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub i64);

impl ClientId {
    /// Returns the raw database value.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Registered OAuth 2.0 client.
///
/// `id` is `None` (or zero) until the client has been saved; saving a client
/// without a positive id inserts it and writes the assigned id back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Internal id, absent for clients that were never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ClientId>,

    /// Human-readable name.
    pub name: String,

    /// Public identifier used by the OAuth protocol layer.
    pub code: String,

    /// Shared secret.
    #[serde(default, skip_serializing)]
    pub secret: String,

    /// Registered redirect URI.
    pub redirect_uri: String,

    /// Grant types this client may use, in registration order.
    #[serde(default)]
    pub allowed_grant_types: Vec<String>,

    /// Response types this client may request, in registration order.
    #[serde(default)]
    pub allowed_response_types: Vec<String>,

    /// Scopes this client may request, in registration order.
    #[serde(default)]
    pub allowed_scopes: Vec<String>,

    /// When the client was registered.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Client {
    /// Creates an unsaved client with empty allow-lists.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            code: code.into(),
            secret: secret.into(),
            redirect_uri: redirect_uri.into(),
            allowed_grant_types: Vec::new(),
            allowed_response_types: Vec::new(),
            allowed_scopes: Vec::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Sets the allowed grant types.
    #[must_use]
    pub fn with_grant_types<I, S>(mut self, grant_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_grant_types = grant_types.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the allowed response types.
    #[must_use]
    pub fn with_response_types<I, S>(mut self, response_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_response_types = response_types.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the allowed scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// The database id, if one has been assigned. An id of zero or below
    /// marks an unsaved client, same as no id.
    #[must_use]
    pub fn persisted_id(&self) -> Option<ClientId> {
        self.id.filter(|id| id.get() > 0)
    }

    /// Returns `true` once the client has a database id.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persisted_id().is_some()
    }

    /// Checks the fields required before a client may be saved.
    ///
    /// # Errors
    ///
    /// Returns the first missing field.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.name.is_empty() {
            return Err(ClientValidationError::EmptyName);
        }
        if self.code.is_empty() {
            return Err(ClientValidationError::EmptyCode);
        }
        if self.secret.is_empty() {
            return Err(ClientValidationError::EmptySecret);
        }
        if self.redirect_uri.is_empty() {
            return Err(ClientValidationError::EmptyRedirectUri);
        }
        Ok(())
    }
}

/// Reasons a client cannot be saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClientValidationError {
    /// `name` is empty.
    #[error("client name is empty")]
    EmptyName,
    /// `code` is empty.
    #[error("client code is empty")]
    EmptyCode,
    /// `secret` is empty.
    #[error("client secret is empty")]
    EmptySecret,
    /// `redirect_uri` is empty.
    #[error("client redirect uri is empty")]
    EmptyRedirectUri,
}

// =============================================================================
// Listing
// =============================================================================

/// Sort direction for client listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl SortOrder {
    /// SQL keyword for this direction.
    #[must_use]
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Paging and ordering for [`crate::storage::CredentialStore::load_clients`].
///
/// Sort keys are free-form; the store keeps only the ones it allows and
/// silently drops the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientQuery {
    /// Maximum rows to return. Values below 1 are raised to 1.
    pub limit: i64,
    /// Rows to skip. Negative values are treated as 0.
    pub offset: i64,
    /// Requested ordering, applied in the given order.
    pub sort: Vec<(String, SortOrder)>,
}

impl ClientQuery {
    /// Creates a query for one page.
    #[must_use]
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit,
            offset,
            sort: Vec::new(),
        }
    }

    /// Appends a sort key.
    #[must_use]
    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.push((field.into(), order));
        self
    }

    /// Limit after clamping.
    #[must_use]
    pub fn effective_limit(&self) -> i64 {
        self.limit.max(1)
    }

    /// Offset after clamping.
    #[must_use]
    pub fn effective_offset(&self) -> i64 {
        self.offset.max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> Client {
        Client::new("demo", "demo-code", "s3cret", "https://example/cb")
    }

    #[test]
    fn test_new_client_is_unsaved() {
        let client = demo();
        assert!(!client.is_persisted());
        assert!(client.allowed_scopes.is_empty());
        assert!(client.validate().is_ok());
    }

    #[test]
    fn test_zero_id_is_unsaved() {
        let client: Client = serde_json::from_value(serde_json::json!({
            "id": 0,
            "name": "demo",
            "code": "demo-code",
            "redirectUri": "https://example/cb",
            "allowedGrantTypes": [],
            "allowedResponseTypes": [],
            "allowedScopes": [],
            "createdAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(client.id, Some(ClientId(0)));
        assert_eq!(client.persisted_id(), None);
        assert!(!client.is_persisted());

        let mut client = demo();
        client.id = Some(ClientId(-3));
        assert!(!client.is_persisted());
        client.id = Some(ClientId(7));
        assert_eq!(client.persisted_id(), Some(ClientId(7)));
    }

    #[test]
    fn test_validate_reports_first_empty_field() {
        let mut client = demo();
        client.secret.clear();
        assert_eq!(client.validate(), Err(ClientValidationError::EmptySecret));

        client.name.clear();
        assert_eq!(client.validate(), Err(ClientValidationError::EmptyName));

        let mut client = demo();
        client.redirect_uri.clear();
        assert_eq!(
            client.validate(),
            Err(ClientValidationError::EmptyRedirectUri)
        );

        let mut client = demo();
        client.code.clear();
        assert_eq!(client.validate(), Err(ClientValidationError::EmptyCode));
    }

    #[test]
    fn test_builder_sets_allow_lists() {
        let client = demo()
            .with_grant_types(["authorization_code", "refresh_token"])
            .with_response_types(["code"])
            .with_scopes(["basic", "user_info"]);
        assert_eq!(
            client.allowed_grant_types,
            vec!["authorization_code", "refresh_token"]
        );
        assert_eq!(client.allowed_response_types, vec!["code"]);
        assert_eq!(client.allowed_scopes, vec!["basic", "user_info"]);
    }

    #[test]
    fn test_secret_is_not_serialized() {
        let json = serde_json::to_value(demo()).unwrap();
        assert!(json.get("secret").is_none());
        assert_eq!(json["code"], "demo-code");
        assert_eq!(json["redirectUri"], "https://example/cb");
    }

    #[test]
    fn test_client_query_clamps() {
        let query = ClientQuery::new(0, -5);
        assert_eq!(query.effective_limit(), 1);
        assert_eq!(query.effective_offset(), 0);

        let query = ClientQuery::new(20, 40).sort_by("created", SortOrder::Descending);
        assert_eq!(query.effective_limit(), 20);
        assert_eq!(query.effective_offset(), 40);
        assert_eq!(query.sort, vec![("created".to_string(), SortOrder::Descending)]);
    }
}
