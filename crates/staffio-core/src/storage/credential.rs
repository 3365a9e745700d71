//! Credential store trait.
//!
//! The persistence contract an OAuth 2.0 provider needs: authorization codes,
//! access and refresh tokens, clients, scopes and user grants. Implementations
//! are provided by storage backends (e.g., PostgreSQL).

use async_trait::async_trait;

use crate::StoreResult;
use crate::types::{
    AccessData, AuthorizeData, Client, ClientId, ClientQuery, ClientUserAuthorization, Scope,
};

// =============================================================================
// Credential Store Trait
// =============================================================================

/// Storage operations for OAuth 2.0 credentials.
///
/// Lookups that miss return [`crate::StoreError::NotFound`] with the
/// identifier embedded in the message. Every other persistence failure is
/// [`crate::StoreError::Database`].
///
/// # Lifecycle
///
/// Codes and tokens go `issued -> loaded -> removed`. Loading never consumes
/// or expires a record; the caller checks `is_expired()` and removes what it
/// has exchanged.
///
/// # Example
///
/// ```ignore
/// use staffio_core::storage::CredentialStore;
///
/// async fn exchange(store: &impl CredentialStore, code: &str) -> StoreResult<()> {
///     let data = store.load_authorize(code).await?;
///     if data.is_expired() {
///         store.remove_authorize(code).await?;
///         return Ok(());
///     }
///     // ... issue the access token, then:
///     store.remove_authorize(code).await
/// }
/// ```
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Resolves a client by the identifier the protocol layer uses.
    ///
    /// This is the public code; the lookup funnels into
    /// [`CredentialStore::get_client_with_code`].
    ///
    /// # Errors
    ///
    /// `NotFound` naming the identifier when no client matches.
    async fn get_client(&self, id: &str) -> StoreResult<Client>;

    /// Resolves a client by its public code.
    ///
    /// # Errors
    ///
    /// `NotFound` naming the code when no client matches.
    async fn get_client_with_code(&self, code: &str) -> StoreResult<Client>;

    /// Resolves a client by its internal database id.
    ///
    /// # Errors
    ///
    /// `NotFound` naming the id when no client matches.
    async fn get_client_by_id(&self, id: ClientId) -> StoreResult<Client>;

    /// Persists a newly issued authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails (e.g. a duplicate code).
    async fn save_authorize(&self, data: &AuthorizeData) -> StoreResult<()>;

    /// Loads an authorization code with its client resolved.
    ///
    /// # Errors
    ///
    /// `NotFound` if the code is unknown or its client no longer resolves.
    async fn load_authorize(&self, code: &str) -> StoreResult<AuthorizeData>;

    /// Deletes an authorization code. An empty code is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    async fn remove_authorize(&self, code: &str) -> StoreResult<()>;

    /// Persists an access token and, once the row is durable, indexes its
    /// refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails; nothing is indexed in that case.
    async fn save_access(&self, data: &AccessData) -> StoreResult<()>;

    /// Loads an access token with its client resolved.
    ///
    /// # Errors
    ///
    /// `NotFound` if the token is unknown or its client no longer resolves.
    async fn load_access(&self, token: &str) -> StoreResult<AccessData>;

    /// Deletes an access token row.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    async fn remove_access(&self, token: &str) -> StoreResult<()>;

    /// Resolves a refresh token to the access token it was issued with.
    ///
    /// # Errors
    ///
    /// `NotFound` if the refresh token is not indexed, otherwise whatever
    /// [`CredentialStore::load_access`] returns.
    async fn load_refresh(&self, token: &str) -> StoreResult<AccessData>;

    /// Forgets a refresh token. The access token row is left in place.
    ///
    /// # Errors
    ///
    /// Implementations backed by an in-process index never fail.
    async fn remove_refresh(&self, token: &str) -> StoreResult<()>;

    /// Lists clients one page at a time.
    ///
    /// Only `id` and `created` are sortable; other keys are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails. Rows that fail to decode are
    /// skipped, not reported.
    async fn load_clients(&self, query: &ClientQuery) -> StoreResult<Vec<Client>>;

    /// Total number of registered clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn count_clients(&self) -> StoreResult<u64>;

    /// Inserts a client without an id, updates one with an id.
    ///
    /// On insert the assigned id is written back into `client`.
    ///
    /// # Errors
    ///
    /// `InvalidValue` without touching storage when name, code, secret or
    /// redirect URI is empty; `NotFound` when updating an id that no longer
    /// exists.
    async fn save_client(&self, client: &mut Client) -> StoreResult<()>;

    /// Loads every scope. Rows that fail to decode are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn load_scopes(&self) -> StoreResult<Vec<Scope>>;

    /// Loads the approval `username` gave the client with public code
    /// `client_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user never approved the client, `Database` if the
    /// lookup fails.
    async fn load_authorized(
        &self,
        client_id: &str,
        username: &str,
    ) -> StoreResult<ClientUserAuthorization>;

    /// Whether `username` has approved the client with public code
    /// `client_id`. Any lookup failure reads as `false`.
    async fn is_authorized(&self, client_id: &str, username: &str) -> bool;

    /// Records that `username` approved the client with public code
    /// `client_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    async fn save_authorized(&self, client_id: &str, username: &str) -> StoreResult<()>;
}
