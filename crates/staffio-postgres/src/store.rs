//! PostgreSQL credential store.
//!
//! Implements [`CredentialStore`] on top of the [`Gateway`]. Reads go through
//! `with_query`, every write through its own `with_transaction`. Refresh
//! tokens are resolved through the in-process [`RefreshIndex`].

use std::collections::HashSet;

use async_trait::async_trait;
use staffio_core::{
    AccessData, AuthorizeData, Client, ClientId, ClientQuery, ClientUserAuthorization,
    CredentialStore, Scope, StoreError, StoreResult,
};
use tracing::{debug, info, instrument};

use crate::access::{AccessStorage, delete_access, delete_expired_access, insert_access};
use crate::authorize::{
    AuthorizeStorage, delete_authorize, delete_expired_authorize, insert_authorize,
};
use crate::client::{ClientStorage, insert_client, update_client};
use crate::gateway::Gateway;
use crate::grant::{GrantStorage, insert_authorized};
use crate::refresh_index::RefreshIndex;
use crate::token_prefix as prefix;

/// Re-raises a lookup failure naming the record and key.
fn lookup_failed(err: StoreError, what: &str, key: &str) -> StoreError {
    if err.is_not_found() {
        StoreError::not_found(format!("{what} {key:?} not found"))
    } else {
        err.with_context(format!("load {what} {key:?}"))
    }
}

/// Outcome of [`PgCredentialStore::purge_expired`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Authorization codes deleted.
    pub authorize_codes: u64,
    /// Access token rows deleted.
    pub access_tokens: u64,
    /// Refresh index entries dropped with them.
    pub refresh_entries: usize,
}

/// Credential store backed by PostgreSQL.
///
/// Cloning shares both the pool and the refresh index.
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    gateway: Gateway,
    refresh: RefreshIndex,
}

impl PgCredentialStore {
    /// Creates a store with an empty refresh index.
    ///
    /// Call [`PgCredentialStore::rebuild_refresh_index`] before serving
    /// refresh requests.
    #[must_use]
    pub fn new(gateway: Gateway) -> Self {
        Self::with_refresh_index(gateway, RefreshIndex::new())
    }

    /// Creates a store sharing an existing index.
    #[must_use]
    pub fn with_refresh_index(gateway: Gateway, refresh: RefreshIndex) -> Self {
        Self { gateway, refresh }
    }

    /// Underlying gateway.
    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Refresh token index.
    #[must_use]
    pub fn refresh_index(&self) -> &RefreshIndex {
        &self.refresh
    }

    /// Repopulates the refresh index from the access token table.
    ///
    /// # Errors
    ///
    /// `Database` if the scan fails.
    pub async fn rebuild_refresh_index(&self) -> StoreResult<usize> {
        self.refresh.rebuild(&self.gateway).await
    }

    /// Deletes expired authorization codes and access tokens, and drops the
    /// refresh index entries that pointed at the deleted tokens.
    ///
    /// Reads never expire anything; this runs only when called.
    ///
    /// # Errors
    ///
    /// `Database` if the delete fails. Nothing is deleted in that case.
    #[instrument(skip(self))]
    pub async fn purge_expired(&self) -> StoreResult<PurgeReport> {
        let (authorize_codes, purged) = self
            .gateway
            .with_transaction(|conn| {
                Box::pin(async move {
                    let codes = delete_expired_authorize(&mut *conn).await?;
                    let tokens = delete_expired_access(&mut *conn).await?;
                    Ok((codes, tokens))
                })
            })
            .await
            .map_err(|e| e.with_context("purge expired"))?;

        let purged: HashSet<String> = purged.into_iter().collect();
        let before = self.refresh.len();
        self.refresh.retain(|_, access| !purged.contains(access));

        let report = PurgeReport {
            authorize_codes,
            access_tokens: purged.len() as u64,
            refresh_entries: before.saturating_sub(self.refresh.len()),
        };
        info!(?report, "expired credentials purged");
        Ok(report)
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn get_client(&self, id: &str) -> StoreResult<Client> {
        self.get_client_with_code(id).await
    }

    #[instrument(skip(self))]
    async fn get_client_with_code(&self, code: &str) -> StoreResult<Client> {
        let row = self
            .gateway
            .with_query(|pool| async move { ClientStorage::new(pool).find_by_code(code).await })
            .await
            .map_err(|e| lookup_failed(e, "client", code))?;

        Ok(row.into_client())
    }

    #[instrument(skip(self))]
    async fn get_client_by_id(&self, id: ClientId) -> StoreResult<Client> {
        let row = self
            .gateway
            .with_query(|pool| async move { ClientStorage::new(pool).find_by_id(id.get()).await })
            .await
            .map_err(|e| lookup_failed(e, "client", &id.to_string()))?;

        Ok(row.into_client())
    }

    #[instrument(skip_all, fields(code = %prefix(&data.code), client = %data.client.code))]
    async fn save_authorize(&self, data: &AuthorizeData) -> StoreResult<()> {
        let data = data.clone();
        self.gateway
            .with_transaction(move |conn| {
                Box::pin(async move { insert_authorize(conn, &data).await })
            })
            .await
            .map_err(|e| e.with_context("save authorize"))?;

        debug!("authorization code saved");
        Ok(())
    }

    #[instrument(skip_all, fields(code = %prefix(code)))]
    async fn load_authorize(&self, code: &str) -> StoreResult<AuthorizeData> {
        let row = self
            .gateway
            .with_query(|pool| async move { AuthorizeStorage::new(pool).find(code).await })
            .await
            .map_err(|e| lookup_failed(e, "authorize", code))?;

        let client = self
            .get_client_with_code(&row.client_id)
            .await
            .map_err(|e| lookup_failed(e, "authorize", code))?;

        Ok(row.into_data(client))
    }

    #[instrument(skip_all, fields(code = %prefix(code)))]
    async fn remove_authorize(&self, code: &str) -> StoreResult<()> {
        if code.is_empty() {
            return Ok(());
        }

        let owned = code.to_owned();
        let removed = self
            .gateway
            .with_transaction(move |conn| {
                Box::pin(async move { delete_authorize(conn, &owned).await })
            })
            .await
            .map_err(|e| e.with_context("remove authorize"))?;

        debug!(removed, "authorization code removed");
        Ok(())
    }

    #[instrument(skip_all, fields(token = %prefix(&data.access_token), client = %data.client.code))]
    async fn save_access(&self, data: &AccessData) -> StoreResult<()> {
        let row = data.clone();
        self.gateway
            .with_transaction(move |conn| Box::pin(async move { insert_access(conn, &row).await }))
            .await
            .map_err(|e| e.with_context("save access"))?;

        // Only durable tokens are indexed.
        if let Some(refresh) = data.refresh_token() {
            self.refresh.insert(refresh, &data.access_token);
        }

        debug!("access token saved");
        Ok(())
    }

    #[instrument(skip_all, fields(token = %prefix(token)))]
    async fn load_access(&self, token: &str) -> StoreResult<AccessData> {
        let row = self
            .gateway
            .with_query(|pool| async move { AccessStorage::new(pool).find(token).await })
            .await
            .map_err(|e| lookup_failed(e, "access token", token))?;

        let client = self
            .get_client_with_code(&row.client_id)
            .await
            .map_err(|e| lookup_failed(e, "access token", token))?;

        Ok(row.into_data(client))
    }

    #[instrument(skip_all, fields(token = %prefix(token)))]
    async fn remove_access(&self, token: &str) -> StoreResult<()> {
        let owned = token.to_owned();
        let removed = self
            .gateway
            .with_transaction(move |conn| {
                Box::pin(async move { delete_access(conn, &owned).await })
            })
            .await
            .map_err(|e| e.with_context("remove access"))?;

        debug!(removed, "access token removed");
        Ok(())
    }

    #[instrument(skip_all, fields(token = %prefix(token)))]
    async fn load_refresh(&self, token: &str) -> StoreResult<AccessData> {
        let Some(access) = self.refresh.get(token) else {
            return Err(StoreError::not_found(format!(
                "refresh token {token:?} not found"
            )));
        };

        self.load_access(&access)
            .await
            .map_err(|e| lookup_failed(e, "refresh token", token))
    }

    #[instrument(skip_all, fields(token = %prefix(token)))]
    async fn remove_refresh(&self, token: &str) -> StoreResult<()> {
        let removed = self.refresh.remove(token).is_some();
        debug!(removed, "refresh token forgotten");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_clients(&self, query: &ClientQuery) -> StoreResult<Vec<Client>> {
        let rows = self
            .gateway
            .with_query(|pool| async move { ClientStorage::new(pool).list(query).await })
            .await
            .map_err(|e| e.with_context("load clients"))?;

        Ok(rows.into_iter().map(|row| row.into_client()).collect())
    }

    async fn count_clients(&self) -> StoreResult<u64> {
        let count = self
            .gateway
            .with_query(|pool| async move { ClientStorage::new(pool).count().await })
            .await
            .map_err(|e| e.with_context("count clients"))?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    #[instrument(skip_all, fields(code = %client.code, id = ?client.id))]
    async fn save_client(&self, client: &mut Client) -> StoreResult<()> {
        client
            .validate()
            .map_err(|e| StoreError::invalid_value(e.to_string()))?;

        let snapshot = client.clone();
        match client.persisted_id() {
            Some(id) => {
                self.gateway
                    .with_transaction(move |conn| {
                        Box::pin(async move { update_client(conn, id.get(), &snapshot).await })
                    })
                    .await
                    .map_err(|e| lookup_failed(e, "client", &id.to_string()))?;
                debug!("client updated");
            }
            None => {
                let id = self
                    .gateway
                    .with_transaction(move |conn| {
                        Box::pin(async move { insert_client(conn, &snapshot).await })
                    })
                    .await
                    .map_err(|e| e.with_context("save client"))?;
                client.id = Some(ClientId(id));
                debug!(id, "client inserted");
            }
        }

        Ok(())
    }

    async fn load_scopes(&self) -> StoreResult<Vec<Scope>> {
        self.gateway
            .with_query(|pool| async move { GrantStorage::new(pool).scopes().await })
            .await
            .map_err(|e| e.with_context("load scopes"))
    }

    async fn load_authorized(
        &self,
        client_id: &str,
        username: &str,
    ) -> StoreResult<ClientUserAuthorization> {
        self.gateway
            .with_query(|pool| async move {
                GrantStorage::new(pool)
                    .find_authorized(client_id, username)
                    .await
            })
            .await
            .map_err(|e| lookup_failed(e, "authorization", &format!("{client_id}/{username}")))
    }

    async fn is_authorized(&self, client_id: &str, username: &str) -> bool {
        match self.load_authorized(client_id, username).await {
            Ok(_) => true,
            Err(e) if e.is_not_found() => false,
            Err(e) => {
                debug!(client_id, username, error = %e, "authorization lookup failed");
                false
            }
        }
    }

    #[instrument(skip(self))]
    async fn save_authorized(&self, client_id: &str, username: &str) -> StoreResult<()> {
        let client_id = client_id.to_owned();
        let username = username.to_owned();
        self.gateway
            .with_transaction(move |conn| {
                Box::pin(async move { insert_authorized(conn, &client_id, &username).await })
            })
            .await
            .map_err(|e| e.with_context("save authorized"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::PgPoolOptions;

    /// A store whose pool never connects; any I/O fails.
    fn offline_store() -> PgCredentialStore {
        let pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy("postgres://staffio@127.0.0.1:1/staffio")
            .unwrap();
        PgCredentialStore::new(Gateway::from_pool(pool))
    }

    #[test]
    fn test_lookup_failed_names_key() {
        let err = lookup_failed(StoreError::not_found("query"), "authorize", "abc123");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: authorize \"abc123\" not found");

        let err = lookup_failed(StoreError::database("query"), "client", "demo");
        assert!(err.is_database_error());
    }

    #[tokio::test]
    async fn test_save_client_validates_before_io() {
        let store = offline_store();
        // Closed pool: reaching the database would be a Database error.
        store.gateway().close().await;

        let mut client = Client::new("", "demo", "s3cret", "https://example/cb");
        let err = store.save_client(&mut client).await.unwrap_err();
        assert!(err.is_invalid_value());
        assert!(client.id.is_none());

        let mut client = Client::new("demo", "demo", "", "https://example/cb");
        assert!(store.save_client(&mut client).await.unwrap_err().is_invalid_value());
    }

    #[tokio::test]
    async fn test_zero_id_takes_insert_path() {
        let store = offline_store();
        store.gateway().close().await;

        let mut client = Client::new("demo", "demo", "s3cret", "https://example/cb");
        client.id = Some(ClientId(0));
        let err = store.save_client(&mut client).await.unwrap_err();
        assert!(err.is_database_error());
        assert!(err.to_string().contains("save client"), "{err}");
        assert_eq!(client.id, Some(ClientId(0)));
    }

    #[tokio::test]
    async fn test_load_refresh_miss_is_not_found() {
        let store = offline_store();
        store.gateway().close().await;

        let err = store.load_refresh("unknown").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("\"unknown\""));
    }

    #[tokio::test]
    async fn test_remove_refresh_only_touches_index() {
        let store = offline_store();
        store.gateway().close().await;

        store.refresh_index().insert("r-1", "a-1");
        store.remove_refresh("r-1").await.unwrap();
        store.remove_refresh("r-1").await.unwrap();
        assert!(store.refresh_index().is_empty());
    }

    #[tokio::test]
    async fn test_is_authorized_swallows_errors() {
        let store = offline_store();
        store.gateway().close().await;
        assert!(!store.is_authorized("demo", "alice").await);

        let err = store.load_authorized("demo", "alice").await.unwrap_err();
        assert!(err.is_database_error());
        assert!(err.to_string().contains("demo/alice"), "{err}");
    }

    #[tokio::test]
    async fn test_remove_empty_authorize_is_noop() {
        let store = offline_store();
        store.gateway().close().await;
        store.remove_authorize("").await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_save_access_is_not_indexed() {
        let store = offline_store();
        store.gateway().close().await;

        let data = AccessData {
            access_token: "a-1".into(),
            refresh_token: Some("r-1".into()),
            client: Client::new("demo", "demo", "s3cret", "https://example/cb"),
            username: "alice".into(),
            expires_in: 3600,
            scope: "basic".into(),
            is_frozen: false,
            created_at: time::OffsetDateTime::now_utc(),
        };
        assert!(store.save_access(&data).await.unwrap_err().is_database_error());
        assert!(store.refresh_index().get("r-1").is_none());
    }
}
