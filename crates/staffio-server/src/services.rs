//! Backend construction from the loaded configuration.

use anyhow::{Context, Result};
use staffio_ldap::DirectoryStore;
use staffio_postgres::{Gateway, PgCredentialStore, open_store};
use tracing::info;

use crate::config::AppConfig;

/// Opens the pool without touching the schema.
pub async fn gateway(config: &AppConfig) -> Result<Gateway> {
    Gateway::open(&config.postgres)
        .await
        .context("failed to open database pool")
}

/// Opens the credential store: pool, migrations when enabled, refresh index.
pub async fn credential_store(config: &AppConfig) -> Result<PgCredentialStore> {
    let store = open_store(&config.postgres)
        .await
        .context("failed to open credential store")?;
    info!(
        refresh_entries = store.refresh_index().len(),
        "credential store ready"
    );
    Ok(store)
}

/// Builds the directory store. Sessions open lazily on first use.
pub fn directory_store(config: &AppConfig) -> DirectoryStore {
    let store = DirectoryStore::from_config(&config.directory);
    info!(
        sources = store.sources().len(),
        policy = ?store.policy(),
        "directory store ready"
    );
    store
}
