//! In-process refresh token index.
//!
//! Maps a refresh token to the access token it was issued with. The index
//! lives only in memory; [`RefreshIndex::rebuild`] repopulates it from the
//! access token table after a restart.
//!
//! Removing a refresh token touches the index only. The access token row it
//! pointed at is left alone.

use std::sync::Arc;

use dashmap::DashMap;
use sqlx_core::query_as::query_as;
use staffio_core::StoreResult;
use tracing::{debug, info, instrument};

use crate::gateway::Gateway;
use crate::token_prefix;

/// Concurrent `refresh token -> access token` map.
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct RefreshIndex {
    entries: Arc<DashMap<String, String>>,
}

impl RefreshIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Points `refresh` at `access`, replacing any previous target.
    /// Empty refresh tokens are ignored.
    pub fn insert(&self, refresh: &str, access: &str) {
        if refresh.is_empty() {
            return;
        }
        self.entries.insert(refresh.to_owned(), access.to_owned());
    }

    /// Access token for `refresh`, if indexed.
    #[must_use]
    pub fn get(&self, refresh: &str) -> Option<String> {
        self.entries.get(refresh).map(|entry| entry.value().clone())
    }

    /// Forgets `refresh`. Returns the access token it pointed at.
    pub fn remove(&self, refresh: &str) -> Option<String> {
        self.entries.remove(refresh).map(|(_, access)| access)
    }

    /// Number of indexed refresh tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keeps only the entries for which `keep(refresh, access)` holds.
    pub fn retain(&self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.entries.retain(|refresh, access| keep(refresh, access));
    }

    /// Loads every persisted refresh token into the index.
    ///
    /// Existing entries are overwritten, not cleared, so tokens saved while
    /// the rebuild runs are kept. Returns the number of rows loaded.
    ///
    /// # Errors
    ///
    /// `Database` if the scan fails; the index is left as it was.
    #[instrument(skip_all)]
    pub async fn rebuild(&self, gateway: &Gateway) -> StoreResult<usize> {
        let rows: Vec<(String, String)> = gateway
            .with_query(|pool| {
                query_as(
                    "SELECT refresh_token, access_token FROM oauth_access_token \
                     WHERE refresh_token <> ''",
                )
                .fetch_all(pool)
            })
            .await
            .map_err(|e| e.with_context("rebuild refresh index"))?;

        let loaded = rows.len();
        for (refresh, access) in rows {
            debug!(
                refresh = %token_prefix(&refresh),
                token = %token_prefix(&access),
                "indexing refresh token"
            );
            self.entries.insert(refresh, access);
        }

        info!(loaded, total = self.entries.len(), "refresh index rebuilt");
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let index = RefreshIndex::new();
        index.insert("r1", "a1");
        assert_eq!(index.get("r1").as_deref(), Some("a1"));
        assert_eq!(index.len(), 1);

        index.insert("r1", "a2");
        assert_eq!(index.get("r1").as_deref(), Some("a2"));

        assert_eq!(index.remove("r1").as_deref(), Some("a2"));
        assert!(index.get("r1").is_none());
        assert!(index.remove("r1").is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn test_empty_refresh_is_not_indexed() {
        let index = RefreshIndex::new();
        index.insert("", "a1");
        assert!(index.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let index = RefreshIndex::new();
        let other = index.clone();
        other.insert("r1", "a1");
        assert_eq!(index.get("r1").as_deref(), Some("a1"));
    }

    #[test]
    fn test_retain() {
        let index = RefreshIndex::new();
        index.insert("r1", "a1");
        index.insert("r2", "a2");
        index.retain(|_, access| access != "a1");
        assert!(index.get("r1").is_none());
        assert_eq!(index.get("r2").as_deref(), Some("a2"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers() {
        let index = RefreshIndex::new();
        let mut handles = Vec::new();
        for worker in 0..8 {
            let index = index.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..250 {
                    let refresh = format!("r-{worker}-{i}");
                    index.insert(&refresh, &format!("a-{worker}-{i}"));
                    if i % 2 == 0 {
                        index.remove(&refresh);
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(index.len(), 8 * 125);
        assert_eq!(index.get("r-3-1").as_deref(), Some("a-3-1"));
        assert!(index.get("r-3-0").is_none());
    }
}
