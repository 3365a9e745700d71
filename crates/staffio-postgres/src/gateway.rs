//! Relational store gateway.
//!
//! The gateway owns the connection pool. Nothing above it touches a
//! connection directly: reads go through [`Gateway::with_query`], writes
//! through [`Gateway::with_transaction`]. Both collapse statement errors into
//! `NotFound` / `Database` before returning.
//!
//! Pooled connections are pinged before they are handed out
//! (`test_before_acquire`); a connection that fails the ping is discarded and
//! the pool opens a fresh one.

use std::future::Future;
use std::time::Duration;

use futures_util::future::BoxFuture;
use sqlx_core::error::Error as SqlxError;
use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgConnection, PgPool, Postgres};
use staffio_core::StoreResult;
use tracing::{debug, info, instrument, warn};

use crate::config::{PostgresConfig, mask_password};
use crate::error::{PostgresError, Result, collapse};
use crate::migrations;

/// Type alias for PostgreSQL pool options.
pub type PgPoolOptions = PoolOptions<Postgres>;

/// Shared handle to the relational store.
///
/// Cloning is cheap; all clones share one pool. Each call to
/// [`Gateway::with_transaction`] begins its own transaction on its own
/// connection, so concurrent callers never share a transaction.
#[derive(Debug, Clone)]
pub struct Gateway {
    pool: PgPool,
}

impl Gateway {
    /// Opens a connection pool from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the first
    /// connection cannot be established.
    #[instrument(skip(config), fields(url = %mask_password(&config.connection_url())))]
    pub async fn open(config: &PostgresConfig) -> Result<Self> {
        if config.pool_size == 0 {
            return Err(PostgresError::config("pool_size must be > 0"));
        }

        info!(
            pool_size = config.pool_size,
            min_connections = ?config.min_connections,
            connect_timeout_ms = config.connect_timeout_ms,
            "Opening PostgreSQL connection pool"
        );

        let min_connections = config
            .min_connections
            .unwrap_or(config.pool_size / 4)
            .clamp(1, config.pool_size);

        let mut options = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs.unwrap_or(1800)))
            .test_before_acquire(true);

        if let Some(idle_timeout) = config.idle_timeout_ms {
            options = options.idle_timeout(Duration::from_millis(idle_timeout));
        }

        let pool = options.connect(&config.connection_url()).await?;

        debug!("PostgreSQL connection pool opened");

        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Closes every connection. Later calls fail with a `Database` error.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("PostgreSQL connection pool closed");
    }

    /// Returns `true` once [`Gateway::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Round-trips a trivial statement.
    ///
    /// # Errors
    ///
    /// `Database` if no healthy connection can be obtained.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> StoreResult<()> {
        self.with_query(|pool| async move {
            sqlx_core::query::query("SELECT 1").execute(pool).await?;
            Ok(())
        })
        .await
        .map_err(|e| e.with_context("ping"))
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        migrations::run(&self.pool).await
    }

    /// Runs a read against the pool.
    ///
    /// `RowNotFound` raised by `op` surfaces as `NotFound`, anything else as
    /// `Database`.
    ///
    /// # Errors
    ///
    /// The collapsed error of `op`.
    pub async fn with_query<'g, T, F, Fut>(&'g self, op: F) -> StoreResult<T>
    where
        F: FnOnce(&'g PgPool) -> Fut,
        Fut: Future<Output = std::result::Result<T, SqlxError>>,
    {
        op(&self.pool).await.map_err(|e| collapse("query", e))
    }

    /// Runs `op` inside a transaction.
    ///
    /// Commits when `op` returns `Ok`, rolls back when it returns `Err`. If
    /// `op` panics the transaction is dropped, which also rolls it back.
    ///
    /// ```ignore
    /// let code = data.code.clone();
    /// gateway
    ///     .with_transaction(move |conn| {
    ///         Box::pin(async move {
    ///             query("DELETE FROM oauth_authorization_code WHERE code = $1")
    ///                 .bind(code)
    ///                 .execute(&mut *conn)
    ///                 .await?;
    ///             Ok(())
    ///         })
    ///     })
    ///     .await?;
    /// ```
    ///
    /// # Errors
    ///
    /// The collapsed error of `begin`, `op` or `commit`.
    pub async fn with_transaction<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, std::result::Result<T, SqlxError>>
            + Send,
        T: Send,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| collapse("begin transaction", e))?;

        match op(&mut tx).await {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| collapse("commit transaction", e))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "transaction rollback failed");
                }
                Err(collapse("transaction", err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_rejects_zero_pool() {
        let config = PostgresConfig::new("postgres://localhost/staffio").with_pool_size(0);
        let err = Gateway::open(&config).await.unwrap_err();
        assert!(matches!(err, PostgresError::Config { .. }));
    }

    #[tokio::test]
    async fn test_with_query_maps_row_not_found() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://staffio@localhost:1/staffio")
            .unwrap();
        let gateway = Gateway::from_pool(pool);

        let err = gateway
            .with_query(|_pool| async { Err::<(), _>(SqlxError::RowNotFound) })
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let value = gateway
            .with_query(|_pool| async { Ok::<_, SqlxError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_closed_gateway_reports_closed() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://staffio@localhost:1/staffio")
            .unwrap();
        let gateway = Gateway::from_pool(pool);
        assert!(!gateway.is_closed());
        gateway.close().await;
        assert!(gateway.is_closed());
        assert!(gateway.ping().await.unwrap_err().is_database_error());
    }
}
