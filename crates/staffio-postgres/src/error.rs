//! Error types for the PostgreSQL gateway.
//!
//! Lifecycle failures (connect, migrate) use [`PostgresError`]. Statement
//! failures never leave the gateway as sqlx errors: [`collapse`] turns them
//! into the two-tier `NotFound` / `Database` taxonomy and logs the original.

use sqlx_core::error::Error as SqlxError;
use staffio_core::StoreError;
use tracing::{debug, error};

/// PostgreSQL error code for unique violation (23505).
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Collapses a statement error into the store taxonomy.
///
/// `RowNotFound` becomes `NotFound`; everything else becomes `Database`.
/// The original error is logged here and dropped.
pub fn collapse(context: &str, err: SqlxError) -> StoreError {
    match err {
        SqlxError::RowNotFound => {
            debug!(context, "no rows");
            StoreError::not_found(context)
        }
        other => {
            error!(
                context,
                error = %other,
                unique_violation = has_pg_error_code(&other, PG_UNIQUE_VIOLATION),
                "database error"
            );
            StoreError::database(context)
        }
    }
}

/// Errors from opening, checking or migrating the database.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx_core::error::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StoreError {
    fn from(err: PostgresError) -> Self {
        StoreError::database(err.to_string())
    }
}

/// Result type alias for gateway lifecycle operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_collapses_to_not_found() {
        let err = collapse("load authorize", SqlxError::RowNotFound);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: load authorize");
    }

    #[test]
    fn test_other_errors_collapse_to_database() {
        let err = collapse("save client", SqlxError::PoolTimedOut);
        assert!(err.is_database_error());
        // The sqlx message must not leak through.
        assert_eq!(err.to_string(), "Database error: save client");
    }

    #[test]
    fn test_error_display() {
        let err = PostgresError::config("pool_size must be > 0");
        assert!(err.to_string().contains("Configuration error"));

        let store: StoreError = PostgresError::Migration("bad sql".into()).into();
        assert!(store.is_database_error());
    }
}
