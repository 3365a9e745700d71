//! Embedded schema migrations.
//!
//! SQL files are compiled into the binary; applied versions are tracked in
//! `_sqlx_migrations`.

use std::borrow::Cow;

use sqlx_core::migrate::{Migration, MigrationType, Migrator};
use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use crate::error::{PostgresError, Result};

/// `(version, description, sql)` in apply order. New files go at the end.
const EMBEDDED: &[(i64, &str, &str)] = &[(
    20240101000001,
    "oauth_schema",
    include_str!("../migrations/20240101000001_oauth_schema.sql"),
)];

fn build_migrations() -> Vec<Migration> {
    EMBEDDED
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(sql),
            checksum: Cow::Borrowed(&[]),
            no_tx: false,
        })
        .collect()
}

/// Number of migrations compiled in.
#[must_use]
pub fn embedded_count() -> usize {
    EMBEDDED.len()
}

/// Applies every pending migration.
///
/// # Errors
///
/// Returns [`PostgresError::Migration`] if a migration fails.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> Result<()> {
    let migrations = build_migrations();
    info!(count = migrations.len(), "Running embedded migrations");

    let migrator = Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };

    migrator
        .run(pool)
        .await
        .map_err(|e| PostgresError::Migration(e.to_string()))?;

    info!("Migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_ascending() {
        let migrations = build_migrations();
        assert_eq!(migrations.len(), embedded_count());
        assert!(migrations.windows(2).all(|w| w[0].version < w[1].version));
    }

    #[test]
    fn test_schema_creates_every_table() {
        let sql = EMBEDDED[0].2;
        for table in [
            "oauth_client",
            "oauth_authorization_code",
            "oauth_access_token",
            "oauth_scope",
            "oauth_client_user_authorized",
        ] {
            assert!(
                sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table} ")),
                "missing {table}"
            );
        }
    }
}
