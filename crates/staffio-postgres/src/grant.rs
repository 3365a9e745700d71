//! Scope reference rows and per-user client approvals.

use sqlx_core::error::Error as SqlxError;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::row::Row;
use sqlx_postgres::{PgConnection, PgPool, PgRow};
use staffio_core::{ClientUserAuthorization, Scope};
use time::OffsetDateTime;
use tracing::warn;

fn scope_from_row(row: &PgRow) -> Result<Scope, SqlxError> {
    Ok(Scope {
        name: row.try_get("name")?,
        label: row.try_get("label")?,
        description: row.try_get("description")?,
        is_default: row.try_get("is_default")?,
    })
}

/// Read access to `oauth_scope` and `oauth_client_user_authorized`.
pub struct GrantStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> GrantStorage<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every scope, by name. Rows that fail to decode are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn scopes(&self) -> Result<Vec<Scope>, SqlxError> {
        let rows = query("SELECT name, label, description, is_default FROM oauth_scope ORDER BY name")
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| match scope_from_row(row) {
                Ok(scope) => Some(scope),
                Err(e) => {
                    warn!(error = %e, "skipping undecodable scope row");
                    None
                }
            })
            .collect())
    }

    /// The grant row for `(client_id, username)`.
    ///
    /// # Errors
    ///
    /// `RowNotFound` if there is none, or any query error.
    pub async fn find_authorized(
        &self,
        client_id: &str,
        username: &str,
    ) -> Result<ClientUserAuthorization, SqlxError> {
        let (client_id, username, created_at): (String, String, OffsetDateTime) = query_as(
            "SELECT client_id, username, created FROM oauth_client_user_authorized \
             WHERE client_id = $1 AND username = $2",
        )
        .bind(client_id)
        .bind(username)
        .fetch_one(self.pool)
        .await?;

        Ok(ClientUserAuthorization {
            client_id,
            username,
            created_at,
        })
    }
}

/// Records an approval. An existing approval is left untouched.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn insert_authorized(
    conn: &mut PgConnection,
    client_id: &str,
    username: &str,
) -> Result<(), SqlxError> {
    query(
        r#"
        INSERT INTO oauth_client_user_authorized (client_id, username, created)
        VALUES ($1, $2, NOW())
        ON CONFLICT (client_id, username) DO NOTHING
        "#,
    )
    .bind(client_id)
    .bind(username)
    .execute(conn)
    .await?;

    Ok(())
}
