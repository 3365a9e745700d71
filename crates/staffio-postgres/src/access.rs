//! Access token rows.
//!
//! A token issued without a refresh token is stored with an empty
//! `refresh_token` column; [`AccessRow::into_data`] maps it back to `None`.

use sqlx_core::error::Error as SqlxError;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::{PgConnection, PgPool};
use staffio_core::{AccessData, Client};
use time::OffsetDateTime;

type AccessTuple = (
    String,
    String,
    String,
    String,
    i32,
    String,
    bool,
    OffsetDateTime,
);

/// `oauth_access_token` row. `client_id` is the client's public code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRow {
    pub access_token: String,
    pub refresh_token: String,
    pub client_id: String,
    pub username: String,
    pub expires_in: i32,
    pub scopes: String,
    pub is_frozen: bool,
    pub created: OffsetDateTime,
}

impl AccessRow {
    fn from_tuple(row: AccessTuple) -> Self {
        Self {
            access_token: row.0,
            refresh_token: row.1,
            client_id: row.2,
            username: row.3,
            expires_in: row.4,
            scopes: row.5,
            is_frozen: row.6,
            created: row.7,
        }
    }

    /// Attaches the resolved client.
    #[must_use]
    pub fn into_data(self, client: Client) -> AccessData {
        AccessData {
            access_token: self.access_token,
            refresh_token: Some(self.refresh_token).filter(|t| !t.is_empty()),
            client,
            username: self.username,
            expires_in: self.expires_in,
            scope: self.scopes,
            is_frozen: self.is_frozen,
            created_at: self.created,
        }
    }
}

/// Read access to `oauth_access_token`.
pub struct AccessStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> AccessStorage<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetches the row for `token`.
    ///
    /// # Errors
    ///
    /// `RowNotFound` if the token is unknown.
    pub async fn find(&self, token: &str) -> Result<AccessRow, SqlxError> {
        let row: AccessTuple = query_as(
            r#"
            SELECT access_token, refresh_token, client_id, username,
                   expires_in, scopes, is_frozen, created
            FROM oauth_access_token
            WHERE access_token = $1
            "#,
        )
        .bind(token)
        .fetch_one(self.pool)
        .await?;

        Ok(AccessRow::from_tuple(row))
    }
}

/// Inserts an access token.
///
/// # Errors
///
/// Returns an error if the insert fails (e.g. the token already exists).
pub async fn insert_access(conn: &mut PgConnection, data: &AccessData) -> Result<(), SqlxError> {
    query(
        r#"
        INSERT INTO oauth_access_token
            (client_id, username, access_token, refresh_token, expires_in,
             scopes, is_frozen, created)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(&data.client.code)
    .bind(&data.username)
    .bind(&data.access_token)
    .bind(data.refresh_token().unwrap_or_default())
    .bind(data.expires_in)
    .bind(&data.scope)
    .bind(data.is_frozen)
    .bind(data.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Deletes an access token. Deleting an unknown token is not an error.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub async fn delete_access(conn: &mut PgConnection, token: &str) -> Result<u64, SqlxError> {
    let result = query("DELETE FROM oauth_access_token WHERE access_token = $1")
        .bind(token)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

/// Deletes every token whose validity window has closed and returns the
/// deleted access token strings.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub async fn delete_expired_access(conn: &mut PgConnection) -> Result<Vec<String>, SqlxError> {
    query_scalar(
        "DELETE FROM oauth_access_token \
         WHERE created + expires_in * INTERVAL '1 second' < NOW() \
         RETURNING access_token",
    )
    .fetch_all(conn)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_refresh_column_maps_to_none() {
        let row = AccessRow {
            access_token: "abc123".into(),
            refresh_token: String::new(),
            client_id: "demo-code".into(),
            username: "alice".into(),
            expires_in: 3600,
            scopes: "basic".into(),
            is_frozen: false,
            created: OffsetDateTime::UNIX_EPOCH,
        };
        let client = Client::new("demo", "demo-code", "s", "https://example/cb");

        let data = row.clone().into_data(client.clone());
        assert_eq!(data.refresh_token, None);
        assert_eq!(data.client.code, "demo-code");

        let row = AccessRow {
            refresh_token: "r-1".into(),
            is_frozen: true,
            ..row
        };
        let data = row.into_data(client);
        assert_eq!(data.refresh_token.as_deref(), Some("r-1"));
        assert!(data.is_frozen);
    }
}
