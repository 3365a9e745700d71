//! Authorization code rows.

use sqlx_core::error::Error as SqlxError;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::{PgConnection, PgPool};
use staffio_core::{AuthorizeData, Client};
use time::OffsetDateTime;

type AuthorizeTuple = (String, String, String, String, i32, String, OffsetDateTime);

/// `oauth_authorization_code` row. `client_id` is the client's public code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeRow {
    pub code: String,
    pub client_id: String,
    pub username: String,
    pub redirect_uri: String,
    pub expires_in: i32,
    pub scopes: String,
    pub created: OffsetDateTime,
}

impl AuthorizeRow {
    fn from_tuple(row: AuthorizeTuple) -> Self {
        Self {
            code: row.0,
            client_id: row.1,
            username: row.2,
            redirect_uri: row.3,
            expires_in: row.4,
            scopes: row.5,
            created: row.6,
        }
    }

    /// Attaches the resolved client.
    #[must_use]
    pub fn into_data(self, client: Client) -> AuthorizeData {
        AuthorizeData {
            code: self.code,
            client,
            username: self.username,
            redirect_uri: self.redirect_uri,
            expires_in: self.expires_in,
            scope: self.scopes,
            created_at: self.created,
        }
    }
}

/// Read access to `oauth_authorization_code`.
pub struct AuthorizeStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> AuthorizeStorage<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetches the row for `code`.
    ///
    /// # Errors
    ///
    /// `RowNotFound` if the code is unknown.
    pub async fn find(&self, code: &str) -> Result<AuthorizeRow, SqlxError> {
        let row: AuthorizeTuple = query_as(
            r#"
            SELECT code, client_id, username, redirect_uri, expires_in, scopes, created
            FROM oauth_authorization_code
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_one(self.pool)
        .await?;

        Ok(AuthorizeRow::from_tuple(row))
    }
}

/// Inserts an authorization code.
///
/// # Errors
///
/// Returns an error if the insert fails (e.g. the code already exists).
pub async fn insert_authorize(
    conn: &mut PgConnection,
    data: &AuthorizeData,
) -> Result<(), SqlxError> {
    query(
        r#"
        INSERT INTO oauth_authorization_code
            (code, client_id, username, redirect_uri, expires_in, scopes, created)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&data.code)
    .bind(&data.client.code)
    .bind(&data.username)
    .bind(&data.redirect_uri)
    .bind(data.expires_in)
    .bind(&data.scope)
    .bind(data.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Deletes an authorization code. Deleting an unknown code is not an error.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub async fn delete_authorize(conn: &mut PgConnection, code: &str) -> Result<u64, SqlxError> {
    let result = query("DELETE FROM oauth_authorization_code WHERE code = $1")
        .bind(code)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

/// Deletes every code whose validity window has closed. Returns the count.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub async fn delete_expired_authorize(conn: &mut PgConnection) -> Result<u64, SqlxError> {
    let result = query(
        "DELETE FROM oauth_authorization_code \
         WHERE created + expires_in * INTERVAL '1 second' < NOW()",
    )
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}
