//! OAuth client rows.
//!
//! [`ClientStorage`] reads from the pool; the write helpers take a
//! transaction connection so they can only run inside
//! [`crate::Gateway::with_transaction`].

use sqlx_core::error::Error as SqlxError;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_core::row::Row;
use sqlx_postgres::{PgConnection, PgPool, PgRow};
use staffio_core::{Client, ClientId, ClientQuery, SortOrder};
use time::OffsetDateTime;
use tracing::warn;

const CLIENT_COLUMNS: &str = "id, name, code, secret, redirect_uri, allowed_grant_types, \
     allowed_response_types, allowed_scopes, created";

/// Columns a client listing may be ordered by.
pub const SORTABLE_COLUMNS: &[&str] = &["id", "created"];

// =============================================================================
// List Columns
// =============================================================================

/// Joins an allow-list into its column form.
#[must_use]
pub fn join_list(items: &[String]) -> String {
    items.join(",")
}

/// Splits a list column. An empty column is an empty list.
#[must_use]
pub fn split_list(column: &str) -> Vec<String> {
    if column.is_empty() {
        return Vec::new();
    }
    column.split(',').map(str::to_owned).collect()
}

// =============================================================================
// Row
// =============================================================================

type ClientTuple = (
    i64,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    OffsetDateTime,
);

/// `oauth_client` row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRow {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub secret: String,
    pub redirect_uri: String,
    pub allowed_grant_types: String,
    pub allowed_response_types: String,
    pub allowed_scopes: String,
    pub created: OffsetDateTime,
}

impl ClientRow {
    fn from_tuple(row: ClientTuple) -> Self {
        Self {
            id: row.0,
            name: row.1,
            code: row.2,
            secret: row.3,
            redirect_uri: row.4,
            allowed_grant_types: row.5,
            allowed_response_types: row.6,
            allowed_scopes: row.7,
            created: row.8,
        }
    }

    fn try_from_row(row: &PgRow) -> Result<Self, SqlxError> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            code: row.try_get("code")?,
            secret: row.try_get("secret")?,
            redirect_uri: row.try_get("redirect_uri")?,
            allowed_grant_types: row.try_get("allowed_grant_types")?,
            allowed_response_types: row.try_get("allowed_response_types")?,
            allowed_scopes: row.try_get("allowed_scopes")?,
            created: row.try_get("created")?,
        })
    }

    /// Decodes the list columns into a domain client.
    #[must_use]
    pub fn into_client(self) -> Client {
        Client {
            id: Some(ClientId(self.id)),
            name: self.name,
            code: self.code,
            secret: self.secret,
            redirect_uri: self.redirect_uri,
            allowed_grant_types: split_list(&self.allowed_grant_types),
            allowed_response_types: split_list(&self.allowed_response_types),
            allowed_scopes: split_list(&self.allowed_scopes),
            created_at: self.created,
        }
    }
}

/// Builds the `ORDER BY` clause for a listing.
///
/// Keys outside [`SORTABLE_COLUMNS`] are dropped. With no usable key the
/// listing falls back to `id ASC` so pages stay stable.
#[must_use]
pub fn order_by_clause(sort: &[(String, SortOrder)]) -> String {
    let terms: Vec<String> = sort
        .iter()
        .filter(|(field, _)| SORTABLE_COLUMNS.contains(&field.as_str()))
        .map(|(field, order)| format!("{field} {}", order.as_sql()))
        .collect();

    if terms.is_empty() {
        "ORDER BY id ASC".to_owned()
    } else {
        format!("ORDER BY {}", terms.join(", "))
    }
}

// =============================================================================
// Reads
// =============================================================================

/// Read access to `oauth_client`.
pub struct ClientStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> ClientStorage<'a> {
    /// Create a new client storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetches the client with public code `code`.
    ///
    /// # Errors
    ///
    /// `RowNotFound` if no client has that code.
    pub async fn find_by_code(&self, code: &str) -> Result<ClientRow, SqlxError> {
        let row: ClientTuple = query_as(&format!(
            "SELECT {CLIENT_COLUMNS} FROM oauth_client WHERE code = $1"
        ))
        .bind(code)
        .fetch_one(self.pool)
        .await?;

        Ok(ClientRow::from_tuple(row))
    }

    /// Fetches the client with internal id `id`.
    ///
    /// # Errors
    ///
    /// `RowNotFound` if no client has that id.
    pub async fn find_by_id(&self, id: i64) -> Result<ClientRow, SqlxError> {
        let row: ClientTuple = query_as(&format!(
            "SELECT {CLIENT_COLUMNS} FROM oauth_client WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(ClientRow::from_tuple(row))
    }

    /// One page of clients. Rows that fail to decode are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self, page: &ClientQuery) -> Result<Vec<ClientRow>, SqlxError> {
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM oauth_client {} LIMIT $1 OFFSET $2",
            order_by_clause(&page.sort)
        );

        let rows = query(&sql)
            .bind(page.effective_limit())
            .bind(page.effective_offset())
            .fetch_all(self.pool)
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| match ClientRow::try_from_row(row) {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!(error = %e, "skipping undecodable client row");
                    None
                }
            })
            .collect())
    }

    /// Total number of clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count(&self) -> Result<i64, SqlxError> {
        query_scalar("SELECT COUNT(*) FROM oauth_client")
            .fetch_one(self.pool)
            .await
    }
}

// =============================================================================
// Writes
// =============================================================================

/// Inserts `client` and returns the assigned id.
///
/// # Errors
///
/// Returns an error if the insert fails (e.g. a duplicate code).
pub async fn insert_client(conn: &mut PgConnection, client: &Client) -> Result<i64, SqlxError> {
    query_scalar(
        r#"
        INSERT INTO oauth_client
            (name, code, secret, redirect_uri, allowed_grant_types,
             allowed_response_types, allowed_scopes, created)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(&client.name)
    .bind(&client.code)
    .bind(&client.secret)
    .bind(&client.redirect_uri)
    .bind(join_list(&client.allowed_grant_types))
    .bind(join_list(&client.allowed_response_types))
    .bind(join_list(&client.allowed_scopes))
    .bind(client.created_at)
    .fetch_one(conn)
    .await
}

/// Rewrites every mutable column of the client with id `id`.
///
/// # Errors
///
/// `RowNotFound` if no client has that id.
pub async fn update_client(
    conn: &mut PgConnection,
    id: i64,
    client: &Client,
) -> Result<i64, SqlxError> {
    query_scalar(
        r#"
        UPDATE oauth_client
        SET name = $2, code = $3, secret = $4, redirect_uri = $5,
            allowed_grant_types = $6, allowed_response_types = $7, allowed_scopes = $8
        WHERE id = $1
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(&client.name)
    .bind(&client.code)
    .bind(&client.secret)
    .bind(&client.redirect_uri)
    .bind(join_list(&client.allowed_grant_types))
    .bind(join_list(&client.allowed_response_types))
    .bind(join_list(&client.allowed_scopes))
    .fetch_one(conn)
    .await
}
