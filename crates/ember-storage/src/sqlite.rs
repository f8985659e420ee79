use ember_core::error::Result;
use ember_core::{LinkRecord, ShortToken};
use jiff::Timestamp;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::error::map_sqlx_error;
use crate::row::{decode, to_millis, COLUMNS};
use crate::sql::sql_link_repository;

/// Schema applied on connect.
pub const SCHEMA: &str = include_str!("../ddl/sqlite/links.sql");

/// SQLite implementation of the repository contract.
///
/// Records are hard-deleted. The guarded click increment is a single
/// `UPDATE ... RETURNING` statement, which SQLite executes atomically.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Creates a repository from an existing pool. The schema must already exist.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if missing) the database at `database_url` and applies
    /// the schema.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(map_sqlx_error)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // one writer at a time; also keeps `sqlite::memory:` a single database
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(map_sqlx_error)?;

        let repository = Self::new(pool);
        repository.ensure_schema().await?;
        Ok(repository)
    }

    /// Opens a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Creates the `links` table and its indexes if they do not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!("sqlite schema ready");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

sql_link_repository!(SqliteRepository {
    async fn record_click(&self, token: &ShortToken, now: Timestamp) -> Result<Option<LinkRecord>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE links
            SET click_count = click_count + 1
            WHERE short_token = ?
              AND click_count < click_limit
              AND expires_at > ?
            RETURNING {COLUMNS}
            "#
        ))
        .bind(token.as_str())
        .bind(to_millis(now))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(decode).transpose()
    }
});
