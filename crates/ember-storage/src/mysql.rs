use ember_core::error::Result;
use ember_core::{LinkRecord, ShortToken};
use jiff::Timestamp;
use sqlx::MySqlPool;
use tracing::debug;

use crate::error::map_sqlx_error;
use crate::row::{decode, to_millis, COLUMNS};
use crate::sql::sql_link_repository;

/// Schema applied by [`MySqlRepository::ensure_schema`].
pub const SCHEMA: &str = include_str!("../ddl/mysql/links.sql");

/// MySQL implementation of the repository contract.
///
/// MySQL has no `UPDATE ... RETURNING`, so the guarded click increment runs
/// in a transaction: the conditional `UPDATE` takes the row lock, and the
/// follow-up `SELECT` reads the incremented row before the lock is released.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new MySQL connection pool and
    /// applying the schema.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        let repository = Self::new(pool);
        repository.ensure_schema().await?;
        Ok(repository)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!("mysql schema ready");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

sql_link_repository!(MySqlRepository {
    async fn record_click(&self, token: &ShortToken, now: Timestamp) -> Result<Option<LinkRecord>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let updated = sqlx::query(
            r#"
            UPDATE links
            SET click_count = click_count + 1
            WHERE short_token = ?
              AND click_count < click_limit
              AND expires_at > ?
            "#,
        )
        .bind(token.as_str())
        .bind(to_millis(now))
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if updated.rows_affected() == 0 {
            tx.commit().await.map_err(map_sqlx_error)?;
            return Ok(None);
        }

        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM links WHERE short_token = ? LIMIT 1"
        ))
        .bind(token.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        row.as_ref().map(decode).transpose()
    }
});
