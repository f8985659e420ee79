//! Query code shared by the SQL backends.
//!
//! SQLite and MySQL accept the same statements for everything except the
//! guarded click, so [`sql_link_repository!`] writes the
//! [`LinkRepository`](ember_core::LinkRepository) impl for a repository with
//! a `pool` field and splices in the backend's own `record_click`.

macro_rules! sql_link_repository {
    ($repository:ty { $($record_click:tt)* }) => {
        #[async_trait::async_trait]
        impl ember_core::LinkRepository for $repository {
            async fn insert(&self, record: &ember_core::LinkRecord) -> ember_core::error::Result<()> {
                let result = sqlx::query(
                    r#"
                    INSERT INTO links
                        (short_token, owner_id, destination, expires_at, click_limit, click_count, created_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(record.short_token.as_str())
                .bind(record.owner_id.as_str())
                .bind(record.destination.as_str())
                .bind($crate::row::to_millis(record.expires_at))
                .bind(i64::from(record.click_limit))
                .bind(i64::from(record.click_count))
                .bind($crate::row::to_millis(record.created_at))
                .execute(&self.pool)
                .await;

                match result {
                    Ok(_) => Ok(()),
                    Err(err) if $crate::error::is_unique_violation(&err) => Err(
                        ember_core::StorageError::Conflict(record.short_token.to_string()),
                    ),
                    Err(err) => Err($crate::error::map_sqlx_error(err)),
                }
            }

            async fn find_by_token(
                &self,
                token: &ember_core::ShortToken,
            ) -> ember_core::error::Result<Option<ember_core::LinkRecord>> {
                let row = sqlx::query(&format!(
                    "SELECT {} FROM links WHERE short_token = ? LIMIT 1",
                    $crate::row::COLUMNS
                ))
                .bind(token.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err($crate::error::map_sqlx_error)?;

                row.as_ref().map($crate::row::decode).transpose()
            }

            async fn find_by_owner(
                &self,
                owner: &ember_core::OwnerId,
            ) -> ember_core::error::Result<Vec<ember_core::LinkRecord>> {
                let rows = sqlx::query(&format!(
                    "SELECT {} FROM links WHERE owner_id = ? ORDER BY id",
                    $crate::row::COLUMNS
                ))
                .bind(owner.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err($crate::error::map_sqlx_error)?;

                rows.iter().map($crate::row::decode).collect()
            }

            async fn exists(&self, token: &ember_core::ShortToken) -> ember_core::error::Result<bool> {
                let exists = sqlx::query("SELECT 1 FROM links WHERE short_token = ? LIMIT 1")
                    .bind(token.as_str())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err($crate::error::map_sqlx_error)?
                    .is_some();

                Ok(exists)
            }

            async fn update_click_count(
                &self,
                token: &ember_core::ShortToken,
                click_count: u32,
            ) -> ember_core::error::Result<bool> {
                let result = sqlx::query("UPDATE links SET click_count = ? WHERE short_token = ?")
                    .bind(i64::from(click_count))
                    .bind(token.as_str())
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::map_sqlx_error)?;

                Ok(result.rows_affected() > 0)
            }

            async fn update_click_limit(
                &self,
                token: &ember_core::ShortToken,
                owner: &ember_core::OwnerId,
                click_limit: u32,
            ) -> ember_core::error::Result<bool> {
                let result = sqlx::query(
                    "UPDATE links SET click_limit = ? WHERE short_token = ? AND owner_id = ?",
                )
                .bind(i64::from(click_limit))
                .bind(token.as_str())
                .bind(owner.as_str())
                .execute(&self.pool)
                .await
                .map_err($crate::error::map_sqlx_error)?;

                Ok(result.rows_affected() > 0)
            }

            async fn update_expiry(
                &self,
                token: &ember_core::ShortToken,
                owner: &ember_core::OwnerId,
                expires_at: jiff::Timestamp,
            ) -> ember_core::error::Result<bool> {
                let result = sqlx::query(
                    "UPDATE links SET expires_at = ? WHERE short_token = ? AND owner_id = ?",
                )
                .bind($crate::row::to_millis(expires_at))
                .bind(token.as_str())
                .bind(owner.as_str())
                .execute(&self.pool)
                .await
                .map_err($crate::error::map_sqlx_error)?;

                Ok(result.rows_affected() > 0)
            }

            async fn delete(&self, token: &ember_core::ShortToken) -> ember_core::error::Result<bool> {
                let result = sqlx::query("DELETE FROM links WHERE short_token = ?")
                    .bind(token.as_str())
                    .execute(&self.pool)
                    .await
                    .map_err($crate::error::map_sqlx_error)?;

                Ok(result.rows_affected() > 0)
            }

            async fn delete_if_dead(
                &self,
                token: &ember_core::ShortToken,
                owner: &ember_core::OwnerId,
                now: jiff::Timestamp,
            ) -> ember_core::error::Result<bool> {
                let result = sqlx::query(
                    r#"
                    DELETE FROM links
                    WHERE short_token = ?
                      AND owner_id = ?
                      AND (expires_at <= ? OR click_count >= click_limit)
                    "#,
                )
                .bind(token.as_str())
                .bind(owner.as_str())
                .bind($crate::row::to_millis(now))
                .execute(&self.pool)
                .await
                .map_err($crate::error::map_sqlx_error)?;

                Ok(result.rows_affected() > 0)
            }

            async fn delete_dead(
                &self,
                now: jiff::Timestamp,
                owner: Option<&ember_core::OwnerId>,
            ) -> ember_core::error::Result<u64> {
                let result = match owner {
                    Some(owner) => {
                        sqlx::query(
                            r#"
                            DELETE FROM links
                            WHERE owner_id = ?
                              AND (expires_at <= ? OR click_count >= click_limit)
                            "#,
                        )
                        .bind(owner.as_str())
                        .bind($crate::row::to_millis(now))
                        .execute(&self.pool)
                        .await
                    }
                    None => {
                        sqlx::query(
                            r#"
                            DELETE FROM links
                            WHERE expires_at <= ? OR click_count >= click_limit
                            "#,
                        )
                        .bind($crate::row::to_millis(now))
                        .execute(&self.pool)
                        .await
                    }
                }
                .map_err($crate::error::map_sqlx_error)?;

                Ok(result.rows_affected())
            }

            $($record_click)*
        }
    };
}

pub(crate) use sql_link_repository;
