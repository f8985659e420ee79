//! Column layout shared by the SQL backends.
//!
//! Both schemas store timestamps as Unix milliseconds and counters as
//! 64-bit integers, so a row decodes into [`RawRecord`] the same way on
//! every backend.

use ember_core::{Destination, LinkRecord, OwnerId, ShortToken, StorageError};
use jiff::Timestamp;
use sqlx::{ColumnIndex, Decode, Row, Type};

use crate::error::map_sqlx_error;

pub(crate) const COLUMNS: &str =
    "short_token, owner_id, destination, expires_at, click_limit, click_count, created_at";

pub(crate) struct RawRecord {
    short_token: String,
    owner_id: String,
    destination: String,
    expires_at: i64,
    click_limit: i64,
    click_count: i64,
    created_at: i64,
}

impl RawRecord {
    pub(crate) fn from_row<'r, R>(row: &'r R) -> ember_core::error::Result<Self>
    where
        R: Row,
        &'static str: ColumnIndex<R>,
        String: Decode<'r, R::Database> + Type<R::Database>,
        i64: Decode<'r, R::Database> + Type<R::Database>,
    {
        Ok(Self {
            short_token: row.try_get("short_token").map_err(map_sqlx_error)?,
            owner_id: row.try_get("owner_id").map_err(map_sqlx_error)?,
            destination: row.try_get("destination").map_err(map_sqlx_error)?,
            expires_at: row.try_get("expires_at").map_err(map_sqlx_error)?,
            click_limit: row.try_get("click_limit").map_err(map_sqlx_error)?,
            click_count: row.try_get("click_count").map_err(map_sqlx_error)?,
            created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
        })
    }

    pub(crate) fn into_record(self) -> ember_core::error::Result<LinkRecord> {
        Ok(LinkRecord {
            short_token: ShortToken::new_unchecked(self.short_token),
            owner_id: OwnerId::new_unchecked(self.owner_id),
            destination: Destination::new_unchecked(self.destination),
            expires_at: parse_millis("expires_at", self.expires_at)?,
            click_limit: parse_counter("click_limit", self.click_limit)?,
            click_count: parse_counter("click_count", self.click_count)?,
            created_at: parse_millis("created_at", self.created_at)?,
        })
    }
}

/// Decodes one `COLUMNS` row of any SQL backend.
pub(crate) fn decode<'r, R>(row: &'r R) -> ember_core::error::Result<LinkRecord>
where
    R: Row,
    &'static str: ColumnIndex<R>,
    String: Decode<'r, R::Database> + Type<R::Database>,
    i64: Decode<'r, R::Database> + Type<R::Database>,
{
    RawRecord::from_row(row)?.into_record()
}

pub(crate) fn to_millis(ts: Timestamp) -> i64 {
    ts.as_millisecond()
}

fn parse_millis(column: &str, value: i64) -> ember_core::error::Result<Timestamp> {
    Timestamp::from_millisecond(value).map_err(|e| {
        StorageError::InvalidData(format!("invalid {} timestamp '{}': {e}", column, value))
    })
}

fn parse_counter(column: &str, value: i64) -> ember_core::error::Result<u32> {
    u32::try_from(value).map_err(|_| {
        StorageError::InvalidData(format!("{} out of range: {}", column, value))
    })
}
