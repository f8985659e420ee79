use crate::destination::Destination;
use crate::error::Result;
use crate::owner::OwnerId;
use crate::token::ShortToken;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A stored link record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Globally unique lookup key.
    pub short_token: ShortToken,
    /// The party that created the record. Never changes.
    pub owner_id: OwnerId,
    /// The address the token stands for.
    pub destination: Destination,
    /// The record is gone once `now >= expires_at`.
    pub expires_at: Timestamp,
    /// Maximum number of successful resolutions, always at least 1.
    pub click_limit: u32,
    /// Successful resolutions so far. A click is only counted while
    /// `click_count < click_limit`, but lowering the limit afterwards can
    /// leave the count above it, which makes the record exhausted.
    pub click_count: u32,
    /// Creation time, informational. Listing order comes from the store.
    pub created_at: Timestamp,
}

/// Whether a record may still be resolved, and if not, why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Live,
    Expired,
    Exhausted,
}

impl LinkRecord {
    /// Evaluates the record at `now`. The deadline wins when both the deadline
    /// and the click quota have run out.
    pub fn liveness(&self, now: Timestamp) -> Liveness {
        if now >= self.expires_at {
            Liveness::Expired
        } else if self.click_count >= self.click_limit {
            Liveness::Exhausted
        } else {
            Liveness::Live
        }
    }

    pub fn is_live(&self, now: Timestamp) -> bool {
        self.liveness(now) == Liveness::Live
    }

    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        &self.owner_id == owner
    }

    pub fn remaining_clicks(&self) -> u32 {
        self.click_limit.saturating_sub(self.click_count)
    }
}

/// Persistence operations over link records, keyed by short token.
///
/// Implementations store and fetch records; they do not decide what expiry
/// or quota mean. The two operations that take `now` evaluate the guard
/// spelled out in their docs and nothing more.
#[async_trait]
pub trait LinkRepository: Send + Sync + 'static {
    /// Inserts a new record. Returns `Err(Conflict)` if the token already exists.
    async fn insert(&self, record: &LinkRecord) -> Result<()>;

    /// Retrieves the record for a token, whoever owns it.
    async fn find_by_token(&self, token: &ShortToken) -> Result<Option<LinkRecord>>;

    /// Retrieves every record of an owner in creation order.
    async fn find_by_owner(&self, owner: &OwnerId) -> Result<Vec<LinkRecord>>;

    /// Checks whether a token is taken by any owner.
    async fn exists(&self, token: &ShortToken) -> Result<bool>;

    /// Overwrites the click count. Returns `true` if the record existed.
    async fn update_click_count(&self, token: &ShortToken, click_count: u32) -> Result<bool>;

    /// Overwrites the click limit of a record belonging to `owner`.
    /// Returns `true` if such a record existed.
    async fn update_click_limit(
        &self,
        token: &ShortToken,
        owner: &OwnerId,
        click_limit: u32,
    ) -> Result<bool>;

    /// Overwrites the deadline of a record belonging to `owner`.
    /// Returns `true` if such a record existed.
    async fn update_expiry(
        &self,
        token: &ShortToken,
        owner: &OwnerId,
        expires_at: Timestamp,
    ) -> Result<bool>;

    /// Atomically increments the click count by one, but only while
    /// `click_count < click_limit` and `now < expires_at`.
    ///
    /// Returns the record as it is after the increment, or `None` if the
    /// record is missing or the guard did not hold.
    async fn record_click(&self, token: &ShortToken, now: Timestamp) -> Result<Option<LinkRecord>>;

    /// Deletes the record for a token.
    /// Returns `true` if the record existed and was removed.
    async fn delete(&self, token: &ShortToken) -> Result<bool>;

    /// Deletes the record for a token only if it belongs to `owner` and, at
    /// the moment of deletion, `now >= expires_at` or
    /// `click_count >= click_limit`.
    ///
    /// Returns `false` if no such record existed, including when a concurrent
    /// update made the record live again.
    async fn delete_if_dead(
        &self,
        token: &ShortToken,
        owner: &OwnerId,
        now: Timestamp,
    ) -> Result<bool>;

    /// Deletes every record with `now >= expires_at` or
    /// `click_count >= click_limit`, optionally only those of one owner.
    /// Returns the number of deleted records.
    async fn delete_dead(&self, now: Timestamp, owner: Option<&OwnerId>) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    fn record(expires_at: Timestamp, click_limit: u32, click_count: u32) -> LinkRecord {
        LinkRecord {
            short_token: ShortToken::new_unchecked("abc123"),
            owner_id: OwnerId::new_unchecked("owner"),
            destination: Destination::new_unchecked("https://example.com"),
            expires_at,
            click_limit,
            click_count,
            created_at: Timestamp::UNIX_EPOCH,
        }
    }

    #[test]
    fn live_until_deadline_and_quota() {
        let now = Timestamp::from_second(1_000).unwrap();
        let later = now + SignedDuration::from_hours(1);

        assert_eq!(record(later, 2, 0).liveness(now), Liveness::Live);
        assert_eq!(record(later, 2, 1).liveness(now), Liveness::Live);
        assert_eq!(record(later, 2, 2).liveness(now), Liveness::Exhausted);
    }

    #[test]
    fn deadline_is_exclusive() {
        let now = Timestamp::from_second(1_000).unwrap();

        assert_eq!(record(now, 5, 0).liveness(now), Liveness::Expired);
        assert!(!record(now, 5, 0).is_live(now));
    }

    #[test]
    fn expiry_takes_precedence_over_quota() {
        let now = Timestamp::from_second(1_000).unwrap();
        let earlier = now - SignedDuration::from_secs(1);

        assert_eq!(record(earlier, 1, 1).liveness(now), Liveness::Expired);
    }

    #[test]
    fn remaining_clicks_never_underflows() {
        let later = Timestamp::from_second(1_000).unwrap();

        assert_eq!(record(later, 3, 1).remaining_clicks(), 2);
        assert_eq!(record(later, 3, 5).remaining_clicks(), 0);
    }

    #[test]
    fn ownership_is_exact_match() {
        let r = record(Timestamp::UNIX_EPOCH, 1, 0);

        assert!(r.is_owned_by(&OwnerId::new_unchecked("owner")));
        assert!(!r.is_owned_by(&OwnerId::new_unchecked("Owner")));
    }
}
