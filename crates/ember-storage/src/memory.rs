use async_trait::async_trait;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use ember_core::error::Result;
use ember_core::{LinkRecord, LinkRepository, OwnerId, ShortToken, StorageError};
use jiff::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory storage entry for a link record.
#[derive(Debug, Clone)]
struct Entry {
    /// Insertion sequence, used to list an owner's records in creation order.
    seq: u64,
    record: LinkRecord,
}

/// In-memory implementation of [`LinkRepository`] using DashMap.
///
/// Every mutation of a single token happens under that token's shard lock,
/// which makes the guarded click increment atomic with respect to other
/// writers of the same token.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    storage: DashMap<String, Entry>,
    next_seq: AtomicU64,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, dead or alive.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Applies `apply` under the token's shard lock if the record exists and,
    /// when `owner` is given, belongs to that owner.
    fn update<F>(&self, token: &ShortToken, owner: Option<&OwnerId>, apply: F) -> bool
    where
        F: FnOnce(&mut LinkRecord),
    {
        match self.storage.get_mut(token.as_str()) {
            Some(mut entry) if owner.map_or(true, |owner| entry.record.is_owned_by(owner)) => {
                apply(&mut entry.record);
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl LinkRepository for InMemoryRepository {
    async fn insert(&self, record: &LinkRecord) -> Result<()> {
        match self.storage.entry(record.short_token.as_str().to_owned()) {
            MapEntry::Occupied(_) => Err(StorageError::Conflict(record.short_token.to_string())),
            MapEntry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(Entry {
                    seq,
                    record: record.clone(),
                });
                Ok(())
            }
        }
    }

    async fn find_by_token(&self, token: &ShortToken) -> Result<Option<LinkRecord>> {
        Ok(self
            .storage
            .get(token.as_str())
            .map(|entry| entry.record.clone()))
    }

    async fn find_by_owner(&self, owner: &OwnerId) -> Result<Vec<LinkRecord>> {
        let mut owned: Vec<(u64, LinkRecord)> = self
            .storage
            .iter()
            .filter(|entry| entry.record.is_owned_by(owner))
            .map(|entry| (entry.seq, entry.record.clone()))
            .collect();
        owned.sort_by_key(|(seq, _)| *seq);

        Ok(owned.into_iter().map(|(_, record)| record).collect())
    }

    async fn exists(&self, token: &ShortToken) -> Result<bool> {
        Ok(self.storage.contains_key(token.as_str()))
    }

    async fn update_click_count(&self, token: &ShortToken, click_count: u32) -> Result<bool> {
        Ok(self.update(token, None, |record| record.click_count = click_count))
    }

    async fn update_click_limit(
        &self,
        token: &ShortToken,
        owner: &OwnerId,
        click_limit: u32,
    ) -> Result<bool> {
        Ok(self.update(token, Some(owner), |record| {
            record.click_limit = click_limit
        }))
    }

    async fn update_expiry(
        &self,
        token: &ShortToken,
        owner: &OwnerId,
        expires_at: Timestamp,
    ) -> Result<bool> {
        Ok(self.update(token, Some(owner), |record| {
            record.expires_at = expires_at
        }))
    }

    async fn record_click(&self, token: &ShortToken, now: Timestamp) -> Result<Option<LinkRecord>> {
        let Some(mut entry) = self.storage.get_mut(token.as_str()) else {
            return Ok(None);
        };

        let record = &mut entry.record;
        if record.click_count >= record.click_limit || now >= record.expires_at {
            return Ok(None);
        }

        record.click_count += 1;
        Ok(Some(record.clone()))
    }

    async fn delete(&self, token: &ShortToken) -> Result<bool> {
        Ok(self.storage.remove(token.as_str()).is_some())
    }

    async fn delete_if_dead(
        &self,
        token: &ShortToken,
        owner: &OwnerId,
        now: Timestamp,
    ) -> Result<bool> {
        let removed = self.storage.remove_if(token.as_str(), |_, entry| {
            entry.record.is_owned_by(owner) && !entry.record.is_live(now)
        });
        Ok(removed.is_some())
    }

    async fn delete_dead(&self, now: Timestamp, owner: Option<&OwnerId>) -> Result<u64> {
        let mut deleted = 0u64;

        self.storage.retain(|_, entry| {
            let record = &entry.record;
            let in_scope = owner.map_or(true, |owner| record.is_owned_by(owner));
            let dead = now >= record.expires_at || record.click_count >= record.click_limit;
            if in_scope && dead {
                deleted += 1;
                false
            } else {
                true
            }
        });

        Ok(deleted)
    }
}
