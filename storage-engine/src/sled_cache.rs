use crate::{decode, encode, storage_error};
use abacus::domain::{CacheEntry, CacheKey, CacheQuery};
use abacus::ports::CacheRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{Error, Result};
use std::collections::BTreeMap;

/// Cache entries stored as JSON under their hex key.
///
/// Every write to a row goes through `update_and_fetch`, which retries on
/// contention, so concurrent upserts and hit increments never lose updates.
#[derive(Clone)]
pub struct SledCacheRepository {
    tree: sled::Tree,
}

impl SledCacheRepository {
    pub(crate) fn new(tree: sled::Tree) -> Self {
        Self { tree }
    }
}

#[async_trait]
impl CacheRepository for SledCacheRepository {
    async fn find(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let value = self
            .tree
            .get(key.as_bytes())
            .map_err(|e| storage_error("Failed to read cache entry", e))?;

        value.map(|bytes| decode(&bytes)).transpose()
    }

    async fn upsert(&self, entry: CacheEntry) -> Result<CacheEntry> {
        let fresh = encode(&entry)?;
        let mut failure: Option<Error> = None;

        let stored = self
            .tree
            .update_and_fetch(entry.key.as_bytes(), |old| {
                failure = None;
                let Some(old) = old else {
                    return Some(fresh.clone());
                };
                let merged = decode::<CacheEntry>(old)
                    .map(|previous| entry.clone().merged_with(&previous))
                    .and_then(|merged| encode(&merged));
                match merged {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        // leave the row untouched and report after the loop
                        failure = Some(e);
                        Some(old.to_vec())
                    }
                }
            })
            .map_err(|e| storage_error("Failed to write cache entry", e))?;

        if let Some(e) = failure {
            return Err(e);
        }
        match stored {
            Some(bytes) => decode(&bytes),
            None => Err(Error::Internal("cache entry vanished during upsert".into())),
        }
    }

    async fn record_hit(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<Option<CacheEntry>> {
        let mut counted = false;
        let mut failure: Option<Error> = None;

        let stored = self
            .tree
            .update_and_fetch(key.as_bytes(), |old| {
                counted = false;
                failure = None;
                let old = old?;
                let mut entry = match decode::<CacheEntry>(old) {
                    Ok(entry) => entry,
                    Err(e) => {
                        failure = Some(e);
                        return Some(old.to_vec());
                    }
                };
                if !entry.is_live(now) {
                    return Some(old.to_vec());
                }
                entry.hit_count += 1;
                match encode(&entry) {
                    Ok(bytes) => {
                        counted = true;
                        Some(bytes)
                    }
                    Err(e) => {
                        failure = Some(e);
                        Some(old.to_vec())
                    }
                }
            })
            .map_err(|e| storage_error("Failed to record cache hit", e))?;

        if let Some(e) = failure {
            return Err(e);
        }
        match stored {
            Some(bytes) if counted => decode(&bytes).map(Some),
            _ => Ok(None),
        }
    }

    async fn list(&self, query: &CacheQuery) -> Result<Vec<CacheEntry>> {
        let mut entries = Vec::new();

        for item in self.tree.iter() {
            let (_, value) = item.map_err(|e| storage_error("Failed to iterate cache", e))?;
            let entry: CacheEntry = decode(&value)?;
            if query.matches(&entry.operation) {
                entries.push(entry);
            }
        }

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(query.limit);
        Ok(entries)
    }

    async fn count_by_operation(&self) -> Result<BTreeMap<String, u64>> {
        let mut counts = BTreeMap::new();

        for item in self.tree.iter() {
            let (_, value) = item.map_err(|e| storage_error("Failed to iterate cache", e))?;
            let entry: CacheEntry = decode(&value)?;
            *counts.entry(entry.operation).or_insert(0) += 1;
        }

        Ok(counts)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut purged = 0;

        for item in self.tree.iter() {
            let (key, value) = item.map_err(|e| storage_error("Failed to iterate cache", e))?;
            let entry: CacheEntry = match decode(&value) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping undecodable cache row during purge: {}", e);
                    continue;
                }
            };
            if entry.is_live(now) {
                continue;
            }

            // Only remove the row if nobody rewrote it since we read it
            let swapped = self
                .tree
                .compare_and_swap(&key, Some(&value), None as Option<&[u8]>)
                .map_err(|e| storage_error("Failed to purge cache entry", e))?;
            if swapped.is_ok() {
                purged += 1;
            }
        }

        Ok(purged)
    }
}
