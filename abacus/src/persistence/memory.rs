use crate::domain::{
    CacheEntry, CacheKey, CacheQuery, HistoryQuery, NewRequestRecord, RequestRecord, RequestTally,
};
use crate::ports::{CacheRepository, RequestLog};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use shared::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// DashMap-backed cache repository. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct MemoryCacheRepository {
    entries: Arc<DashMap<CacheKey, CacheEntry>>,
}

impl MemoryCacheRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheRepository for MemoryCacheRepository {
    async fn find(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn upsert(&self, entry: CacheEntry) -> Result<CacheEntry> {
        let stored = match self.entries.entry(entry.key.clone()) {
            Entry::Occupied(mut occupied) => {
                let merged = entry.merged_with(occupied.get());
                occupied.insert(merged.clone());
                merged
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry.clone());
                entry
            }
        };
        Ok(stored)
    }

    async fn record_hit(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<Option<CacheEntry>> {
        // get_mut holds the shard lock, so concurrent hits serialize here
        let Some(mut entry) = self.entries.get_mut(key) else {
            return Ok(None);
        };
        if !entry.is_live(now) {
            return Ok(None);
        }
        entry.hit_count += 1;
        Ok(Some(entry.value().clone()))
    }

    async fn list(&self, query: &CacheQuery) -> Result<Vec<CacheEntry>> {
        let mut entries: Vec<CacheEntry> = self
            .entries
            .iter()
            .filter(|entry| query.matches(&entry.operation))
            .map(|entry| entry.value().clone())
            .collect();

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(query.limit);
        Ok(entries)
    }

    async fn count_by_operation(&self) -> Result<BTreeMap<String, u64>> {
        let mut counts = BTreeMap::new();
        for entry in self.entries.iter() {
            *counts.entry(entry.operation.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut purged = 0;
        self.entries.retain(|_, entry| {
            let live = entry.is_live(now);
            if !live {
                purged += 1;
            }
            live
        });
        Ok(purged)
    }
}

/// Append-only request log kept in a vector, oldest first.
#[derive(Clone)]
pub struct MemoryRequestLog {
    records: Arc<RwLock<Vec<RequestRecord>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for MemoryRequestLog {
    fn default() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl MemoryRequestLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestLog for MemoryRequestLog {
    async fn record(&self, record: NewRequestRecord) -> Result<RequestRecord> {
        let mut records = self.records.write();
        // Assign the id under the write lock so ids follow insertion order
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let stored = record.into_record(id, Utc::now());
        records.push(stored.clone());
        Ok(stored)
    }

    async fn history(&self, query: &HistoryQuery) -> Result<Vec<RequestRecord>> {
        let records = self.records.read();
        Ok(records
            .iter()
            .rev()
            .filter(|record| query.matches(record))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn tally(&self) -> Result<RequestTally> {
        Ok(self.records.read().iter().collect())
    }
}
