#![deny(clippy::all)]

use crate::domain::{
    CacheEntry, CacheKey, CacheQuery, HistoryQuery, NewRequestRecord, RequestRecord, RequestTally,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::Result;
use std::collections::BTreeMap;

// Ports are the pluggable persistence points the core is written against

/// Port for the result cache table
///
/// Every method is a single atomic step against the backing store: a reader
/// never observes a half-written entry and concurrent hits are never lost.
#[async_trait]
pub trait CacheRepository: Send + Sync + 'static {
    async fn find(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Insert, or overwrite result/parameters/expiry of an existing row while
    /// keeping its `created_at` and `hit_count`. Returns the stored entry.
    async fn upsert(&self, entry: CacheEntry) -> Result<CacheEntry>;

    /// Increment `hit_count` and return the entry, only if it exists and is
    /// live at `now`.
    async fn record_hit(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<Option<CacheEntry>>;

    async fn list(&self, query: &CacheQuery) -> Result<Vec<CacheEntry>>;

    /// Number of stored rows per operation, expired rows included.
    async fn count_by_operation(&self) -> Result<BTreeMap<String, u64>>;

    /// Delete rows expired at `now`, returning how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Port for the audit trail of dispatches
#[async_trait]
pub trait RequestLog: Send + Sync + 'static {
    async fn record(&self, record: NewRequestRecord) -> Result<RequestRecord>;

    async fn history(&self, query: &HistoryQuery) -> Result<Vec<RequestRecord>>;

    /// Fold every record into running totals without collecting the log.
    async fn tally(&self) -> Result<RequestTally>;
}
