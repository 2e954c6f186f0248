use crate::domain::{CacheEntry, CacheKey, CacheQuery, MathValue, Parameters};
use crate::ports::CacheRepository;
use chrono::Utc;
use shared::Result;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Content-addressed result cache with logical expiry and hit counting
#[derive(Clone)]
pub struct CacheStore {
    repository: Arc<dyn CacheRepository>,
    default_ttl: Option<Duration>,
}

impl Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl CacheStore {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    /// `default_ttl` of `None` stores entries that never expire
    pub fn new(repository: Arc<dyn CacheRepository>, default_ttl: Option<Duration>) -> Self {
        Self {
            repository,
            default_ttl,
        }
    }

    pub fn compute_key(operation: &str, parameters: &Parameters) -> CacheKey {
        CacheKey::compute(operation, parameters)
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Fetch a live result, counting the hit
    pub async fn get(&self, key: &CacheKey) -> Result<Option<MathValue>> {
        match self.repository.record_hit(key, Utc::now()).await? {
            Some(entry) => {
                tracing::info!(
                    cache_key = %key,
                    operation = %entry.operation,
                    hit_count = entry.hit_count,
                    "Cache hit"
                );
                Ok(Some(entry.result))
            }
            None => {
                tracing::debug!(cache_key = %key, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Store a result under its computed key; `ttl` falls back to the default
    pub async fn put(
        &self,
        operation: &str,
        parameters: &Parameters,
        result: MathValue,
        ttl: Option<Duration>,
    ) -> Result<CacheEntry> {
        let entry = CacheEntry::new(
            operation,
            parameters.clone(),
            result,
            Utc::now(),
            ttl.or(self.default_ttl),
        );
        let stored = self.repository.upsert(entry).await?;

        tracing::info!(
            cache_key = %stored.key,
            operation = %stored.operation,
            parameters = %stored.parameters.canonical_json(),
            expires_at = ?stored.expires_at,
            "Result cached"
        );
        Ok(stored)
    }

    pub async fn entries(&self, query: &CacheQuery) -> Result<Vec<CacheEntry>> {
        self.repository.list(query).await
    }

    pub async fn count_by_operation(&self) -> Result<BTreeMap<String, u64>> {
        self.repository.count_by_operation().await
    }

    /// Remove expired rows. Lookups never depend on this having run.
    pub async fn purge_expired(&self) -> Result<usize> {
        let purged = self.repository.purge_expired(Utc::now()).await?;
        tracing::info!("Purged {} expired cache entries", purged);
        Ok(purged)
    }
}
