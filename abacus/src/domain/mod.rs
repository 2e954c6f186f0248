mod parameters;
pub mod records;
mod value;

pub use parameters::Parameters;
pub use records::{
    CacheQuery, HistoryQuery, NewRequestRecord, RequestContext, RequestRecord, RequestTally,
};
pub use value::MathValue;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;

/// Content address of a cached result: SHA-256 over the operation name and the
/// canonical parameter encoding, as 64 lowercase hex characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn compute(operation: &str, parameters: &Parameters) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(operation.as_bytes());
        hasher.update([0u8]); // separator
        hasher.update(parameters.canonical_json().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub operation: String,
    pub parameters: Parameters,
    pub result: MathValue,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>, // None = never expires
    pub hit_count: u64,
}

impl CacheEntry {
    pub fn new(
        operation: impl Into<String>,
        parameters: Parameters,
        result: MathValue,
        now: DateTime<Utc>,
        ttl: Option<Duration>,
    ) -> Self {
        let operation = operation.into();
        // A TTL too large to represent is treated as no expiry at all.
        let expires_at = ttl
            .and_then(|ttl| TimeDelta::from_std(ttl).ok())
            .and_then(|ttl| now.checked_add_signed(ttl));

        Self {
            key: CacheKey::compute(&operation, &parameters),
            operation,
            parameters,
            result,
            created_at: now,
            expires_at,
            hit_count: 0,
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }

    /// Overwrite `previous` with this entry's result, parameters and expiry,
    /// keeping its creation time and hit count.
    pub fn merged_with(self, previous: &CacheEntry) -> CacheEntry {
        CacheEntry {
            created_at: previous.created_at,
            hit_count: previous.hit_count,
            ..self
        }
    }
}

/// Outcome of one successful dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchResult {
    pub result: MathValue,
    pub elapsed: Duration,
    pub cache_hit: bool,
}

impl DispatchResult {
    pub fn computed(result: MathValue, elapsed: Duration) -> Self {
        Self {
            result,
            elapsed,
            cache_hit: false,
        }
    }

    pub fn cached(result: MathValue) -> Self {
        Self {
            result,
            elapsed: Duration::ZERO,
            cache_hit: true,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}
