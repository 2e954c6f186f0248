use crate::domain::{CacheEntry, RequestRecord, RequestTally};
use crate::planes::data::CacheStore;
use crate::ports::RequestLog;
use serde::Serialize;
use shared::Result;
use std::collections::BTreeMap;

/// Usage summary over the request log and the cache
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Mean compute time of successful requests that were actually computed.
    /// Cache hits are left out rather than averaged in as zero, so this is
    /// the cost of a miss.
    pub average_execution_time_ms: f64,
    pub operations_count: BTreeMap<String, u64>,
    /// Percentage of successful requests answered from the cache
    pub cache_hit_rate: f64,
    pub cache_entries_by_operation: BTreeMap<String, u64>,
}

impl ServiceStats {
    pub fn compute(records: &[RequestRecord], entries: &[CacheEntry]) -> Self {
        let mut cache_entries_by_operation = BTreeMap::new();
        for entry in entries {
            *cache_entries_by_operation
                .entry(entry.operation.clone())
                .or_insert(0) += 1;
        }
        Self::from_tally(records.iter().collect(), cache_entries_by_operation)
    }

    pub fn from_tally(
        tally: RequestTally,
        cache_entries_by_operation: BTreeMap<String, u64>,
    ) -> Self {
        let average_execution_time_ms = if tally.timed == 0 {
            0.0
        } else {
            tally.execution_time_ms / tally.timed as f64
        };
        let cache_hit_rate = if tally.successful == 0 {
            0.0
        } else {
            tally.cache_hits as f64 / tally.successful as f64 * 100.0
        };

        Self {
            total_requests: tally.total,
            successful_requests: tally.successful,
            failed_requests: tally.total - tally.successful,
            average_execution_time_ms: round2(average_execution_time_ms),
            operations_count: tally.by_operation,
            cache_hit_rate: round2(cache_hit_rate),
            cache_entries_by_operation,
        }
    }

    /// Fold the log and count the cache rows, one stored row at a time
    pub async fn collect(request_log: &dyn RequestLog, cache: &CacheStore) -> Result<Self> {
        let tally = request_log.tally().await?;
        let cache_entries_by_operation = cache.count_by_operation().await?;
        Ok(Self::from_tally(tally, cache_entries_by_operation))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DispatchResult, MathValue, NewRequestRecord, Parameters, RequestContext};
    use chrono::Utc;
    use std::time::Duration;

    fn record(id: u64, operation: &str, outcome: Option<(u64, bool)>) -> RequestRecord {
        let context = RequestContext::default();
        let new = match outcome {
            Some((micros, cache_hit)) => {
                let dispatch = if cache_hit {
                    DispatchResult::cached(MathValue::from(1u64))
                } else {
                    DispatchResult::computed(MathValue::from(1u64), Duration::from_micros(micros))
                };
                NewRequestRecord::success(operation, Parameters::new(), &dispatch, &context)
            }
            None => {
                NewRequestRecord::failure(operation, Parameters::new(), "boom", None, &context)
            }
        };
        new.into_record(id, Utc::now())
    }

    fn entry(operation: &str, n: u64, result: u64) -> CacheEntry {
        let parameters = Parameters::new().with("n", n);
        CacheEntry::new(operation, parameters, MathValue::from(result), Utc::now(), None)
    }

    #[test]
    fn test_empty_stats() {
        let stats = ServiceStats::compute(&[], &[]);
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.average_execution_time_ms, 0.0);
        assert_eq!(stats.cache_hit_rate, 0.0);
        assert!(stats.operations_count.is_empty());
    }

    #[test]
    fn test_counts_rates_and_averages() {
        let records = vec![
            record(1, "fibonacci", Some((1_000, false))),
            record(2, "fibonacci", Some((0, true))),
            record(3, "factorial", Some((2_000, false))),
            record(4, "factorial", None),
        ];
        let entries = vec![
            entry("fibonacci", 3, 2),
            entry("fibonacci", 4, 3),
            entry("factorial", 3, 6),
        ];

        let stats = ServiceStats::compute(&records, &entries);
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.successful_requests, 3);
        assert_eq!(stats.failed_requests, 1);
        // cached request excluded: (1.0 + 2.0) / 2
        assert_eq!(stats.average_execution_time_ms, 1.5);
        assert_eq!(stats.cache_hit_rate, 33.33);
        assert_eq!(stats.operations_count["fibonacci"], 2);
        assert_eq!(stats.operations_count["factorial"], 2);
        assert_eq!(stats.cache_entries_by_operation["fibonacci"], 2);
        assert_eq!(stats.cache_entries_by_operation["factorial"], 1);
    }

    #[test]
    fn test_fast_computation_is_not_a_cache_hit() {
        // a computed result that took no measurable time still counts as a miss
        let records = vec![record(1, "power", Some((0, false)))];
        let stats = ServiceStats::compute(&records, &[]);
        assert_eq!(stats.cache_hit_rate, 0.0);
    }

    #[tokio::test]
    async fn test_collect_matches_compute() {
        use crate::persistence::{MemoryCacheRepository, MemoryRequestLog};
        use std::sync::Arc;

        let log = MemoryRequestLog::new();
        log.record(NewRequestRecord::success(
            "power",
            Parameters::new(),
            &DispatchResult::computed(MathValue::from(8u64), Duration::from_millis(3)),
            &RequestContext::default(),
        ))
        .await
        .unwrap();
        log.record(NewRequestRecord::success(
            "power",
            Parameters::new(),
            &DispatchResult::cached(MathValue::from(8u64)),
            &RequestContext::default(),
        ))
        .await
        .unwrap();

        let cache = CacheStore::new(Arc::new(MemoryCacheRepository::new()), None);
        cache
            .put("power", &Parameters::new(), MathValue::from(8u64), None)
            .await
            .unwrap();

        let stats = ServiceStats::collect(&log, &cache).await.unwrap();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.average_execution_time_ms, 3.0);
        assert_eq!(stats.cache_hit_rate, 50.0);
        assert_eq!(stats.operations_count["power"], 2);
        assert_eq!(stats.cache_entries_by_operation["power"], 1);
    }
}
