use crate::domain::{
    CacheKey, DispatchResult, MathValue, NewRequestRecord, Parameters, RequestContext,
};
use crate::operations::Operation;
use crate::planes::control::OperationRegistry;
use crate::planes::data::CacheStore;
use crate::ports::RequestLog;
use shared::{Error, OperationError, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Application service that answers operation requests
/// This is the main entry point for dispatching in the application core
#[derive(Clone)]
pub struct Dispatcher {
    registry: OperationRegistry,
    cache: CacheStore,
    request_log: Option<Arc<dyn RequestLog>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("cache", &self.cache)
            .field("request_log", &self.request_log.is_some())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(registry: OperationRegistry, cache: CacheStore) -> Self {
        Self {
            registry,
            cache,
            request_log: None,
        }
    }

    pub fn with_request_log(
        registry: OperationRegistry,
        cache: CacheStore,
        request_log: Arc<dyn RequestLog>,
    ) -> Self {
        Self {
            registry,
            cache,
            request_log: Some(request_log),
        }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Names of every dispatchable operation, sorted
    pub async fn list_operations(&self) -> Vec<String> {
        self.registry.names().await
    }

    pub async fn execute(
        &self,
        operation: &str,
        parameters: &Parameters,
        use_cache: bool,
    ) -> Result<DispatchResult> {
        let context = RequestContext::default();
        self.execute_with_context(operation, parameters, use_cache, &context)
            .await
    }

    /// Execute and record the outcome in the request log
    pub async fn execute_with_context(
        &self,
        operation: &str,
        parameters: &Parameters,
        use_cache: bool,
        context: &RequestContext,
    ) -> Result<DispatchResult> {
        let (outcome, compute_time) = self.dispatch(operation, parameters, use_cache).await;
        self.record_outcome(operation, parameters, &outcome, compute_time, context)
            .await;
        outcome
    }

    async fn dispatch(
        &self,
        name: &str,
        parameters: &Parameters,
        use_cache: bool,
    ) -> (Result<DispatchResult>, Option<Duration>) {
        // The registry lock is released here, before any compute
        let operation = match self.registry.get(name).await {
            Ok(operation) => operation,
            Err(e) => {
                tracing::warn!("Rejected request for unsupported operation '{}'", name);
                return (Err(e), None);
            }
        };

        if use_cache {
            let key = CacheKey::compute(name, parameters);
            match self.cache.get(&key).await {
                Ok(Some(result)) => return (Ok(DispatchResult::cached(result)), None),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        "Cache lookup failed for '{}' (key {}): {}. Computing instead.",
                        name,
                        key,
                        e
                    );
                }
            }
        }

        let started = Instant::now();
        let computed = run_operation(operation.as_ref(), parameters);
        let elapsed = started.elapsed();

        match computed {
            Ok(result) => {
                if use_cache {
                    if let Err(e) = self.cache.put(name, parameters, result.clone(), None).await {
                        tracing::warn!("Failed to cache result of '{}': {}", name, e);
                    }
                }
                (Ok(DispatchResult::computed(result, elapsed)), Some(elapsed))
            }
            Err(e) => {
                tracing::error!(
                    operation = name,
                    parameters = %parameters.canonical_json(),
                    error = %e,
                    execution_time_ms = elapsed.as_secs_f64() * 1000.0,
                    "Operation execution failed"
                );
                (Err(Error::OperationFailed(e)), Some(elapsed))
            }
        }
    }

    async fn record_outcome(
        &self,
        operation: &str,
        parameters: &Parameters,
        outcome: &Result<DispatchResult>,
        compute_time: Option<Duration>,
        context: &RequestContext,
    ) {
        let Some(ref request_log) = self.request_log else {
            return;
        };

        let record = match outcome {
            Ok(dispatch) => {
                NewRequestRecord::success(operation, parameters.clone(), dispatch, context)
            }
            Err(e) => NewRequestRecord::failure(
                operation,
                parameters.clone(),
                e.to_string(),
                compute_time,
                context,
            ),
        };

        match request_log.record(record).await {
            Ok(stored) => {
                tracing::debug!("Recorded request {} for '{}'", stored.id, operation);
            }
            Err(e) => {
                tracing::error!("Failed to persist request for '{}': {}", operation, e);
            }
        }
    }
}

/// Validate and compute, turning a panic inside the operation into an error.
fn run_operation(
    operation: &dyn Operation,
    parameters: &Parameters,
) -> std::result::Result<MathValue, OperationError> {
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        operation.validate(parameters)?;
        operation.compute(parameters)
    }));

    attempt.unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "operation panicked".to_string());
        Err(OperationError::Internal(message))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CacheEntry, CacheQuery, HistoryQuery, RequestRecord, RequestTally};
    use crate::operations::OperationLimits;
    use crate::persistence::{MemoryCacheRepository, MemoryRequestLog};
    use crate::ports::CacheRepository;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness {
        dispatcher: Dispatcher,
        cache: Arc<MemoryCacheRepository>,
        log: Arc<MemoryRequestLog>,
    }

    fn harness() -> Harness {
        let cache = Arc::new(MemoryCacheRepository::new());
        let log = Arc::new(MemoryRequestLog::new());
        let dispatcher = Dispatcher::with_request_log(
            OperationRegistry::with_builtins(OperationLimits::default()),
            CacheStore::new(cache.clone(), Some(CacheStore::DEFAULT_TTL)),
            log.clone(),
        );
        Harness {
            dispatcher,
            cache,
            log,
        }
    }

    async fn oldest_first(log: &MemoryRequestLog) -> Vec<RequestRecord> {
        let mut records = log.history(&HistoryQuery::everything()).await.unwrap();
        records.reverse();
        records
    }

    /// Repository whose every call fails, as if the database were down.
    struct BrokenRepository;

    #[async_trait]
    impl CacheRepository for BrokenRepository {
        async fn find(&self, _: &CacheKey) -> Result<Option<CacheEntry>> {
            Err(Error::Storage("connection refused".into()))
        }
        async fn upsert(&self, _: CacheEntry) -> Result<CacheEntry> {
            Err(Error::Storage("connection refused".into()))
        }
        async fn record_hit(&self, _: &CacheKey, _: DateTime<Utc>) -> Result<Option<CacheEntry>> {
            Err(Error::Storage("connection refused".into()))
        }
        async fn list(&self, _: &CacheQuery) -> Result<Vec<CacheEntry>> {
            Err(Error::Storage("connection refused".into()))
        }
        async fn count_by_operation(&self) -> Result<BTreeMap<String, u64>> {
            Err(Error::Storage("connection refused".into()))
        }
        async fn purge_expired(&self, _: DateTime<Utc>) -> Result<usize> {
            Err(Error::Storage("connection refused".into()))
        }
    }

    struct BrokenLog;

    #[async_trait]
    impl RequestLog for BrokenLog {
        async fn record(&self, _: NewRequestRecord) -> Result<RequestRecord> {
            Err(Error::Storage("disk full".into()))
        }
        async fn history(&self, _: &HistoryQuery) -> Result<Vec<RequestRecord>> {
            Err(Error::Storage("disk full".into()))
        }
        async fn tally(&self) -> Result<RequestTally> {
            Err(Error::Storage("disk full".into()))
        }
    }

    /// Counts how often it is computed.
    struct Counting {
        calls: AtomicUsize,
    }

    impl Operation for Counting {
        fn name(&self) -> &str {
            "counting"
        }
        fn validate(&self, _: &Parameters) -> std::result::Result<(), OperationError> {
            Ok(())
        }
        fn compute(&self, _: &Parameters) -> std::result::Result<MathValue, OperationError> {
            let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(MathValue::from(calls as u64))
        }
    }

    struct Exploding;

    impl Operation for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }
        fn validate(&self, _: &Parameters) -> std::result::Result<(), OperationError> {
            Ok(())
        }
        fn compute(&self, _: &Parameters) -> std::result::Result<MathValue, OperationError> {
            panic!("division by zero in lookup table")
        }
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let h = harness();
        let params = Parameters::new().with("n", 50);

        let first = h.dispatcher.execute("fibonacci", &params, true).await.unwrap();
        assert!(!first.cache_hit);
        assert_eq!(first.result, MathValue::from(12_586_269_025u64));

        let second = h.dispatcher.execute("fibonacci", &params, true).await.unwrap();
        assert!(second.cache_hit);
        assert_eq!(second.elapsed, Duration::ZERO);
        assert_eq!(second.result, first.result);
    }

    #[tokio::test]
    async fn test_large_results_come_back_identical() {
        let h = harness();
        let params = Parameters::new().with("n", 1000);

        let first = h.dispatcher.execute("fibonacci", &params, true).await.unwrap();
        let second = h.dispatcher.execute("fibonacci", &params, true).await.unwrap();
        assert!(second.cache_hit);
        assert_eq!(first.result, second.result);
    }

    #[tokio::test]
    async fn test_cache_disabled_always_computes() {
        let h = harness();
        let counting = Arc::new(Counting {
            calls: AtomicUsize::new(0),
        });
        h.dispatcher.registry().register(counting.clone()).await;

        let params = Parameters::new();
        let first = h.dispatcher.execute("counting", &params, false).await.unwrap();
        let second = h.dispatcher.execute("counting", &params, false).await.unwrap();

        assert!(!first.cache_hit && !second.cache_hit);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
        assert!(h.cache.list(&CacheQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_operation_touches_nothing() {
        let h = harness();
        let result = h
            .dispatcher
            .execute("sqrt", &Parameters::new().with("x", 9), true)
            .await;

        assert!(matches!(result, Err(Error::UnknownOperation(ref name)) if name == "sqrt"));
        assert!(h.cache.list(&CacheQuery::default()).await.unwrap().is_empty());

        let records = oldest_first(&h.log).await;
        assert_eq!(records.len(), 1);
        assert!(!records[0].success);
        assert_eq!(records[0].execution_time_ms, None);
    }

    #[tokio::test]
    async fn test_domain_errors_are_wrapped_and_not_cached() {
        let h = harness();
        let params = Parameters::new()
            .with("base", -8)
            .with_real("exponent", 1.0 / 3.0)
            .unwrap();

        let result = h.dispatcher.execute("power", &params, true).await;
        assert!(matches!(
            result,
            Err(Error::OperationFailed(OperationError::InvalidArgument(_)))
        ));

        let result = h
            .dispatcher
            .execute("factorial", &Parameters::new().with("n", 171), true)
            .await;
        assert!(matches!(
            result,
            Err(Error::OperationFailed(OperationError::ResultTooLarge(_)))
        ));

        assert!(h.cache.list(&CacheQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_operation_becomes_internal_failure() {
        let h = harness();
        h.dispatcher.registry().register(Arc::new(Exploding)).await;

        let result = h.dispatcher.execute("exploding", &Parameters::new(), true).await;
        match result {
            Err(Error::OperationFailed(OperationError::Internal(message))) => {
                assert!(message.contains("division by zero"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_broken_cache_does_not_fail_dispatch() {
        let dispatcher = Dispatcher::new(
            OperationRegistry::with_builtins(OperationLimits::default()),
            CacheStore::new(Arc::new(BrokenRepository), None),
        );
        let params = Parameters::new().with("n", 5);

        let first = dispatcher.execute("factorial", &params, true).await.unwrap();
        let second = dispatcher.execute("factorial", &params, true).await.unwrap();
        assert_eq!(first.result, MathValue::from(120u64));
        assert!(!second.cache_hit);
    }

    #[tokio::test]
    async fn test_broken_request_log_does_not_mask_outcome() {
        let dispatcher = Dispatcher::with_request_log(
            OperationRegistry::with_builtins(OperationLimits::default()),
            CacheStore::new(Arc::new(MemoryCacheRepository::new()), None),
            Arc::new(BrokenLog),
        );

        let ok = dispatcher
            .execute("power", &Parameters::new().with("base", 2).with("exponent", 10), true)
            .await
            .unwrap();
        assert_eq!(ok.result, MathValue::from(1024u64));

        let err = dispatcher
            .execute("fibonacci", &Parameters::new().with("n", -1), true)
            .await;
        assert!(matches!(err, Err(Error::OperationFailed(_))));
    }

    #[tokio::test]
    async fn test_every_outcome_is_logged_with_explicit_cache_flag() {
        let h = harness();
        let context = RequestContext {
            client_ip: Some("10.0.0.7".into()),
            user_agent: Some("curl/8.5".into()),
        };
        let params = Parameters::new().with("n", 10);

        for _ in 0..2 {
            h.dispatcher
                .execute_with_context("fibonacci", &params, true, &context)
                .await
                .unwrap();
        }
        h.dispatcher
            .execute_with_context("factorial", &Parameters::new().with("n", -2), true, &context)
            .await
            .unwrap_err();

        let records = oldest_first(&h.log).await;
        assert_eq!(records.len(), 3);

        assert!(records[0].success && !records[0].cache_hit);
        assert!(records[1].success && records[1].cache_hit);
        assert_eq!(records[1].execution_time_ms, Some(0.0));
        assert!(!records[2].success);
        assert!(
            records[2]
                .error_message
                .as_deref()
                .unwrap()
                .starts_with("operation failed:")
        );
        assert_eq!(records[2].client_ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(records[2].user_agent.as_deref(), Some("curl/8.5"));
    }

    #[tokio::test]
    async fn test_concurrent_hits_are_all_counted() {
        let h = harness();
        let params = Parameters::new().with("n", 30);
        h.dispatcher.execute("fibonacci", &params, true).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let dispatcher = h.dispatcher.clone();
            let params = params.clone();
            tasks.push(tokio::spawn(async move {
                dispatcher.execute("fibonacci", &params, true).await
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().unwrap().cache_hit);
        }

        let key = CacheKey::compute("fibonacci", &params);
        let entry = h.cache.find(&key).await.unwrap().unwrap();
        assert_eq!(entry.hit_count, 32);
    }

    #[tokio::test]
    async fn test_list_operations() {
        let h = harness();
        assert_eq!(
            h.dispatcher.list_operations().await,
            vec!["factorial", "fibonacci", "power"]
        );
    }
}
