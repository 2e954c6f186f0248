use abacus::persistence::{MemoryCacheRepository, MemoryRequestLog};
use abacus::{
    CacheRepository, CacheStore, Dispatcher, OperationLimits, OperationRegistry, RequestLog,
};
use shared::config::{Config, StorageBackend};
use std::path::Path;
use std::sync::Arc;
use storage_engine::SledStorage;

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub request_log: Arc<dyn RequestLog>,
    pub config: Arc<Config>,
    storage: Option<SledStorage>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let data_dir = match &config.storage {
            StorageBackend::Sled(data_dir) => data_dir.clone(),
            StorageBackend::Memory => {
                tracing::info!("Running with in-memory storage");
                return Self::in_memory(config);
            }
        };

        // Try to initialize with persistence, fall back to in-memory if it fails
        match Self::init_with_persistence(&data_dir) {
            Ok((storage, cache, request_log)) => {
                tracing::info!("Persistence enabled under {}", data_dir);
                Self::assemble(config, cache, request_log, Some(storage))
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize persistence: {}. Running in-memory mode.",
                    e
                );
                Self::in_memory(config)
            }
        }
    }

    pub fn in_memory(config: Config) -> Self {
        Self::assemble(
            config,
            Arc::new(MemoryCacheRepository::new()),
            Arc::new(MemoryRequestLog::new()),
            None,
        )
    }

    fn init_with_persistence(
        data_dir: &str,
    ) -> shared::Result<(SledStorage, Arc<dyn CacheRepository>, Arc<dyn RequestLog>)> {
        let storage = SledStorage::open(Path::new(data_dir).join("abacus.sled"))?;
        let cache: Arc<dyn CacheRepository> = Arc::new(storage.cache_repository()?);
        let request_log: Arc<dyn RequestLog> = Arc::new(storage.request_log()?);
        Ok((storage, cache, request_log))
    }

    fn assemble(
        config: Config,
        cache: Arc<dyn CacheRepository>,
        request_log: Arc<dyn RequestLog>,
        storage: Option<SledStorage>,
    ) -> Self {
        let registry = OperationRegistry::with_builtins(OperationLimits {
            fibonacci_max_n: config.fibonacci_max_n,
            magnitude_ceiling: config.magnitude_ceiling,
        });
        let cache = CacheStore::new(cache, config.cache_ttl);
        let dispatcher = Dispatcher::with_request_log(registry, cache, request_log.clone());

        Self {
            dispatcher,
            request_log,
            config: Arc::new(config),
            storage,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    /// Push buffered writes to disk; a no-op for in-memory state
    pub fn flush(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        match storage.flush() {
            Ok(bytes) => tracing::info!("Flushed {} bytes to disk", bytes),
            Err(e) => tracing::error!("Failed to flush storage: {}", e),
        }
    }
}
