//! Sled-backed implementations of the abacus persistence ports.

mod sled_cache;
mod sled_requests;

pub use sled_cache::SledCacheRepository;
pub use sled_requests::SledRequestLog;

use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Error, Result};
use std::path::Path;

const CACHE_TREE: &str = "cache_entries";
const REQUESTS_TREE: &str = "requests";

/// One sled database holding the result cache and the request log
#[derive(Clone)]
pub struct SledStorage {
    db: sled::Db,
}

impl SledStorage {
    /// Open (or create) the database at `path`
    /// Creates the parent directory if it doesn't exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create directory: {}", e)))?;
        }

        let db = sled::open(path)
            .map_err(|e| Error::Storage(format!("Failed to open Sled database: {}", e)))?;

        tracing::info!("Opened sled database at {}", path.display());
        Ok(Self { db })
    }

    pub fn cache_repository(&self) -> Result<SledCacheRepository> {
        Ok(SledCacheRepository::new(self.open_tree(CACHE_TREE)?))
    }

    pub fn request_log(&self) -> Result<SledRequestLog> {
        Ok(SledRequestLog::new(self.db.clone(), self.open_tree(REQUESTS_TREE)?))
    }

    /// Flush dirty pages to disk, returning the number of bytes written
    pub fn flush(&self) -> Result<usize> {
        self.db
            .flush()
            .map_err(|e| Error::Storage(format!("Failed to flush database: {}", e)))
    }

    fn open_tree(&self, name: &str) -> Result<sled::Tree> {
        self.db
            .open_tree(name)
            .map_err(|e| Error::Storage(format!("Failed to open tree '{}': {}", name, e)))
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::Serialization(format!("Failed to encode: {}", e)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| Error::Serialization(format!("Failed to decode: {}", e)))
}

fn storage_error(context: &str, e: sled::Error) -> Error {
    Error::Storage(format!("{}: {}", context, e))
}
