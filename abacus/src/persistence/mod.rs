//! In-process implementations of the persistence ports.

mod memory;

pub use memory::{MemoryCacheRepository, MemoryRequestLog};
