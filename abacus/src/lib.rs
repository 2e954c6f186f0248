//! Abacus core: an operation registry, a content-addressed result cache and
//! the dispatcher that ties them together.
//!
//! The data plane ([`planes::data`]) answers requests: it looks results up in
//! the [`CacheStore`], falls back to computing them and writes them back. The
//! control plane ([`planes::control`]) manages which operations exist and
//! summarises what happened. Persistence is reached only through the traits in
//! [`ports`].

pub mod domain;
pub mod operations;
pub mod persistence;
pub mod planes;
pub mod ports;

pub use domain::{CacheEntry, CacheKey, DispatchResult, MathValue, Parameters};
pub use operations::{Operation, OperationLimits};
pub use planes::control::{OperationRegistry, ServiceStats};
pub use planes::data::{CacheStore, Dispatcher};
pub use ports::{CacheRepository, RequestLog};
