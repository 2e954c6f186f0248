pub mod cache_store;
pub mod dispatcher;

pub use cache_store::CacheStore;
pub use dispatcher::Dispatcher;
