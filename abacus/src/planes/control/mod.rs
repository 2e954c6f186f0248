pub mod registry;
pub mod stats;

pub use registry::OperationRegistry;
pub use stats::ServiceStats;
