pub mod cache;
pub mod history;
pub mod info;
pub mod math;

pub use cache::{list_cache, purge_expired};
pub use history::{history, stats};
pub use info::{health_check, list_operations, not_found, service_info};
pub use math::{execute_operation, factorial, fibonacci, power};
