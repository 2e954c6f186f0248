pub mod api;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod validation;

// Re-export key types
pub use routes::{App, build_app, build_router};
pub use state::AppState;
