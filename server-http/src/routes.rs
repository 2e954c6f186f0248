use crate::handlers;
use crate::middleware::process_time;
use crate::state::AppState;
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::normalize_path::NormalizePath;
use tower_http::trace::TraceLayer;

/// The router behind trailing-slash normalization
pub type App = NormalizePath<Router>;

/// Wrap the router so `/health/` resolves like `/health`.
///
/// Path rewriting has to happen before route matching, which a
/// `Router::layer` never sees, so the layer goes around the whole router.
pub fn build_app(state: AppState) -> App {
    NormalizePath::trim_trailing_slash(build_router(state))
}

/// Build and configure the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        // Service info
        .route("/", get(handlers::service_info))
        .route("/health", get(handlers::health_check))
        // Operations
        .route("/operations", get(handlers::list_operations))
        .route("/operations/{name}", post(handlers::execute_operation))
        .route("/math/power", post(handlers::power))
        .route("/math/fibonacci", post(handlers::fibonacci))
        .route("/math/factorial", post(handlers::factorial))
        // Request log and cache
        .route("/history", get(handlers::history))
        .route("/stats", get(handlers::stats))
        .route("/cache", get(handlers::list_cache))
        .route("/cache/expired", delete(handlers::purge_expired))
        .fallback(handlers::not_found)
        // Middleware
        .layer(middleware::from_fn(process_time))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|origin| origin == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    base.allow_origin(origins)
}
