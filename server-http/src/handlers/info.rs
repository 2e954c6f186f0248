use crate::api::responses::{
    ENDPOINTS, HealthResponse, OperationsResponse, SERVICE_NAME, ServiceInfoResponse, VERSION,
};
use crate::error::ApiError;
use crate::state::AppState;
use axum::{Json, extract::State, http::Uri};
use chrono::Utc;

/// GET /
pub async fn service_info() -> Json<ServiceInfoResponse> {
    Json(ServiceInfoResponse {
        service: SERVICE_NAME,
        version: VERSION,
        description: "Cached mathematical operations over HTTP",
        endpoints: ENDPOINTS.into_iter().collect(),
        features: vec![
            "Request persistence",
            "Result caching",
            "Structured logging",
            "Input validation",
        ],
        timestamp: Utc::now(),
    })
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        version: VERSION,
    })
}

/// GET /operations
pub async fn list_operations(State(state): State<AppState>) -> Json<OperationsResponse> {
    let operations = state.dispatcher.list_operations().await;
    Json(OperationsResponse {
        total: operations.len(),
        operations,
        timestamp: Utc::now(),
    })
}

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}
