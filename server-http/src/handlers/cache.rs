use crate::api::requests::CacheParams;
use crate::api::responses::PurgeResponse;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation;
use abacus::CacheEntry;
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use chrono::Utc;

/// GET /cache
pub async fn list_cache(
    State(state): State<AppState>,
    params: Result<Query<CacheParams>, QueryRejection>,
) -> Result<Json<Vec<CacheEntry>>, ApiError> {
    let Query(params) = params?;
    let query = validation::cache_query(params)?;

    let entries = state.dispatcher.cache().entries(&query).await?;
    Ok(Json(entries))
}

/// DELETE /cache/expired
pub async fn purge_expired(State(state): State<AppState>) -> Result<Json<PurgeResponse>, ApiError> {
    let purged = state.dispatcher.cache().purge_expired().await?;
    Ok(Json(PurgeResponse {
        purged,
        timestamp: Utc::now(),
    }))
}
