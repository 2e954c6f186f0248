use crate::api::requests::HistoryParams;
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation;
use abacus::ServiceStats;
use abacus::domain::RequestRecord;
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};

/// GET /history
pub async fn history(
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Vec<RequestRecord>>, ApiError> {
    let Query(params) = params?;
    let query = validation::history_query(params)?;

    let records = state.request_log.history(&query).await?;
    Ok(Json(records))
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Result<Json<ServiceStats>, ApiError> {
    let stats = ServiceStats::collect(state.request_log.as_ref(), state.dispatcher.cache()).await?;
    Ok(Json(stats))
}
