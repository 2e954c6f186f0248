use crate::api::requests::{OperationRequest, PositionRequest, PowerRequest};
use crate::api::responses::OperationResponse;
use crate::error::ApiError;
use crate::extract::ClientInfo;
use crate::state::AppState;
use crate::validation;
use abacus::Parameters;
use abacus::domain::RequestContext;
use abacus::operations::{FactorialOperation, FibonacciOperation, PowerOperation};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

type OperationResult = Result<Json<OperationResponse>, ApiError>;

/// POST /math/power
pub async fn power(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    body: Result<Json<PowerRequest>, JsonRejection>,
) -> OperationResult {
    let Json(req) = body?;
    let mut parameters = Parameters::new();
    parameters.insert("base", req.base);
    parameters.insert("exponent", req.exponent);

    dispatch(&state, PowerOperation::NAME, parameters, true, &client).await
}

/// POST /math/fibonacci
pub async fn fibonacci(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    body: Result<Json<PositionRequest>, JsonRejection>,
) -> OperationResult {
    let Json(req) = body?;
    let parameters = validation::bounded_position(req.n, state.config.fibonacci_max_n)?;

    dispatch(&state, FibonacciOperation::NAME, parameters, true, &client).await
}

/// POST /math/factorial
pub async fn factorial(
    State(state): State<AppState>,
    ClientInfo(client): ClientInfo,
    body: Result<Json<PositionRequest>, JsonRejection>,
) -> OperationResult {
    let Json(req) = body?;
    let parameters = validation::bounded_position(req.n, state.config.factorial_max_n)?;

    dispatch(&state, FactorialOperation::NAME, parameters, true, &client).await
}

/// POST /operations/{name}
pub async fn execute_operation(
    State(state): State<AppState>,
    Path(name): Path<String>,
    ClientInfo(client): ClientInfo,
    body: Result<Json<OperationRequest>, JsonRejection>,
) -> OperationResult {
    let Json(req) = body?;
    let parameters = validation::parameters(req.parameters)?;

    dispatch(&state, &name, parameters, req.use_cache, &client).await
}

async fn dispatch(
    state: &AppState,
    operation: &str,
    parameters: Parameters,
    use_cache: bool,
    client: &RequestContext,
) -> OperationResult {
    tracing::info!(
        operation,
        parameters = %parameters.canonical_json(),
        client_ip = client.client_ip.as_deref().unwrap_or("unknown"),
        "Dispatching operation"
    );

    let outcome = state
        .dispatcher
        .execute_with_context(operation, &parameters, use_cache, client)
        .await?;

    Ok(Json(OperationResponse::new(operation, parameters, outcome)))
}
