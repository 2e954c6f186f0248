use abacus::{DispatchResult, MathValue, Parameters};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

pub const SERVICE_NAME: &str = "Abacus";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Paths listed by the root endpoint and by the JSON 404 page
pub const ENDPOINTS: [(&str, &str); 9] = [
    ("health", "/health"),
    ("operations", "/operations"),
    ("execute", "/operations/{name}"),
    ("power", "/math/power"),
    ("fibonacci", "/math/fibonacci"),
    ("factorial", "/math/factorial"),
    ("history", "/history"),
    ("statistics", "/stats"),
    ("cache", "/cache"),
];

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: BTreeMap<&'static str, &'static str>,
    pub features: Vec<&'static str>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OperationsResponse {
    pub operations: Vec<String>,
    pub total: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub operation: String,
    pub parameters: Parameters,
    pub result: MathValue,
    pub execution_time_ms: f64,
    pub timestamp: DateTime<Utc>,
    pub cached: bool,
}

impl OperationResponse {
    pub fn new(
        operation: impl Into<String>,
        parameters: Parameters,
        outcome: DispatchResult,
    ) -> Self {
        Self {
            operation: operation.into(),
            parameters,
            execution_time_ms: outcome.elapsed_ms(),
            result: outcome.result,
            timestamp: Utc::now(),
            cached: outcome.cache_hit,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub purged: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_endpoints: Option<Vec<&'static str>>,
}
