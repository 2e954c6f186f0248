use serde::Deserialize;
use serde_json::{Map, Number, Value};

#[derive(Debug, Deserialize)]
pub struct PowerRequest {
    pub base: Number,
    pub exponent: Number,
}

/// Body of `/math/fibonacci` and `/math/factorial`
#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    pub n: i64,
}

#[derive(Debug, Deserialize)]
pub struct OperationRequest {
    #[serde(default = "empty_object")]
    pub parameters: Value,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn default_use_cache() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<u64>,
    pub operation: Option<String>,
    pub success_only: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CacheParams {
    pub limit: Option<u64>,
    pub operation: Option<String>,
}
