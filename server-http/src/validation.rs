use abacus::Parameters;
use abacus::domain::{CacheQuery, HistoryQuery};

use crate::api::requests::{CacheParams, HistoryParams};

// Constants for validation ranges
pub const MAX_LIST_LIMIT: u64 = 1000;
const DEFAULT_LIST_LIMIT: u64 = 50;

#[derive(Debug)]
pub enum ValidationError {
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    LimitTooLarge(u64),
    InvalidParameters(String),
    MalformedRequest(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::OutOfRange {
                field,
                value,
                min,
                max,
            } => {
                write!(
                    f,
                    "Field '{}' value {} is out of range (min: {}, max: {})",
                    field, value, min, max
                )
            }
            ValidationError::LimitTooLarge(limit) => {
                write!(
                    f,
                    "Field 'limit' value {} must not exceed {}",
                    limit, MAX_LIST_LIMIT
                )
            }
            ValidationError::InvalidParameters(reason) => {
                write!(f, "Invalid parameters: {}", reason)
            }
            ValidationError::MalformedRequest(reason) => write!(f, "{}", reason),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check `n` against `0..=max` and build the single-parameter input.
pub fn bounded_position(n: i64, max: u64) -> Result<Parameters, ValidationError> {
    let max = i64::try_from(max).unwrap_or(i64::MAX);
    if !(0..=max).contains(&n) {
        return Err(ValidationError::OutOfRange {
            field: "n",
            value: n,
            min: 0,
            max,
        });
    }
    Ok(Parameters::new().with("n", n))
}

pub fn parameters(value: serde_json::Value) -> Result<Parameters, ValidationError> {
    Parameters::from_json(value).map_err(|e| ValidationError::InvalidParameters(e.to_string()))
}

fn list_limit(limit: Option<u64>) -> Result<usize, ValidationError> {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit > MAX_LIST_LIMIT {
        return Err(ValidationError::LimitTooLarge(limit));
    }
    Ok(limit as usize)
}

pub fn history_query(params: HistoryParams) -> Result<HistoryQuery, ValidationError> {
    Ok(HistoryQuery {
        limit: list_limit(params.limit)?,
        operation: params.operation.filter(|op| !op.is_empty()),
        success_only: params.success_only.unwrap_or(false),
    })
}

pub fn cache_query(params: CacheParams) -> Result<CacheQuery, ValidationError> {
    Ok(CacheQuery {
        limit: list_limit(params.limit)?,
        operation: params.operation.filter(|op| !op.is_empty()),
    })
}
