use super::{DispatchResult, MathValue, Parameters};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Who sent a request, as far as the transport knows.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// A dispatch outcome before the request log assigns it an id.
#[derive(Clone, Debug, PartialEq)]
pub struct NewRequestRecord {
    pub operation: String,
    pub parameters: Parameters,
    pub result: Option<MathValue>,
    pub execution_time_ms: Option<f64>,
    pub success: bool,
    pub cache_hit: bool,
    pub error_message: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl NewRequestRecord {
    pub fn success(
        operation: impl Into<String>,
        parameters: Parameters,
        dispatch: &DispatchResult,
        context: &RequestContext,
    ) -> Self {
        Self {
            operation: operation.into(),
            parameters,
            result: Some(dispatch.result.clone()),
            execution_time_ms: Some(dispatch.elapsed_ms()),
            success: true,
            cache_hit: dispatch.cache_hit,
            error_message: None,
            client_ip: context.client_ip.clone(),
            user_agent: context.user_agent.clone(),
        }
    }

    pub fn failure(
        operation: impl Into<String>,
        parameters: Parameters,
        error_message: impl Into<String>,
        elapsed: Option<Duration>,
        context: &RequestContext,
    ) -> Self {
        Self {
            operation: operation.into(),
            parameters,
            result: None,
            execution_time_ms: elapsed.map(|e| e.as_secs_f64() * 1000.0),
            success: false,
            cache_hit: false,
            error_message: Some(error_message.into()),
            client_ip: context.client_ip.clone(),
            user_agent: context.user_agent.clone(),
        }
    }

    pub fn into_record(self, id: u64, timestamp: DateTime<Utc>) -> RequestRecord {
        RequestRecord {
            id,
            operation: self.operation,
            parameters: self.parameters,
            result: self.result,
            execution_time_ms: self.execution_time_ms,
            success: self.success,
            cache_hit: self.cache_hit,
            error_message: self.error_message,
            timestamp,
            client_ip: self.client_ip,
            user_agent: self.user_agent,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: u64,
    pub operation: String,
    pub parameters: Parameters,
    pub result: Option<MathValue>,
    pub execution_time_ms: Option<f64>,
    pub success: bool,
    pub cache_hit: bool,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Running totals over the request log, folded one record at a time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestTally {
    pub total: u64,
    pub successful: u64,
    pub cache_hits: u64,
    /// Successful requests that were computed and carry a timing
    pub timed: u64,
    pub execution_time_ms: f64,
    pub by_operation: BTreeMap<String, u64>,
}

impl RequestTally {
    pub fn observe(&mut self, record: &RequestRecord) {
        self.total += 1;
        match self.by_operation.get_mut(&record.operation) {
            Some(count) => *count += 1,
            None => {
                self.by_operation.insert(record.operation.clone(), 1);
            }
        }

        if !record.success {
            return;
        }
        self.successful += 1;
        if record.cache_hit {
            self.cache_hits += 1;
        } else if let Some(elapsed) = record.execution_time_ms {
            self.timed += 1;
            self.execution_time_ms += elapsed;
        }
    }
}

impl<'a> FromIterator<&'a RequestRecord> for RequestTally {
    fn from_iter<I: IntoIterator<Item = &'a RequestRecord>>(records: I) -> Self {
        let mut tally = Self::default();
        for record in records {
            tally.observe(record);
        }
        tally
    }
}

/// Filter for the request history, newest first.
#[derive(Clone, Debug)]
pub struct HistoryQuery {
    pub limit: usize,
    pub operation: Option<String>,
    pub success_only: bool,
}

impl HistoryQuery {
    pub const DEFAULT_LIMIT: usize = 50;

    /// Every record, newest first.
    pub fn everything() -> Self {
        Self {
            limit: usize::MAX,
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &RequestRecord) -> bool {
        self.operation
            .as_deref()
            .is_none_or(|operation| record.operation == operation)
            && (!self.success_only || record.success)
    }
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            operation: None,
            success_only: false,
        }
    }
}

/// Filter for listing cache entries, newest first.
#[derive(Clone, Debug)]
pub struct CacheQuery {
    pub limit: usize,
    pub operation: Option<String>,
}

impl CacheQuery {
    pub const DEFAULT_LIMIT: usize = 50;

    /// Every entry, for aggregate statistics.
    pub fn everything() -> Self {
        Self {
            limit: usize::MAX,
            operation: None,
        }
    }

    pub fn matches(&self, operation: &str) -> bool {
        self.operation.as_deref().is_none_or(|wanted| wanted == operation)
    }
}

impl Default for CacheQuery {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            operation: None,
        }
    }
}
