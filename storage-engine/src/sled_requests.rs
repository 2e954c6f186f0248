use crate::{decode, encode, storage_error};
use abacus::domain::{HistoryQuery, NewRequestRecord, RequestRecord, RequestTally};
use abacus::ports::RequestLog;
use async_trait::async_trait;
use chrono::Utc;
use shared::Result;

/// Request records keyed by big-endian id, so tree order is insertion order.
#[derive(Clone)]
pub struct SledRequestLog {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledRequestLog {
    pub(crate) fn new(db: sled::Db, tree: sled::Tree) -> Self {
        Self { db, tree }
    }
}

#[async_trait]
impl RequestLog for SledRequestLog {
    async fn record(&self, record: NewRequestRecord) -> Result<RequestRecord> {
        // generate_id is monotonic across restarts and starts at zero
        let id = self
            .db
            .generate_id()
            .map_err(|e| storage_error("Failed to allocate request id", e))?
            + 1;

        let stored = record.into_record(id, Utc::now());
        self.tree
            .insert(id.to_be_bytes(), encode(&stored)?)
            .map_err(|e| storage_error("Failed to save request", e))?;

        Ok(stored)
    }

    async fn history(&self, query: &HistoryQuery) -> Result<Vec<RequestRecord>> {
        let mut records = Vec::new();

        for item in self.tree.iter().rev() {
            if records.len() >= query.limit {
                break;
            }
            let (_, value) = item.map_err(|e| storage_error("Failed to iterate requests", e))?;
            let record: RequestRecord = decode(&value)?;
            if query.matches(&record) {
                records.push(record);
            }
        }

        Ok(records)
    }

    async fn tally(&self) -> Result<RequestTally> {
        let mut tally = RequestTally::default();

        for item in self.tree.iter() {
            let (_, value) = item.map_err(|e| storage_error("Failed to iterate requests", e))?;
            tally.observe(&decode(&value)?);
        }

        Ok(tally)
    }
}
