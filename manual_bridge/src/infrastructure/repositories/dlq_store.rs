// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Dead-letter queue store (sled-backed)
//!
//! Persists [`FailedOperation`] records so a crash mid-retry doesn't lose
//! track of work still owed to a document. `due_for_retry` backs the DLQ
//! sweep loop in `application::services::monitoring_loops`.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use manual_bridge_domain::error::PipelineError;
use manual_bridge_domain::ids::DlqRecordId;
use manual_bridge_domain::reliability::FailedOperation;

use crate::infrastructure::sled_err;

const TREE_NAME: &str = "dlq_records";

pub struct DlqStore {
    tree: sled::Tree,
}

impl DlqStore {
    pub fn open(db: &sled::Db) -> Result<Self, PipelineError> {
        let tree = db.open_tree(TREE_NAME).map_err(sled_err)?;
        Ok(Self { tree })
    }

    #[tracing::instrument(skip(self, record), fields(dlq_record_id = %record.id, op_kind = %record.op_kind, attempts = record.attempts))]
    pub fn put(&self, record: &FailedOperation) -> Result<(), PipelineError> {
        let key = record.id.to_string();
        let value = serde_json::to_vec(record)?;
        self.tree.insert(key, value).map_err(sled_err)?;
        self.tree.flush().map_err(sled_err)?;
        info!(dlq_record_id = %record.id, op_kind = %record.op_kind, attempts = record.attempts, "dead-letter record enqueued");
        Ok(())
    }

    pub fn get(&self, id: &DlqRecordId) -> Result<Option<FailedOperation>, PipelineError> {
        match self.tree.get(id.to_string()).map_err(sled_err)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    #[tracing::instrument(skip(self), fields(dlq_record_id = %id))]
    pub fn remove(&self, id: &DlqRecordId) -> Result<(), PipelineError> {
        let existed = self.tree.remove(id.to_string()).map_err(sled_err)?.is_some();
        self.tree.flush().map_err(sled_err)?;
        if existed {
            info!(dlq_record_id = %id, "dead-letter record drained");
        } else {
            warn!(dlq_record_id = %id, "dead-letter drain found no matching record");
        }
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<FailedOperation>, PipelineError> {
        self.tree
            .iter()
            .values()
            .map(|res| {
                let bytes = res.map_err(sled_err)?;
                serde_json::from_slice(&bytes).map_err(PipelineError::from)
            })
            .collect()
    }

    /// Records whose backoff has elapsed as of `now`, per
    /// [`FailedOperation::is_due`].
    pub fn due_for_retry(&self, now: DateTime<Utc>) -> Result<Vec<FailedOperation>, PipelineError> {
        Ok(self.list()?.into_iter().filter(|record| record.is_due(now)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manual_bridge_domain::error::PipelineError as Err;

    fn temp_db() -> sled::Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    #[test]
    fn put_then_get_round_trips() {
        let db = temp_db();
        let store = DlqStore::open(&db).unwrap();
        let record = FailedOperation::enqueue("graph_write", serde_json::json!({}), &Err::CircuitOpen("graph".into()));
        store.put(&record).unwrap();
        assert!(store.get(&record.id).unwrap().is_some());
    }

    #[test]
    fn manual_review_records_are_never_due() {
        let db = temp_db();
        let store = DlqStore::open(&db).unwrap();
        let record = FailedOperation::enqueue("graph_write", serde_json::json!({}), &Err::InvalidInput("bad".into()));
        store.put(&record).unwrap();
        let due = store.due_for_retry(Utc::now() + chrono::Duration::hours(1)).unwrap();
        assert!(due.is_empty());
    }

    #[test]
    fn remove_drops_the_record() {
        let db = temp_db();
        let store = DlqStore::open(&db).unwrap();
        let record = FailedOperation::enqueue("graph_write", serde_json::json!({}), &Err::CircuitOpen("graph".into()));
        store.put(&record).unwrap();
        store.remove(&record.id).unwrap();
        assert!(store.get(&record.id).unwrap().is_none());
    }
}
