// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Embedded graph repository (sled-backed)
//!
//! The in-process stand-in for an external graph database (§4.2). Writes
//! are keyed by `(process_id, local_id)` so a retried batch after a partial
//! failure never double-counts a node or edge; this is the mechanism behind
//! universal invariant #2 (idempotent graph writes).
//!
//! The graph circuit breaker wraps calls to this adapter from
//! `application::services::bridge_service`, not here: this type has no
//! opinion about whether the graph is healthy, only about durable storage.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use manual_bridge_domain::entities::{QsrEntity, Relationship};
use manual_bridge_domain::error::PipelineError;
use manual_bridge_domain::ids::{ProcessId, TxnId};
use manual_bridge_domain::repositories::{BatchOutcome, GraphRepository};

use crate::infrastructure::sled_err;

const ENTITIES_TREE: &str = "graph_entities";
const RELATIONSHIPS_TREE: &str = "graph_relationships";

fn entity_key(process_id: ProcessId, local_id: &str) -> String {
    format!("{process_id}:{local_id}")
}

fn relationship_key(process_id: ProcessId, relationship: &Relationship) -> String {
    format!(
        "{process_id}:{}->{}:{}",
        relationship.source_entity_local_id, relationship.target_entity_local_id, relationship.relationship_type
    )
}

pub struct SledGraphRepository {
    entities: sled::Tree,
    relationships: sled::Tree,
}

impl SledGraphRepository {
    pub fn open(db: &sled::Db) -> Result<Self, PipelineError> {
        Ok(Self {
            entities: db.open_tree(ENTITIES_TREE).map_err(sled_err)?,
            relationships: db.open_tree(RELATIONSHIPS_TREE).map_err(sled_err)?,
        })
    }
}

#[async_trait]
impl GraphRepository for SledGraphRepository {
    async fn create_entities_batch(&self, txn: TxnId, process_id: ProcessId, entities: &[QsrEntity]) -> Result<BatchOutcome, PipelineError> {
        tracing::debug!(%txn, %process_id, count = entities.len(), "writing entity batch");
        let mut outcome = BatchOutcome::default();
        for entity in entities {
            let key = entity_key(process_id, &entity.local_id);
            let value = serde_json::to_vec(entity)?;
            let previous = self.entities.insert(key.as_bytes(), value).map_err(sled_err)?;
            if previous.is_none() {
                outcome.created += 1;
            }
            outcome.node_ids.push(key);
        }
        self.entities.flush_async().await.map_err(sled_err)?;
        Ok(outcome)
    }

    async fn create_relationships_batch(&self, txn: TxnId, process_id: ProcessId, relationships: &[Relationship]) -> Result<BatchOutcome, PipelineError> {
        tracing::debug!(%txn, %process_id, count = relationships.len(), "writing relationship batch");
        let mut outcome = BatchOutcome::default();
        for relationship in relationships {
            let key = relationship_key(process_id, relationship);
            let value = serde_json::to_vec(relationship)?;
            let previous = self.relationships.insert(key.as_bytes(), value).map_err(sled_err)?;
            if previous.is_none() {
                outcome.created += 1;
            }
            outcome.node_ids.push(key);
        }
        self.relationships.flush_async().await.map_err(sled_err)?;
        Ok(outcome)
    }

    async fn delete_by_process(&self, txn: TxnId, process_id: ProcessId) -> Result<(), PipelineError> {
        tracing::debug!(%txn, %process_id, "rolling back graph writes");
        let prefix = format!("{process_id}:");
        for tree in [&self.entities, &self.relationships] {
            let keys: Vec<_> = tree.scan_prefix(prefix.as_bytes()).keys().collect::<Result<_, _>>().map_err(sled_err)?;
            for key in keys {
                tree.remove(key).map_err(sled_err)?;
            }
            tree.flush_async().await.map_err(sled_err)?;
        }
        Ok(())
    }

    async fn count_entities_for_process(&self, process_id: ProcessId) -> Result<u64, PipelineError> {
        let prefix = format!("{process_id}:");
        Ok(self.entities.scan_prefix(prefix.as_bytes()).count() as u64)
    }

    async fn health_probe(&self) -> Result<Duration, PipelineError> {
        let start = Instant::now();
        self.entities.get(b"__health_probe__").map_err(sled_err)?;
        Ok(start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manual_bridge_domain::value_objects::QsrType;

    fn temp_repo() -> SledGraphRepository {
        let db = sled::Config::new().temporary(true).open().unwrap();
        SledGraphRepository::open(&db).unwrap()
    }

    #[tokio::test]
    async fn repeated_batch_write_is_idempotent_on_count() {
        let repo = temp_repo();
        let process_id = ProcessId::new();
        let txn = TxnId::new();
        let entity = QsrEntity::new("e1", "Taylor C602", QsrType::Equipment, "manual.pdf");
        let first = repo.create_entities_batch(txn, process_id, std::slice::from_ref(&entity)).await.unwrap();
        let second = repo.create_entities_batch(txn, process_id, std::slice::from_ref(&entity)).await.unwrap();
        assert_eq!(first.created, 1);
        assert_eq!(second.created, 0);
        assert_eq!(repo.count_entities_for_process(process_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_by_process_removes_only_that_process() {
        let repo = temp_repo();
        let txn = TxnId::new();
        let a = ProcessId::new();
        let b = ProcessId::new();
        let entity = QsrEntity::new("e1", "Taylor C602", QsrType::Equipment, "manual.pdf");
        repo.create_entities_batch(txn, a, std::slice::from_ref(&entity)).await.unwrap();
        repo.create_entities_batch(txn, b, std::slice::from_ref(&entity)).await.unwrap();
        repo.delete_by_process(txn, a).await.unwrap();
        assert_eq!(repo.count_entities_for_process(a).await.unwrap(), 0);
        assert_eq!(repo.count_entities_for_process(b).await.unwrap(), 1);
    }
}
