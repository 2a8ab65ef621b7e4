// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain ports
//!
//! The trait boundaries the application layer implements and the pipeline
//! depends on. Per §9's re-architecture notes, these replace the source's
//! duck-typed external calls with explicit, typed, `async_trait` contracts.
//! The in-process embedded graph (§4.2) and any real extractor backends are
//! infrastructure-layer implementations of these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::entities::{QsrEntity, Relationship, VisualCitation};
use crate::error::PipelineError;
use crate::ids::{ProcessId, TxnId};

/// Raw entity/relationship mentions as produced by the external entity
/// extractor, before normalization or qsr_type classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMention {
    pub local_id: String,
    pub name: String,
    pub page: u32,
    pub properties: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRelationship {
    pub source_local_id: String,
    pub target_local_id: String,
    pub relationship_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub entities: Vec<RawMention>,
    pub relationships: Vec<RawRelationship>,
}

/// External text extractor boundary (§4.4 step 2).
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, PipelineError>;
}

/// External entity/relationship extractor boundary (§4.4 step 3, §4.5 step 1).
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract_entities(&self, text: &str) -> Result<ExtractionResult, PipelineError>;
}

/// External image/table extractor boundary (§4.7). Falls back to the
/// text-reference heuristic in [`crate::preservation`] when unavailable.
#[async_trait]
pub trait ImageExtractor: Send + Sync {
    async fn extract_images(&self, pdf_bytes: &[u8]) -> Result<Vec<VisualCitation>, PipelineError>;
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub created: u64,
    pub node_ids: Vec<String>,
}

/// Single facade for all graph reads/writes (§4.2). Writes are batched,
/// idempotent on (process_id, local_id), and run under the caller's saga
/// transaction; the graph circuit breaker wraps every call from the adapter
/// side, not here.
#[async_trait]
pub trait GraphRepository: Send + Sync {
    async fn create_entities_batch(&self, txn: TxnId, process_id: ProcessId, entities: &[QsrEntity]) -> Result<BatchOutcome, PipelineError>;

    async fn create_relationships_batch(&self, txn: TxnId, process_id: ProcessId, relationships: &[Relationship]) -> Result<BatchOutcome, PipelineError>;

    /// Deletes everything written for `process_id` under `txn`; the
    /// compensating operation for a rollback.
    async fn delete_by_process(&self, txn: TxnId, process_id: ProcessId) -> Result<(), PipelineError>;

    async fn count_entities_for_process(&self, process_id: ProcessId) -> Result<u64, PipelineError>;

    async fn health_probe(&self) -> Result<Duration, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_result_defaults_to_empty() {
        let result = ExtractionResult::default();
        assert!(result.entities.is_empty());
        assert!(result.relationships.is_empty());
    }
}
