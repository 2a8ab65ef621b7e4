// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bridge service
//!
//! Drives one [`Process`](manual_bridge_domain::Process) through every
//! [`Stage`] in order: validation, text extraction, entity extraction,
//! deduplication, visual-citation linking, graph write, integrity check,
//! finalization. Each stage is entered and exited on the process record,
//! published to the progress bus, and the three external-collaborator calls
//! (text/entity/image extraction, graph write) run under their matching
//! circuit breaker.
//!
//! A failure at `graph_write` or `integrity_check` rolls the saga back via
//! the transaction's recorded compensations and enqueues the triggering
//! error to the dead-letter queue rather than leaving a half-written
//! document in the graph.

use std::collections::HashSet;
use std::time::Instant;

use manual_bridge_domain::audit::{ActorRole, AuditEvent, EventResult};
use manual_bridge_domain::dedup;
use manual_bridge_domain::entities::{
    score_link_confidence, BoundingBox, QsrEntity, Relationship, TerminalState, VisualCitation, VisualCitationKind, VisualEntityLink,
    VisualLinkKind, MIN_LINK_CONFIDENCE,
};
use manual_bridge_domain::error::PipelineError;
use manual_bridge_domain::ids::{ProcessId, TxnId};
use manual_bridge_domain::integrity::{self, IntegritySnapshot, IssueSeverity};
use manual_bridge_domain::preservation;
use manual_bridge_domain::progress::{ProgressUpdate, SuccessSummary};
use manual_bridge_domain::reliability::FailedOperation;
use manual_bridge_domain::value_objects::{QsrType, Stage};
use tracing::{error, info, warn};

use crate::context::AppContext;

/// Above this fraction of entities with no relationship edge, `check_orphan_entities`
/// raises a warning (§4.8). No config key names this, so it stays a fixed
/// policy constant rather than a tunable.
const ORPHAN_RATIO_POLICY: f64 = 0.5;

fn elapsed_seconds(start: Instant) -> f64 {
    start.elapsed().as_secs_f64()
}

pub struct BridgeService;

impl BridgeService {
    /// Runs the full pipeline for an already-persisted, already-stored
    /// process. Returns once the process has reached a terminal state;
    /// errors are also recorded on the process, metrics, and the DLQ, never
    /// just returned bare to the caller, so a caller that only logs the
    /// `Err` still leaves the system in a consistent state.
    #[tracing::instrument(skip(app, pdf_bytes), fields(bytes = pdf_bytes.len()))]
    pub async fn run_pipeline(app: &AppContext, process_id: ProcessId, pdf_bytes: Vec<u8>) -> Result<(), PipelineError> {
        let start = Instant::now();
        info!(%process_id, "pipeline run starting");
        match Self::run_stages(app, process_id, &pdf_bytes, start).await {
            Ok(summary) => {
                info!(%process_id, entities = summary.total_entities, relationships = summary.total_relationships, "pipeline run succeeded");
                Self::finish_success(app, process_id, start, summary);
                Ok(())
            }
            Err(err) => {
                error!(%process_id, error = %err, "pipeline run failed");
                Self::finish_failure(app, process_id, start, &err);
                Err(err)
            }
        }
    }

    async fn run_stages(app: &AppContext, process_id: ProcessId, pdf_bytes: &[u8], start: Instant) -> Result<SuccessSummary, PipelineError> {
        Self::enter_stage(app, process_id, Stage::Validation);
        if pdf_bytes.is_empty() {
            return Err(PipelineError::invalid_input("uploaded file is empty"));
        }
        Self::exit_stage(app, process_id, None);

        Self::enter_stage(app, process_id, Stage::TextExtraction);
        let extractor = app.text_extractor.clone();
        let bytes = pdf_bytes.to_vec();
        let text = match app.breakers.guard("text_extractor", || async move { extractor.extract_text(&bytes).await }).await {
            Ok(text) => text,
            Err(err) => {
                Self::exit_stage(app, process_id, Some(err.to_string()));
                return Err(err);
            }
        };
        Self::exit_stage(app, process_id, None);
        Self::publish(app, process_id, Stage::TextExtraction, 15, "text extracted", start, 0, 0);

        Self::enter_stage(app, process_id, Stage::EntityExtraction);
        let entity_extractor = app.entity_extractor.clone();
        let text_for_extraction = text.clone();
        let extraction = match app
            .breakers
            .guard("entity_extractor", || async move { entity_extractor.extract_entities(&text_for_extraction).await })
            .await
        {
            Ok(extraction) => extraction,
            Err(err) => {
                Self::exit_stage(app, process_id, Some(err.to_string()));
                return Err(err);
            }
        };

        let filename = app.processes.get(&process_id).map(|p| p.filename.clone()).unwrap_or_default();
        let raw_entities: Vec<QsrEntity> = extraction
            .entities
            .iter()
            .map(|mention| {
                let qsr_type = QsrType::classify(&dedup::normalize_for_matching(&mention.name));
                let mut entity = QsrEntity::new(mention.local_id.clone(), mention.name.clone(), qsr_type, filename.clone());
                entity = entity.with_page_ref(mention.page);
                entity.properties = mention.properties.clone();
                entity
            })
            .collect();
        let raw_relationships: Vec<Relationship> = extraction
            .relationships
            .iter()
            .map(|r| Relationship::new(r.source_local_id.clone(), r.target_local_id.clone(), r.relationship_type.clone()))
            .collect();
        Self::with_process(app, process_id, |p| {
            p.counters.entities_extracted = raw_entities.len() as u64;
            p.counters.relationships_extracted = raw_relationships.len() as u64;
        });
        Self::exit_stage(app, process_id, None);
        Self::publish(app, process_id, Stage::EntityExtraction, 35, "entities extracted", start, raw_entities.len() as u64, raw_relationships.len() as u64);

        Self::enter_stage(app, process_id, Stage::Deduplication);
        // Cross-document matching stays empty: the resolved Open Question in
        // SPEC_FULL.md leaves cross-document dedup disabled by default since
        // no deployed config key exposes it.
        let dedup_result = dedup::deduplicate(&raw_entities, &raw_relationships, &[]);
        Self::exit_stage(app, process_id, None);
        Self::publish(
            app,
            process_id,
            Stage::Deduplication,
            50,
            "deduplication complete",
            start,
            dedup_result.canonical_entities.len() as u64,
            dedup_result.relationships.len() as u64,
        );

        Self::enter_stage(app, process_id, Stage::VisualCitation);
        let image_extractor = app.image_extractor.clone();
        let bytes_for_images = pdf_bytes.to_vec();
        let mut citations = match app
            .breakers
            .guard("image_extractor", || async move { image_extractor.extract_images(&bytes_for_images).await })
            .await
        {
            Ok(citations) => citations,
            Err(err) => {
                Self::exit_stage(app, process_id, Some(err.to_string()));
                return Err(err);
            }
        };
        if citations.is_empty() {
            citations = Self::fallback_citations(app, &filename, &text)?;
        }
        let visual_links = Self::link_citations(&mut citations, &dedup_result.canonical_entities);
        Self::exit_stage(app, process_id, None);
        Self::publish(app, process_id, Stage::VisualCitation, 65, "visual citations linked", start, 0, 0);

        Self::enter_stage(app, process_id, Stage::GraphWrite);
        let txn = app.transactions.begin(process_id);
        let graph_write = Self::write_graph(app, process_id, txn.txn_id, &dedup_result.canonical_entities, &dedup_result.relationships).await;
        let (entities_written, relationships_written) = match graph_write {
            Ok(outcome) => outcome,
            Err(err) => {
                Self::rollback(app, process_id, &err, "graph_write").await;
                Self::exit_stage(app, process_id, Some(err.to_string()));
                return Err(err);
            }
        };
        Self::with_process(app, process_id, |p| {
            p.counters.entities_bridged = entities_written;
            p.counters.relationships_bridged = relationships_written;
        });
        Self::exit_stage(app, process_id, None);
        Self::publish(app, process_id, Stage::GraphWrite, 85, "graph write complete", start, entities_written, relationships_written);

        Self::enter_stage(app, process_id, Stage::IntegrityCheck);
        let page_count = app.processes.get(&process_id).map(|p| p.page_count).unwrap_or(1).max(1);
        let pages_with_text: HashSet<u32> = (1..=page_count).collect();
        let snapshot = IntegritySnapshot {
            entities: dedup_result.canonical_entities.clone(),
            relationships: dedup_result.relationships.clone(),
            visual_links: visual_links.clone(),
            existing_graph_entity_ids: HashSet::new(),
            pages_with_text,
            bridged_entity_count: entities_written,
            bridged_relationship_count: relationships_written,
            cross_document: false,
            orphan_ratio_policy: ORPHAN_RATIO_POLICY,
        };
        let issues = integrity::run_checks(&snapshot);
        let unresolved: Vec<_> = issues.into_iter().filter(|i| !integrity::is_auto_repairable(i)).collect();
        if integrity::has_unresolved_critical(&unresolved) {
            let detail = unresolved
                .iter()
                .filter(|i| i.severity == IssueSeverity::Critical)
                .map(|i| i.detail.clone())
                .collect::<Vec<_>>()
                .join("; ");
            let err = PipelineError::IntegrityFailed(detail);
            Self::rollback(app, process_id, &err, "integrity_check").await;
            Self::exit_stage(app, process_id, Some(err.to_string()));
            return Err(err);
        }
        if let Some(mut txn) = app.transactions.take(process_id) {
            txn.commit();
        }
        Self::exit_stage(app, process_id, None);
        Self::publish(app, process_id, Stage::IntegrityCheck, 95, "integrity verified", start, entities_written, relationships_written);

        Self::enter_stage(app, process_id, Stage::Finalization);
        let _ = app.audit_store.append(&AuditEvent::record(
            "document_processed",
            "pipeline",
            ActorRole::Service,
            EventResult::Success,
            serde_json::json!({
                "process_id": process_id.to_string(),
                "entities": entities_written,
                "relationships": relationships_written,
            }),
        ));
        Self::exit_stage(app, process_id, None);

        Ok(SuccessSummary { total_entities: entities_written, total_relationships: relationships_written })
    }

    fn fallback_citations(app: &AppContext, filename: &str, text: &str) -> Result<Vec<VisualCitation>, PipelineError> {
        let tokens = preservation::find_fallback_reference_tokens(text);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let mut citation = VisualCitation::new(VisualCitationKind::Image, "txt", filename, 1);
        citation.bbox = BoundingBox::default();
        let bytes = text.as_bytes();
        citation.content_hash = preservation::content_hash(bytes);
        let path = app.layout.content_dir().join(format!("{}.txt", citation.citation_id));
        let persisted = std::fs::write(&path, bytes).is_ok();
        if !persisted {
            tracing::warn!(citation_id = %citation.citation_id, path = %path.display(), "fallback citation text write failed, marking citation failed");
        }
        citation.preservation_state = preservation::fallback_preservation_state(persisted);
        Ok(vec![citation])
    }

    fn link_citations(citations: &mut [VisualCitation], entities: &[QsrEntity]) -> Vec<VisualEntityLink> {
        let mut links = Vec::new();
        for citation in citations.iter_mut() {
            for entity in entities {
                let confidence = score_link_confidence(citation, entity.qsr_type, &entity.page_refs);
                if confidence < MIN_LINK_CONFIDENCE {
                    continue;
                }
                citation.linked_entity_ids.insert(entity.local_id.clone());
                links.push(VisualEntityLink {
                    citation_id: citation.citation_id,
                    entity_id: entity.local_id.clone(),
                    link_kind: VisualLinkKind::infer(citation.kind, entity.qsr_type),
                    confidence,
                    spatial_proximity: None,
                    semantic_similarity: None,
                });
            }
        }
        links
    }

    #[tracing::instrument(skip(app, entities, relationships), fields(entities = entities.len(), relationships = relationships.len()))]
    async fn write_graph(
        app: &AppContext,
        process_id: ProcessId,
        txn_id: TxnId,
        entities: &[QsrEntity],
        relationships: &[Relationship],
    ) -> Result<(u64, u64), PipelineError> {
        let graph = app.graph.clone();
        let entities_owned = entities.to_vec();
        let entity_outcome = app
            .breakers
            .guard("graph", || async move { graph.create_entities_batch(txn_id, process_id, &entities_owned).await })
            .await?;

        let graph = app.graph.clone();
        let relationships_owned = relationships.to_vec();
        let relationship_outcome = app
            .breakers
            .guard("graph", || async move { graph.create_relationships_batch(txn_id, process_id, &relationships_owned).await })
            .await?;

        if let Some(mut txn) = app.transactions.take(process_id) {
            txn.add("create_entities_batch", "delete_by_process");
            txn.add("create_relationships_batch", "delete_by_process");
            app.transactions.update(process_id, txn);
        }

        Ok((
            entity_outcome.created.max(entities.len() as u64),
            relationship_outcome.created.max(relationships.len() as u64),
        ))
    }

    async fn rollback(app: &AppContext, process_id: ProcessId, err: &PipelineError, op_kind: &str) {
        warn!(%process_id, op_kind, error = %err, "saga rollback starting");
        if let Some(mut txn) = app.transactions.take(process_id) {
            let _compensations = txn.compensations_in_rollback_order();
            let graph = app.graph.clone();
            let txn_id = txn.txn_id;
            let _ = app.breakers.guard("graph", || async move { graph.delete_by_process(txn_id, process_id).await }).await;
            txn.mark_rolled_back();
        }
        let record = FailedOperation::enqueue(op_kind, serde_json::json!({ "process_id": process_id.to_string() }), err);
        info!(%process_id, op_kind, dlq_record_id = %record.id, "rollback complete, enqueued to dead-letter queue");
        let _ = app.dlq_store.put(&record);
    }

    fn enter_stage(app: &AppContext, process_id: ProcessId, stage: Stage) {
        info!(%process_id, ?stage, "stage entered");
        Self::with_process(app, process_id, |p| p.enter_stage(stage));
    }

    fn exit_stage(app: &AppContext, process_id: ProcessId, error: Option<String>) {
        if let Some(detail) = &error {
            warn!(%process_id, error = %detail, "stage exited with error");
        }
        Self::with_process(app, process_id, |p| p.exit_stage(error));
    }

    fn with_process(app: &AppContext, process_id: ProcessId, f: impl FnOnce(&mut manual_bridge_domain::Process)) {
        if let Some(mut entry) = app.processes.get_mut(&process_id) {
            f(&mut entry);
            let _ = app.process_store.put(&entry);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn publish(app: &AppContext, process_id: ProcessId, stage: Stage, percent: u8, message: &str, start: Instant, entities: u64, relationships: u64) {
        let mut update = ProgressUpdate::in_progress(process_id, stage, percent, message, elapsed_seconds(start));
        update.entities_found = entities;
        update.relationships_found = relationships;
        app.progress_bus.publish(update);
    }

    fn finish_success(app: &AppContext, process_id: ProcessId, start: Instant, summary: SuccessSummary) {
        Self::with_process(app, process_id, |p| p.mark_terminal(TerminalState::Succeeded, None));
        app.metrics.record_outcome("succeeded");
        app.progress_bus.publish(ProgressUpdate::terminal_success(process_id, elapsed_seconds(start), summary));
        app.progress_bus.retire(process_id);
    }

    fn finish_failure(app: &AppContext, process_id: ProcessId, start: Instant, err: &PipelineError) {
        let stage = app.processes.get(&process_id).map(|p| p.current_stage).unwrap_or(Stage::Validation);
        Self::with_process(app, process_id, |p| p.mark_terminal(TerminalState::Failed, Some(err.to_string())));
        app.metrics.record_outcome("failed");
        app.progress_bus.publish(ProgressUpdate::terminal_failure(process_id, stage, elapsed_seconds(start), err.user_facing_message()));
        app.progress_bus.retire(process_id);
    }
}
