// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Upload / ingest use case
//!
//! Accepts an already-read document, persists it to
//! [`crate::context::Layout::uploads_dir`], creates its [`Process`] record,
//! and hands the pipeline run off to a background task so the HTTP request
//! that uploaded the file returns immediately with a `process_id` rather
//! than blocking for the full bridge run (§6).

use manual_bridge_domain::audit::{ActorRole, AuditEvent, EventResult};
use manual_bridge_domain::error::PipelineError;
use manual_bridge_domain::ids::ProcessId;
use manual_bridge_domain::Process;

use crate::application::commands::UploadDocumentCommand;
use crate::application::services::bridge_service::BridgeService;
use crate::context::AppContext;

/// Counts `/Type /Page` object markers in the raw PDF bytes as a rough page
/// count; falls back to 1 so a process always has a non-zero page count for
/// the integrity checker's `document_completeness` check.
fn estimate_page_count(bytes: &[u8]) -> u32 {
    let needle = b"/Type/Page";
    let spaced_needle = b"/Type /Page";
    let count = bytes.windows(needle.len()).filter(|w| *w == needle).count()
        + bytes.windows(spaced_needle.len()).filter(|w| *w == spaced_needle).count();
    count.max(1) as u32
}

pub struct UploadOutcome {
    pub process_id: ProcessId,
    pub filename: String,
    pub page_count: u32,
}

pub async fn upload_document(app: &AppContext, command: UploadDocumentCommand) -> Result<UploadOutcome, PipelineError> {
    if command.bytes.is_empty() {
        return Err(PipelineError::invalid_input("uploaded file is empty"));
    }

    let page_count = estimate_page_count(&command.bytes);
    let stored_path = app.layout.uploads_dir().join(format!("{}_{}", ProcessId::new(), command.filename));
    std::fs::write(&stored_path, &command.bytes)?;

    let process = Process::new(
        command.filename.clone(),
        stored_path.to_string_lossy().to_string(),
        command.bytes.len() as u64,
        page_count,
    );
    let process_id = process.process_id;

    app.process_store.put(&process)?;
    app.processes.insert(process_id, process);

    let _ = app.audit_store.append(&AuditEvent::record(
        "upload",
        &command.actor,
        ActorRole::Operator,
        EventResult::Success,
        serde_json::json!({ "process_id": process_id.to_string(), "filename": command.filename }),
    ));

    let spawn_app = app.clone();
    let bytes = command.bytes;
    tokio::spawn(async move {
        let _ = BridgeService::run_pipeline(&spawn_app, process_id, bytes).await;
    });

    Ok(UploadOutcome { process_id, filename: command.filename, page_count })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_never_reports_zero() {
        assert_eq!(estimate_page_count(b"no markers here"), 1);
    }

    #[test]
    fn page_count_counts_both_spacing_variants() {
        let bytes = b"/Type/Page /Type /Page /Type/Page";
        assert_eq!(estimate_page_count(bytes), 3);
    }
}
