// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Process lifecycle use cases
//!
//! Status/result lookups read the hot in-memory map first and fall back to
//! the durable store (covers a process restored after a restart that hasn't
//! been touched since). Cancel and delete both mutate the in-memory record
//! so `/status` reflects the request immediately; the pipeline task itself
//! is responsible for noticing `cancel_requested` between stages.

use tokio::sync::broadcast;

use manual_bridge_domain::audit::{ActorRole, AuditEvent, EventResult};
use manual_bridge_domain::error::PipelineError;
use manual_bridge_domain::ids::{ProcessId, TxnId};
use manual_bridge_domain::progress::ProgressUpdate;
use manual_bridge_domain::Process;

use crate::application::commands::{CancelProcessCommand, DeleteDocumentCommand};
use crate::context::AppContext;

pub fn get_process(app: &AppContext, process_id: ProcessId) -> Result<Process, PipelineError> {
    if let Some(process) = app.processes.get(&process_id) {
        return Ok(process.value().clone());
    }
    app.process_store
        .get(&process_id)?
        .ok_or_else(|| PipelineError::NotFound(process_id.to_string()))
}

pub fn list_processes(app: &AppContext) -> Result<Vec<Process>, PipelineError> {
    app.process_store.list()
}

pub fn subscribe_progress(app: &AppContext, process_id: ProcessId) -> broadcast::Receiver<ProgressUpdate> {
    app.progress_bus.subscribe(process_id)
}

pub async fn cancel_process(app: &AppContext, command: CancelProcessCommand) -> Result<(), PipelineError> {
    let mut entry = app
        .processes
        .get_mut(&command.process_id)
        .ok_or_else(|| PipelineError::NotFound(command.process_id.to_string()))?;
    entry.request_cancel();
    app.process_store.put(&entry)?;
    drop(entry);

    let _ = app.audit_store.append(&AuditEvent::record(
        "process_cancel",
        &command.actor,
        ActorRole::Operator,
        EventResult::Success,
        serde_json::json!({ "process_id": command.process_id.to_string() }),
    ));
    Ok(())
}

/// Removes a document's bridged graph data and its process record. The
/// graph delete reuses `delete_by_process` under a fresh, immediately
/// committed transaction since there is no saga in flight to join.
pub async fn delete_document(app: &AppContext, command: DeleteDocumentCommand) -> Result<(), PipelineError> {
    app.graph.delete_by_process(TxnId::new(), command.process_id).await?;
    app.process_store.delete(&command.process_id)?;
    app.processes.remove(&command.process_id);

    let _ = app.audit_store.append(&AuditEvent::record(
        "document_delete",
        &command.actor,
        ActorRole::Operator,
        EventResult::Success,
        serde_json::json!({ "process_id": command.process_id.to_string() }),
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_process_id_is_not_found() {
        let missing = ProcessId::new();
        let err = PipelineError::NotFound(missing.to_string());
        assert_eq!(err.category(), "not_found");
    }
}
