// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `GET /status/{process_id}` and `GET /result/{process_id}` (§6): the
//! polling counterpart to the `/progress` WebSocket, sharing the same
//! [`ProgressUpdate`] wire format.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use manual_bridge_domain::entities::TerminalState;
use manual_bridge_domain::error::PipelineError;
use manual_bridge_domain::ids::ProcessId;
use manual_bridge_domain::progress::{ProgressUpdate, SuccessSummary};
use manual_bridge_domain::Process;

use crate::application::use_cases::manage_process;
use crate::context::AppContext;
use crate::presentation::http::state::ApiError;

fn parse_process_id(raw: &str) -> Result<ProcessId, ApiError> {
    raw.parse().map_err(|_| ApiError(PipelineError::NotFound(raw.to_string())))
}

/// Builds a progress frame from the durable `Process` record when no live
/// snapshot is held in memory - the case right after a restart, before the
/// resumed or replayed stage has published anything yet.
fn snapshot_from_process(process: &Process) -> ProgressUpdate {
    match process.terminal_state {
        TerminalState::Succeeded => ProgressUpdate::terminal_success(
            process.process_id,
            0.0,
            SuccessSummary {
                total_entities: process.counters.entities_bridged,
                total_relationships: process.counters.relationships_bridged,
            },
        ),
        TerminalState::Failed | TerminalState::ForceCompleted => ProgressUpdate::terminal_failure(
            process.process_id,
            process.current_stage,
            0.0,
            process.error.clone().unwrap_or_else(|| "processing did not complete".to_string()),
        ),
        TerminalState::Running => ProgressUpdate::in_progress(process.process_id, process.current_stage, 0, "resumed", 0.0),
    }
}

pub async fn status(State(app): State<AppContext>, Path(process_id): Path<String>) -> Result<Json<ProgressUpdate>, ApiError> {
    let process_id = parse_process_id(&process_id)?;
    if let Some(update) = app.progress_bus.snapshot(process_id) {
        return Ok(Json(update));
    }
    let process = manage_process::get_process(&app, process_id)?;
    Ok(Json(snapshot_from_process(&process)))
}

pub enum ResultError {
    Api(ApiError),
    StillRunning,
}

impl axum::response::IntoResponse for ResultError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ResultError::Api(err) => err.into_response(),
            ResultError::StillRunning => StatusCode::CONFLICT.into_response(),
        }
    }
}

pub async fn result(State(app): State<AppContext>, Path(process_id): Path<String>) -> Result<Json<ProgressUpdate>, ResultError> {
    let process_id = parse_process_id(&process_id).map_err(ResultError::Api)?;
    let process = manage_process::get_process(&app, process_id).map_err(|e| ResultError::Api(e.into()))?;
    if !process.is_terminal() {
        return Err(ResultError::StillRunning);
    }
    if let Some(update) = app.progress_bus.snapshot(process_id) {
        if update.terminal {
            return Ok(Json(update));
        }
    }
    Ok(Json(snapshot_from_process(&process)))
}
