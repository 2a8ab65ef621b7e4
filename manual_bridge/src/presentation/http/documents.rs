// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `GET /documents`, `GET /documents/{id}`, `DELETE /documents/{id}` (§6):
//! the admin surface over the stored corpus.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use manual_bridge_domain::error::PipelineError;
use manual_bridge_domain::ids::ProcessId;
use manual_bridge_domain::Process;

use crate::application::commands::DeleteDocumentCommand;
use crate::application::use_cases::manage_process;
use crate::context::AppContext;
use crate::presentation::http::state::{ApiError, HTTP_ACTOR};

fn parse_process_id(raw: &str) -> Result<ProcessId, ApiError> {
    raw.parse().map_err(|_| ApiError(PipelineError::NotFound(raw.to_string())))
}

pub async fn list_documents(State(app): State<AppContext>) -> Result<Json<Vec<Process>>, ApiError> {
    Ok(Json(manage_process::list_processes(&app)?))
}

pub async fn get_document(State(app): State<AppContext>, Path(process_id): Path<String>) -> Result<Json<Process>, ApiError> {
    let process_id = parse_process_id(&process_id)?;
    Ok(Json(manage_process::get_process(&app, process_id)?))
}

pub async fn delete_document(State(app): State<AppContext>, Path(process_id): Path<String>) -> Result<StatusCode, ApiError> {
    let process_id = parse_process_id(&process_id)?;
    manage_process::delete_document(&app, DeleteDocumentCommand { process_id, actor: HTTP_ACTOR.to_string() }).await?;
    Ok(StatusCode::NO_CONTENT)
}
