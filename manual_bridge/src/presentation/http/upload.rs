// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `POST /upload` (§6): multipart body with a single PDF field.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use manual_bridge_domain::error::PipelineError;

use crate::application::commands::UploadDocumentCommand;
use crate::application::use_cases::process_document;
use crate::context::AppContext;
use crate::presentation::http::state::{ApiError, HTTP_ACTOR};

/// §6 default byte limit. No config key names this (it isn't in the §6
/// config-keys table), so it stays a fixed policy constant.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Serialize)]
pub struct UploadResponse {
    pub process_id: String,
    pub filename: String,
    pub pages: u32,
    pub status_stream_url: String,
    pub snapshot_url: String,
    pub result_url: String,
}

#[derive(Serialize)]
struct DegradedBody {
    retry_after: u64,
}

/// Seconds a `503` response asks a degraded client to wait before retrying.
/// Not configurable - it is a client-facing hint, not a processing
/// parameter, so it does not belong in `AppConfig`.
const DEGRADED_RETRY_AFTER_SECONDS: u64 = 30;

pub async fn upload(State(app): State<AppContext>, mut multipart: Multipart) -> Result<(StatusCode, Json<UploadResponse>), UploadError> {
    if !app.degradation_snapshot().effects().accept_new_uploads {
        return Err(UploadError::Degraded);
    }

    let mut filename = None;
    let mut bytes = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| UploadError::Api(PipelineError::invalid_input(e.to_string()).into()))? {
        let is_pdf_field = field
            .content_type()
            .map(|ct| ct == "application/pdf")
            .unwrap_or(false)
            || field.name() == Some("file");
        if !is_pdf_field {
            continue;
        }
        filename = field.file_name().map(|n| n.to_string());
        let data = field.bytes().await.map_err(|e| UploadError::Api(PipelineError::invalid_input(e.to_string()).into()))?;
        bytes = Some(data.to_vec());
    }

    let filename = filename.unwrap_or_else(|| "upload.pdf".to_string());
    let bytes = bytes.ok_or_else(|| UploadError::Api(PipelineError::invalid_input("missing PDF field").into()))?;

    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::Api(PipelineError::invalid_input("uploaded file exceeds the size limit").into()));
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(UploadError::Api(PipelineError::invalid_input("uploaded file is not a PDF").into()));
    }

    let command = UploadDocumentCommand { filename, bytes, actor: HTTP_ACTOR.to_string() };
    let outcome = process_document::upload_document(&app, command).await.map_err(|e| UploadError::Api(e.into()))?;

    let process_id = outcome.process_id.to_string();
    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            filename: outcome.filename,
            pages: outcome.page_count,
            status_stream_url: format!("/status/{process_id}"),
            snapshot_url: format!("/status/{process_id}"),
            result_url: format!("/result/{process_id}"),
            process_id,
        }),
    ))
}

pub enum UploadError {
    Api(ApiError),
    Degraded,
}

impl axum::response::IntoResponse for UploadError {
    fn into_response(self) -> axum::response::Response {
        match self {
            UploadError::Api(err) => err.into_response(),
            UploadError::Degraded => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(DegradedBody { retry_after: DEGRADED_RETRY_AFTER_SECONDS })).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_magic_bytes_are_recognized() {
        assert!(b"%PDF-1.7 rest of file".starts_with(PDF_MAGIC));
        assert!(!b"not a pdf".starts_with(PDF_MAGIC));
    }
}
