// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shared HTTP plumbing
//!
//! [`AppContext`] is itself the axum `State`; this module only adds the one
//! thing every handler needs and none of them should reimplement: mapping a
//! [`PipelineError`] to a status code and a sanitized JSON body (§7 -
//! internal detail never reaches the wire, only `user_facing_message()`
//! does).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use manual_bridge_domain::error::PipelineError;

/// Identity of the caller driving a mutating request. Auth/identity is out
/// of scope (§1 Non-goals); every handler that needs an actor string for the
/// audit log uses this constant rather than inventing a per-handler default.
pub const HTTP_ACTOR: &str = "http_api";

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    category: &'static str,
}

pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            PipelineError::LocalQueueFull | PipelineError::BusyRetryLater(_) | PipelineError::CircuitOpen(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PipelineError::Cancelled | PipelineError::Interrupted(_) => StatusCode::CONFLICT,
            PipelineError::InvalidConfiguration(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.user_facing_message(),
            category: self.0.category(),
        };
        (status, Json(body)).into_response()
    }
}
