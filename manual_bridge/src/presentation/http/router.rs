// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Route table assembly for the §6 external interface. One handler per
//! route, no middleware logic inlined here - that belongs in `tower`/
//! `tower-http` layers.

use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::presentation::http::{documents, health, status, upload, ws};

/// Upper bound on how long a single request is allowed to take. Uploads run
/// in the background (§6 - `/upload` returns `202` immediately), so this
/// only bounds the synchronous handlers, not pipeline processing itself.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn build_router(app: AppContext) -> Router {
    Router::new()
        .route("/upload", post(upload::upload))
        .route("/status/{process_id}", get(status::status))
        .route("/result/{process_id}", get(status::result))
        .route("/progress/{process_id}", get(ws::progress_ws))
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .route("/documents", get(documents::list_documents))
        .route("/documents/{process_id}", get(documents::get_document))
        .route("/documents/{process_id}", delete(documents::delete_document))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CorsLayer::permissive())
        .with_state(app)
}
