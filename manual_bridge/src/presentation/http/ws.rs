// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `WS /progress/{process_id}` (§6): pushes the current snapshot first, then
//! live updates, and closes once a terminal update has been sent -
//! `ProgressBus`'s own contract (§4.3), this handler just drives it.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use manual_bridge_domain::ids::ProcessId;
use manual_bridge_domain::progress::ProgressUpdate;

use crate::application::use_cases::manage_process;
use crate::context::AppContext;

pub async fn progress_ws(State(app): State<AppContext>, Path(process_id): Path<String>, upgrade: WebSocketUpgrade) -> Response {
    let Ok(process_id) = process_id.parse::<ProcessId>() else {
        return axum::http::StatusCode::NOT_FOUND.into_response();
    };
    upgrade.on_upgrade(move |socket| stream_progress(app, process_id, socket))
}

async fn stream_progress(app: AppContext, process_id: ProcessId, mut socket: WebSocket) {
    let mut receiver = manage_process::subscribe_progress(&app, process_id);

    if let Some(snapshot) = app.progress_bus.snapshot(process_id) {
        if send_update(&mut socket, &snapshot).await.is_err() {
            return;
        }
        if snapshot.terminal {
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    }

    loop {
        match receiver.recv().await {
            Ok(update) => {
                let terminal = update.terminal;
                if send_update(&mut socket, &update).await.is_err() {
                    break;
                }
                if terminal {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(process_id = %process_id, skipped, "progress subscriber lagged, resubscribing at head");
                continue;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn send_update(socket: &mut WebSocket, update: &ProgressUpdate) -> Result<(), axum::Error> {
    let body = serde_json::to_string(update).unwrap_or_default();
    socket.send(Message::Text(body.into())).await
}
