// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `GET /health` and `GET /metrics` (§6). `/health` recomputes a rollup
//! on demand from the live circuit breakers, degradation mode, and DLQ
//! depth, independent of `application::services::monitoring_loops`'s own
//! sampling history - an operator hitting `/health` gets the current state,
//! not whatever the last 30s sample happened to be.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use manual_bridge_domain::degradation::DegradationMode;
use manual_bridge_domain::health::{overall_health, HealthLevel};
use manual_bridge_domain::reliability::CircuitState;

use crate::context::AppContext;
use crate::presentation::http::state::ApiError;

#[derive(Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub circuit_state: CircuitState,
    pub level: HealthLevel,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub overall: HealthLevel,
    pub degradation_mode: DegradationMode,
    pub active_processes: usize,
    pub dlq_depth: usize,
    pub components: Vec<ComponentHealth>,
}

fn level_for(state: CircuitState) -> HealthLevel {
    match state {
        CircuitState::Closed => HealthLevel::Healthy,
        CircuitState::HalfOpen => HealthLevel::Warning,
        CircuitState::Open => HealthLevel::Critical,
    }
}

pub async fn health(State(app): State<AppContext>) -> Result<Json<HealthResponse>, ApiError> {
    let components: Vec<ComponentHealth> = app
        .breakers
        .names()
        .into_iter()
        .filter_map(|name| {
            app.breakers.state(name).map(|state| ComponentHealth {
                name: name.to_string(),
                circuit_state: state,
                level: level_for(state),
            })
        })
        .collect();

    let levels: Vec<HealthLevel> = components.iter().map(|c| c.level).collect();
    let dlq_depth = app.dlq_store.list()?.len();

    Ok(Json(HealthResponse {
        overall: overall_health(&levels),
        degradation_mode: app.degradation_snapshot(),
        active_processes: app.processes.len(),
        dlq_depth,
        components,
    }))
}

pub async fn metrics(State(app): State<AppContext>) -> Result<String, ApiError> {
    Ok(app.metrics.render()?)
}
