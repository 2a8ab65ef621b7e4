// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logging
//!
//! Initializes the global `tracing` subscriber once, at `serve` startup.
//! JSON output in production/staging, human-readable in development and
//! testing, matching the teacher crate's `tracing_subscriber::FmtSubscriber`
//! wiring in its own `main.rs`.

use manual_bridge_bootstrap::config::LogLevel;
use manual_bridge_domain::config::Environment;

/// Installs the global subscriber. Safe to call at most once per process;
/// `serve` is the only long-running command, so `main.rs` calls this exactly
/// once before entering the axum server.
pub fn init(log_level: LogLevel, environment: Environment) {
    let level = log_level.to_tracing_level();
    let use_json = matches!(environment, Environment::Production | Environment::Staging);

    let subscriber = tracing_subscriber::fmt().with_max_level(level).with_target(true);

    if use_json {
        subscriber.json().init();
    } else {
        subscriber.pretty().init();
    }
}
