// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure layer
//!
//! Adapters implementing the domain's port traits, the embedded `sled`
//! repositories, metrics/logging setup, and the runtime state (circuit
//! breakers, transactions, progress bus) the composition root owns.

pub mod adapters;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod repositories;
pub mod runtime;

use manual_bridge_domain::error::PipelineError;

/// `sled::Error` lives in a foreign crate and `PipelineError` in another, so
/// every embedded-storage adapter maps through this helper instead of a
/// blanket `From` impl (which the orphan rules forbid here anyway).
pub(crate) fn sled_err(err: sled::Error) -> PipelineError {
    PipelineError::Internal(format!("sled: {err}"))
}
