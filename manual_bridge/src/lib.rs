// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Manual Bridge
//!
//! Application, infrastructure, and presentation layers for the QSR
//! equipment-manual ingestion-and-bridge pipeline. The domain layer
//! ([`manual_bridge_domain`]) holds every pure rule; this crate wires those
//! rules to an embedded [`sled`] graph store, heuristic extractor adapters,
//! an axum HTTP/WS surface, and the background loops that drive recovery,
//! degradation, and optimization.
//!
//! ## Module structure
//!
//! - [`context`] - `AppContext`, the composition root every layer is handed.
//! - [`application`] - use cases and application services.
//! - [`infrastructure`] - adapters, embedded repositories, runtime state.
//! - [`presentation`] - the HTTP/WS surface.

pub mod application;
pub mod context;
pub mod infrastructure;
pub mod presentation;

pub use context::AppContext;
pub use manual_bridge_domain::{
    AlertId, AuditEventId, ChangeId, CitationId, DlqRecordId, PipelineError, Process, ProcessId, QsrEntity,
    QsrType, RecoveryExecutionId, Relationship, Stage, TxnId, VisualCitation,
};
