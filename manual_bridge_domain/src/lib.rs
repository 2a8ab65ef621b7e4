// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Manual Bridge Domain
//!
//! The domain layer for the QSR equipment-manual ingestion-and-bridge
//! pipeline. It implements Domain-Driven Design patterns and is independent
//! of external concerns like the HTTP surface, the embedded graph store, or
//! any particular extractor backend.
//!
//! ## Module structure
//!
//! - [`ids`] - phantom-typed ULID identifiers, one newtype per entity kind.
//! - [`error`] - the single `PipelineError` hierarchy threaded end to end.
//! - [`value_objects`] - `Stage`, `QsrType`: immutable, self-validating concepts.
//! - [`entities`] - `Process`, `QsrEntity`, `Relationship`, `VisualCitation`:
//!   objects with identity that persist through state changes.
//! - [`reliability`] - the circuit breaker, dead-letter queue, and saga
//!   transaction manager (C1).
//! - [`dedup`] - the deduplication engine (C6).
//! - [`preservation`] - pure visual-citation preservation decisions (C7).
//! - [`integrity`] - the post-bridge integrity check suite (C8).
//! - [`health`] - metric sampling, thresholds, and alerts (C9).
//! - [`recovery`] - the failure-type to strategy-order table (C10).
//! - [`degradation`] - the global mode selector (C11).
//! - [`optimization`] - the parameter-tuning loop's pure statistics (C12).
//! - [`config`] and [`audit`] - the typed config tree and the sanitized
//!   audit log (C13).
//! - [`progress`] - the progress-update wire type (C3).
//! - [`repositories`] - the trait boundaries the application layer implements.

pub mod audit;
pub mod config;
pub mod dedup;
pub mod degradation;
pub mod entities;
pub mod error;
pub mod health;
pub mod ids;
pub mod integrity;
pub mod optimization;
pub mod preservation;
pub mod progress;
pub mod recovery;
pub mod reliability;
pub mod repositories;
pub mod value_objects;

pub use entities::{Process, QsrEntity, Relationship, VisualCitation};
pub use error::PipelineError;
pub use ids::{AlertId, AuditEventId, ChangeId, CitationId, DlqRecordId, ProcessId, RecoveryExecutionId, TxnId};
pub use value_objects::{QsrType, Stage};
