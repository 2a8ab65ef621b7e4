// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A hierarchical error system for the ingestion-and-bridge pipeline domain. Error
//! kinds are carried end-to-end from a stage failure to the progress bus to the
//! HTTP response, each with a stable category used by the DLQ classifier, the
//! recovery controller, and the audit sanitizer.
//!
//! Transient errors (`Timeout`, `CircuitOpen`, `GraphWriteFailed`) are retried
//! locally and never surface to a caller as terminal unless their retry budget is
//! exhausted. `IntegrityFailed` always implies a saga rollback already happened by
//! the time it is observed outside the bridge.

use thiserror::Error;

/// The single error type threaded through the pipeline, bridge, reliability
/// substrate, and external interfaces.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("circuit '{0}' is open")]
    CircuitOpen(String),

    #[error("graph write failed: {0}")]
    GraphWriteFailed(String),

    #[error("integrity check failed: {0}")]
    IntegrityFailed(String),

    #[error("cancelled")]
    Cancelled,

    #[error("interrupted: {0}")]
    Interrupted(String),

    #[error("local queue full")]
    LocalQueueFull,

    #[error("busy, retry after {0}s")]
    BusyRetryLater(u64),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn extraction_failed(msg: impl Into<String>) -> Self {
        Self::ExtractionFailed(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Whether the local CB/retry/DLQ machinery should keep trying before this
    /// surfaces as a terminal, user-visible failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::Timeout(_) | PipelineError::CircuitOpen(_) | PipelineError::GraphWriteFailed(_)
        )
    }

    /// Stable category used by the DLQ classifier and the audit risk scorer.
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "validation",
            PipelineError::ExtractionFailed(_) => "extraction",
            PipelineError::Timeout(_) => "timeout",
            PipelineError::CircuitOpen(_) => "circuit",
            PipelineError::GraphWriteFailed(_) => "graph",
            PipelineError::IntegrityFailed(_) => "integrity",
            PipelineError::Cancelled => "cancellation",
            PipelineError::Interrupted(_) => "interruption",
            PipelineError::LocalQueueFull => "backpressure",
            PipelineError::BusyRetryLater(_) => "backpressure",
            PipelineError::PermissionDenied(_) => "security",
            PipelineError::InvalidConfiguration(_) => "configuration",
            PipelineError::NotFound(_) => "not_found",
            PipelineError::Internal(_) => "internal",
        }
    }

    /// Classification used when a forward op is enqueued to the dead-letter
    /// queue: transient failures are retried with backoff, structural ones go
    /// straight to manual review.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PipelineError::Timeout(_) | PipelineError::CircuitOpen(_) | PipelineError::GraphWriteFailed(_)
        )
    }

    /// A single sanitized message safe to put in front of an end user. Internal
    /// detail (paths, stack context) never makes it into this string; the audit
    /// sanitizer additionally redacts sensitive patterns in logged payloads.
    pub fn user_facing_message(&self) -> String {
        match self {
            PipelineError::InvalidInput(_) => "the uploaded file could not be accepted".to_string(),
            PipelineError::ExtractionFailed(_) => "document content could not be extracted".to_string(),
            PipelineError::Timeout(_) => "processing took too long and was stopped".to_string(),
            PipelineError::CircuitOpen(name) => format!("{name} is temporarily unavailable"),
            PipelineError::GraphWriteFailed(_) => "the document could not be saved".to_string(),
            PipelineError::IntegrityFailed(_) => "the result failed an internal consistency check".to_string(),
            PipelineError::Cancelled => "processing was cancelled".to_string(),
            PipelineError::Interrupted(_) => "processing was interrupted".to_string(),
            PipelineError::LocalQueueFull => "the system is overloaded, try again later".to_string(),
            PipelineError::BusyRetryLater(_) => "the system is busy, try again later".to_string(),
            PipelineError::PermissionDenied(_) => "permission denied".to_string(),
            PipelineError::InvalidConfiguration(_) => "the system is misconfigured".to_string(),
            PipelineError::NotFound(_) => "not found".to_string(),
            PipelineError::Internal(_) => "an internal error occurred".to_string(),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Internal(format!("io: {err}"))
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Internal(format!("serialization: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_recoverable() {
        assert!(PipelineError::Timeout(std::time::Duration::from_secs(1)).is_recoverable());
        assert!(PipelineError::CircuitOpen("graph".into()).is_recoverable());
        assert!(!PipelineError::InvalidInput("bad".into()).is_recoverable());
    }

    #[test]
    fn category_is_stable_for_dlq_classification() {
        assert_eq!(PipelineError::IntegrityFailed("x".into()).category(), "integrity");
        assert_eq!(PipelineError::LocalQueueFull.category(), "backpressure");
    }

    #[test]
    fn user_facing_message_never_echoes_raw_detail() {
        let err = PipelineError::GraphWriteFailed("connection refused at 10.0.0.5:7687".into());
        assert!(!err.user_facing_message().contains("10.0.0.5"));
    }
}
