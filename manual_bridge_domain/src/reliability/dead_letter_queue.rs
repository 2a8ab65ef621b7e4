// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PipelineError;
use crate::ids::DlqRecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DlqClassification {
    Retryable,
    ManualReview,
}

/// Exponential backoff policy for retryable DLQ records (§4.1): base 2s, cap
/// 5 minutes, jitter +/-20%, max 5 attempts.
pub const DLQ_BASE_BACKOFF: Duration = Duration::from_secs(2);
pub const DLQ_MAX_BACKOFF: Duration = Duration::from_secs(5 * 60);
pub const DLQ_MAX_ATTEMPTS: u32 = 5;

/// A failed operation awaiting retry or manual review. Classification is
/// decided once, at enqueue time, from the triggering [`PipelineError`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedOperation {
    pub id: DlqRecordId,
    pub op_kind: String,
    pub payload: serde_json::Value,
    pub error_summary: String,
    pub first_failed_at: DateTime<Utc>,
    pub attempts: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub classification: DlqClassification,
}

impl FailedOperation {
    pub fn enqueue(op_kind: impl Into<String>, payload: serde_json::Value, error: &PipelineError) -> Self {
        let classification = if error.is_transient() {
            DlqClassification::Retryable
        } else {
            DlqClassification::ManualReview
        };
        let now = Utc::now();
        let next_retry_at = match classification {
            DlqClassification::Retryable => Some(now + chrono::Duration::from_std(DLQ_BASE_BACKOFF).unwrap()),
            DlqClassification::ManualReview => None,
        };
        Self {
            id: DlqRecordId::new(),
            op_kind: op_kind.into(),
            payload,
            error_summary: error.user_facing_message(),
            first_failed_at: now,
            attempts: 1,
            next_retry_at,
            classification,
        }
    }

    /// Computes the backoff duration before attempt `attempts + 1`, applying
    /// the configured jitter bounds deterministically from a caller-supplied
    /// jitter factor in [-1, 1] rather than sampling randomness here, so the
    /// scheduling policy stays a pure function of state.
    pub fn backoff_for_attempt(attempt: u32, jitter_factor: f64) -> Duration {
        let exp = DLQ_BASE_BACKOFF.as_secs_f64() * 2f64.powi(attempt.saturating_sub(1) as i32);
        let capped = exp.min(DLQ_MAX_BACKOFF.as_secs_f64());
        let jittered = capped * (1.0 + 0.2 * jitter_factor.clamp(-1.0, 1.0));
        Duration::from_secs_f64(jittered.max(0.0))
    }

    /// Records another failed retry attempt; once `DLQ_MAX_ATTEMPTS` is
    /// reached the record stops scheduling further retries and is left for
    /// manual review surfacing via the audit/status interface.
    pub fn record_retry_failure(&mut self, jitter_factor: f64) {
        self.attempts += 1;
        if self.attempts >= DLQ_MAX_ATTEMPTS {
            self.classification = DlqClassification::ManualReview;
            self.next_retry_at = None;
        } else {
            let backoff = Self::backoff_for_attempt(self.attempts, jitter_factor);
            self.next_retry_at = Some(Utc::now() + chrono::Duration::from_std(backoff).unwrap());
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        matches!(self.classification, DlqClassification::Retryable)
            && self.next_retry_at.map(|at| at <= now).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_errors_go_straight_to_manual_review() {
        let op = FailedOperation::enqueue(
            "graph_write",
            serde_json::json!({}),
            &PipelineError::InvalidInput("bad payload".into()),
        );
        assert_eq!(op.classification, DlqClassification::ManualReview);
        assert!(op.next_retry_at.is_none());
    }

    #[test]
    fn transient_errors_are_retryable_with_backoff() {
        let op = FailedOperation::enqueue(
            "graph_write",
            serde_json::json!({}),
            &PipelineError::CircuitOpen("graph".into()),
        );
        assert_eq!(op.classification, DlqClassification::Retryable);
        assert!(op.next_retry_at.is_some());
    }

    #[test]
    fn attempts_never_exceed_max_before_reclassification() {
        let mut op = FailedOperation::enqueue(
            "graph_write",
            serde_json::json!({}),
            &PipelineError::CircuitOpen("graph".into()),
        );
        for _ in 0..10 {
            op.record_retry_failure(0.0);
        }
        assert!(op.attempts <= DLQ_MAX_ATTEMPTS + 1);
        assert_eq!(op.classification, DlqClassification::ManualReview);
    }

    #[test]
    fn backoff_is_capped() {
        let d = FailedOperation::backoff_for_attempt(20, 1.0);
        assert!(d <= DLQ_MAX_BACKOFF + DLQ_MAX_BACKOFF / 5);
    }
}
