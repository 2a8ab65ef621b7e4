// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Progress reporting (C3) - wire types
//!
//! The typed replacement for the source's ad-hoc progress-callback dicts
//! (§9): a single struct matching the §6 wire format, shared verbatim by the
//! WS push and the `/status` polling endpoint. The broadcast channel and
//! subscriber lifecycle live in the application layer.

use serde::{Deserialize, Serialize};

use crate::ids::ProcessId;
use crate::value_objects::Stage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessSummary {
    pub total_entities: u64,
    pub total_relationships: u64,
}

/// One progress frame. Percent is monotonic within a stage window; a stage
/// transition resets percent to that stage's lower bound (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub process_id: ProcessId,
    pub stage: Stage,
    pub percent: u8,
    pub message: String,
    pub entities_found: u64,
    pub relationships_found: u64,
    pub elapsed_seconds: f64,
    pub eta_seconds: Option<f64>,
    pub terminal: bool,
    pub error: Option<String>,
    pub success_summary: Option<SuccessSummary>,
}

impl ProgressUpdate {
    pub fn in_progress(process_id: ProcessId, stage: Stage, percent: u8, message: impl Into<String>, elapsed_seconds: f64) -> Self {
        Self {
            process_id,
            stage,
            percent: percent.min(100),
            message: message.into(),
            entities_found: 0,
            relationships_found: 0,
            elapsed_seconds,
            eta_seconds: None,
            terminal: false,
            error: None,
            success_summary: None,
        }
    }

    pub fn terminal_success(process_id: ProcessId, elapsed_seconds: f64, summary: SuccessSummary) -> Self {
        Self {
            process_id,
            stage: Stage::Finalization,
            percent: 100,
            message: "complete".to_string(),
            entities_found: summary.total_entities,
            relationships_found: summary.total_relationships,
            elapsed_seconds,
            eta_seconds: Some(0.0),
            terminal: true,
            error: None,
            success_summary: Some(summary),
        }
    }

    pub fn terminal_failure(process_id: ProcessId, stage: Stage, elapsed_seconds: f64, error: impl Into<String>) -> Self {
        Self {
            process_id,
            stage,
            percent: 100,
            message: "failed".to_string(),
            entities_found: 0,
            relationships_found: 0,
            elapsed_seconds,
            eta_seconds: Some(0.0),
            terminal: true,
            error: Some(error.into()),
            success_summary: None,
        }
    }
}

/// Ordering key used by subscribers and tests to assert testable property
/// #7: monotonic in (stage-order, percent within stage) until terminal.
pub fn ordering_key(update: &ProgressUpdate) -> (u8, u8) {
    (update.stage.order(), update.percent)
}

/// Checks a full sequence of updates for one process never regresses its
/// ordering key before the terminal update.
pub fn is_monotonic(updates: &[ProgressUpdate]) -> bool {
    let mut last: Option<(u8, u8)> = None;
    for update in updates {
        let key = ordering_key(update);
        if let Some(prev) = last {
            if key < prev {
                return false;
            }
        }
        last = Some(key);
        if update.terminal {
            break;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_transition_resets_percent_but_stage_order_still_advances() {
        let pid = ProcessId::new();
        let updates = vec![
            ProgressUpdate::in_progress(pid, Stage::TextExtraction, 90, "almost done", 1.0),
            ProgressUpdate::in_progress(pid, Stage::EntityExtraction, 0, "starting", 2.0),
        ];
        assert!(is_monotonic(&updates));
    }

    #[test]
    fn regressing_percent_within_the_same_stage_is_not_monotonic() {
        let pid = ProcessId::new();
        let updates = vec![
            ProgressUpdate::in_progress(pid, Stage::TextExtraction, 50, "halfway", 1.0),
            ProgressUpdate::in_progress(pid, Stage::TextExtraction, 20, "oops", 2.0),
        ];
        assert!(!is_monotonic(&updates));
    }

    #[test]
    fn terminal_success_reports_full_percent() {
        let pid = ProcessId::new();
        let update = ProgressUpdate::terminal_success(pid, 12.5, SuccessSummary { total_entities: 2, total_relationships: 1 });
        assert_eq!(update.percent, 100);
        assert!(update.terminal);
    }
}
