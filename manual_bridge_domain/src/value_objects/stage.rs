// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The ordered stages of the ingestion pipeline's per-document state machine.
///
/// Ordering matters: [`Stage::order`] is used by the cancellation/ordering
/// invariants in the pipeline and by `validate_stage_ordering`-style checks
/// carried over from the stage-executor contract this domain descends from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    TextExtraction,
    EntityExtraction,
    Deduplication,
    VisualCitation,
    GraphWrite,
    IntegrityCheck,
    Finalization,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Validation,
        Stage::TextExtraction,
        Stage::EntityExtraction,
        Stage::Deduplication,
        Stage::VisualCitation,
        Stage::GraphWrite,
        Stage::IntegrityCheck,
        Stage::Finalization,
    ];

    pub fn order(self) -> u8 {
        match self {
            Stage::Validation => 0,
            Stage::TextExtraction => 1,
            Stage::EntityExtraction => 2,
            Stage::Deduplication => 3,
            Stage::VisualCitation => 4,
            Stage::GraphWrite => 5,
            Stage::IntegrityCheck => 6,
            Stage::Finalization => 7,
        }
    }

    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self.order() as usize + 1).copied()
    }

    /// Default soft timeout for one run of this stage (`processing.timeout_seconds`
    /// scales these via the config layer; these are the unscaled base values).
    pub fn default_timeout(self) -> Duration {
        match self {
            Stage::Validation => Duration::from_secs(30),
            Stage::TextExtraction => Duration::from_secs(300),
            Stage::EntityExtraction => Duration::from_secs(900),
            Stage::Deduplication => Duration::from_secs(60),
            Stage::VisualCitation => Duration::from_secs(300),
            Stage::GraphWrite => Duration::from_secs(180),
            Stage::IntegrityCheck => Duration::from_secs(60),
            Stage::Finalization => Duration::from_secs(10),
        }
    }

    /// Elapsed time in this stage beyond which the health monitor emits a
    /// `stuck_file` entry (§4.9 defaults).
    pub fn stuck_threshold(self) -> Duration {
        match self {
            Stage::Validation => Duration::from_secs(5 * 60),
            Stage::TextExtraction => Duration::from_secs(10 * 60),
            Stage::EntityExtraction => Duration::from_secs(30 * 60),
            Stage::GraphWrite => Duration::from_secs(15 * 60),
            _ => Duration::from_secs(10 * 60),
        }
    }

    /// `force_complete` is a permitted recovery strategy for most stuck
    /// stages, but this spec forbids it here unconditionally.
    pub fn allows_force_complete(self) -> bool {
        !matches!(self, Stage::GraphWrite | Stage::IntegrityCheck)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Validation => "validation",
            Stage::TextExtraction => "text_extraction",
            Stage::EntityExtraction => "entity_extraction",
            Stage::Deduplication => "deduplication",
            Stage::VisualCitation => "visual_citation",
            Stage::GraphWrite => "graph_write",
            Stage::IntegrityCheck => "integrity_check",
            Stage::Finalization => "finalization",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_write_and_integrity_check_never_allow_force_complete() {
        assert!(!Stage::GraphWrite.allows_force_complete());
        assert!(!Stage::IntegrityCheck.allows_force_complete());
        assert!(Stage::TextExtraction.allows_force_complete());
    }

    #[test]
    fn next_walks_in_declared_order() {
        assert_eq!(Stage::Validation.next(), Some(Stage::TextExtraction));
        assert_eq!(Stage::Finalization.next(), None);
    }
}
