// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Degradation manager (C11)
//!
//! Global mode selector. Pure trigger evaluation and mode-effect parameters;
//! the actual redirection of C2 writes to a local queue and the intake
//! gating live in the application/infrastructure layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationMode {
    Normal,
    ReducedPerformance,
    LocalQueue,
    MemoryConstrained,
    SelectiveProcessing,
    Emergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationTrigger {
    GraphCbOpenSustained,
    MemorySustainedHigh,
    ErrorRateSustainedHigh,
    QueueDepthSustainedHigh,
    ProcessingTimeoutRepeat,
}

impl DegradationTrigger {
    /// Trigger -> target mode table (§4.11).
    pub fn target_mode(self) -> DegradationMode {
        match self {
            DegradationTrigger::GraphCbOpenSustained => DegradationMode::LocalQueue,
            DegradationTrigger::MemorySustainedHigh => DegradationMode::MemoryConstrained,
            DegradationTrigger::ErrorRateSustainedHigh => DegradationMode::SelectiveProcessing,
            DegradationTrigger::QueueDepthSustainedHigh => DegradationMode::SelectiveProcessing,
            DegradationTrigger::ProcessingTimeoutRepeat => DegradationMode::ReducedPerformance,
        }
    }
}

/// Minimum sustained duration before a trigger counts as active (§4.11:
/// "open > 5m", "sustained", "repeat").
pub const GRAPH_CB_OPEN_TRIGGER_DURATION: Duration = Duration::from_secs(5 * 60);

/// Auto-recovery threshold: a mode is left only once all of its entry
/// triggers have been clear for at least this long (§4.11).
pub const AUTO_RECOVERY_CLEAR_DURATION: Duration = Duration::from_secs(5 * 60);

/// Given the set of currently-active triggers, decides the target mode:
/// `emergency` once 3 or more triggers are active simultaneously (§4.11),
/// otherwise the single highest-priority active trigger's target, or
/// `normal` if none are active. Ties among non-emergency triggers favor the
/// most severe effect, in the order the table is declared.
pub fn resolve_mode(active_triggers: &[DegradationTrigger]) -> DegradationMode {
    if active_triggers.len() >= 3 {
        return DegradationMode::Emergency;
    }
    const PRIORITY: &[DegradationTrigger] = &[
        DegradationTrigger::GraphCbOpenSustained,
        DegradationTrigger::MemorySustainedHigh,
        DegradationTrigger::ErrorRateSustainedHigh,
        DegradationTrigger::QueueDepthSustainedHigh,
        DegradationTrigger::ProcessingTimeoutRepeat,
    ];
    PRIORITY
        .iter()
        .find(|t| active_triggers.contains(t))
        .map(|t| t.target_mode())
        .unwrap_or(DegradationMode::Normal)
}

/// Concrete effect parameters for a given mode, applied by the application
/// layer against the live config snapshot (§4.11 "Mode effects").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModeEffects {
    pub batch_size_multiplier: f64,
    pub timeout_multiplier: f64,
    pub concurrency_delta: i32,
    pub min_accepted_priority: Priority,
    pub accept_new_uploads: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl DegradationMode {
    pub fn effects(self) -> ModeEffects {
        match self {
            DegradationMode::Normal => ModeEffects {
                batch_size_multiplier: 1.0,
                timeout_multiplier: 1.0,
                concurrency_delta: 0,
                min_accepted_priority: Priority::Low,
                accept_new_uploads: true,
            },
            DegradationMode::ReducedPerformance => ModeEffects {
                batch_size_multiplier: 1.0,
                timeout_multiplier: 1.5,
                concurrency_delta: -1,
                min_accepted_priority: Priority::Low,
                accept_new_uploads: true,
            },
            DegradationMode::LocalQueue => ModeEffects {
                batch_size_multiplier: 1.0,
                timeout_multiplier: 1.0,
                concurrency_delta: 0,
                min_accepted_priority: Priority::Low,
                accept_new_uploads: true,
            },
            DegradationMode::MemoryConstrained => ModeEffects {
                batch_size_multiplier: 0.5,
                timeout_multiplier: 1.0,
                concurrency_delta: 0,
                min_accepted_priority: Priority::Low,
                accept_new_uploads: true,
            },
            DegradationMode::SelectiveProcessing => ModeEffects {
                batch_size_multiplier: 1.0,
                timeout_multiplier: 1.0,
                concurrency_delta: 0,
                min_accepted_priority: Priority::High,
                accept_new_uploads: true,
            },
            DegradationMode::Emergency => ModeEffects {
                batch_size_multiplier: 1.0,
                timeout_multiplier: 1.0,
                concurrency_delta: 0,
                min_accepted_priority: Priority::High,
                accept_new_uploads: false,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradationEvent {
    pub from_mode: DegradationMode,
    pub to_mode: DegradationMode,
    pub triggers: Vec<DegradationTrigger>,
    pub at: DateTime<Utc>,
}

impl DegradationEvent {
    pub fn new(from_mode: DegradationMode, to_mode: DegradationMode, triggers: Vec<DegradationTrigger>) -> Self {
        Self { from_mode, to_mode, triggers, at: Utc::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_simultaneous_triggers_force_emergency() {
        let triggers = vec![
            DegradationTrigger::GraphCbOpenSustained,
            DegradationTrigger::MemorySustainedHigh,
            DegradationTrigger::ErrorRateSustainedHigh,
        ];
        assert_eq!(resolve_mode(&triggers), DegradationMode::Emergency);
    }

    #[test]
    fn single_trigger_maps_to_its_target_mode() {
        assert_eq!(resolve_mode(&[DegradationTrigger::MemorySustainedHigh]), DegradationMode::MemoryConstrained);
    }

    #[test]
    fn no_triggers_is_normal() {
        assert_eq!(resolve_mode(&[]), DegradationMode::Normal);
    }

    #[test]
    fn emergency_stops_new_uploads() {
        assert!(!DegradationMode::Emergency.effects().accept_new_uploads);
        assert!(DegradationMode::LocalQueue.effects().accept_new_uploads);
    }

    #[test]
    fn memory_constrained_halves_batch_size() {
        assert_eq!(DegradationMode::MemoryConstrained.effects().batch_size_multiplier, 0.5);
    }
}
