// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Recovery controller (C10)
//!
//! Subscribes to health signals (conceptually; the actual subscription lives
//! in the application layer's health-to-recovery glue). This module is the
//! pure part: the failure-type to strategy-order table, the cooldown/
//! in-flight bookkeeping, and the force_complete gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::ids::RecoveryExecutionId;
use crate::value_objects::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    StuckTextExtraction,
    StuckEntityExtraction,
    StuckGraphWrite,
    MemoryExhaustion,
    ConnectionFailure,
    ProcessingTimeout,
    CbOpenTooLong,
    StuckTransaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStrategy {
    RetryStage,
    ClearMemory,
    RestartProcess,
    ResetCb,
    ResetConnection,
    ForceComplete,
    RollbackTxn,
    Escalate,
}

impl FailureType {
    /// Strategy order table (§4.10); every list ends in `Escalate`.
    pub fn strategy_order(self) -> &'static [RecoveryStrategy] {
        use RecoveryStrategy::*;
        match self {
            FailureType::StuckTextExtraction => &[RetryStage, ClearMemory, RestartProcess, Escalate],
            FailureType::StuckEntityExtraction => &[RetryStage, ClearMemory, ForceComplete, Escalate],
            FailureType::StuckGraphWrite => &[ResetCb, ResetConnection, RetryStage, Escalate],
            FailureType::MemoryExhaustion => &[ClearMemory, RestartProcess, Escalate],
            FailureType::ConnectionFailure => &[ResetConnection, ResetCb, RetryStage, Escalate],
            FailureType::ProcessingTimeout => &[RetryStage, ForceComplete, Escalate],
            FailureType::CbOpenTooLong => &[ResetCb, ResetConnection, Escalate],
            FailureType::StuckTransaction => &[RollbackTxn, RetryStage, Escalate],
        }
    }

    /// The stage a `ForceComplete` strategy would act on for this failure
    /// type, if any is implied by the name; callers that already know the
    /// concrete stuck stage should gate on [`Stage::allows_force_complete`]
    /// directly instead.
    pub fn implied_stage(self) -> Option<Stage> {
        match self {
            FailureType::StuckTextExtraction => Some(Stage::TextExtraction),
            FailureType::StuckEntityExtraction => Some(Stage::EntityExtraction),
            FailureType::StuckGraphWrite => Some(Stage::GraphWrite),
            _ => None,
        }
    }
}

/// Cooldown defaults (§4.10): at most 3 recovery attempts per failure_type in
/// a 10-minute sliding window.
pub const MAX_ATTEMPTS_PER_WINDOW: u32 = 3;
pub const COOLDOWN_WINDOW: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryOutcome {
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryExecution {
    pub id: RecoveryExecutionId,
    pub failure_type: FailureType,
    pub target: String,
    pub strategy: RecoveryStrategy,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub outcome: Option<RecoveryOutcome>,
}

impl RecoveryExecution {
    pub fn start(failure_type: FailureType, target: impl Into<String>, strategy: RecoveryStrategy) -> Self {
        Self {
            id: RecoveryExecutionId::new(),
            failure_type,
            target: target.into(),
            strategy,
            started_at: Utc::now(),
            ended_at: None,
            outcome: None,
        }
    }

    pub fn finish(&mut self, outcome: RecoveryOutcome) {
        self.ended_at = Some(Utc::now());
        self.outcome = Some(outcome);
    }

    pub fn is_in_flight(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Tracks, per (failure_type, target), the currently in-flight execution (if
/// any) and the timestamps of recent attempts for cooldown accounting.
#[derive(Debug, Clone, Default)]
pub struct RecoveryLedger {
    in_flight: HashMap<(FailureType, String), ()>,
    attempt_history: HashMap<(FailureType, String), Vec<DateTime<Utc>>>,
}

impl RecoveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Execution discipline #1: at most one in-flight recovery per
    /// (failure_type, target).
    pub fn is_in_flight(&self, failure_type: FailureType, target: &str) -> bool {
        self.in_flight.contains_key(&(failure_type, target.to_string()))
    }

    pub fn mark_started(&mut self, failure_type: FailureType, target: &str, at: DateTime<Utc>) {
        self.in_flight.insert((failure_type, target.to_string()), ());
        self.attempt_history.entry((failure_type, target.to_string())).or_default().push(at);
    }

    pub fn mark_finished(&mut self, failure_type: FailureType, target: &str) {
        self.in_flight.remove(&(failure_type, target.to_string()));
    }

    /// Execution discipline #2: cooldown after `MAX_ATTEMPTS_PER_WINDOW`
    /// attempts for this failure_type within `COOLDOWN_WINDOW`, regardless of
    /// target, per §4.10's "per failure_type in a window" wording.
    pub fn is_in_cooldown(&self, failure_type: FailureType, now: DateTime<Utc>) -> bool {
        let window_start = now - chrono::Duration::from_std(COOLDOWN_WINDOW).unwrap();
        let count: usize = self
            .attempt_history
            .iter()
            .filter(|((ft, _), _)| *ft == failure_type)
            .flat_map(|(_, ts)| ts.iter())
            .filter(|&&t| t >= window_start)
            .count();
        count >= MAX_ATTEMPTS_PER_WINDOW as usize
    }

    /// Decides the next strategy to try for this failure: the first strategy
    /// in the declared order not yet attempted in `already_tried`, or
    /// `Escalate` once cooldown is exhausted or the list runs out.
    pub fn next_strategy(&self, failure_type: FailureType, already_tried: &[RecoveryStrategy], now: DateTime<Utc>) -> RecoveryStrategy {
        if self.is_in_cooldown(failure_type, now) {
            return RecoveryStrategy::Escalate;
        }
        failure_type
            .strategy_order()
            .iter()
            .find(|s| !already_tried.contains(s))
            .copied()
            .unwrap_or(RecoveryStrategy::Escalate)
    }
}

/// Whether `ForceComplete` may be used for a stuck stage. §4.10: never used
/// for graph_write or integrity_check, delegated to the stage's own rule.
pub fn force_complete_allowed(stage: Stage) -> bool {
    stage.allows_force_complete()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_strategy_list_ends_in_escalate() {
        for ft in [
            FailureType::StuckTextExtraction,
            FailureType::StuckEntityExtraction,
            FailureType::StuckGraphWrite,
            FailureType::MemoryExhaustion,
            FailureType::ConnectionFailure,
            FailureType::ProcessingTimeout,
            FailureType::CbOpenTooLong,
            FailureType::StuckTransaction,
        ] {
            assert_eq!(*ft.strategy_order().last().unwrap(), RecoveryStrategy::Escalate);
        }
    }

    #[test]
    fn graph_write_force_complete_is_never_allowed() {
        assert!(!force_complete_allowed(Stage::GraphWrite));
    }

    #[test]
    fn cooldown_triggers_after_max_attempts_in_window() {
        let mut ledger = RecoveryLedger::new();
        let now = Utc::now();
        for _ in 0..MAX_ATTEMPTS_PER_WINDOW {
            ledger.mark_started(FailureType::ConnectionFailure, "graph", now);
            ledger.mark_finished(FailureType::ConnectionFailure, "graph");
        }
        assert!(ledger.is_in_cooldown(FailureType::ConnectionFailure, now));
    }

    #[test]
    fn in_flight_blocks_a_second_concurrent_attempt() {
        let mut ledger = RecoveryLedger::new();
        let now = Utc::now();
        ledger.mark_started(FailureType::StuckGraphWrite, "graph", now);
        assert!(ledger.is_in_flight(FailureType::StuckGraphWrite, "graph"));
        ledger.mark_finished(FailureType::StuckGraphWrite, "graph");
        assert!(!ledger.is_in_flight(FailureType::StuckGraphWrite, "graph"));
    }

    #[test]
    fn next_strategy_walks_the_declared_order() {
        let ledger = RecoveryLedger::new();
        let now = Utc::now();
        let first = ledger.next_strategy(FailureType::StuckGraphWrite, &[], now);
        assert_eq!(first, RecoveryStrategy::ResetCb);
        let second = ledger.next_strategy(FailureType::StuckGraphWrite, &[RecoveryStrategy::ResetCb], now);
        assert_eq!(second, RecoveryStrategy::ResetConnection);
    }
}
