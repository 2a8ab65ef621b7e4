// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Optimization engine (C12)
//!
//! Offline-style loop over a rolling analysis window. The statistics
//! (slope, correlation) are computed here as pure functions over a sample
//! series; the scheduling of the 24h window and the 60m before/after
//! monitoring period is the application layer's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ids::ChangeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunableParameter {
    BatchSize,
    ConnectionPoolSize,
    MemoryLimitMb,
    CircuitBreakerThreshold,
}

/// Analysis window defaults (§4.12).
pub const ANALYSIS_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);
pub const MIN_SAMPLES: usize = 10;
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const MAX_PARAMETER_CHANGE_PERCENT: f64 = 0.20;
pub const MONITORING_WINDOW: Duration = Duration::from_secs(60 * 60);
pub const AUTO_REVERT_THRESHOLD: f64 = -0.10;

/// Least-squares slope of `values` sampled at equally-spaced indices, plus
/// the Pearson correlation coefficient of (index, value) used as the
/// proposal's confidence (§4.12: "computes slope and a confidence
/// (|correlation|)").
pub fn slope_and_confidence(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < MIN_SAMPLES {
        return None;
    }
    let n = values.len() as f64;
    let xs: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = values.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(values.iter()) {
        let dx = x - x_mean;
        let dy = y - y_mean;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return Some((0.0, 0.0));
    }
    let slope = cov / var_x;
    let correlation = cov / (var_x.sqrt() * var_y.sqrt());
    Some((slope, correlation.abs()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterChange {
    pub id: ChangeId,
    pub parameter: TunableParameter,
    pub from_value: f64,
    pub to_value: f64,
    pub confidence: f64,
    pub proposed_at: DateTime<Utc>,
    pub applied: bool,
}

impl ParameterChange {
    /// Proposes a change, clamped to `±MAX_PARAMETER_CHANGE_PERCENT` of
    /// `from_value`. Returns `None` if confidence is below threshold.
    pub fn propose(parameter: TunableParameter, from_value: f64, desired_value: f64, confidence: f64) -> Option<Self> {
        if confidence < CONFIDENCE_THRESHOLD {
            return None;
        }
        let max_delta = from_value.abs() * MAX_PARAMETER_CHANGE_PERCENT;
        let delta = (desired_value - from_value).clamp(-max_delta, max_delta);
        Some(Self {
            id: ChangeId::new(),
            parameter,
            from_value,
            to_value: from_value + delta,
            confidence,
            proposed_at: Utc::now(),
            applied: false,
        })
    }
}

/// Weights for the before/after performance comparison (§4.12).
pub struct PerformanceWeights;
impl PerformanceWeights {
    pub const SUCCESS_RATE: f64 = 1.0;
    pub const THROUGHPUT: f64 = 1.0;
    pub const PROCESSING_TIME: f64 = -1.0;
    pub const MEMORY: f64 = -0.5;
    pub const CB_FAILURES: f64 = -0.8;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceSnapshot {
    pub success_rate: f64,
    pub throughput: f64,
    pub processing_time: f64,
    pub memory: f64,
    pub cb_failures: f64,
}

/// Weighted relative change `(after - before) / |before|` per metric, summed
/// with the §4.12 weights. A negative result below `-AUTO_REVERT_THRESHOLD`
/// (i.e. more negative than -10%) means the change regressed and must be
/// reverted.
pub fn weighted_performance_change(before: PerformanceSnapshot, after: PerformanceSnapshot) -> f64 {
    fn rel(before: f64, after: f64) -> f64 {
        if before == 0.0 {
            0.0
        } else {
            (after - before) / before.abs()
        }
    }
    PerformanceWeights::SUCCESS_RATE * rel(before.success_rate, after.success_rate)
        + PerformanceWeights::THROUGHPUT * rel(before.throughput, after.throughput)
        + PerformanceWeights::PROCESSING_TIME * rel(before.processing_time, after.processing_time)
        + PerformanceWeights::MEMORY * rel(before.memory, after.memory)
        + PerformanceWeights::CB_FAILURES * rel(before.cb_failures, after.cb_failures)
}

pub fn should_auto_revert(weighted_change: f64) -> bool {
    weighted_change < AUTO_REVERT_THRESHOLD
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEventKind {
    Proposed,
    Applied,
    Reverted,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationJournalEntry {
    pub change_id: ChangeId,
    pub kind: JournalEventKind,
    pub at: DateTime<Utc>,
    pub detail: String,
}

impl OptimizationJournalEntry {
    pub fn new(change_id: ChangeId, kind: JournalEventKind, detail: impl Into<String>) -> Self {
        Self { change_id, kind, at: Utc::now(), detail: detail.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fewer_than_min_samples_yields_no_confidence() {
        assert!(slope_and_confidence(&[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn perfectly_linear_series_has_confidence_one() {
        let values: Vec<f64> = (0..12).map(|i| i as f64 * 2.0).collect();
        let (slope, confidence) = slope_and_confidence(&values).unwrap();
        assert!((slope - 2.0).abs() < 1e-9);
        assert!((confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn low_confidence_proposal_is_rejected() {
        assert!(ParameterChange::propose(TunableParameter::BatchSize, 100.0, 150.0, 0.5).is_none());
    }

    #[test]
    fn proposal_is_clamped_to_max_change_percent() {
        let change = ParameterChange::propose(TunableParameter::BatchSize, 100.0, 1000.0, 0.9).unwrap();
        assert_eq!(change.to_value, 120.0);
    }

    #[test]
    fn regression_past_threshold_triggers_auto_revert() {
        let before = PerformanceSnapshot { success_rate: 0.99, throughput: 100.0, processing_time: 10.0, memory: 50.0, cb_failures: 0.0 };
        let after = PerformanceSnapshot { success_rate: 0.70, throughput: 60.0, processing_time: 10.0, memory: 50.0, cb_failures: 0.0 };
        let change = weighted_performance_change(before, after);
        assert!(should_auto_revert(change));
    }
}
