// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Health monitor (C9)
//!
//! Pure sampling and threshold-evaluation logic. The actual periodic
//! sampling loop and ring-buffer storage live in the infrastructure layer;
//! this module defines what a sample is, how a threshold breach is decided,
//! and how component/overall health is aggregated from breaches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use crate::ids::AlertId;

/// The fixed set of metrics C9 samples (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    ProcessingTimeAvg,
    SuccessRate,
    GraphResponseTime,
    GraphCbState,
    MemoryPercent,
    QueueDepth,
    ActiveProcesses,
    StuckFilesCount,
    ErrorRate,
    Throughput,
}

impl MetricName {
    /// Default sampling interval, within the 30-120s range named in §4.9.
    pub fn default_interval(self) -> Duration {
        match self {
            MetricName::ProcessingTimeAvg => Duration::from_secs(60),
            MetricName::SuccessRate => Duration::from_secs(60),
            MetricName::GraphResponseTime => Duration::from_secs(30),
            MetricName::GraphCbState => Duration::from_secs(30),
            MetricName::MemoryPercent => Duration::from_secs(30),
            MetricName::QueueDepth => Duration::from_secs(30),
            MetricName::ActiveProcesses => Duration::from_secs(60),
            MetricName::StuckFilesCount => Duration::from_secs(120),
            MetricName::ErrorRate => Duration::from_secs(60),
            MetricName::Throughput => Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricSample {
    pub metric: MetricName,
    pub value: f64,
    pub sampled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdDirection {
    /// Breach when the sampled value is >= the threshold (e.g. memory_percent).
    Above,
    /// Breach when the sampled value is <= the threshold (e.g. success_rate).
    Below,
}

/// One configured threshold for one metric, owned by a named component
/// (`graph`, `pipeline`, `bridge`, ...) for the purpose of health-level
/// attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threshold {
    pub metric: MetricName,
    pub component: String,
    pub direction: ThresholdDirection,
    pub warning: f64,
    pub critical: f64,
    /// Minimum sustained duration before the breach counts (§4.9).
    pub min_duration: Duration,
}

impl Threshold {
    /// Number of consecutive breaching samples required, given the metric's
    /// sampling interval: `ceil(min_duration / interval)`.
    pub fn required_consecutive_samples(&self) -> u32 {
        let interval = self.metric.default_interval().as_secs_f64().max(1.0);
        let duration = self.min_duration.as_secs_f64();
        (duration / interval).ceil().max(1.0) as u32
    }

    fn breaches(&self, value: f64, level: HealthLevel) -> bool {
        let bound = match level {
            HealthLevel::Critical => self.critical,
            _ => self.warning,
        };
        match self.direction {
            ThresholdDirection::Above => value >= bound,
            ThresholdDirection::Below => value <= bound,
        }
    }

    /// Evaluates the threshold against the most recent samples for this
    /// metric (newest last). Returns the breached level, if the trailing
    /// `required_consecutive_samples()` samples all breach at that level.
    pub fn evaluate(&self, recent_samples: &[f64]) -> Option<HealthLevel> {
        let n = self.required_consecutive_samples() as usize;
        if recent_samples.len() < n {
            return None;
        }
        let tail = &recent_samples[recent_samples.len() - n..];
        if tail.iter().all(|&v| self.breaches(v, HealthLevel::Critical)) {
            Some(HealthLevel::Critical)
        } else if tail.iter().all(|&v| self.breaches(v, HealthLevel::Warning)) {
            Some(HealthLevel::Warning)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub component: String,
    pub metric: MetricName,
    pub level: HealthLevel,
    pub message: String,
    pub raised_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn raise(component: impl Into<String>, metric: MetricName, level: HealthLevel, message: impl Into<String>) -> Self {
        Self {
            id: AlertId::new(),
            component: component.into(),
            metric,
            level,
            message: message.into(),
            raised_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.resolved_at.is_none()
    }
}

/// Number of consecutive healthy samples required before an active alert is
/// auto-resolved, symmetric with the breach-confirmation window.
pub const ALERT_RESOLUTION_SAMPLES: u32 = 3;

/// Decides whether a run of recent samples (newest last) justifies resolving
/// an active alert: the trailing `ALERT_RESOLUTION_SAMPLES` must all be clear
/// of even the warning bound.
pub fn should_resolve(threshold: &Threshold, recent_samples: &[f64]) -> bool {
    let n = ALERT_RESOLUTION_SAMPLES as usize;
    if recent_samples.len() < n {
        return false;
    }
    let tail = &recent_samples[recent_samples.len() - n..];
    tail.iter().all(|&v| !threshold.breaches(v, HealthLevel::Warning))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StuckFile {
    pub process_id: String,
    pub stage: String,
    pub elapsed: Duration,
}

/// A bounded ring of recent samples for one metric, oldest evicted first.
#[derive(Debug, Clone)]
pub struct MetricRingBuffer {
    capacity: usize,
    samples: VecDeque<MetricSample>,
}

impl MetricRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, samples: VecDeque::with_capacity(capacity) }
    }

    pub fn push(&mut self, sample: MetricSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }
}

/// Worst-of aggregation across component health levels (§4.9: "overall
/// system health = worst component health").
pub fn overall_health<'a>(component_levels: impl IntoIterator<Item = &'a HealthLevel>) -> HealthLevel {
    component_levels.into_iter().copied().max().unwrap_or(HealthLevel::Healthy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cb_threshold() -> Threshold {
        Threshold {
            metric: MetricName::MemoryPercent,
            component: "pipeline".into(),
            direction: ThresholdDirection::Above,
            warning: 80.0,
            critical: 90.0,
            min_duration: Duration::from_secs(60),
        }
    }

    #[test]
    fn requires_ceil_duration_over_interval_consecutive_breaches() {
        let t = cb_threshold();
        assert_eq!(t.required_consecutive_samples(), 2);
        assert!(t.evaluate(&[95.0]).is_none());
        assert_eq!(t.evaluate(&[95.0, 95.0]), Some(HealthLevel::Critical));
    }

    #[test]
    fn single_good_sample_in_tail_blocks_breach() {
        let t = cb_threshold();
        assert!(t.evaluate(&[95.0, 50.0]).is_none());
    }

    #[test]
    fn warning_level_below_critical_bound() {
        let t = cb_threshold();
        assert_eq!(t.evaluate(&[82.0, 82.0]), Some(HealthLevel::Warning));
    }

    #[test]
    fn overall_health_is_the_worst_component() {
        let levels = vec![HealthLevel::Healthy, HealthLevel::Warning, HealthLevel::Healthy];
        assert_eq!(overall_health(&levels), HealthLevel::Warning);
    }

    #[test]
    fn resolution_requires_three_clear_samples() {
        let t = cb_threshold();
        assert!(!should_resolve(&t, &[10.0, 10.0]));
        assert!(should_resolve(&t, &[10.0, 10.0, 10.0]));
    }
}
