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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// A named state holder guarding calls to one unreliable collaborator (one
/// instance per protected external dependency, e.g. "graph", "text_extractor").
///
/// Transitions: closed -> open at `consecutive_failures >= failure_threshold`;
/// open -> half_open after `cool_down` elapses; half_open -> closed on a probe
/// success; half_open -> open on a probe failure. The breaker never jumps
/// closed -> half_open or open -> closed directly (universal invariant #5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerState {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub opened_at: Option<DateTime<Utc>>,
    pub failure_threshold: u32,
    pub cool_down: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerMetrics {
    pub state: CircuitState,
    pub consecutive_failures: u32,
}

impl CircuitBreakerState {
    pub fn new(name: impl Into<String>, failure_threshold: u32, cool_down: Duration) -> Self {
        Self {
            name: name.into(),
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            failure_threshold,
            cool_down,
        }
    }

    /// Whether a call is currently allowed to pass through. In `half_open`
    /// exactly one probe call is permitted; the caller is responsible for
    /// serializing probes (the infrastructure adapter holds the breaker
    /// behind a mutex and checks-then-calls atomically).
    pub fn allows_call(&mut self) -> Result<(), PipelineError> {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = self
                    .opened_at
                    .map(|at| Utc::now().signed_duration_since(at))
                    .and_then(|d| d.to_std().ok())
                    .unwrap_or_default();
                if elapsed >= self.cool_down {
                    self.state = CircuitState::HalfOpen;
                    Ok(())
                } else {
                    Err(PipelineError::CircuitOpen(self.name.clone()))
                }
            }
        }
    }

    pub fn record_success(&mut self) {
        match self.state {
            CircuitState::HalfOpen => {
                self.state = CircuitState::Closed;
                self.consecutive_failures = 0;
                self.opened_at = None;
            }
            CircuitState::Closed => {
                self.consecutive_failures = 0;
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&mut self) {
        match self.state {
            CircuitState::HalfOpen => {
                self.state = CircuitState::Open;
                self.opened_at = Some(Utc::now());
            }
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.failure_threshold {
                    self.state = CircuitState::Open;
                    self.opened_at = Some(Utc::now());
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn metrics(&self) -> CircuitBreakerMetrics {
        CircuitBreakerMetrics {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
        }
    }

    /// Used by recovery's `reset_cb` strategy.
    pub fn force_close(&mut self) {
        self.state = CircuitState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreakerState {
        CircuitBreakerState::new("graph", 5, Duration::from_secs(60))
    }

    #[test]
    fn opens_after_exactly_failure_threshold_consecutive_failures() {
        let mut cb = breaker();
        for _ in 0..4 {
            cb.record_failure();
            assert_eq!(cb.state, CircuitState::Closed);
        }
        cb.record_failure();
        assert_eq!(cb.state, CircuitState::Open);
    }

    #[test]
    fn never_transitions_closed_to_half_open_directly() {
        let mut cb = breaker();
        cb.record_failure();
        assert_eq!(cb.state, CircuitState::Closed);
        // allows_call from closed stays closed regardless of elapsed time.
        cb.allows_call().unwrap();
        assert_eq!(cb.state, CircuitState::Closed);
    }

    #[test]
    fn open_moves_to_half_open_only_after_cool_down_then_closes_on_success() {
        let mut cb = CircuitBreakerState::new("graph", 1, Duration::from_millis(0));
        cb.record_failure();
        assert_eq!(cb.state, CircuitState::Open);
        cb.allows_call().unwrap();
        assert_eq!(cb.state, CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state, CircuitState::Closed);
    }

    #[test]
    fn half_open_probe_failure_reopens() {
        let mut cb = CircuitBreakerState::new("graph", 1, Duration::from_millis(0));
        cb.record_failure();
        cb.allows_call().unwrap();
        cb.record_failure();
        assert_eq!(cb.state, CircuitState::Open);
    }
}
