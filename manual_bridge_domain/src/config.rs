// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration (C13)
//!
//! The typed config tree matching the §6 config-keys table, per-environment
//! defaults, and the append-only change log record. Snapshot/watch wiring
//! (the `arc-swap` read side and the callback registry) lives in the
//! application layer; this module owns the schema and validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::ids::ChangeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
    Testing,
}

impl Environment {
    /// Parses `DEPLOYMENT_ENV`, falling back to hostname pattern matching
    /// (`*prod*`, `*stage*`, `*test*`) per §6, and finally `Development`.
    pub fn resolve(deployment_env: Option<&str>, hostname: Option<&str>) -> Environment {
        if let Some(env) = deployment_env {
            if let Ok(parsed) = env.parse() {
                return parsed;
            }
        }
        if let Some(host) = hostname {
            let host = host.to_lowercase();
            if host.contains("prod") {
                return Environment::Production;
            }
            if host.contains("stage") {
                return Environment::Staging;
            }
            if host.contains("test") {
                return Environment::Testing;
            }
        }
        Environment::Development
    }
}

impl std::str::FromStr for Environment {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            "testing" => Ok(Environment::Testing),
            other => Err(PipelineError::invalid_config(format!("unknown environment: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub batch_size: u32,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub concurrent_processes: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub connection_pool_size: u32,
    pub query_timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AlertThreshold {
    pub warn: f64,
    pub crit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub metrics_collection_interval_seconds: u64,
    pub alert_thresholds: std::collections::BTreeMap<String, AlertThreshold>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DegradationConfig {
    pub queue_mode_threshold_seconds: u64,
    pub memory_threshold_percent: f64,
    pub auto_recovery: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub audit_logging: bool,
    pub data_sanitization: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub processing: ProcessingConfig,
    pub database: DatabaseConfig,
    pub monitoring: MonitoringConfig,
    pub degradation: DegradationConfig,
    pub security: SecurityConfig,
}

impl AppConfig {
    /// Per-environment defaults; production's are the §6 table values, the
    /// others scale down timeouts/concurrency for local iteration speed.
    pub fn defaults_for(environment: Environment) -> Self {
        let mut cfg = Self {
            environment,
            processing: ProcessingConfig {
                batch_size: 3,
                timeout_seconds: 900,
                retry_attempts: 5,
                concurrent_processes: 5,
            },
            database: DatabaseConfig {
                connection_pool_size: 10,
                query_timeout_seconds: 60,
            },
            monitoring: MonitoringConfig {
                metrics_collection_interval_seconds: 15,
                alert_thresholds: std::collections::BTreeMap::new(),
            },
            degradation: DegradationConfig {
                queue_mode_threshold_seconds: 120,
                memory_threshold_percent: 70.0,
                auto_recovery: true,
            },
            security: SecurityConfig {
                audit_logging: true,
                data_sanitization: true,
            },
        };
        match environment {
            Environment::Production => {}
            Environment::Staging => {
                cfg.processing.concurrent_processes = 3;
            }
            Environment::Development | Environment::Testing => {
                cfg.processing.concurrent_processes = 2;
                cfg.processing.timeout_seconds = 120;
                cfg.security.audit_logging = false;
            }
        }
        cfg
    }

    /// Schema validation run on load and on every `Set`: the invariants a
    /// config value must hold regardless of environment.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.processing.batch_size == 0 {
            return Err(PipelineError::invalid_config("processing.batch_size must be > 0"));
        }
        if self.processing.concurrent_processes == 0 {
            return Err(PipelineError::invalid_config("processing.concurrent_processes must be > 0"));
        }
        if self.database.connection_pool_size == 0 {
            return Err(PipelineError::invalid_config("database.connection_pool_size must be > 0"));
        }
        if !(0.0..=100.0).contains(&self.degradation.memory_threshold_percent) {
            return Err(PipelineError::invalid_config("degradation.memory_threshold must be a percentage"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigChange {
    pub id: ChangeId,
    pub path: String,
    pub previous_value: serde_json::Value,
    pub new_value: serde_json::Value,
    pub actor: String,
    pub at: DateTime<Utc>,
}

impl ConfigChange {
    pub fn new(path: impl Into<String>, previous_value: serde_json::Value, new_value: serde_json::Value, actor: impl Into<String>) -> Self {
        Self {
            id: ChangeId::new(),
            path: path.into(),
            previous_value,
            new_value,
            actor: actor.into(),
            at: Utc::now(),
        }
    }

    /// Watchers only re-fire on an actual value change (§4.13).
    pub fn is_noop(&self) -> bool {
        self.previous_value == self.new_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_defaults_match_spec_table() {
        let cfg = AppConfig::defaults_for(Environment::Production);
        assert_eq!(cfg.processing.batch_size, 3);
        assert_eq!(cfg.processing.concurrent_processes, 5);
        assert_eq!(cfg.database.connection_pool_size, 10);
        assert_eq!(cfg.degradation.queue_mode_threshold_seconds, 120);
    }

    #[test]
    fn zero_batch_size_fails_validation() {
        let mut cfg = AppConfig::defaults_for(Environment::Production);
        cfg.processing.batch_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn environment_resolution_falls_back_to_hostname_pattern() {
        assert_eq!(Environment::resolve(None, Some("web-prod-03")), Environment::Production);
        assert_eq!(Environment::resolve(None, None), Environment::Development);
    }

    #[test]
    fn unchanged_value_is_a_noop_change() {
        let change = ConfigChange::new("processing.batch_size", serde_json::json!(3), serde_json::json!(3), "admin");
        assert!(change.is_noop());
    }
}
