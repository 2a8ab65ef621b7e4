// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap-Phase Configuration
//!
//! A small, immutable settings bundle produced from [`crate::cli::ValidatedCli`]
//! before the full layered `AppConfig` (owned by the application crate, see
//! `manual_bridge_domain::config`) is loaded. This is what `logger` and
//! `platform` need to get the process started: a log level, the deployment
//! environment override, and the path to a config file, if any.

use std::path::PathBuf;

use crate::cli::{ValidatedCli, ValidatedCommand};

/// Log level configuration for the bootstrap logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Immutable bootstrap-phase configuration, derived once from the validated
/// CLI arguments.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    app_name: String,
    log_level: LogLevel,
    config_path: Option<PathBuf>,
    env_override: Option<String>,
    verbose: bool,
}

impl BootstrapConfig {
    pub fn from_validated_cli(cli: &ValidatedCli) -> Self {
        let log_level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
        Self {
            app_name: "manual-bridge".to_string(),
            log_level,
            config_path: cli.config.clone(),
            env_override: cli.env.clone(),
            verbose: cli.verbose,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }

    pub fn env_override(&self) -> Option<&str> {
        self.env_override.as_deref()
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// `true` for `serve`, the only command that stays resident and needs
    /// the full ambient stack (metrics endpoint, signal handling, shutdown
    /// coordinator) wired up; `config` and `doctor` are one-shot commands.
    pub fn is_long_running(&self, command: &ValidatedCommand) -> bool {
        matches!(command, ValidatedCommand::Serve { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ValidatedCommand;

    fn sample_cli(verbose: bool) -> ValidatedCli {
        ValidatedCli {
            command: ValidatedCommand::Doctor,
            verbose,
            config: None,
            env: None,
        }
    }

    #[test]
    fn verbose_flag_raises_log_level() {
        let quiet = BootstrapConfig::from_validated_cli(&sample_cli(false));
        let loud = BootstrapConfig::from_validated_cli(&sample_cli(true));
        assert_eq!(quiet.log_level(), LogLevel::Info);
        assert_eq!(loud.log_level(), LogLevel::Debug);
    }

    #[test]
    fn serve_is_long_running_doctor_is_not() {
        let config = BootstrapConfig::from_validated_cli(&sample_cli(false));
        assert!(!config.is_long_running(&ValidatedCommand::Doctor));
        assert!(config.is_long_running(&ValidatedCommand::Serve {
            bind: "127.0.0.1".parse().unwrap(),
            port: 8080,
        }));
    }
}
