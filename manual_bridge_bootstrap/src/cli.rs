// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse()                 │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validator::validate()           │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedConfig                 │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands, ConfigAction};
pub use validator::{ParseError, SecureArgParser};

use std::net::IpAddr;
use std::path::PathBuf;

/// Validated CLI configuration
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub env: Option<String>,
}

/// Validated command variants
#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Serve {
        bind: IpAddr,
        port: u16,
    },
    ConfigShow,
    ConfigSet {
        key: String,
        value: String,
    },
    ConfigRollback {
        change_id: String,
    },
    Doctor,
}

/// Parse and validate CLI arguments: parse with clap, then run every
/// argument through [`SecureArgParser`] before handing it to bootstrap.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = match cli.config {
        Some(ref path) => {
            SecureArgParser::validate_argument(&path.to_string_lossy())?;
            Some(path.clone())
        }
        None => None,
    };

    if let Some(ref env) = cli.env {
        SecureArgParser::validate_argument(env)?;
    }

    let command = match cli.command {
        Commands::Serve { bind, port } => ValidatedCommand::Serve { bind, port },
        Commands::Config { action } => match action {
            ConfigAction::Show => ValidatedCommand::ConfigShow,
            ConfigAction::Set { key, value } => {
                SecureArgParser::validate_argument(&key)?;
                SecureArgParser::validate_argument(&value)?;
                ValidatedCommand::ConfigSet { key, value }
            }
            ConfigAction::Rollback { change_id } => {
                SecureArgParser::validate_argument(&change_id)?;
                ValidatedCommand::ConfigRollback { change_id }
            }
        },
        Commands::Doctor => ValidatedCommand::Doctor,
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config,
        env: cli.env,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_set_rejects_dangerous_value() {
        let cli = Cli {
            command: Commands::Config {
                action: ConfigAction::Set {
                    key: "processing.batch_size".to_string(),
                    value: "$(rm -rf /)".to_string(),
                },
            },
            verbose: false,
            config: None,
            env: None,
        };
        assert!(validate_cli(cli).is_err());
    }

    #[test]
    fn serve_command_passes_through_bind_and_port() {
        let cli = Cli {
            command: Commands::Serve {
                bind: "127.0.0.1".parse().unwrap(),
                port: 9090,
            },
            verbose: true,
            config: None,
            env: None,
        };
        let validated = validate_cli(cli).unwrap();
        assert!(matches!(validated.command, ValidatedCommand::Serve { port: 9090, .. }));
    }
}
