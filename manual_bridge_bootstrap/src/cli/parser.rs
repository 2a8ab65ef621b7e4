// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Parser
//!
//! Command-line interface parsing using clap.
//!
//! This module defines the CLI structure and handles argument parsing.
//! Security validation happens in the validator module after parsing.

use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Main CLI structure
#[derive(Parser, Debug, Clone)]
#[command(name = "manual-bridge")]
#[command(about = concat!("Manual Bridge v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override DEPLOYMENT_ENV resolution for this run
    #[arg(long)]
    pub env: Option<String>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP/WS server
    Serve {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        bind: IpAddr,

        /// Bind port
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Inspect or change running configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// One-shot health snapshot: component rollup, degradation mode, DLQ depth
    Doctor,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the active config tree
    Show,

    /// Set a single config key and append a change record
    Set {
        /// Dotted config path, e.g. processing.batch_size
        key: String,

        /// New value, parsed according to the key's type
        value: String,
    },

    /// Revert the most recent change to a key
    Rollback {
        /// Change id to roll back, or the key to revert to its prior value
        change_id: String,
    },
}

/// Parse CLI arguments
///
/// # Panics
///
/// Clap will exit the process with appropriate error message if parsing fails
pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
