// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Layered configuration loading
//!
//! Builds an [`AppConfig`] from, in ascending precedence: the environment's
//! built-in defaults, an optional config file (`toml`/`yaml`/`json`,
//! dispatched by extension through the `config` crate), and `MANUAL_BRIDGE_`
//! prefixed environment variables. This mirrors the teacher crate's layered
//! `config::Config` builder; the `AppConfig` schema itself, and its
//! `validate()`, live in the domain crate.

pub mod store;

use std::path::Path;

use config::{Config, Environment as ConfigEnvironment, File, FileFormat};

use manual_bridge_domain::config::{AppConfig, Environment};
use manual_bridge_domain::error::PipelineError;

pub fn load(environment: Environment, config_path: Option<&Path>) -> Result<AppConfig, PipelineError> {
    let defaults = AppConfig::defaults_for(environment);
    let defaults_json = serde_json::to_string(&defaults).map_err(PipelineError::from)?;

    let mut builder = Config::builder().add_source(File::from_str(&defaults_json, FileFormat::Json));

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(false));
    }

    builder = builder.add_source(ConfigEnvironment::with_prefix("MANUAL_BRIDGE").separator("__"));

    let built = builder.build().map_err(config_err)?;
    let config: AppConfig = built.try_deserialize().map_err(config_err)?;
    config.validate()?;
    Ok(config)
}

fn config_err(err: config::ConfigError) -> PipelineError {
    PipelineError::invalid_config(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_environment_defaults_with_no_file() {
        let cfg = load(Environment::Testing, None).unwrap();
        assert_eq!(cfg.environment, Environment::Testing);
    }
}
