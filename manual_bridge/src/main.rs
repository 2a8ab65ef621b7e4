// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Manual Bridge entry point
//!
//! Thin glue between [`manual_bridge_bootstrap`] (CLI parsing, signal
//! handling, shutdown coordination, exit codes) and the `manual_bridge`
//! library: `serve` stands up the axum HTTP surface and the five
//! background monitoring loops; `config show|set|rollback` and `doctor`
//! are one-shot commands that reuse the same use cases the HTTP API calls.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use manual_bridge_bootstrap::shutdown::ShutdownCoordinator;
use manual_bridge_bootstrap::signals::create_signal_handler;
use manual_bridge_bootstrap::{result_to_exit_code, BootstrapConfig, ValidatedCli, ValidatedCommand};

use manual_bridge::application::services::monitoring_loops;
use manual_bridge::application::use_cases::config_admin;
use manual_bridge::application::commands::{ConfigRollbackCommand, ConfigSetCommand};
use manual_bridge::context::{AppContext, Layout};
use manual_bridge::infrastructure::{config as config_loader, logging};
use manual_bridge::presentation::http::build_router;
use manual_bridge_domain::config::Environment;
use manual_bridge_domain::error::PipelineError;

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(15);
const DEFAULT_BASE_DIR: &str = "manual-bridge-data";

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = match manual_bridge_bootstrap::parse_and_validate() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("argument error: {e}");
            return std::process::ExitCode::from(64);
        }
    };

    result_to_exit_code(run(cli).await)
}

async fn run(cli: ValidatedCli) -> Result<(), PipelineError> {
    let bootstrap = BootstrapConfig::from_validated_cli(&cli);
    let environment = Environment::resolve(bootstrap.env_override(), hostname().as_deref());

    if bootstrap.is_long_running(&cli.command) {
        logging::init(bootstrap.log_level(), environment);
    }

    let config = config_loader::load(environment, bootstrap.config_path().map(|p| p.as_path()))?;
    let layout = Layout::new(std::env::var("MANUAL_BRIDGE_DATA_DIR").unwrap_or_else(|_| DEFAULT_BASE_DIR.to_string()));
    let app = AppContext::bootstrap(layout, config)?;

    match cli.command {
        ValidatedCommand::Serve { bind, port } => serve(app, bind, port).await,
        ValidatedCommand::ConfigShow => config_show(&app),
        ValidatedCommand::ConfigSet { key, value } => config_set(&app, key, value).await,
        ValidatedCommand::ConfigRollback { change_id } => config_rollback(&app, change_id).await,
        ValidatedCommand::Doctor => doctor(&app),
    }
}

fn hostname() -> Option<String> {
    std::env::var("HOSTNAME").ok()
}

async fn serve(app: AppContext, bind: IpAddr, port: u16) -> Result<(), PipelineError> {
    let coordinator = ShutdownCoordinator::new(SHUTDOWN_GRACE_PERIOD);

    tokio::spawn(monitoring_loops::health_sample_loop(app.clone(), coordinator.token()));
    tokio::spawn(monitoring_loops::degradation_loop(app.clone(), coordinator.token()));
    tokio::spawn(monitoring_loops::recovery_sweep_loop(app.clone(), coordinator.token()));
    tokio::spawn(monitoring_loops::dlq_retry_loop(app.clone(), coordinator.token()));
    tokio::spawn(monitoring_loops::optimization_loop(app.clone(), coordinator.token()));

    let signal_handler = create_signal_handler();
    let signal_coordinator = coordinator.clone();
    tokio::spawn(async move {
        signal_handler
            .wait_for_signal(Box::new(move || signal_coordinator.initiate_shutdown()))
            .await;
    });

    let addr = SocketAddr::new(bind, port);
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(PipelineError::from)?;
    tracing::info!(%addr, "manual-bridge listening");

    let router = build_router(app);
    let shutdown_token = coordinator.token();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await
        .map_err(|e| PipelineError::Internal(e.to_string()))?;

    coordinator.initiate_shutdown();
    coordinator.wait_for_shutdown().await;
    coordinator.complete_shutdown();
    Ok(())
}

fn config_show(app: &AppContext) -> Result<(), PipelineError> {
    let config = config_admin::get_config(app);
    println!("{}", serde_json::to_string_pretty(config.as_ref())?);
    Ok(())
}

async fn config_set(app: &AppContext, key: String, value: String) -> Result<(), PipelineError> {
    let new_value = serde_json::from_str(&value).unwrap_or_else(|_| serde_json::Value::String(value.clone()));
    let change = config_admin::set_config(
        app,
        ConfigSetCommand { path: key, new_value, actor: "cli".to_string() },
    )
    .await?;
    println!("{}", serde_json::to_string_pretty(&change)?);
    Ok(())
}

async fn config_rollback(app: &AppContext, change_id: String) -> Result<(), PipelineError> {
    let change_id = change_id.parse()?;
    let change = config_admin::rollback_config(app, ConfigRollbackCommand { change_id, actor: "cli".to_string() }).await?;
    println!("{}", serde_json::to_string_pretty(&change)?);
    Ok(())
}

/// One-shot health snapshot for operators without standing up the HTTP
/// surface - the same rollup `/health` serves, printed to stdout.
fn doctor(app: &AppContext) -> Result<(), PipelineError> {
    let breaker_states: Vec<(&str, String)> = app
        .breakers
        .names()
        .into_iter()
        .filter_map(|name| app.breakers.state(name).map(|s| (name, format!("{s:?}"))))
        .collect();

    let report = serde_json::json!({
        "degradation_mode": format!("{:?}", app.degradation_snapshot()),
        "active_processes": app.processes.len(),
        "dlq_depth": app.dlq_store.list()?.len(),
        "circuit_breakers": breaker_states.into_iter().collect::<std::collections::BTreeMap<_, _>>(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
