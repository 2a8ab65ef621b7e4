// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metrics (Prometheus)
//!
//! A small, fixed registry exposed at `GET /metrics`. Counters/gauges map
//! directly to the health monitor's [`MetricName`](manual_bridge_domain::health::MetricName)
//! set plus the ambient request/stage counters the teacher crate's own
//! `MetricsService` exposes.

use prometheus::{Encoder, Gauge, HistogramVec, IntCounterVec, IntGauge, Registry, TextEncoder};

use manual_bridge_domain::error::PipelineError;
use manual_bridge_domain::value_objects::Stage;

pub struct Metrics {
    registry: Registry,
    pub documents_total: IntCounterVec,
    pub stage_duration_seconds: HistogramVec,
    pub active_processes: IntGauge,
    pub queue_depth: IntGauge,
    pub memory_percent: Gauge,
    pub graph_response_seconds: HistogramVec,
    pub circuit_state: IntGauge,
    pub dlq_depth: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, PipelineError> {
        let registry = Registry::new();

        let documents_total = IntCounterVec::new(
            prometheus::Opts::new("manual_bridge_documents_total", "Documents processed by outcome"),
            &["outcome"],
        )
        .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;

        let stage_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new("manual_bridge_stage_duration_seconds", "Stage duration in seconds"),
            &["stage"],
        )
        .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;

        let graph_response_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new("manual_bridge_graph_response_seconds", "Graph adapter call latency"),
            &["operation"],
        )
        .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;

        let active_processes = IntGauge::new("manual_bridge_active_processes", "Currently running processes")
            .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;
        let queue_depth = IntGauge::new("manual_bridge_queue_depth", "Local degradation queue depth")
            .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;
        let memory_percent = Gauge::new("manual_bridge_memory_percent", "Process resident memory percent")
            .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;
        let circuit_state = IntGauge::new("manual_bridge_graph_circuit_state", "0=closed,1=half_open,2=open")
            .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;
        let dlq_depth = IntGauge::new("manual_bridge_dlq_depth", "Dead-letter queue depth")
            .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;

        registry
            .register(Box::new(documents_total.clone()))
            .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;
        registry
            .register(Box::new(stage_duration_seconds.clone()))
            .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;
        registry
            .register(Box::new(graph_response_seconds.clone()))
            .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;
        registry
            .register(Box::new(active_processes.clone()))
            .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;
        registry
            .register(Box::new(queue_depth.clone()))
            .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;
        registry
            .register(Box::new(memory_percent.clone()))
            .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;
        registry
            .register(Box::new(circuit_state.clone()))
            .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;
        registry
            .register(Box::new(dlq_depth.clone()))
            .map_err(|e| PipelineError::internal(format!("metrics: {e}")))?;

        Ok(Self {
            registry,
            documents_total,
            stage_duration_seconds,
            active_processes,
            queue_depth,
            memory_percent,
            graph_response_seconds,
            circuit_state,
            dlq_depth,
        })
    }

    pub fn observe_stage(&self, stage: Stage, seconds: f64) {
        self.stage_duration_seconds.with_label_values(&[stage.as_str()]).observe(seconds);
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.documents_total.with_label_values(&[outcome]).inc();
    }

    /// Renders the registry in the Prometheus text exposition format for
    /// `GET /metrics`.
    pub fn render(&self) -> Result<String, PipelineError> {
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| PipelineError::internal(format!("metrics encode: {e}")))?;
        String::from_utf8(buffer).map_err(|e| PipelineError::internal(format!("metrics utf8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_metric_names() {
        let metrics = Metrics::new().unwrap();
        metrics.record_outcome("succeeded");
        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("manual_bridge_documents_total"));
    }
}
