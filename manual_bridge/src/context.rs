// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Composition root
//!
//! `AppContext` is the single struct every use case, service, and HTTP
//! handler is handed. It owns the long-lived state the teacher crate would
//! normally split across a `ResourceManager` and several repository structs:
//! the embedded [`sled`] database, the circuit breakers and saga ledger, the
//! progress broadcast bus, the live config snapshot, and the extractor/graph
//! adapter trait objects.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;

use manual_bridge_domain::config::AppConfig;
use manual_bridge_domain::degradation::DegradationMode;
use manual_bridge_domain::error::PipelineError;
use manual_bridge_domain::ids::ProcessId;
use manual_bridge_domain::reliability::{CircuitBreakerState, Transaction};
use manual_bridge_domain::recovery::RecoveryLedger;
use manual_bridge_domain::repositories::{EntityExtractor, GraphRepository, ImageExtractor, TextExtractor};
use manual_bridge_domain::Process;

use crate::infrastructure::adapters::entity_extractor::HeuristicEntityExtractor;
use crate::infrastructure::adapters::graph_repository::SledGraphRepository;
use crate::infrastructure::adapters::image_extractor::UnavailableImageExtractor;
use crate::infrastructure::adapters::text_extractor::HeuristicTextExtractor;
use crate::infrastructure::config::store::ConfigStore;
use crate::infrastructure::metrics::Metrics;
use crate::infrastructure::repositories::audit_store::AuditStore;
use crate::infrastructure::repositories::dlq_store::DlqStore;
use crate::infrastructure::repositories::process_store::ProcessStore;
use crate::infrastructure::runtime::progress_bus::ProgressBus;
use crate::infrastructure::sled_err;

/// Filesystem layout rooted at one base directory (§6's persisted state
/// layout): `uploads/`, `content/`, and `data/{dlq,degradation,health,
/// recovery,optimization,audit,config}`.
#[derive(Debug, Clone)]
pub struct Layout {
    base_dir: PathBuf,
}

impl Layout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.base_dir.join("uploads")
    }

    pub fn content_dir(&self) -> PathBuf {
        self.base_dir.join("content")
    }

    pub fn data_dir(&self, component: &str) -> PathBuf {
        self.base_dir.join("data").join(component)
    }

    pub fn sled_path(&self) -> PathBuf {
        self.base_dir.join("data").join("manual_bridge.sled")
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// Every named circuit breaker this process protects a call behind. One
/// instance per external collaborator, guarded individually so a probe on
/// `graph` never blocks a probe on `text_extractor`.
pub struct Breakers {
    inner: DashMap<&'static str, Mutex<CircuitBreakerState>>,
}

impl Breakers {
    pub fn new() -> Self {
        let inner = DashMap::new();
        inner.insert("graph", Mutex::new(CircuitBreakerState::new("graph", 5, Duration::from_secs(60))));
        inner.insert(
            "text_extractor",
            Mutex::new(CircuitBreakerState::new("text_extractor", 5, Duration::from_secs(30))),
        );
        inner.insert(
            "entity_extractor",
            Mutex::new(CircuitBreakerState::new("entity_extractor", 5, Duration::from_secs(30))),
        );
        inner.insert(
            "image_extractor",
            Mutex::new(CircuitBreakerState::new("image_extractor", 5, Duration::from_secs(30))),
        );
        Self { inner }
    }

    /// Runs `call` under the named breaker's gate, recording success/failure
    /// on the shared state before returning the call's own result. Every
    /// state transition (including the open -> half-open probe admitted by
    /// `allows_call`) is logged at the point it happens.
    #[tracing::instrument(skip(self, call), fields(breaker = name))]
    pub async fn guard<F, Fut, T>(&self, name: &'static str, call: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, PipelineError>>,
    {
        let entry = self
            .inner
            .get(name)
            .unwrap_or_else(|| panic!("no circuit breaker registered for {name}"));
        {
            let mut breaker = entry.lock();
            let before = breaker.metrics().state;
            let allowed = breaker.allows_call();
            let after = breaker.metrics().state;
            if before != after {
                tracing::info!(breaker = name, ?before, ?after, "circuit breaker probing after cool-down");
            }
            allowed?;
        }
        match call().await {
            Ok(value) => {
                let mut breaker = entry.lock();
                let before = breaker.metrics().state;
                breaker.record_success();
                let after = breaker.metrics().state;
                if before != after {
                    tracing::info!(breaker = name, ?before, ?after, "circuit breaker closed");
                }
                Ok(value)
            }
            Err(err) => {
                let mut breaker = entry.lock();
                let before = breaker.metrics().state;
                breaker.record_failure();
                let after = breaker.metrics().state;
                if before != after {
                    tracing::warn!(breaker = name, ?before, ?after, error = %err, "circuit breaker opened");
                }
                Err(err)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn force_close(&self, name: &str) {
        if let Some(entry) = self.inner.get(name) {
            entry.lock().force_close();
            tracing::info!(breaker = name, "circuit breaker force-closed by recovery action");
        }
    }

    pub fn state(&self, name: &str) -> Option<manual_bridge_domain::reliability::CircuitState> {
        self.inner.get(name).map(|e| e.lock().metrics().state)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.inner.iter().map(|e| *e.key()).collect()
    }
}

/// In-memory saga ledger: the open transaction for a process while its
/// bridge write is in flight. `infrastructure::runtime::transactions` owns
/// the compensation-execution glue; this just tracks which txn is live.
pub struct Transactions {
    open: DashMap<ProcessId, Transaction>,
}

impl Transactions {
    pub fn new() -> Self {
        Self { open: DashMap::new() }
    }

    pub fn begin(&self, process_id: ProcessId) -> Transaction {
        let txn = Transaction::begin();
        self.open.insert(process_id, txn.clone());
        txn
    }

    pub fn update(&self, process_id: ProcessId, txn: Transaction) {
        self.open.insert(process_id, txn);
    }

    pub fn take(&self, process_id: ProcessId) -> Option<Transaction> {
        self.open.remove(&process_id).map(|(_, txn)| txn)
    }

    pub fn stuck(&self, now: chrono::DateTime<chrono::Utc>) -> Vec<(ProcessId, Transaction)> {
        self.open
            .iter()
            .filter(|e| e.value().is_stuck(now))
            .map(|e| (*e.key(), e.value().clone()))
            .collect()
    }
}

/// The composition root. Cheap to clone (everything behind an `Arc`), handed
/// to every use case, application service, and HTTP handler.
#[derive(Clone)]
pub struct AppContext {
    pub layout: Layout,
    pub config: Arc<ArcSwap<AppConfig>>,
    pub breakers: Arc<Breakers>,
    pub transactions: Arc<Transactions>,
    pub recovery_ledger: Arc<Mutex<RecoveryLedger>>,
    pub degradation_mode: Arc<ArcSwap<DegradationMode>>,
    pub processes: Arc<DashMap<ProcessId, Process>>,
    pub progress_bus: Arc<ProgressBus>,
    pub metrics: Arc<Metrics>,
    pub graph: Arc<dyn GraphRepository>,
    pub text_extractor: Arc<dyn TextExtractor>,
    pub entity_extractor: Arc<dyn EntityExtractor>,
    pub image_extractor: Arc<dyn ImageExtractor>,
    pub process_store: Arc<ProcessStore>,
    pub dlq_store: Arc<DlqStore>,
    pub audit_store: Arc<AuditStore>,
    pub config_store: Arc<ConfigStore>,
}

impl AppContext {
    /// Wires every adapter and embedded-storage tree behind one `sled::Db`
    /// at `layout.sled_path()`, then restores in-flight processes from disk
    /// so a restart doesn't lose track of what was running.
    pub fn bootstrap(layout: Layout, config: AppConfig) -> Result<Self, PipelineError> {
        std::fs::create_dir_all(layout.uploads_dir())?;
        std::fs::create_dir_all(layout.content_dir())?;
        std::fs::create_dir_all(layout.sled_path().parent().expect("sled path has a parent"))?;

        let db = sled::open(layout.sled_path()).map_err(sled_err)?;

        let process_store = Arc::new(ProcessStore::open(&db)?);
        let dlq_store = Arc::new(DlqStore::open(&db)?);
        let audit_store = Arc::new(AuditStore::open(&db)?);
        let config_store = Arc::new(ConfigStore::open(&db)?);
        let graph = Arc::new(SledGraphRepository::open(&db)?);

        let processes = Arc::new(DashMap::new());
        for process in process_store.list()? {
            processes.insert(process.process_id, process);
        }

        Ok(Self {
            layout,
            config: Arc::new(ArcSwap::from_pointee(config)),
            breakers: Arc::new(Breakers::new()),
            transactions: Arc::new(Transactions::new()),
            recovery_ledger: Arc::new(Mutex::new(RecoveryLedger::new())),
            degradation_mode: Arc::new(ArcSwap::from_pointee(DegradationMode::Normal)),
            processes,
            progress_bus: Arc::new(ProgressBus::new()),
            metrics: Arc::new(Metrics::new()?),
            graph,
            text_extractor: Arc::new(HeuristicTextExtractor),
            entity_extractor: Arc::new(HeuristicEntityExtractor),
            image_extractor: Arc::new(UnavailableImageExtractor),
            process_store,
            dlq_store,
            audit_store,
            config_store,
        })
    }

    pub fn config_snapshot(&self) -> Arc<AppConfig> {
        self.config.load_full()
    }

    pub fn degradation_snapshot(&self) -> DegradationMode {
        **self.degradation_mode.load()
    }
}
