// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ProcessId;
use crate::value_objects::Stage;

/// Terminal outcome of a [`Process`]. Non-terminal processes are `running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Running,
    Succeeded,
    Failed,
    ForceCompleted,
}

impl TerminalState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TerminalState::Running)
    }
}

/// One completed-or-in-progress entry in a process's `stage_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageHistoryEntry {
    pub stage: Stage,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Running counters of extracted/bridged entities and relationships,
/// compared against the graph at commit time by the integrity verifier
/// (universal invariant #1 in the testable-properties list).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProcessCounters {
    pub entities_extracted: u64,
    pub relationships_extracted: u64,
    pub entities_bridged: u64,
    pub relationships_bridged: u64,
    pub orphaned_relationships: u64,
}

/// One uploaded document's lifecycle record. Owned exclusively by the
/// pipeline worker that created it; no other component mutates it directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    pub process_id: ProcessId,
    pub filename: String,
    pub stored_path: String,
    pub byte_size: u64,
    pub page_count: u32,
    pub created_at: DateTime<Utc>,
    pub current_stage: Stage,
    pub stage_history: Vec<StageHistoryEntry>,
    pub counters: ProcessCounters,
    pub terminal_state: TerminalState,
    pub cancel_requested: bool,
    pub error: Option<String>,
}

impl Process {
    pub fn new(filename: String, stored_path: String, byte_size: u64, page_count: u32) -> Self {
        Self {
            process_id: ProcessId::new(),
            filename,
            stored_path,
            byte_size,
            page_count,
            created_at: Utc::now(),
            current_stage: Stage::Validation,
            stage_history: Vec::new(),
            counters: ProcessCounters::default(),
            terminal_state: TerminalState::Running,
            cancel_requested: false,
            error: None,
        }
    }

    pub fn enter_stage(&mut self, stage: Stage) {
        self.current_stage = stage;
        self.stage_history.push(StageHistoryEntry {
            stage,
            start: Utc::now(),
            end: None,
            error: None,
        });
    }

    pub fn exit_stage(&mut self, error: Option<String>) {
        if let Some(entry) = self.stage_history.last_mut() {
            if entry.end.is_none() {
                entry.end = Some(Utc::now());
                entry.error = error;
            }
        }
    }

    pub fn mark_terminal(&mut self, state: TerminalState, error: Option<String>) {
        self.terminal_state = state;
        self.error = error;
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_state.is_terminal()
    }

    pub fn request_cancel(&mut self) {
        self.cancel_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_process_starts_in_validation_running() {
        let p = Process::new("manual.pdf".into(), "uploads/x_manual.pdf".into(), 1024, 3);
        assert_eq!(p.current_stage, Stage::Validation);
        assert!(!p.is_terminal());
    }

    #[test]
    fn stage_history_records_entry_and_exit() {
        let mut p = Process::new("manual.pdf".into(), "uploads/x_manual.pdf".into(), 1024, 3);
        p.enter_stage(Stage::TextExtraction);
        assert_eq!(p.stage_history.len(), 1);
        p.exit_stage(None);
        assert!(p.stage_history[0].end.is_some());
    }
}
