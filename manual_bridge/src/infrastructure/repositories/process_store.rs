// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Process store (sled-backed)
//!
//! Durable record of every [`Process`], keyed by its ULID so a tree scan
//! comes back oldest-first. The in-memory `DashMap<ProcessId, Process>` on
//! `AppContext` is the hot path read by `/status`; this store is the
//! recovery path on restart and the `/documents` listing's source of truth.

use manual_bridge_domain::entities::Process;
use manual_bridge_domain::error::PipelineError;
use manual_bridge_domain::ids::ProcessId;

use crate::infrastructure::sled_err;

const TREE_NAME: &str = "processes";

pub struct ProcessStore {
    tree: sled::Tree,
}

impl ProcessStore {
    pub fn open(db: &sled::Db) -> Result<Self, PipelineError> {
        let tree = db.open_tree(TREE_NAME).map_err(sled_err)?;
        Ok(Self { tree })
    }

    pub fn put(&self, process: &Process) -> Result<(), PipelineError> {
        let key = process.process_id.to_string();
        let value = serde_json::to_vec(process)?;
        self.tree.insert(key, value).map_err(sled_err)?;
        self.tree.flush().map_err(sled_err)?;
        Ok(())
    }

    pub fn get(&self, process_id: &ProcessId) -> Result<Option<Process>, PipelineError> {
        match self.tree.get(process_id.to_string()).map_err(sled_err)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn delete(&self, process_id: &ProcessId) -> Result<(), PipelineError> {
        self.tree.remove(process_id.to_string()).map_err(sled_err)?;
        self.tree.flush().map_err(sled_err)?;
        Ok(())
    }

    /// All stored processes, oldest first. Used to repopulate the in-memory
    /// map at startup and to serve `GET /documents`.
    pub fn list(&self) -> Result<Vec<Process>, PipelineError> {
        self.tree
            .iter()
            .values()
            .map(|res| {
                let bytes = res.map_err(sled_err)?;
                serde_json::from_slice(&bytes).map_err(PipelineError::from)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> sled::Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    #[test]
    fn put_then_get_round_trips() {
        let db = temp_db();
        let store = ProcessStore::open(&db).unwrap();
        let process = Process::new("manual.pdf".into(), "uploads/x_manual.pdf".into(), 1024, 3);
        store.put(&process).unwrap();
        let fetched = store.get(&process.process_id).unwrap().unwrap();
        assert_eq!(fetched.filename, "manual.pdf");
    }

    #[test]
    fn delete_removes_the_record() {
        let db = temp_db();
        let store = ProcessStore::open(&db).unwrap();
        let process = Process::new("manual.pdf".into(), "uploads/x_manual.pdf".into(), 1024, 3);
        store.put(&process).unwrap();
        store.delete(&process.process_id).unwrap();
        assert!(store.get(&process.process_id).unwrap().is_none());
    }

    #[test]
    fn list_returns_every_stored_process() {
        let db = temp_db();
        let store = ProcessStore::open(&db).unwrap();
        store.put(&Process::new("a.pdf".into(), "uploads/a.pdf".into(), 10, 1)).unwrap();
        store.put(&Process::new("b.pdf".into(), "uploads/b.pdf".into(), 20, 2)).unwrap();
        assert_eq!(store.list().unwrap().len(), 2);
    }
}
