// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Audit log store (sled-backed)
//!
//! Append-only by convention: nothing in this module ever removes or
//! rewrites an entry, matching universal invariant #9's audit-immutability
//! requirement.

use manual_bridge_domain::audit::AuditEvent;
use manual_bridge_domain::error::PipelineError;

use crate::infrastructure::sled_err;

const TREE_NAME: &str = "audit_events";

pub struct AuditStore {
    tree: sled::Tree,
}

impl AuditStore {
    pub fn open(db: &sled::Db) -> Result<Self, PipelineError> {
        let tree = db.open_tree(TREE_NAME).map_err(sled_err)?;
        Ok(Self { tree })
    }

    pub fn append(&self, event: &AuditEvent) -> Result<(), PipelineError> {
        let key = event.id.to_string();
        let value = serde_json::to_vec(event)?;
        self.tree.insert(key, value).map_err(sled_err)?;
        self.tree.flush().map_err(sled_err)?;
        Ok(())
    }

    /// Every recorded event, oldest first.
    pub fn all(&self) -> Result<Vec<AuditEvent>, PipelineError> {
        self.tree
            .iter()
            .values()
            .map(|res| {
                let bytes = res.map_err(sled_err)?;
                serde_json::from_slice(&bytes).map_err(PipelineError::from)
            })
            .collect()
    }

    /// The `limit` most recent events, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditEvent>, PipelineError> {
        let mut events = self.all()?;
        events.reverse();
        events.truncate(limit);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manual_bridge_domain::audit::{ActorRole, EventResult};

    fn temp_db() -> sled::Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    #[test]
    fn append_then_all_round_trips() {
        let db = temp_db();
        let store = AuditStore::open(&db).unwrap();
        let event = AuditEvent::record("upload", "admin", ActorRole::Admin, EventResult::Success, serde_json::json!({}));
        store.append(&event).unwrap();
        assert_eq!(store.all().unwrap().len(), 1);
    }

    #[test]
    fn recent_returns_newest_first_and_respects_limit() {
        let db = temp_db();
        let store = AuditStore::open(&db).unwrap();
        for kind in ["upload", "config_change", "document_delete"] {
            store
                .append(&AuditEvent::record(kind, "admin", ActorRole::Admin, EventResult::Success, serde_json::json!({})))
                .unwrap();
        }
        let recent = store.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event_kind, "document_delete");
    }
}
