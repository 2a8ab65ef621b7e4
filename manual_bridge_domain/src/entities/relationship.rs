// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A directed edge between two entities, keyed by their `local_id`s until
/// deduplication remaps endpoints to surviving canonical ids. Relationships
/// whose endpoint does not survive dedup are dropped and counted in
/// `orphaned_relationships` (§8 boundary cases).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub source_entity_local_id: String,
    pub target_entity_local_id: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub properties: HashMap<String, serde_json::Value>,
}

impl Relationship {
    pub fn new(source: impl Into<String>, target: impl Into<String>, relationship_type: impl Into<String>) -> Self {
        Self {
            source_entity_local_id: source.into(),
            target_entity_local_id: target.into(),
            relationship_type: relationship_type.into(),
            properties: HashMap::new(),
        }
    }

    /// Rewrites both endpoints through a dedup mapping; returns `None` if
    /// either endpoint has no surviving canonical id.
    pub fn remap(&self, mapping: &HashMap<String, String>) -> Option<Relationship> {
        let source = mapping.get(&self.source_entity_local_id)?;
        let target = mapping.get(&self.target_entity_local_id)?;
        Some(Relationship {
            source_entity_local_id: source.clone(),
            target_entity_local_id: target.clone(),
            relationship_type: self.relationship_type.clone(),
            properties: self.properties.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remap_drops_relationship_with_unmapped_endpoint() {
        let rel = Relationship::new("a", "b", "requires");
        let mut mapping = HashMap::new();
        mapping.insert("a".to_string(), "canonical-a".to_string());
        assert!(rel.remap(&mapping).is_none());
    }

    #[test]
    fn remap_rewrites_both_endpoints_when_present() {
        let rel = Relationship::new("a", "b", "requires");
        let mapping = HashMap::from([("a".to_string(), "ca".to_string()), ("b".to_string(), "cb".to_string())]);
        let remapped = rel.remap(&mapping).unwrap();
        assert_eq!(remapped.source_entity_local_id, "ca");
        assert_eq!(remapped.target_entity_local_id, "cb");
    }
}
