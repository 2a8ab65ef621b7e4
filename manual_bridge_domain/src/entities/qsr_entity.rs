// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::value_objects::QsrType;

/// An extracted QSR concept: a piece of equipment, a procedure, a safety
/// note, etc. Spec's "Entity", renamed to avoid colliding with the
/// DDD term used throughout this module tree.
///
/// Invariant: `canonical_name` is never empty; `qsr_type` is assigned before
/// deduplication runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QsrEntity {
    pub local_id: String,
    pub canonical_name: String,
    pub qsr_type: QsrType,
    pub source_document: String,
    pub page_refs: BTreeSet<u32>,
    pub properties: HashMap<String, serde_json::Value>,
    pub source_entity_ids: BTreeSet<String>,
}

impl QsrEntity {
    pub fn new(local_id: impl Into<String>, canonical_name: impl Into<String>, qsr_type: QsrType, source_document: impl Into<String>) -> Self {
        let canonical_name = canonical_name.into();
        debug_assert!(!canonical_name.is_empty(), "canonical_name must not be empty");
        Self {
            local_id: local_id.into(),
            canonical_name,
            qsr_type,
            source_document: source_document.into(),
            page_refs: BTreeSet::new(),
            properties: HashMap::new(),
            source_entity_ids: BTreeSet::new(),
        }
    }

    pub fn with_page_ref(mut self, page: u32) -> Self {
        self.page_refs.insert(page);
        self
    }
}
