// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Integrity verifier (C8)
//!
//! A fixed suite of post-bridge checks scoped to one process (§4.8). Checks
//! are pure functions over the in-memory bridge result; the caller (the
//! bridge service, in the application layer) supplies whatever graph-side
//! counts it already queried rather than this module reaching into the
//! graph client itself.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::entities::{QsrEntity, Relationship, VisualEntityLink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub check: &'static str,
    pub severity: IssueSeverity,
    pub detail: String,
    pub repairable: bool,
}

/// Snapshot of what the integrity checks need to know about one process,
/// assembled by the bridge after graph_write.
#[derive(Debug, Clone, Default)]
pub struct IntegritySnapshot {
    pub entities: Vec<QsrEntity>,
    pub relationships: Vec<Relationship>,
    pub visual_links: Vec<VisualEntityLink>,
    pub existing_graph_entity_ids: HashSet<String>,
    pub pages_with_text: HashSet<u32>,
    pub bridged_entity_count: u64,
    pub bridged_relationship_count: u64,
    pub cross_document: bool,
    pub orphan_ratio_policy: f64,
}

fn entity_ids(entities: &[QsrEntity]) -> HashSet<&str> {
    entities.iter().map(|e| e.local_id.as_str()).collect()
}

fn check_dangling_edges(snap: &IntegritySnapshot) -> Vec<Issue> {
    let ids = entity_ids(&snap.entities);
    snap.relationships
        .iter()
        .filter(|r| !ids.contains(r.source_entity_local_id.as_str()) || !ids.contains(r.target_entity_local_id.as_str()))
        .map(|r| Issue {
            check: "dangling_edge",
            severity: IssueSeverity::Critical,
            detail: format!("{} -> {} has a missing endpoint", r.source_entity_local_id, r.target_entity_local_id),
            repairable: true,
        })
        .collect()
}

fn check_visual_link_resolvability(snap: &IntegritySnapshot) -> Vec<Issue> {
    let ids = entity_ids(&snap.entities);
    snap.visual_links
        .iter()
        .filter(|l| !ids.contains(l.entity_id.as_str()))
        .map(|l| Issue {
            check: "visual_link_resolvability",
            severity: IssueSeverity::Warning,
            detail: format!("visual link references missing entity {}", l.entity_id),
            repairable: true,
        })
        .collect()
}

fn check_dedup_success(snap: &IntegritySnapshot) -> Vec<Issue> {
    let mut seen: HashMap<(&str, &str), u32> = HashMap::new();
    for e in &snap.entities {
        *seen.entry((e.canonical_name.as_str(), e.qsr_type.as_str())).or_insert(0) += 1;
    }
    seen.into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|((name, _), _)| Issue {
            check: "dedup_success",
            severity: IssueSeverity::Critical,
            detail: format!("canonical_name '{name}' appears on multiple surviving entities"),
            repairable: false,
        })
        .collect()
}

fn check_document_completeness(snap: &IntegritySnapshot) -> Vec<Issue> {
    let covered_pages: HashSet<u32> = snap.entities.iter().flat_map(|e| e.page_refs.iter().copied()).collect();
    snap.pages_with_text
        .difference(&covered_pages)
        .map(|page| Issue {
            check: "document_completeness",
            severity: IssueSeverity::Warning,
            detail: format!("page {page} had text but produced no entity"),
            repairable: false,
        })
        .collect()
}

fn check_counts_match(snap: &IntegritySnapshot) -> Vec<Issue> {
    let mut issues = Vec::new();
    if snap.entities.len() as u64 != snap.bridged_entity_count {
        issues.push(Issue {
            check: "counts_match",
            severity: IssueSeverity::Critical,
            detail: format!(
                "entity count mismatch: {} canonical vs {} bridged",
                snap.entities.len(),
                snap.bridged_entity_count
            ),
            repairable: false,
        });
    }
    if snap.relationships.len() as u64 != snap.bridged_relationship_count {
        issues.push(Issue {
            check: "counts_match",
            severity: IssueSeverity::Critical,
            detail: format!(
                "relationship count mismatch: {} canonical vs {} bridged",
                snap.relationships.len(),
                snap.bridged_relationship_count
            ),
            repairable: false,
        });
    }
    issues
}

fn check_orphan_entities(snap: &IntegritySnapshot) -> Vec<Issue> {
    if snap.entities.is_empty() {
        return Vec::new();
    }
    let mut connected: HashSet<&str> = HashSet::new();
    for r in &snap.relationships {
        connected.insert(r.source_entity_local_id.as_str());
        connected.insert(r.target_entity_local_id.as_str());
    }
    let orphan_count = snap.entities.iter().filter(|e| !connected.contains(e.local_id.as_str())).count();
    let ratio = orphan_count as f64 / snap.entities.len() as f64;
    if ratio > snap.orphan_ratio_policy {
        vec![Issue {
            check: "orphan_entities",
            severity: IssueSeverity::Warning,
            detail: format!("{:.0}% of entities are orphaned, above policy", ratio * 100.0),
            repairable: false,
        }]
    } else {
        Vec::new()
    }
}

fn check_duplicate_relationships(snap: &IntegritySnapshot) -> Vec<Issue> {
    let mut seen: HashSet<(&str, &str, &str)> = HashSet::new();
    let mut dupes = Vec::new();
    for r in &snap.relationships {
        let key = (r.source_entity_local_id.as_str(), r.target_entity_local_id.as_str(), r.relationship_type.as_str());
        if !seen.insert(key) {
            dupes.push(Issue {
                check: "duplicate_relationship",
                severity: IssueSeverity::Warning,
                detail: format!("duplicate relationship {:?}", key),
                repairable: true,
            });
        }
    }
    dupes
}

fn check_cross_document_referential_integrity(snap: &IntegritySnapshot) -> Vec<Issue> {
    if !snap.cross_document {
        return Vec::new();
    }
    snap.entities
        .iter()
        .filter(|e| !e.source_entity_ids.is_empty() && !snap.existing_graph_entity_ids.contains(e.local_id.as_str()))
        .map(|e| Issue {
            check: "cross_document_referential_integrity",
            severity: IssueSeverity::Warning,
            detail: format!("entity {} not resolvable against existing canonical set", e.local_id),
            repairable: false,
        })
        .collect()
}

/// Runs the full fixed suite and returns every issue found, unfiltered.
pub fn run_checks(snap: &IntegritySnapshot) -> Vec<Issue> {
    let mut issues = Vec::new();
    issues.extend(check_dangling_edges(snap));
    issues.extend(check_visual_link_resolvability(snap));
    issues.extend(check_dedup_success(snap));
    issues.extend(check_document_completeness(snap));
    issues.extend(check_counts_match(snap));
    issues.extend(check_orphan_entities(snap));
    issues.extend(check_duplicate_relationships(snap));
    issues.extend(check_cross_document_referential_integrity(snap));
    issues
}

/// After a bounded auto-repair pass (performed by the caller against the
/// repairable allow-list), whether any critical issues remain decides
/// pass/fail for the stage.
pub fn has_unresolved_critical(issues: &[Issue]) -> bool {
    issues.iter().any(|i| i.severity == IssueSeverity::Critical)
}

pub fn is_auto_repairable(issue: &Issue) -> bool {
    issue.repairable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::QsrType;

    fn entity(id: &str) -> QsrEntity {
        QsrEntity::new(id, format!("Entity {id}"), QsrType::Equipment, "manual.pdf")
    }

    #[test]
    fn dangling_edge_is_critical() {
        let snap = IntegritySnapshot {
            entities: vec![entity("1")],
            relationships: vec![Relationship::new("1", "missing", "requires")],
            ..Default::default()
        };
        let issues = run_checks(&snap);
        assert!(issues.iter().any(|i| i.check == "dangling_edge" && i.severity == IssueSeverity::Critical));
    }

    #[test]
    fn duplicate_canonical_names_fail_dedup_success() {
        let mut e1 = entity("1");
        let mut e2 = entity("2");
        e1.canonical_name = "Taylor C602".into();
        e2.canonical_name = "Taylor C602".into();
        let snap = IntegritySnapshot {
            entities: vec![e1, e2],
            ..Default::default()
        };
        let issues = run_checks(&snap);
        assert!(has_unresolved_critical(&issues));
    }

    #[test]
    fn clean_snapshot_has_no_critical_issues() {
        let e = entity("1").with_page_ref(1);
        let snap = IntegritySnapshot {
            entities: vec![e],
            relationships: vec![],
            bridged_entity_count: 1,
            bridged_relationship_count: 0,
            orphan_ratio_policy: 1.0,
            ..Default::default()
        };
        let issues = run_checks(&snap);
        assert!(!has_unresolved_critical(&issues));
    }
}
