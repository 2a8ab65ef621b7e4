// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Deduplication engine (C6)
//!
//! Finds duplicate [`QsrEntity`] records emitted from one document (or,
//! with `dedup.cross_document` enabled, against an already-canonical set)
//! and merges them into survivors via union-find over validated pairwise
//! matches. See §4.6.
//!
//! The engine is a pure function of its input: no I/O, no shared state. It is
//! idempotent (testable property #6) and order-independent modulo the
//! survivor tie-break rule.

use std::collections::{HashMap, HashSet};

use crate::entities::{QsrEntity, Relationship};
use crate::value_objects::QsrType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStrategy {
    Exact,
    Pattern,
    Alias,
    Fuzzy,
    Semantic,
}

impl MatchStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStrategy::Exact => "exact",
            MatchStrategy::Pattern => "pattern",
            MatchStrategy::Alias => "alias",
            MatchStrategy::Fuzzy => "fuzzy",
            MatchStrategy::Semantic => "semantic",
        }
    }
}

const FILLER_WORDS: &[&str] = &["the", "a", "an", "model", "type", "series", "unit", "system"];

/// Curated brand aliases; lookup is case-insensitive over normalized tokens.
const BRAND_ALIASES: &[(&str, &[&str])] = &[
    ("taylor", &["taylor"]),
    ("grote", &["grote"]),
    ("electro_freeze", &["electro freeze", "electro-freeze", "electrofreeze"]),
    ("hobart", &["hobart"]),
];

/// Curated model aliases: canonical model key -> surface forms that should
/// collapse to the same model.
const MODEL_ALIASES: &[(&str, &[&str])] = &[("taylor_c602", &["c602", "c-602", "taylor c602", "taylor model c602"])];

/// Curated procedure synonym clusters for the semantic strategy.
const SEMANTIC_CLUSTERS: &[&[&str]] = &[&["daily cleaning", "end of day cleaning"]];

/// Normalizes a name for comparison only: lowercase, collapse whitespace,
/// strip a leading numeric prefix (`"1Grote Tool"` -> `"grote tool"`), drop
/// filler words. The original `canonical_name` on the entity is untouched.
pub fn normalize_for_matching(name: &str) -> String {
    let lower = name.to_lowercase();
    let stripped_prefix = lower.trim_start_matches(|c: char| c.is_ascii_digit());
    let collapsed: Vec<&str> = stripped_prefix.split_whitespace().collect();
    let without_filler: Vec<&str> = collapsed
        .into_iter()
        .filter(|tok| !FILLER_WORDS.contains(tok))
        .collect();
    without_filler.join(" ")
}

fn brand_alias_key(token: &str) -> Option<&'static str> {
    BRAND_ALIASES
        .iter()
        .find(|(_, forms)| forms.contains(&token))
        .map(|(key, _)| *key)
}

fn model_alias_key(normalized: &str) -> Option<&'static str> {
    MODEL_ALIASES
        .iter()
        .find(|(_, forms)| forms.iter().any(|f| normalized.contains(f)))
        .map(|(key, _)| *key)
}

fn fuzzy_threshold(qsr_type: QsrType) -> f64 {
    match qsr_type {
        QsrType::Equipment => 0.80,
        QsrType::Procedure => 0.75,
        _ => 0.85,
    }
}

/// A confirmed pairwise match between two entities (by index into the input
/// slice), with the winning strategy and its confidence.
#[derive(Debug, Clone, Copy)]
struct Match {
    a: usize,
    b: usize,
    strategy: MatchStrategy,
    #[allow(dead_code)]
    confidence: f64,
}

/// Tries each strategy in order for one pair; the first to match at its
/// threshold wins (§4.6).
fn match_pair(a: &QsrEntity, b: &QsrEntity) -> Option<(MatchStrategy, f64)> {
    if !a.qsr_type.compatible_for_dedup(b.qsr_type) {
        return None;
    }

    let na = normalize_for_matching(&a.canonical_name);
    let nb = normalize_for_matching(&b.canonical_name);

    if na == nb {
        return Some((MatchStrategy::Exact, 1.0));
    }

    // Pattern: brand token + model token overlap (e.g. "taylor c602" vs "c-602"
    // when a shared brand or model alias key can be inferred for both).
    let a_tokens: HashSet<&str> = na.split_whitespace().collect();
    let b_tokens: HashSet<&str> = nb.split_whitespace().collect();
    let shared_brand = a_tokens
        .iter()
        .filter_map(|t| brand_alias_key(t))
        .find(|brand| b_tokens.iter().any(|t| brand_alias_key(t) == Some(brand)));
    if shared_brand.is_some() && (a_tokens.iter().any(|t| t.chars().any(|c| c.is_ascii_digit())) || b_tokens.iter().any(|t| t.chars().any(|c| c.is_ascii_digit()))) {
        return Some((MatchStrategy::Pattern, 0.95));
    }

    // Alias table: both normalize into the same curated model alias bucket.
    if let (Some(ka), Some(kb)) = (model_alias_key(&na), model_alias_key(&nb)) {
        if ka == kb {
            return Some((MatchStrategy::Alias, 0.9));
        }
    }

    // Fuzzy: Ratcliff/Obershelp-equivalent similarity (strsim's Jaro-Winkler
    // stands in for the source's string-similarity library).
    let threshold = fuzzy_threshold(a.qsr_type).min(fuzzy_threshold(b.qsr_type));
    let similarity = strsim::jaro_winkler(&na, &nb);
    if similarity >= threshold {
        return Some((MatchStrategy::Fuzzy, similarity));
    }

    // Semantic: only within curated clusters.
    for cluster in SEMANTIC_CLUSTERS {
        if cluster.contains(&na.as_str()) && cluster.contains(&nb.as_str()) {
            return Some((MatchStrategy::Semantic, 0.85));
        }
    }

    None
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DedupStats {
    pub entities_in: usize,
    pub entities_out: usize,
    pub clusters_formed: usize,
    pub matches_by_strategy: HashMap<&'static str, u32>,
}

#[derive(Debug, Clone, Default)]
pub struct DedupResult {
    pub canonical_entities: Vec<QsrEntity>,
    /// old local_id -> surviving canonical local_id.
    pub id_mapping: HashMap<String, String>,
    pub relationships: Vec<Relationship>,
    pub stats: DedupStats,
}

/// Merges properties per §4.6: per-key union; list-valued keys concatenate
/// de-duplicated; scalar conflicts collapse into a list.
fn merge_properties(
    target: &mut HashMap<String, serde_json::Value>,
    incoming: &HashMap<String, serde_json::Value>,
) {
    for (k, v) in incoming {
        match target.get_mut(k) {
            None => {
                target.insert(k.clone(), v.clone());
            }
            Some(existing) => {
                if existing == v {
                    continue;
                }
                match (existing.as_array_mut(), v.as_array()) {
                    (Some(arr), Some(incoming_arr)) => {
                        for item in incoming_arr {
                            if !arr.contains(item) {
                                arr.push(item.clone());
                            }
                        }
                    }
                    _ => {
                        let mut merged: Vec<serde_json::Value> = match existing.as_array() {
                            Some(arr) => arr.clone(),
                            None => vec![existing.clone()],
                        };
                        if !merged.contains(v) {
                            merged.push(v.clone());
                        }
                        *existing = serde_json::Value::Array(merged);
                    }
                }
            }
        }
    }
}

/// Runs clustering + merge + relationship remap for one document's entities
/// and relationships. Idempotent: feeding the output back in produces the
/// same canonical set (every pair is already either identical or
/// dedup-incompatible once merged).
///
/// `cross_document_candidates` is the already-canonical set from other
/// documents to match against when `dedup.cross_document` is enabled (empty
/// otherwise, per the resolved Open Question in SPEC_FULL.md §9). Candidates
/// that match nothing new are left out of the returned `canonical_entities`
/// since they are unchanged; candidates a new entity merges into are
/// returned so the caller can persist the updated survivor.
pub fn deduplicate(entities: &[QsrEntity], relationships: &[Relationship], cross_document_candidates: &[QsrEntity]) -> DedupResult {
    let n = entities.len();
    let total = n + cross_document_candidates.len();
    let combined: Vec<&QsrEntity> = entities.iter().chain(cross_document_candidates.iter()).collect();
    let mut uf = UnionFind::new(total);
    let mut matches_by_strategy: HashMap<&'static str, u32> = HashMap::new();

    for i in 0..total {
        for j in (i + 1)..total {
            if let Some((strategy, _confidence)) = match_pair(combined[i], combined[j]) {
                uf.union(i, j);
                *matches_by_strategy.entry(strategy.as_str()).or_insert(0) += 1;
            }
        }
    }

    let mut clusters: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..total {
        let root = uf.find(i);
        clusters.entry(root).or_default().push(i);
    }

    let mut id_mapping = HashMap::new();
    let mut canonical_entities = Vec::new();

    for members in clusters.values() {
        // A cluster made up entirely of pre-existing candidates contributes
        // no new information; skip it so the caller doesn't rewrite
        // untouched canonical entities.
        let touches_new_entity = members.iter().any(|&idx| idx < n);
        if !touches_new_entity {
            continue;
        }

        // Survivor: longest canonical_name, tie broken by lexicographically
        // smallest local_id (§4.6).
        let survivor_idx = *members
            .iter()
            .min_by(|&&a, &&b| {
                let ea = combined[a];
                let eb = combined[b];
                eb.canonical_name
                    .len()
                    .cmp(&ea.canonical_name.len())
                    .then_with(|| ea.local_id.cmp(&eb.local_id))
            })
            .unwrap();

        let mut survivor = combined[survivor_idx].clone();
        let mut source_entity_ids: std::collections::BTreeSet<String> = survivor.source_entity_ids.clone();

        for &idx in members {
            id_mapping.insert(combined[idx].local_id.clone(), survivor.local_id.clone());
            source_entity_ids.insert(combined[idx].local_id.clone());
            if idx != survivor_idx {
                survivor.page_refs.extend(combined[idx].page_refs.iter().copied());
                merge_properties(&mut survivor.properties, &combined[idx].properties);
            }
        }
        survivor.source_entity_ids = source_entity_ids;
        canonical_entities.push(survivor);
    }

    let mut orphaned = 0u32;
    let remapped_relationships: Vec<Relationship> = relationships
        .iter()
        .filter_map(|r| match r.remap(&id_mapping) {
            Some(remapped) => Some(remapped),
            None => {
                orphaned += 1;
                None
            }
        })
        .collect();

    let stats = DedupStats {
        entities_in: n,
        entities_out: canonical_entities.len(),
        clusters_formed: canonical_entities.len(),
        matches_by_strategy,
    };

    DedupResult {
        canonical_entities,
        id_mapping,
        relationships: remapped_relationships,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, name: &str, qsr_type: QsrType) -> QsrEntity {
        QsrEntity::new(id, name, qsr_type, "manual.pdf")
    }

    #[test]
    fn exact_duplicate_names_merge() {
        let entities = vec![
            entity("1", "Taylor C602", QsrType::Equipment),
            entity("2", "Taylor C602", QsrType::Equipment),
        ];
        let result = deduplicate(&entities, &[], &[]);
        assert_eq!(result.canonical_entities.len(), 1);
        assert_eq!(result.canonical_entities[0].source_entity_ids.len(), 2);
    }

    #[test]
    fn leading_numeric_prefix_merges_with_clean_name() {
        let entities = vec![
            entity("1", "1Grote Tool", QsrType::Equipment),
            entity("2", "Grote Tool", QsrType::Equipment),
        ];
        let result = deduplicate(&entities, &[], &[]);
        assert_eq!(result.canonical_entities.len(), 1);
    }

    #[test]
    fn three_mentions_of_taylor_c602_collapse_to_one_survivor() {
        let entities = vec![
            entity("1", "Taylor C602", QsrType::Equipment),
            entity("2", "C602", QsrType::Equipment),
            entity("3", "Taylor Model C602", QsrType::Equipment),
        ];
        let result = deduplicate(&entities, &[], &[]);
        assert_eq!(result.canonical_entities.len(), 1);
        assert_eq!(result.canonical_entities[0].source_entity_ids.len(), 3);
    }

    #[test]
    fn cross_type_mismatch_does_not_merge() {
        let entities = vec![
            entity("1", "daily cleaning", QsrType::Procedure),
            entity("2", "daily cleaning", QsrType::Ingredient),
        ];
        let result = deduplicate(&entities, &[], &[]);
        assert_eq!(result.canonical_entities.len(), 2);
    }

    #[test]
    fn relationship_with_dropped_endpoint_is_counted_orphaned() {
        let entities = vec![entity("1", "Taylor C602", QsrType::Equipment)];
        let rels = vec![Relationship::new("1", "missing", "requires")];
        let result = deduplicate(&entities, &rels, &[]);
        assert!(result.relationships.is_empty());
    }

    #[test]
    fn dedup_is_idempotent_on_its_own_output() {
        let entities = vec![
            entity("1", "Taylor C602", QsrType::Equipment),
            entity("2", "C602", QsrType::Equipment),
        ];
        let first = deduplicate(&entities, &[], &[]);
        let second = deduplicate(&first.canonical_entities, &[], &[]);
        assert_eq!(first.canonical_entities.len(), second.canonical_entities.len());
    }

    #[test]
    fn semantic_cluster_merges_procedure_synonyms() {
        let entities = vec![
            entity("1", "daily cleaning", QsrType::Procedure),
            entity("2", "end of day cleaning", QsrType::Procedure),
        ];
        let result = deduplicate(&entities, &[], &[]);
        assert_eq!(result.canonical_entities.len(), 1);
    }
}
