// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ids::CitationId;
use crate::value_objects::QsrType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualCitationKind {
    Image,
    Diagram,
    Table,
    Chart,
    Schematic,
    Photo,
}

impl VisualCitationKind {
    /// Base link confidence by citation kind (§4.7 step 1).
    pub fn base_link_confidence(self) -> f64 {
        match self {
            VisualCitationKind::Image => 0.7,
            VisualCitationKind::Diagram => 0.8,
            VisualCitationKind::Table => 0.6,
            VisualCitationKind::Schematic => 0.9,
            VisualCitationKind::Chart => 0.7,
            VisualCitationKind::Photo => 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreservationState {
    Pending,
    Preserved,
    HashMismatch,
    MissingBytes,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A non-text artifact extracted from the source document, content-addressed
/// by the SHA-256 of its stored bytes.
///
/// Invariant: if `preservation_state == Preserved` then the content file at
/// `content/<citation_id>.<format>` exists and its SHA-256 equals `content_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualCitation {
    pub citation_id: CitationId,
    pub kind: VisualCitationKind,
    pub format: String,
    pub source_document: String,
    pub page: u32,
    pub bbox: BoundingBox,
    pub content_hash: String,
    pub preservation_state: PreservationState,
    pub linked_entity_ids: BTreeSet<String>,
    pub graph_node_id: Option<String>,
    pub integrity_verified: bool,
}

impl VisualCitation {
    pub fn new(kind: VisualCitationKind, format: impl Into<String>, source_document: impl Into<String>, page: u32) -> Self {
        Self {
            citation_id: CitationId::new(),
            kind,
            format: format.into(),
            source_document: source_document.into(),
            page,
            bbox: BoundingBox::default(),
            content_hash: String::new(),
            preservation_state: PreservationState::Pending,
            linked_entity_ids: BTreeSet::new(),
            graph_node_id: None,
            integrity_verified: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualLinkKind {
    Illustrates,
    Shows,
    Demonstrates,
    Specifies,
    Presents,
    Details,
    Depicts,
    References,
}

impl VisualLinkKind {
    /// (citation kind, entity qsr_type) → link_kind lookup table (§4.7 step 2),
    /// defaulting to `References` for unlisted combinations.
    pub fn infer(citation_kind: VisualCitationKind, qsr_type: QsrType) -> VisualLinkKind {
        use QsrType::*;
        use VisualCitationKind::*;
        match (citation_kind, qsr_type) {
            (Diagram, Equipment) => VisualLinkKind::Illustrates,
            (Schematic, Equipment) | (Schematic, Component) => VisualLinkKind::Details,
            (Image, Equipment) => VisualLinkKind::Shows,
            (Image, Procedure) | (Photo, Procedure) => VisualLinkKind::Demonstrates,
            (Table, Specification) => VisualLinkKind::Specifies,
            (Table, _) => VisualLinkKind::Presents,
            (Chart, _) => VisualLinkKind::Presents,
            (_, SafetyProtocol) => VisualLinkKind::Depicts,
            _ => VisualLinkKind::References,
        }
    }
}

/// A scored candidate link between a [`VisualCitation`] and a canonical
/// entity. Only created when `confidence >= 0.3` (§3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualEntityLink {
    pub citation_id: CitationId,
    pub entity_id: String,
    pub link_kind: VisualLinkKind,
    pub confidence: f64,
    pub spatial_proximity: Option<f64>,
    pub semantic_similarity: Option<f64>,
}

/// Minimum confidence required to materialize a [`VisualEntityLink`] (§3, §4.7).
pub const MIN_LINK_CONFIDENCE: f64 = 0.3;

/// Computes link confidence for one (citation, entity) pair per §4.7 step 1:
/// base by kind, +0.2 for a relevant qsr_type, +0.3 if the citation's page is
/// among the entity's page_refs, clamped to [0, 1].
pub fn score_link_confidence(citation: &VisualCitation, entity_qsr_type: QsrType, entity_page_refs: &BTreeSet<u32>) -> f64 {
    let mut score = citation.kind.base_link_confidence();
    if matches!(entity_qsr_type, QsrType::Equipment | QsrType::Procedure | QsrType::Component) {
        score += 0.2;
    }
    if entity_page_refs.contains(&citation.page) {
        score += 0.3;
    }
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schematic_linking_equipment_on_same_page_hits_max_confidence() {
        let mut citation = VisualCitation::new(VisualCitationKind::Schematic, "png", "manual.pdf", 2);
        citation.page = 2;
        let refs = BTreeSet::from([2]);
        let score = score_link_confidence(&citation, QsrType::Equipment, &refs);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn table_linking_brand_off_page_stays_below_threshold_gate() {
        let citation = VisualCitation::new(VisualCitationKind::Table, "png", "manual.pdf", 5);
        let refs = BTreeSet::from([9]);
        let score = score_link_confidence(&citation, QsrType::Brand, &refs);
        assert_eq!(score, 0.6);
        assert!(score >= MIN_LINK_CONFIDENCE);
    }

    #[test]
    fn link_kind_defaults_to_references_for_unlisted_pair() {
        assert_eq!(
            VisualLinkKind::infer(VisualCitationKind::Photo, QsrType::Brand),
            VisualLinkKind::References
        );
    }
}
