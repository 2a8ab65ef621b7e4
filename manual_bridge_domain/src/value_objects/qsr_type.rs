// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};

/// QSR-domain entity classification, assigned by keyword sets before
/// deduplication runs (the glossary's "QSR qsr_type keyword sets").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QsrType {
    Equipment,
    Procedure,
    Component,
    SafetyProtocol,
    Specification,
    Brand,
    Model,
    Ingredient,
    Location,
}

impl QsrType {
    pub fn as_str(self) -> &'static str {
        match self {
            QsrType::Equipment => "equipment",
            QsrType::Procedure => "procedure",
            QsrType::Component => "component",
            QsrType::SafetyProtocol => "safety_protocol",
            QsrType::Specification => "specification",
            QsrType::Brand => "brand",
            QsrType::Model => "model",
            QsrType::Ingredient => "ingredient",
            QsrType::Location => "location",
        }
    }

    /// Classifies a normalized entity name by the keyword sets in the glossary.
    /// Falls back to `Equipment` when no keyword matches, since an
    /// unclassified QSR manual noun is most often a piece of hardware.
    pub fn classify(normalized_name: &str) -> QsrType {
        const EQUIPMENT: &[&str] = &["machine", "equipment", "fryer", "grill", "freezer", "mixer", "slicer", "tool"];
        const PROCEDURE: &[&str] = &["cleaning", "maintenance", "procedure", "process", "protocol", "inspection"];
        const COMPONENT: &[&str] = &["pump", "motor", "valve", "sensor", "control", "panel", "compressor"];
        const SAFETY: &[&str] = &["safety", "warning", "caution", "hazard", "guideline"];

        if SAFETY.iter().any(|kw| normalized_name.contains(kw)) {
            QsrType::SafetyProtocol
        } else if PROCEDURE.iter().any(|kw| normalized_name.contains(kw)) {
            QsrType::Procedure
        } else if COMPONENT.iter().any(|kw| normalized_name.contains(kw)) {
            QsrType::Component
        } else if EQUIPMENT.iter().any(|kw| normalized_name.contains(kw)) {
            QsrType::Equipment
        } else {
            QsrType::Equipment
        }
    }

    /// Cross-type duplicate matches are only permitted between these related
    /// pairs (§4.6); everything else must match within its own type.
    pub fn compatible_for_dedup(self, other: QsrType) -> bool {
        if self == other {
            return true;
        }
        let pair = (self, other);
        matches!(
            pair,
            (QsrType::Equipment, QsrType::Component)
                | (QsrType::Component, QsrType::Equipment)
                | (QsrType::Procedure, QsrType::SafetyProtocol)
                | (QsrType::SafetyProtocol, QsrType::Procedure)
                | (QsrType::Specification, QsrType::Component)
                | (QsrType::Component, QsrType::Specification)
        )
    }
}

impl std::fmt::Display for QsrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_cleaning_as_procedure() {
        assert_eq!(QsrType::classify("daily cleaning procedure"), QsrType::Procedure);
    }

    #[test]
    fn classifies_fryer_as_equipment() {
        assert_eq!(QsrType::classify("taylor c602 fryer"), QsrType::Equipment);
    }

    #[test]
    fn equipment_and_component_are_dedup_compatible() {
        assert!(QsrType::Equipment.compatible_for_dedup(QsrType::Component));
        assert!(!QsrType::Equipment.compatible_for_dedup(QsrType::Procedure));
    }
}
