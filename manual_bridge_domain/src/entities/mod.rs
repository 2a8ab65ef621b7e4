// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain entities: objects with identity that persist through state changes.

mod process;
mod qsr_entity;
mod relationship;
mod visual_citation;

pub use process::{Process, StageHistoryEntry, TerminalState};
pub use qsr_entity::QsrEntity;
pub use relationship::Relationship;
pub use visual_citation::{
    score_link_confidence, BoundingBox, PreservationState, VisualCitation, VisualCitationKind, VisualEntityLink, VisualLinkKind,
    MIN_LINK_CONFIDENCE,
};
