// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Visual-citation preservation (C7) - pure decision logic
//!
//! The actual PDF image/table extraction and file I/O live in the
//! infrastructure layer; this module holds the parts of §4.7 that are pure
//! functions of already-read bytes: content hashing, the preserved/failed
//! decision, and the fallback-citation rule from the resolved Open Question
//! in SPEC_FULL.md §9.

use sha2::{Digest, Sha256};

use crate::entities::PreservationState;

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Decides the preservation state of a citation whose bytes were
/// successfully extracted and written to `content/<citation_id>.<ext>`.
pub fn verify_preservation(stored_bytes: Option<&[u8]>, expected_hash: &str) -> PreservationState {
    match stored_bytes {
        None => PreservationState::MissingBytes,
        Some(bytes) => {
            if content_hash(bytes) == expected_hash {
                PreservationState::Preserved
            } else {
                PreservationState::HashMismatch
            }
        }
    }
}

/// When the host PDF library is unavailable, C7 falls back to a
/// text-reference heuristic and emits low-confidence placeholder citations.
/// Resolved Open Question: such a citation is `preserved` only when the
/// fallback text blob is itself persisted and hashed; otherwise a downstream
/// consumer has nothing to render, so it is marked `failed`.
pub fn fallback_preservation_state(fallback_text_persisted: bool) -> PreservationState {
    if fallback_text_persisted {
        PreservationState::Preserved
    } else {
        PreservationState::Failed
    }
}

/// Scans extracted text for citation reference tokens (`figure|diagram|table|…`)
/// used by the fallback heuristic when the PDF image library is unavailable.
pub fn find_fallback_reference_tokens(text: &str) -> Vec<&str> {
    const TOKENS: &[&str] = &["figure", "diagram", "table", "chart", "schematic", "photo", "image"];
    let lower = text.to_lowercase();
    TOKENS.iter().filter(|t| lower.contains(*t)).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_hash_is_preserved() {
        let bytes = b"some png bytes";
        let hash = content_hash(bytes);
        assert_eq!(verify_preservation(Some(bytes), &hash), PreservationState::Preserved);
    }

    #[test]
    fn mismatched_hash_is_flagged() {
        let bytes = b"some png bytes";
        assert_eq!(
            verify_preservation(Some(bytes), "deadbeef"),
            PreservationState::HashMismatch
        );
    }

    #[test]
    fn missing_bytes_is_flagged() {
        assert_eq!(verify_preservation(None, "deadbeef"), PreservationState::MissingBytes);
    }

    #[test]
    fn unpersisted_fallback_text_is_failed_not_preserved() {
        assert_eq!(fallback_preservation_state(false), PreservationState::Failed);
        assert_eq!(fallback_preservation_state(true), PreservationState::Preserved);
    }
}
