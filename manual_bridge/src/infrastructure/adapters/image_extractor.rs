// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Image extractor adapter
//!
//! Visual-citation extraction algorithms are a named non-goal; this adapter
//! always takes the §4.7 fallback path - it never has a real PDF image
//! library to call - so `extract_images` returns no citations and
//! `bridge_service` relies entirely on the text-reference heuristic in
//! [`manual_bridge_domain::preservation`] to synthesize placeholder
//! citations from extracted text.

use async_trait::async_trait;

use manual_bridge_domain::entities::VisualCitation;
use manual_bridge_domain::error::PipelineError;
use manual_bridge_domain::repositories::ImageExtractor;

pub struct UnavailableImageExtractor;

#[async_trait]
impl ImageExtractor for UnavailableImageExtractor {
    async fn extract_images(&self, _pdf_bytes: &[u8]) -> Result<Vec<VisualCitation>, PipelineError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_returns_no_citations() {
        let extractor = UnavailableImageExtractor;
        assert!(extractor.extract_images(b"anything").await.unwrap().is_empty());
    }
}
