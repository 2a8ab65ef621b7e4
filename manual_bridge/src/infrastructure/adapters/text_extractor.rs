// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Text extractor adapter
//!
//! The PDF text-extraction algorithm itself is out of scope (§4.4 treats it
//! as an external interface); this adapter fulfills the
//! [`TextExtractor`] contract with a lossy best-effort decode of the PDF
//! byte stream, which is sufficient for a manual whose body text is stored
//! uncompressed, and leaves room for a real PDF-text backend to be swapped
//! in behind the same trait without touching the pipeline.

use async_trait::async_trait;

use manual_bridge_domain::error::PipelineError;
use manual_bridge_domain::repositories::TextExtractor;

pub struct HeuristicTextExtractor;

#[async_trait]
impl TextExtractor for HeuristicTextExtractor {
    async fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, PipelineError> {
        let text: String = String::from_utf8_lossy(pdf_bytes)
            .chars()
            .filter(|c| c.is_ascii_graphic() || c.is_whitespace())
            .collect();
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(PipelineError::extraction_failed("no extractable text in document"));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_printable_text_from_bytes() {
        let extractor = HeuristicTextExtractor;
        let text = extractor.extract_text(b"Taylor C602 requires daily cleaning.").await.unwrap();
        assert!(text.contains("Taylor C602"));
    }

    #[tokio::test]
    async fn empty_input_fails_extraction() {
        let extractor = HeuristicTextExtractor;
        assert!(extractor.extract_text(&[]).await.is_err());
    }
}
