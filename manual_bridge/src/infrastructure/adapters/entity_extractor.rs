// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Entity extractor adapter
//!
//! The NLP/LLM internals of entity extraction are a named non-goal; this
//! adapter fulfills the [`EntityExtractor`] contract with a verb-pattern
//! heuristic (`<subject> requires|needs|demonstrates <object>`) sufficient
//! to drive the pipeline's dedup/graph-write/integrity stages end to end on
//! real manual text, and is meant to be replaced by a real extraction
//! service behind the same trait.

use std::collections::HashMap;

use async_trait::async_trait;

use manual_bridge_domain::error::PipelineError;
use manual_bridge_domain::repositories::{EntityExtractor, ExtractionResult, RawMention, RawRelationship};

const RELATIONSHIP_VERBS: &[&str] = &["requires", "needs", "demonstrates"];

fn title_case(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trims a sentence fragment down to a noun phrase: drops a leading article
/// and surrounding punctuation, title-cases the remainder.
fn clean_phrase(fragment: &str) -> Option<String> {
    let trimmed = fragment.trim().trim_matches(|c: char| c.is_ascii_punctuation());
    let without_article = trimmed.strip_prefix("the ").or_else(|| trimmed.strip_prefix("The ")).unwrap_or(trimmed);
    let cleaned = without_article.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(title_case(cleaned))
    }
}

fn mention_id(name: &str, page: u32, by_name: &mut HashMap<String, String>, mentions: &mut Vec<RawMention>, next_id: &mut usize) -> String {
    if let Some(id) = by_name.get(name) {
        return id.clone();
    }
    let id = format!("m{next_id}");
    *next_id += 1;
    mentions.push(RawMention {
        local_id: id.clone(),
        name: name.to_string(),
        page,
        properties: HashMap::new(),
    });
    by_name.insert(name.to_string(), id.clone());
    id
}

pub struct HeuristicEntityExtractor;

#[async_trait]
impl EntityExtractor for HeuristicEntityExtractor {
    async fn extract_entities(&self, text: &str) -> Result<ExtractionResult, PipelineError> {
        let mut mentions = Vec::new();
        let mut relationships = Vec::new();
        let mut by_name: HashMap<String, String> = HashMap::new();
        let mut next_id = 0usize;

        // Extracted PDF text commonly carries a form-feed between pages; fall
        // back to treating the whole document as page 1 when it doesn't.
        for (page_index, page_text) in text.split('\u{000C}').enumerate() {
            let page = (page_index + 1) as u32;
            for sentence in page_text.split(['.', '!', '?']) {
                if sentence.trim().is_empty() {
                    continue;
                }
                let lower = sentence.to_lowercase();
                let Some(verb) = RELATIONSHIP_VERBS.iter().find(|v| lower.contains(**v)) else {
                    continue;
                };
                let Some(pos) = lower.find(verb) else { continue };
                let (left, right) = sentence.split_at(pos);
                let right = &right[verb.len()..];
                let (Some(subject), Some(object)) = (clean_phrase(left), clean_phrase(right)) else {
                    continue;
                };
                let source_id = mention_id(&subject, page, &mut by_name, &mut mentions, &mut next_id);
                let target_id = mention_id(&object, page, &mut by_name, &mut mentions, &mut next_id);
                relationships.push(RawRelationship {
                    source_local_id: source_id,
                    target_local_id: target_id,
                    relationship_type: (*verb).to_string(),
                });
            }
        }

        Ok(ExtractionResult { entities: mentions, relationships })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn extracts_subject_and_object_around_requires() {
        let extractor = HeuristicEntityExtractor;
        let result = extractor.extract_entities("Taylor C602 requires daily cleaning.").await.unwrap();
        assert_eq!(result.entities.len(), 2);
        assert_eq!(result.relationships.len(), 1);
        assert_eq!(result.relationships[0].relationship_type, "requires");
        let names: Vec<_> = result.entities.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"Taylor C602"));
    }

    #[tokio::test]
    async fn repeated_subject_across_sentences_reuses_local_id() {
        let extractor = HeuristicEntityExtractor;
        let result = extractor
            .extract_entities("Taylor C602 requires daily cleaning. Taylor C602 needs monthly service.")
            .await
            .unwrap();
        let taylor_mentions = result.entities.iter().filter(|e| e.name == "Taylor C602").count();
        assert_eq!(taylor_mentions, 1);
        assert_eq!(result.relationships.len(), 2);
    }

    #[tokio::test]
    async fn sentence_without_a_known_verb_yields_nothing() {
        let extractor = HeuristicEntityExtractor;
        let result = extractor.extract_entities("This is a plain sentence with no pattern.").await.unwrap();
        assert!(result.entities.is_empty());
        assert!(result.relationships.is_empty());
    }
}
