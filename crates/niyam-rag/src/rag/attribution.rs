//! Citation parsing and attribution.
//!
//! Scans generated text for inline `[X]` markers, resolves each label back
//! to the chunk it was assigned during prompt assembly, and rewrites the
//! markers as sequential numeric references with a matching source list.
//! This step degrades, never aborts: unknown labels are skipped, and an
//! answer without markers passes through byte-identical.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::{AttributedSource, Candidate};

static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([A-Z])\]").expect("label regex is valid"));

const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct AttributedAnswer {
    pub answer: String,
    pub sources: Vec<AttributedSource>,
}

/// Strip an optional leading "ANSWER:" prefix, case-insensitive.
pub fn strip_answer_prefix(text: &str) -> &str {
    let trimmed = text.trim_start();
    match trimmed.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("answer:") => trimmed[7..].trim_start(),
        _ => text,
    }
}

/// All citation labels in order of first appearance, deduplicated.
pub fn extract_labels(answer: &str) -> Vec<char> {
    let mut seen = Vec::new();
    for cap in LABEL_RE.captures_iter(answer) {
        let label = cap[1].chars().next().expect("single-letter capture");
        if !seen.contains(&label) {
            seen.push(label);
        }
    }
    seen
}

/// Map a raw generated answer back to structured sources.
///
/// `labels[i]` is the letter the assembler gave to `selected[i]`. Labels
/// that resolve get renumbered `[A]` -> `[1]`, `[B]` -> `[2]`, ... in order
/// of first appearance; unresolvable labels are left in place and produce
/// no source entry.
pub fn attribute(raw_answer: &str, labels: &[char], selected: &[Candidate]) -> AttributedAnswer {
    let mut answer = strip_answer_prefix(raw_answer).to_string();
    let used = extract_labels(&answer);

    let mut sources = Vec::new();
    for label in used {
        let Some(index) = labels.iter().position(|&l| l == label) else {
            tracing::warn!(label = %label, "Generated answer cites unknown label, skipping source");
            continue;
        };
        let Some(chunk) = selected.get(index) else {
            tracing::warn!(label = %label, "Label resolves past selection, skipping source");
            continue;
        };
        let number = sources.len() + 1;
        let reference = format!("[{}]", number);
        answer = answer.replace(&format!("[{}]", label), &reference);
        sources.push(AttributedSource {
            reference,
            document: chunk.metadata.document.clone(),
            page: chunk.metadata.page,
            section: chunk.metadata.section.clone(),
            excerpt: excerpt_of(&chunk.text),
            label,
        });
    }

    AttributedAnswer { answer, sources }
}

/// First 200 characters, with an ellipsis when truncated.
pub fn excerpt_of(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        text.to_string()
    } else {
        let mut excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
        excerpt.push_str("...");
        excerpt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use uuid::Uuid;

    use crate::types::ChunkMetadata;

    fn make_chunk(text: &str, document: &str) -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            text: text.to_string(),
            vector_score: 0.8,
            rerank_score: Some(5.0),
            metadata: ChunkMetadata {
                document: document.to_string(),
                page: Some(12),
                section: Some("7.2".to_string()),
                chunk_index: 0,
            },
            extra: HashMap::new(),
        }
    }

    #[test]
    fn test_round_trip_renumbering() {
        let selected = vec![make_chunk("chunk one", "a.pdf"), make_chunk("chunk two", "b.pdf")];
        let result = attribute("[A] and [B] agree, see also [A]", &['A', 'B'], &selected);
        assert_eq!(result.answer, "[1] and [2] agree, see also [1]");
        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.sources[0].reference, "[1]");
        assert_eq!(result.sources[0].label, 'A');
        assert_eq!(result.sources[0].document, "a.pdf");
        assert_eq!(result.sources[1].reference, "[2]");
        assert_eq!(result.sources[1].document, "b.pdf");
    }

    #[test]
    fn test_first_appearance_order_wins() {
        let selected = vec![make_chunk("one", "a.pdf"), make_chunk("two", "b.pdf")];
        // B appears before A, so B becomes [1].
        let result = attribute("[B] then [A]", &['A', 'B'], &selected);
        assert_eq!(result.answer, "[1] then [2]");
        assert_eq!(result.sources[0].document, "b.pdf");
        assert_eq!(result.sources[1].document, "a.pdf");
    }

    #[test]
    fn test_no_markers_returns_byte_identical_answer() {
        let selected = vec![make_chunk("one", "a.pdf")];
        let input = "The code requires two exits per floor.";
        let result = attribute(input, &['A'], &selected);
        assert_eq!(result.answer, input);
        assert!(result.sources.is_empty());
    }

    #[test]
    fn test_unknown_label_skipped_not_fatal() {
        let selected = vec![make_chunk("one", "a.pdf")];
        let result = attribute("[A] is clear but [Q] is not", &['A'], &selected);
        assert_eq!(result.sources.len(), 1);
        // Resolved label renumbered, unknown left untouched.
        assert_eq!(result.answer, "[1] is clear but [Q] is not");
    }

    #[test]
    fn test_strips_answer_prefix() {
        let selected = vec![make_chunk("one", "a.pdf")];
        let result = attribute("ANSWER: [A] covers this.", &['A'], &selected);
        assert_eq!(result.answer, "[1] covers this.");
        let result = attribute("answer:   [A] covers this.", &['A'], &selected);
        assert_eq!(result.answer, "[1] covers this.");
    }

    #[test]
    fn test_excerpt_truncated_at_200_chars() {
        let long_text = "x".repeat(450);
        let selected = vec![make_chunk(&long_text, "a.pdf")];
        let result = attribute("[A]", &['A'], &selected);
        let excerpt = &result.sources[0].excerpt;
        assert_eq!(excerpt.chars().count(), 203);
        assert!(excerpt.ends_with("..."));
    }

    #[test]
    fn test_short_excerpt_not_padded() {
        let selected = vec![make_chunk("short text", "a.pdf")];
        let result = attribute("[A]", &['A'], &selected);
        assert_eq!(result.sources[0].excerpt, "short text");
    }

    #[test]
    fn test_extract_labels_dedup_order() {
        assert_eq!(extract_labels("[C] [A] [C] [B] [A]"), vec!['C', 'A', 'B']);
        assert!(extract_labels("no markers here").is_empty());
        // Lowercase and multi-letter brackets are not citation markers.
        assert!(extract_labels("[a] [AB] [1]").is_empty());
    }
}
