//! Deterministic lexical-overlap relevance estimate.
//!
//! Used as a per-candidate substitute when the cross-encoder call fails:
//! the fraction of distinct query terms present in the chunk text, mapped
//! linearly onto the cross-encoder's score range so the two are comparable
//! inside one selection call.

use std::collections::HashSet;

pub const RERANK_SCORE_MIN: f32 = -10.0;
pub const RERANK_SCORE_MAX: f32 = 10.0;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "in", "on", "at", "to", "for", "of", "and",
    "or", "but", "with", "from", "by", "as", "how", "what", "where", "when", "why", "which",
    "who", "i", "you", "me", "my", "your",
];

/// Query terms worth matching: lowercased, stop words removed, len > 2.
fn query_terms(query: &str) -> HashSet<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// Fraction of query terms present in `text`, mapped onto [-10, 10].
/// Same inputs always yield the same score.
pub fn lexical_overlap_score(query: &str, text: &str) -> f32 {
    let terms = query_terms(query);
    if terms.is_empty() {
        return RERANK_SCORE_MIN;
    }
    let text_lower = text.to_lowercase();
    let hits = terms.iter().filter(|t| text_lower.contains(t.as_str())).count();
    let overlap = hits as f32 / terms.len() as f32;
    RERANK_SCORE_MIN + overlap * (RERANK_SCORE_MAX - RERANK_SCORE_MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_overlap_maps_to_max() {
        let score = lexical_overlap_score(
            "occupancy classification",
            "The occupancy classification of a building determines egress requirements.",
        );
        assert_eq!(score, RERANK_SCORE_MAX);
    }

    #[test]
    fn test_no_overlap_maps_to_min() {
        let score = lexical_overlap_score("sprinkler spacing", "Unrelated text about parking.");
        assert_eq!(score, RERANK_SCORE_MIN);
    }

    #[test]
    fn test_partial_overlap_is_between() {
        let score = lexical_overlap_score("sprinkler spacing rules", "sprinkler heads only");
        assert!(score > RERANK_SCORE_MIN && score < RERANK_SCORE_MAX);
    }

    #[test]
    fn test_stop_words_ignored() {
        // "what is the" contributes nothing; only "deadline" counts
        let score = lexical_overlap_score("what is the deadline", "The deadline is Friday.");
        assert_eq!(score, RERANK_SCORE_MAX);
    }

    #[test]
    fn test_deterministic() {
        let a = lexical_overlap_score("exit widths", "Exit widths shall comply with Table 5.");
        let b = lexical_overlap_score("exit widths", "Exit widths shall comply with Table 5.");
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_query_scores_min() {
        assert_eq!(lexical_overlap_score("", "anything"), RERANK_SCORE_MIN);
    }
}
