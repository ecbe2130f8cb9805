use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Source location attached to a retrieved chunk by the retrieval service.
/// Page/section detection happens upstream; this core only carries it through
/// to the final source list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub document: String,
    pub page: Option<u32>,
    pub section: Option<String>,
    pub chunk_index: u32,
}

/// A retrieved text chunk carrying a vector-similarity score in [0, 1].
/// Produced externally per request; immutable once selection begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub text: String,
    pub vector_score: f32,
    /// Cross-encoder relevance score, roughly [-10, 10]. None until scored.
    pub rerank_score: Option<f32>,
    pub metadata: ChunkMetadata,
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Definition,
    SpecificSection,
    YesNo,
    List,
    Procedure,
    Analysis,
    General,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Definition => "definition",
            QueryType::SpecificSection => "specific_section",
            QueryType::YesNo => "yes_no",
            QueryType::List => "list",
            QueryType::Procedure => "procedure",
            QueryType::Analysis => "analysis",
            QueryType::General => "general",
        }
    }
}

/// Per-query-type retrieval and token budgets. Static configuration,
/// injected into the selector rather than read from globals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Soft ceiling on total estimated tokens of selected chunk text.
    pub max_tokens: usize,
    /// Below this, an over-budget candidate is skipped instead of stopping the scan.
    pub min_tokens: usize,
    /// How many candidates to request from the retrieval service.
    pub retrieve_limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Token budget filled with the minimum already satisfied.
    BudgetFilled,
    /// Percentile gate widened past 100% with nothing left to admit.
    PoolExhausted,
    /// Safety valve: the 20-pass cap was hit.
    PassLimit,
    /// Nothing cleared the gates; the top vector candidate was force-admitted.
    ForcedFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Admitted,
    BelowVectorThreshold,
    BelowRerankThreshold,
    OverBudget,
    Forced,
}

/// One admission decision, recorded only when profiling is enabled.
/// Offline tuning data, not part of the functional contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionDecision {
    pub candidate: Uuid,
    pub pass: usize,
    pub percentile: f32,
    pub threshold: f32,
    pub verdict: Verdict,
}

/// Output of one selection call: admitted chunks in admission order plus
/// aggregate counters for telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionResult {
    pub selected: Vec<Candidate>,
    pub tokens_used: usize,
    pub stop_reason: StopReason,
    pub chunks_considered: usize,
    pub chunks_skipped: usize,
    /// How many candidates were scored by the external reranker
    /// (the rest fell back to the lexical estimate).
    pub chunks_reranked: usize,
    pub avg_rerank_score: f32,
    pub profile: Option<Vec<SelectionDecision>>,
}

/// A resolved citation: inline marker rewritten to "[n]", pointing at a
/// human-readable source descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributedSource {
    /// Numeric marker as it appears in the rewritten answer, e.g. "[1]".
    pub reference: String,
    pub document: String,
    pub page: Option<u32>,
    pub section: Option<String>,
    /// First 200 characters of the cited chunk.
    pub excerpt: String,
    /// The request-scoped letter the generator used, e.g. 'A'.
    pub label: char,
}

/// Final response for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<AttributedSource>,
    pub query_type: QueryType,
    /// True when the answer was built without the generation service
    /// (excerpt-only fallback or empty candidate pool).
    pub degraded: bool,
}

/// Quick token estimate: ceil(chars * 0.25). Used for every token
/// computation in selection and prompt budgeting.
pub fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() + 3) / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_estimate_tokens_counts_chars_not_bytes() {
        // 4 multi-byte chars should still estimate as 1 token
        assert_eq!(estimate_tokens("éééé"), 1);
    }

    #[test]
    fn test_query_type_serde_round_trip() {
        let json = serde_json::to_string(&QueryType::SpecificSection).unwrap();
        assert_eq!(json, "\"specific_section\"");
        let back: QueryType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, QueryType::SpecificSection);
    }
}
