//! Fine-grained relevance scoring for retrieved chunks.
//!
//! The cross-encoder service is the primary scorer; `lexical` provides the
//! deterministic fallback used when a per-candidate call fails, so scoring
//! never blocks selection on a single failure.

pub mod http;
pub mod lexical;

use anyhow::Result;
use async_trait::async_trait;

pub use http::HttpReranker;
pub use lexical::{lexical_overlap_score, RERANK_SCORE_MAX, RERANK_SCORE_MIN};

#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score one (query, passage) pair. Cross-encoder logits,
    /// approximately [-10, 10]; higher is more relevant.
    async fn score(&self, query: &str, passage: &str) -> Result<f32>;
}
