//! Per-request telemetry.
//!
//! One structured summary per query, intended for offline tuning of the
//! budget tables and thresholds. Purely observational: correctness never
//! depends on an observer being installed.

use serde::Serialize;

use crate::types::{QueryType, SelectionResult, StopReason};

#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
    pub query_type: QueryType,
    pub max_tokens: usize,
    pub tokens_used: usize,
    pub chunks_considered: usize,
    pub chunks_selected: usize,
    pub chunks_skipped: usize,
    pub chunks_reranked: usize,
    pub avg_rerank_score: f32,
    pub stop_reason: StopReason,
    pub degraded: bool,
}

impl RequestSummary {
    pub fn from_selection(
        query_type: QueryType,
        max_tokens: usize,
        selection: &SelectionResult,
        degraded: bool,
    ) -> Self {
        Self {
            query_type,
            max_tokens,
            tokens_used: selection.tokens_used,
            chunks_considered: selection.chunks_considered,
            chunks_selected: selection.selected.len(),
            chunks_skipped: selection.chunks_skipped,
            chunks_reranked: selection.chunks_reranked,
            avg_rerank_score: selection.avg_rerank_score,
            stop_reason: selection.stop_reason,
            degraded,
        }
    }
}

pub trait QueryObserver: Send + Sync {
    fn on_request(&self, summary: &RequestSummary);
}

/// Default observer: logs the summary through `tracing`.
pub struct TracingObserver;

impl QueryObserver for TracingObserver {
    fn on_request(&self, summary: &RequestSummary) {
        tracing::info!(
            query_type = summary.query_type.as_str(),
            max_tokens = summary.max_tokens,
            tokens_used = summary.tokens_used,
            considered = summary.chunks_considered,
            selected = summary.chunks_selected,
            skipped = summary.chunks_skipped,
            reranked = summary.chunks_reranked,
            avg_rerank_score = summary.avg_rerank_score,
            stop_reason = ?summary.stop_reason,
            degraded = summary.degraded,
            "Query processed"
        );
    }
}
