//! HTTP client for the cross-encoder reranking service.
//!
//! The service exposes `POST /rerank` taking `{"query", "documents"}` and
//! returning raw logit scores, plus `GET /health` for readiness checks.
//! Responses carry either a `scores` array aligned with the input order or
//! a `rankings` array of `{index, score}` pairs; both forms are accepted.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::config::RerankerConfig;
use crate::reranking::Reranker;

pub struct HttpReranker {
    client: Client,
    base_url: String,
}

impl HttpReranker {
    pub fn new(config: &RerankerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Check the service's `/health` endpoint.
    pub async fn is_healthy(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Reranker health check failed");
                false
            }
        }
    }

    /// Score a batch of documents against one query in a single call.
    /// Returned scores align with the input document order.
    pub async fn score_batch(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/rerank", self.base_url);
        let body = serde_json::json!({ "query": query, "documents": documents });
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("Reranker request to {} timed out", url)
                } else if e.is_connect() {
                    anyhow!("Failed to connect to reranker at {}: {}", url, e)
                } else {
                    anyhow!("Reranker request to {} failed: {}", url, e)
                }
            })?;
        let json: Value = response.error_for_status()?.json().await?;
        parse_rerank_response(&json, documents.len())
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn score(&self, query: &str, passage: &str) -> Result<f32> {
        let scores = self.score_batch(query, &[passage.to_string()]).await?;
        scores
            .first()
            .copied()
            .ok_or_else(|| anyhow!("Reranker returned no score for single-document request"))
    }
}

/// Parse either response form into input-order scores.
fn parse_rerank_response(json: &Value, doc_count: usize) -> Result<Vec<f32>> {
    if let Some(scores) = json.get("scores").and_then(|v| v.as_array()) {
        if scores.len() != doc_count {
            return Err(anyhow!(
                "Reranker returned {} scores for {} documents",
                scores.len(),
                doc_count
            ));
        }
        return scores
            .iter()
            .map(|s| {
                s.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| anyhow!("Non-numeric score in reranker response"))
            })
            .collect();
    }

    if let Some(rankings) = json.get("rankings").and_then(|v| v.as_array()) {
        let mut scores = vec![0.0f32; doc_count];
        let mut filled = vec![false; doc_count];
        for item in rankings {
            let index = item
                .get("index")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| anyhow!("Reranker ranking entry missing index"))?
                as usize;
            let score = item
                .get("score")
                .and_then(|v| v.as_f64())
                .ok_or_else(|| anyhow!("Reranker ranking entry missing score"))?
                as f32;
            if index < doc_count {
                scores[index] = score;
                filled[index] = true;
            }
        }
        if filled.iter().any(|f| !f) {
            return Err(anyhow!("Reranker rankings did not cover all documents"));
        }
        return Ok(scores);
    }

    Err(anyhow!("Reranker response has neither scores nor rankings array"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scores_array() {
        let json = serde_json::json!({ "scores": [4.2, -1.5, 0.0] });
        let scores = parse_rerank_response(&json, 3).unwrap();
        assert_eq!(scores, vec![4.2, -1.5, 0.0]);
    }

    #[test]
    fn test_parse_rankings_aligned_by_index() {
        let json = serde_json::json!({
            "rankings": [
                { "index": 1, "score": 0.2 },
                { "index": 0, "score": 0.9 }
            ]
        });
        let scores = parse_rerank_response(&json, 2).unwrap();
        assert_eq!(scores, vec![0.9, 0.2]);
    }

    #[test]
    fn test_parse_rejects_count_mismatch() {
        let json = serde_json::json!({ "scores": [1.0] });
        assert!(parse_rerank_response(&json, 2).is_err());
    }

    #[test]
    fn test_parse_rejects_incomplete_rankings() {
        let json = serde_json::json!({ "rankings": [{ "index": 0, "score": 1.0 }] });
        assert!(parse_rerank_response(&json, 2).is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_shape() {
        let json = serde_json::json!({ "error": "model not loaded" });
        assert!(parse_rerank_response(&json, 1).is_err());
    }
}
