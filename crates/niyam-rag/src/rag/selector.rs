//! Adaptive chunk selection.
//!
//! Turns a ranked candidate pool into a bounded, budget-respecting subset:
//!
//! 1. score every candidate upfront (bounded-concurrency reranker calls,
//!    lexical fallback per failure) so one quality threshold applies to the
//!    whole pool;
//! 2. scan in vector-score order — vector similarity fixes the visit order,
//!    the rerank score only gates admission;
//! 3. admit through an adaptive percentile gate that starts at the top 5%
//!    of rerank scores and widens by one step whenever a full pass admits
//!    nothing;
//! 4. stop on budget, gate exhaustion, or the pass cap; force-admit the top
//!    vector candidate if nothing else made it through.
//!
//! The algorithm is pure once scores are in; callers observe the outcome
//! through the returned `SelectionResult`, not interleaved logging.

use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::config::SelectorTuning;
use crate::reranking::{lexical_overlap_score, Reranker, RERANK_SCORE_MIN};
use crate::types::{
    estimate_tokens, Candidate, SelectionConfig, SelectionDecision, SelectionResult, StopReason,
    Verdict,
};

/// Scan/expand loop state. Explicit, so no variable doubles as an exit
/// sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectionState {
    Scanning,
    Expanding,
    Done,
}

pub struct AdaptiveSelector {
    reranker: Arc<dyn Reranker>,
    tuning: SelectorTuning,
}

impl AdaptiveSelector {
    pub fn new(reranker: Arc<dyn Reranker>, tuning: SelectorTuning) -> Self {
        Self { reranker, tuning }
    }

    /// Select a bounded subset of `candidates` for `query` under `budget`.
    /// Never returns an empty selection for a non-empty pool.
    pub async fn select(
        &self,
        query: &str,
        mut candidates: Vec<Candidate>,
        budget: &SelectionConfig,
    ) -> SelectionResult {
        let chunks_considered = candidates.len();
        if candidates.is_empty() {
            return SelectionResult {
                selected: Vec::new(),
                tokens_used: 0,
                stop_reason: StopReason::PoolExhausted,
                chunks_considered: 0,
                chunks_skipped: 0,
                chunks_reranked: 0,
                avg_rerank_score: 0.0,
                profile: None,
            };
        }

        // Step 1: upfront scoring. A globally consistent threshold needs the
        // whole pool scored; cost is bounded by retrieve_limit.
        let chunks_reranked = self.score_all(query, &mut candidates).await;

        // Step 2: visit order is vector similarity, descending.
        candidates.sort_by(|a, b| {
            b.vector_score
                .partial_cmp(&a.vector_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut scores_desc: Vec<f32> = candidates
            .iter()
            .map(|c| c.rerank_score.unwrap_or(RERANK_SCORE_MIN))
            .collect();
        scores_desc.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let avg_rerank_score = scores_desc.iter().sum::<f32>() / scores_desc.len() as f32;

        // Steps 3-4: scan/expand loop.
        let mut admitted = vec![false; candidates.len()];
        let mut admission_order: Vec<usize> = Vec::new();
        let mut tokens_used = 0usize;
        let mut percentile = self.tuning.percentile_start;
        let mut pass = 0usize;
        let mut state = SelectionState::Scanning;
        let mut stop_reason = StopReason::PoolExhausted;
        let mut profile: Option<Vec<SelectionDecision>> =
            self.tuning.keep_profile.then(Vec::new);

        while state != SelectionState::Done {
            match state {
                SelectionState::Scanning => {
                    if pass >= self.tuning.max_passes {
                        stop_reason = StopReason::PassLimit;
                        state = SelectionState::Done;
                        continue;
                    }
                    pass += 1;
                    let threshold = percentile_cut(&scores_desc, percentile);
                    let outcome = scan_pass(
                        &candidates,
                        &mut admitted,
                        &mut admission_order,
                        &mut tokens_used,
                        budget,
                        self.tuning.vector_threshold,
                        threshold,
                        pass,
                        percentile,
                        profile.as_mut(),
                    );
                    if outcome.budget_stop {
                        stop_reason = StopReason::BudgetFilled;
                        state = SelectionState::Done;
                    } else if outcome.admitted == 0 {
                        state = SelectionState::Expanding;
                    }
                    // Otherwise rescan at the same threshold; the next pass
                    // admits nothing and triggers expansion.
                }
                SelectionState::Expanding => {
                    if percentile >= 100.0 {
                        stop_reason = StopReason::PoolExhausted;
                        state = SelectionState::Done;
                    } else {
                        // Monotonically non-decreasing within one call.
                        percentile += self.tuning.percentile_step;
                        state = SelectionState::Scanning;
                    }
                }
                SelectionState::Done => {}
            }
        }

        // Step 6: fallback guarantee. candidates[0] is the top vector hit.
        if admission_order.is_empty() {
            admitted[0] = true;
            admission_order.push(0);
            tokens_used += estimate_tokens(&candidates[0].text);
            stop_reason = StopReason::ForcedFallback;
            if let Some(trace) = profile.as_mut() {
                trace.push(SelectionDecision {
                    candidate: candidates[0].id,
                    pass,
                    percentile,
                    threshold: RERANK_SCORE_MIN,
                    verdict: Verdict::Forced,
                });
            }
        }

        let selected: Vec<Candidate> = admission_order
            .iter()
            .map(|&i| candidates[i].clone())
            .collect();
        let chunks_skipped = chunks_considered - selected.len();

        SelectionResult {
            selected,
            tokens_used,
            stop_reason,
            chunks_considered,
            chunks_skipped,
            chunks_reranked,
            avg_rerank_score,
            profile,
        }
    }

    /// Score every unscored candidate, at most `score_concurrency` reranker
    /// calls in flight. Per-candidate failures substitute the lexical
    /// estimate and never abort the request. Returns how many scores came
    /// from the external reranker.
    async fn score_all(&self, query: &str, candidates: &mut [Candidate]) -> usize {
        let concurrency = self.tuning.score_concurrency.max(1);
        let reranker = &self.reranker;
        let scored: Vec<(f32, bool)> = stream::iter(candidates.iter().map(|candidate| {
            let existing = candidate.rerank_score;
            let text = &candidate.text;
            async move {
                if let Some(score) = existing {
                    return (score, false);
                }
                match reranker.score(query, text).await {
                    Ok(score) => (score, true),
                    Err(e) => {
                        tracing::debug!(error = %e, "Reranker call failed, using lexical fallback");
                        (lexical_overlap_score(query, text), false)
                    }
                }
            }
        }))
        .buffered(concurrency)
        .collect()
        .await;

        let mut reranked = 0;
        for (candidate, (score, from_reranker)) in candidates.iter_mut().zip(scored) {
            candidate.rerank_score = Some(score);
            if from_reranker {
                reranked += 1;
            }
        }
        reranked
    }
}

struct PassOutcome {
    admitted: usize,
    budget_stop: bool,
}

/// One full pass over the vector-ordered pool at a fixed threshold.
#[allow(clippy::too_many_arguments)]
fn scan_pass(
    candidates: &[Candidate],
    admitted: &mut [bool],
    admission_order: &mut Vec<usize>,
    tokens_used: &mut usize,
    budget: &SelectionConfig,
    vector_threshold: f32,
    rerank_threshold: f32,
    pass: usize,
    percentile: f32,
    mut profile: Option<&mut Vec<SelectionDecision>>,
) -> PassOutcome {
    let mut admitted_this_pass = 0;
    let mut record = |trace: &mut Option<&mut Vec<SelectionDecision>>,
                      candidate: &Candidate,
                      verdict: Verdict| {
        if let Some(trace) = trace.as_mut() {
            trace.push(SelectionDecision {
                candidate: candidate.id,
                pass,
                percentile,
                threshold: rerank_threshold,
                verdict,
            });
        }
    };

    for (i, candidate) in candidates.iter().enumerate() {
        if admitted[i] {
            continue;
        }
        if candidate.vector_score < vector_threshold {
            record(&mut profile, candidate, Verdict::BelowVectorThreshold);
            continue;
        }
        let rerank = candidate.rerank_score.unwrap_or(RERANK_SCORE_MIN);
        if rerank < rerank_threshold {
            record(&mut profile, candidate, Verdict::BelowRerankThreshold);
            continue;
        }
        let cost = estimate_tokens(&candidate.text);
        if *tokens_used + cost > budget.max_tokens {
            if *tokens_used >= budget.min_tokens {
                // Minimum satisfied: crossing the ceiling is a stop signal.
                return PassOutcome { admitted: admitted_this_pass, budget_stop: true };
            }
            // Minimum unmet: skip this one, a smaller chunk may still fit.
            record(&mut profile, candidate, Verdict::OverBudget);
            continue;
        }
        admitted[i] = true;
        admission_order.push(i);
        *tokens_used += cost;
        admitted_this_pass += 1;
        record(&mut profile, candidate, Verdict::Admitted);
    }

    PassOutcome { admitted: admitted_this_pass, budget_stop: false }
}

/// Rerank score at the given top-percentile of the pool: with p = 5, only
/// the top 5% of scores clear the cut. Scores must be sorted descending.
fn percentile_cut(scores_desc: &[f32], percentile: f32) -> f32 {
    let len = scores_desc.len();
    let keep = ((len as f32 * percentile / 100.0).ceil() as usize).clamp(1, len);
    scores_desc[keep - 1]
}
