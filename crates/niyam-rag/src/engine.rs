//! Request pipeline.
//!
//! CLASSIFY -> retrieve -> SELECT -> ASSEMBLE -> GENERATE -> PARSE ->
//! ATTRIBUTE -> RESPOND. Every stage after retrieval absorbs its own
//! failures: a dead reranker degrades to lexical scores inside selection,
//! and a dead generation service degrades to an excerpt-only answer.
//! Requests are stateless; nothing persists past the returned answer.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::llm::Generator;
use crate::rag::{self, AdaptiveSelector, AssembledPrompt};
use crate::reranking::Reranker;
use crate::retrieval::Retriever;
use crate::telemetry::{QueryObserver, RequestSummary, TracingObserver};
use crate::types::{AttributedSource, Candidate, QueryAnswer, QueryType};

#[derive(Debug, Error)]
pub enum EngineError {
    /// The retrieval collaborator is the only stage whose failure has no
    /// in-core fallback.
    #[error("retrieval failed: {0}")]
    Retrieval(#[source] anyhow::Error),
}

pub struct QueryEngine {
    retriever: Arc<dyn Retriever>,
    selector: AdaptiveSelector,
    generator: Option<Arc<dyn Generator>>,
    config: EngineConfig,
    observer: Arc<dyn QueryObserver>,
}

impl QueryEngine {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        reranker: Arc<dyn Reranker>,
        generator: Option<Arc<dyn Generator>>,
        config: EngineConfig,
    ) -> Self {
        let selector = AdaptiveSelector::new(reranker, config.selector.clone());
        Self {
            retriever,
            selector,
            generator,
            config,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Answer one query against the indexed corpus.
    pub async fn answer(&self, query: &str) -> Result<QueryAnswer, EngineError> {
        let query_type = rag::classify(query);
        let budget = self.config.selection.for_type(query_type);
        tracing::debug!(
            query_type = query_type.as_str(),
            retrieve_limit = budget.retrieve_limit,
            "Classified query"
        );

        let candidates = self
            .retriever
            .retrieve(query, budget.retrieve_limit)
            .await
            .map_err(EngineError::Retrieval)?;

        if candidates.is_empty() {
            tracing::info!("No candidates retrieved, returning empty-corpus answer");
            return Ok(no_information_answer(query_type));
        }

        let selection = self.selector.select(query, candidates, &budget).await;
        let assembled = rag::assemble(query, &selection.selected);

        let raw_answer = self.generate(&assembled).await;
        let degraded = raw_answer.is_none();

        let answer = match raw_answer {
            Some(text) => {
                let attributed = rag::attribute(&text, &assembled.labels, &selection.selected);
                QueryAnswer {
                    answer: attributed.answer,
                    sources: attributed.sources,
                    query_type,
                    degraded: false,
                }
            }
            None => excerpt_answer(query_type, &assembled.labels, &selection.selected),
        };

        let summary =
            RequestSummary::from_selection(query_type, budget.max_tokens, &selection, degraded);
        self.observer.on_request(&summary);

        Ok(answer)
    }

    /// Best-effort generation with a hard timeout. None means degrade.
    async fn generate(&self, assembled: &AssembledPrompt) -> Option<String> {
        let generator = self.generator.as_ref()?;
        let cap = Duration::from_secs(self.config.generation.timeout_secs);
        match tokio::time::timeout(cap, generator.generate(&assembled.prompt)).await {
            Ok(Ok(text)) => Some(text),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Generation failed, falling back to excerpts");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.config.generation.timeout_secs,
                    "Generation timed out, falling back to excerpts"
                );
                None
            }
        }
    }
}

fn no_information_answer(query_type: QueryType) -> QueryAnswer {
    QueryAnswer {
        answer: "No relevant information was found in the indexed compliance documents \
                 for this question."
            .to_string(),
        sources: Vec::new(),
        query_type,
        degraded: true,
    }
}

/// Excerpt-only answer used when the generation service is unavailable:
/// the selected passages under their alphabetic labels, plus an explicit
/// unavailability note.
fn excerpt_answer(query_type: QueryType, labels: &[char], selected: &[Candidate]) -> QueryAnswer {
    let mut body = String::from(
        "The answer service is currently unavailable. \
         The most relevant passages found are shown below.\n",
    );
    let mut sources = Vec::new();
    for (i, (label, chunk)) in labels.iter().zip(selected).enumerate() {
        let excerpt = rag::attribution::excerpt_of(&chunk.text);
        let page = chunk
            .metadata
            .page
            .map(|p| format!(", p. {}", p))
            .unwrap_or_default();
        body.push_str(&format!(
            "\n[{}] ({}{}) {}\n",
            label, chunk.metadata.document, page, excerpt
        ));
        sources.push(AttributedSource {
            reference: format!("[{}]", i + 1),
            document: chunk.metadata.document.clone(),
            page: chunk.metadata.page,
            section: chunk.metadata.section.clone(),
            excerpt,
            label: *label,
        });
    }
    QueryAnswer { answer: body, sources, query_type, degraded: true }
}
