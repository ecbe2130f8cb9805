//! Compliance-document question answering.
//!
//! Answers natural-language questions against a compliance corpus by
//! classifying the query, selecting a bounded, quality-gated subset of
//! retrieved chunks, asking a generation service for a cited answer, and
//! mapping the inline citation markers back to structured sources.
//!
//! Retrieval, reranking, and generation are external collaborators behind
//! the [`retrieval::Retriever`], [`reranking::Reranker`], and
//! [`llm::Generator`] traits; this crate owns the selection and
//! attribution logic between them.

pub mod config;
pub mod engine;
pub mod llm;
pub mod rag;
pub mod reranking;
pub mod retrieval;
pub mod telemetry;
pub mod types;

// Re-export primary types for convenience
pub use config::{EngineConfig, SelectionTable, SelectorTuning};
pub use engine::{EngineError, QueryEngine};
pub use rag::{classify, AdaptiveSelector};
pub use types::{
    AttributedSource, Candidate, ChunkMetadata, QueryAnswer, QueryType, SelectionConfig,
    SelectionResult, StopReason,
};
