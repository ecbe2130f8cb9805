//! Retrieval collaborator seam.
//!
//! Vector search itself lives outside this core; the engine only consumes
//! a ranked candidate list and treats each score as vector similarity.

use anyhow::Result;
use async_trait::async_trait;

use crate::types::Candidate;

#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `limit` candidates ranked by vector similarity,
    /// best first, with source metadata already attached.
    ///
    /// This is the one collaborator whose failure propagates to the
    /// caller — without candidates there is nothing to answer from.
    async fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<Candidate>>;
}
