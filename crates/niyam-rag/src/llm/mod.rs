//! Generation collaborator seam.

pub mod external;

use anyhow::Result;
use async_trait::async_trait;

pub use external::ExternalGenerator;

#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate free text for an assembled prompt. The output may contain
    /// inline `[X]` citation markers referring to prompt labels.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
