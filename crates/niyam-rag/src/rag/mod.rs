//! Query pipeline stages: classification, adaptive selection, prompt
//! assembly, and citation attribution.

pub mod attribution;
pub mod prompt;
pub mod query_classifier;
pub mod selector;

pub use attribution::{attribute, AttributedAnswer};
pub use prompt::{assemble, AssembledPrompt};
pub use query_classifier::classify;
pub use selector::AdaptiveSelector;
