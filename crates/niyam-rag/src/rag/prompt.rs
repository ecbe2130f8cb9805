//! Labeled context-block assembly.
//!
//! Each selected chunk gets a single uppercase letter in admission order;
//! the generator is asked to cite with those letters, and the attribution
//! step later rewrites them to numbered references.

use crate::types::Candidate;

/// Letters available for labeling. Realistic budgets keep selections far
/// below this; anything past 'Z' is dropped with a warning.
pub const MAX_LABELED_CHUNKS: usize = 26;

const CITE_INSTRUCTIONS: &str = "You are answering a question about compliance documents. \
Use ONLY the sources below as facts. Cite every factual statement with the label of the \
source it came from in square brackets, e.g. [A] or [C]. If the sources do not contain \
the answer, say so.";

#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub prompt: String,
    /// labels[i] is the letter assigned to the i-th selected chunk.
    pub labels: Vec<char>,
}

pub fn label_for(index: usize) -> Option<char> {
    (index < MAX_LABELED_CHUNKS).then(|| (b'A' + index as u8) as char)
}

/// Render the selection into a labeled prompt for the generation service.
pub fn assemble(query: &str, selected: &[Candidate]) -> AssembledPrompt {
    if selected.len() > MAX_LABELED_CHUNKS {
        tracing::warn!(
            selected = selected.len(),
            "Selection exceeds label alphabet, truncating context block"
        );
    }

    let mut labels = Vec::with_capacity(selected.len().min(MAX_LABELED_CHUNKS));
    let mut context = String::new();
    for (i, chunk) in selected.iter().take(MAX_LABELED_CHUNKS).enumerate() {
        let label = (b'A' + i as u8) as char;
        labels.push(label);

        let page = chunk
            .metadata
            .page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "not available".to_string());
        let section = chunk
            .metadata
            .section
            .as_deref()
            .map(|s| format!(" | Section: {}", s))
            .unwrap_or_default();

        context.push_str(&format!(
            "[{}] Document: {} | Page: {}{}\n{}\n\n",
            label, chunk.metadata.document, page, section, chunk.text
        ));
    }

    let prompt = format!(
        "{instructions}\n\n\
         ===== SOURCES =====\n\
         {context}\
         ===== END OF SOURCES =====\n\n\
         QUESTION: {question}\n\n\
         ANSWER:",
        instructions = CITE_INSTRUCTIONS,
        context = context,
        question = query,
    );

    AssembledPrompt { prompt, labels }
}
