use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{QueryType, SelectionConfig};

/// Top-level engine configuration. Read-only once the engine is built;
/// the only state shared across requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub selection: SelectionTable,
    pub selector: SelectorTuning,
    pub reranker: RerankerConfig,
    pub generation: GenerationConfig,
}

/// Per-query-type budget table. Short-answer types get small budgets,
/// broad types get large ones, and `general` gets the widest retrieval
/// limit to maximize recall for unclassified intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionTable {
    pub definition: SelectionConfig,
    pub specific_section: SelectionConfig,
    pub yes_no: SelectionConfig,
    pub list: SelectionConfig,
    pub procedure: SelectionConfig,
    pub analysis: SelectionConfig,
    pub general: SelectionConfig,
}

impl SelectionTable {
    pub fn for_type(&self, query_type: QueryType) -> SelectionConfig {
        match query_type {
            QueryType::Definition => self.definition,
            QueryType::SpecificSection => self.specific_section,
            QueryType::YesNo => self.yes_no,
            QueryType::List => self.list,
            QueryType::Procedure => self.procedure,
            QueryType::Analysis => self.analysis,
            QueryType::General => self.general,
        }
    }

    fn entries(&self) -> [(&'static str, SelectionConfig); 7] {
        [
            ("definition", self.definition),
            ("specific_section", self.specific_section),
            ("yes_no", self.yes_no),
            ("list", self.list),
            ("procedure", self.procedure),
            ("analysis", self.analysis),
            ("general", self.general),
        ]
    }
}

/// Knobs for the adaptive selector itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorTuning {
    /// Minimum vector similarity a candidate needs to be considered at all.
    pub vector_threshold: f32,
    /// Starting percentile of the quality gate (top N% of rerank scores pass).
    pub percentile_start: f32,
    /// How far the gate widens when a full pass admits nothing.
    pub percentile_step: f32,
    /// Safety valve on the scan/expand loop.
    pub max_passes: usize,
    /// Simultaneous outbound reranker calls during upfront scoring.
    pub score_concurrency: usize,
    /// Record a per-candidate decision trace in the selection result.
    pub keep_profile: bool,
}

/// Cross-encoder reranking service (HTTP).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

/// Generation service settings (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    /// Cap on one generation call before falling back to excerpts.
    pub timeout_secs: u64,
}

impl EngineConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        for (name, entry) in self.selection.entries() {
            if entry.max_tokens == 0 {
                return Err(format!("selection.{}.max_tokens must be > 0", name));
            }
            if entry.min_tokens >= entry.max_tokens {
                return Err(format!("selection.{}.min_tokens must be < max_tokens", name));
            }
            if entry.retrieve_limit == 0 {
                return Err(format!("selection.{}.retrieve_limit must be > 0", name));
            }
        }
        if !(0.0..=1.0).contains(&self.selector.vector_threshold) {
            return Err("selector.vector_threshold must be in [0.0, 1.0]".into());
        }
        if self.selector.percentile_step <= 0.0 {
            return Err("selector.percentile_step must be > 0".into());
        }
        if !(0.0..=100.0).contains(&self.selector.percentile_start) {
            return Err("selector.percentile_start must be in [0.0, 100.0]".into());
        }
        if self.selector.max_passes == 0 {
            return Err("selector.max_passes must be > 0".into());
        }
        if self.selector.score_concurrency == 0 {
            return Err("selector.score_concurrency must be > 0".into());
        }
        if self.reranker.timeout_ms == 0 {
            return Err("reranker.timeout_ms must be > 0".into());
        }
        Ok(())
    }

    /// Load config from a JSON file, validating before use.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            selection: SelectionTable::default(),
            selector: SelectorTuning::default(),
            reranker: RerankerConfig {
                base_url: "http://localhost:8082".to_string(),
                timeout_ms: 20_000,
            },
            generation: GenerationConfig {
                endpoint: "http://localhost:11434/v1/chat/completions".to_string(),
                api_key: String::new(),
                model: "llama3.1:8b".to_string(),
                max_tokens: 1024,
                temperature: 0.2,
                timeout_secs: 90,
            },
        }
    }
}

impl Default for SelectionTable {
    fn default() -> Self {
        Self {
            definition: SelectionConfig { max_tokens: 800, min_tokens: 200, retrieve_limit: 25 },
            specific_section: SelectionConfig { max_tokens: 1000, min_tokens: 250, retrieve_limit: 30 },
            yes_no: SelectionConfig { max_tokens: 800, min_tokens: 200, retrieve_limit: 25 },
            list: SelectionConfig { max_tokens: 2500, min_tokens: 600, retrieve_limit: 50 },
            procedure: SelectionConfig { max_tokens: 3000, min_tokens: 800, retrieve_limit: 50 },
            analysis: SelectionConfig { max_tokens: 4000, min_tokens: 1000, retrieve_limit: 60 },
            general: SelectionConfig { max_tokens: 2000, min_tokens: 500, retrieve_limit: 60 },
        }
    }
}

impl Default for SelectorTuning {
    fn default() -> Self {
        Self {
            vector_threshold: 0.5,
            percentile_start: 5.0,
            percentile_step: 5.0,
            max_passes: 20,
            score_concurrency: 8,
            keep_profile: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_min_over_max() {
        let mut config = EngineConfig::default();
        config.selection.list.min_tokens = config.selection.list.max_tokens;
        let err = config.validate().unwrap_err();
        assert!(err.contains("list"), "unexpected error: {}", err);
    }

    #[test]
    fn test_rejects_out_of_range_vector_threshold() {
        let mut config = EngineConfig::default();
        config.selector.vector_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_retrieve_limit() {
        let mut config = EngineConfig::default();
        config.selection.general.retrieve_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_for_type_returns_matching_budget() {
        let table = SelectionTable::default();
        assert_eq!(table.for_type(crate::types::QueryType::Analysis).max_tokens, 4000);
        assert_eq!(table.for_type(crate::types::QueryType::Definition).max_tokens, 800);
    }
}
