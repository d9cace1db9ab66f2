//! Pipeline configuration, loadable from TOML.

use crate::error::{PipelineError, Result};
use medrag_context::SegmenterConfig;
use medrag_context::segment::{
    DEFAULT_CHILD_WINDOW_WORDS, DEFAULT_MIN_PAGE_CHARS, DEFAULT_PARENT_WINDOW_WORDS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_LEXICAL_WEIGHT: f32 = 0.4;
pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 1000;
pub const DEFAULT_EMBED_TIMEOUT_MS: u64 = 30_000;

/// Tunables for segmentation, ranking and synthesis.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```
/// use medrag_retriever::PipelineConfig;
///
/// let config = PipelineConfig::from_toml_str("lexical_weight = 0.7").unwrap();
/// assert_eq!(config.lexical_weight, 0.7);
/// assert_eq!(config.default_top_k, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Words per parent chunk
    pub parent_window_words: usize,
    /// Words per child chunk
    pub child_window_words: usize,
    /// Pages with fewer trimmed characters are skipped
    pub min_page_chars: usize,
    /// Weight of the lexical signal in the blend; the semantic signal gets the rest
    pub lexical_weight: f32,
    /// Number of results returned when a query does not ask for a count
    pub default_top_k: usize,
    /// Upper bound on the evidence body of a synthesized response
    pub max_context_chars: usize,
    /// Bound on every embedding call
    pub embed_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            parent_window_words: DEFAULT_PARENT_WINDOW_WORDS,
            child_window_words: DEFAULT_CHILD_WINDOW_WORDS,
            min_page_chars: DEFAULT_MIN_PAGE_CHARS,
            lexical_weight: DEFAULT_LEXICAL_WEIGHT,
            default_top_k: DEFAULT_TOP_K,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            embed_timeout_ms: DEFAULT_EMBED_TIMEOUT_MS,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|err| match err {
            PipelineError::Config { message } => {
                PipelineError::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.segmenter_config().validate()?;
        if !(0.0..=1.0).contains(&self.lexical_weight) {
            return Err(PipelineError::config(format!(
                "lexical_weight must lie in [0, 1], got {}",
                self.lexical_weight
            )));
        }
        if self.default_top_k == 0 {
            return Err(PipelineError::config("default_top_k must be at least 1"));
        }
        if self.embed_timeout_ms == 0 {
            return Err(PipelineError::config("embed_timeout_ms must be at least 1"));
        }
        Ok(())
    }

    pub fn segmenter_config(&self) -> SegmenterConfig {
        SegmenterConfig::default()
            .with_parent_window_words(self.parent_window_words)
            .with_child_window_words(self.child_window_words)
            .with_min_page_chars(self.min_page_chars)
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }

    pub fn with_window_words(self, parent_window_words: usize, child_window_words: usize) -> Self {
        Self {
            parent_window_words,
            child_window_words,
            ..self
        }
    }

    pub fn with_min_page_chars(self, min_page_chars: usize) -> Self {
        Self {
            min_page_chars,
            ..self
        }
    }

    pub fn with_lexical_weight(self, lexical_weight: f32) -> Self {
        Self {
            lexical_weight,
            ..self
        }
    }

    pub fn with_default_top_k(self, default_top_k: usize) -> Self {
        Self {
            default_top_k,
            ..self
        }
    }

    pub fn with_max_context_chars(self, max_context_chars: usize) -> Self {
        Self {
            max_context_chars,
            ..self
        }
    }

    pub fn with_embed_timeout(self, timeout: Duration) -> Self {
        Self {
            embed_timeout_ms: timeout.as_millis() as u64,
            ..self
        }
    }
}
