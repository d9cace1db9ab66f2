//! Configuration for embedding models

use crate::error::{EmbedError, Result};
use serde::{Deserialize, Serialize};

/// Model served by the default configuration.
pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";
/// Output dimension of [`DEFAULT_MODEL_NAME`].
pub const DEFAULT_DIMENSION: usize = 384;

/// Configuration for embedding providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Name of the embedding model to use
    pub model_name: String,
    /// Maximum batch size for embedding generation
    pub batch_size: usize,
    /// Whether to normalize embeddings to unit length
    pub normalize: bool,
    /// Vector dimension; providers with a fixed model dimension validate against it
    pub dimension: usize,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            batch_size: 32,
            normalize: true,
            dimension: DEFAULT_DIMENSION,
        }
    }
}

impl EmbedConfig {
    /// Create a configuration for a named model with default settings
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    /// Set the batch size for embedding generation (builder style)
    pub fn with_batch_size(self, batch_size: usize) -> Self {
        Self { batch_size, ..self }
    }

    /// Set whether to normalize embeddings (builder style)
    pub fn with_normalize(self, normalize: bool) -> Self {
        Self { normalize, ..self }
    }

    /// Set the vector dimension (builder style)
    pub fn with_dimension(self, dimension: usize) -> Self {
        Self { dimension, ..self }
    }

    /// Check that batch size and dimension are usable
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(EmbedError::invalid_config("model name is empty"));
        }
        if self.batch_size == 0 {
            return Err(EmbedError::invalid_config("batch size must be at least 1"));
        }
        if self.dimension == 0 {
            return Err(EmbedError::invalid_config("dimension must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = EmbedConfig::default();

        assert_eq!(config.model_name, "all-MiniLM-L6-v2");
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.dimension, 384);
        assert!(config.normalize);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder_methods() {
        let config = EmbedConfig::new("hashing")
            .with_batch_size(64)
            .with_normalize(false)
            .with_dimension(128);

        assert_eq!(config.model_name, "hashing");
        assert_eq!(config.batch_size, 64);
        assert_eq!(config.dimension, 128);
        assert!(!config.normalize);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(EmbedConfig::default().with_batch_size(0).validate().is_err());
        assert!(EmbedConfig::default().with_dimension(0).validate().is_err());
        assert!(EmbedConfig::new("  ").validate().is_err());
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: EmbedConfig = serde_json::from_str(r#"{"dimension": 64}"#).unwrap();
        assert_eq!(config.dimension, 64);
        assert_eq!(config.model_name, DEFAULT_MODEL_NAME);
    }
}
