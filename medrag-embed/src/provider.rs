//! Embedding provider implementations

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use fnv::FnvHasher;
use half::f16;
use std::hash::Hasher;
use std::time::Duration;

/// Result of embedding generation
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text
    pub embeddings: Vec<Vec<f16>>,
    /// The dimension of each embedding vector
    pub dimension: usize,
}

impl EmbeddingResult {
    /// Create a new embedding result from a vector of f16 embeddings.
    ///
    /// The dimension is inferred from the first embedding vector.
    /// If the embeddings vector is empty, dimension defaults to 0.
    pub fn new(embeddings: Vec<Vec<f16>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    /// Returns the number of embedding vectors in this result.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Returns `true` if this result contains no embedding vectors.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// Trait for embedding providers that can generate embeddings from text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a single text
    async fn embed_text(&self, text: &str) -> Result<Vec<f16>> {
        let texts = vec![text.to_string()];
        let result = self.embed_texts(&texts).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::invalid_config("No embedding generated for text"))
    }

    /// Generate embeddings for multiple texts (batch processing)
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Get the dimension of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

/// Run `embed_texts`, giving up after `timeout`.
///
/// # Errors
/// [`EmbedError::Timeout`] when the provider does not finish in time, otherwise
/// whatever the provider returned.
pub async fn embed_with_timeout(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    timeout: Duration,
) -> Result<EmbeddingResult> {
    match tokio::time::timeout(timeout, provider.embed_texts(texts)).await {
        Ok(result) => result,
        Err(_) => Err(EmbedError::Timeout { elapsed: timeout }),
    }
}

/// Convert f32 embeddings to f16, scaling each vector to unit length when `normalize` is set.
pub fn to_f16(embeddings: Vec<Vec<f32>>, normalize: bool) -> Vec<Vec<f16>> {
    embeddings
        .into_iter()
        .map(|embedding| {
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            let scale = if normalize && norm > 0.0 { 1.0 / norm } else { 1.0 };
            embedding
                .into_iter()
                .map(|value| f16::from_f32(value * scale))
                .collect()
        })
        .collect()
}

/// Deterministic bag-of-features embedder that needs no model files.
///
/// Each lowercased word and each of its character trigrams is hashed with FNV
/// into one of `dimension` signed buckets. Texts sharing vocabulary land close
/// together, which is enough for hybrid ranking and for tests that need stable
/// vectors.
#[derive(Debug, Clone)]
pub struct HashingProvider {
    config: EmbedConfig,
}

impl HashingProvider {
    /// Create a provider producing vectors of `config.dimension` values.
    pub fn new(config: EmbedConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.config.dimension];
        for word in text.split_whitespace() {
            let word: String = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if word.is_empty() {
                continue;
            }
            self.add_feature(&mut vector, word.as_bytes(), 1.0);

            let chars: Vec<char> = format!("#{word}#").chars().collect();
            for gram in chars.windows(3) {
                let gram: String = gram.iter().collect();
                self.add_feature(&mut vector, gram.as_bytes(), 0.5);
            }
        }
        vector
    }

    fn add_feature(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let mut hasher = FnvHasher::default();
        hasher.write(feature);
        let hash = hasher.finish();
        let bucket = (hash % vector.len() as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        tracing::debug!("Hashing embeddings for {} texts", texts.len());

        let raw: Vec<Vec<f32>> = texts.iter().map(|t| self.embed_one(t)).collect();
        let mut result = EmbeddingResult::new(to_f16(raw, self.config.normalize));
        result.dimension = self.config.dimension;
        Ok(result)
    }

    fn embedding_dimension(&self) -> usize {
        self.config.dimension
    }

    fn provider_name(&self) -> &str {
        "hashing"
    }
}

/// Provider that never produces embeddings.
///
/// Stands in for a model that could not be loaded; every call fails with
/// [`EmbedError::Unavailable`], so consumers fall back to lexical ranking.
#[derive(Debug, Clone)]
pub struct DisabledProvider {
    reason: String,
}

impl DisabledProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    async fn embed_texts(&self, _texts: &[String]) -> Result<EmbeddingResult> {
        Err(EmbedError::unavailable(self.reason.clone()))
    }

    fn embedding_dimension(&self) -> usize {
        0
    }

    fn provider_name(&self) -> &str {
        "disabled"
    }
}
