//! Embedding-backed similarity and the reasons it can be missing.

use half::f16;
use medrag_embed::{EmbedError, EmbeddingProvider, embed_with_timeout};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Why an Index runs without its semantic signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// No embedding provider was configured
    NoProvider,
    /// The provider returned an error
    ProviderFailed { reason: String },
    /// The provider did not answer within the embedding timeout
    TimedOut { timeout_ms: u64 },
    /// The provider returned a different number of vectors than texts
    CountMismatch { expected: usize, actual: usize },
    /// A vector did not have the dimension the provider advertised
    DimensionMismatch { expected: usize, actual: usize },
    /// A vector contained NaN or an infinity
    NonFiniteEmbedding { index: usize },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoProvider => write!(f, "no embedding provider configured"),
            Self::ProviderFailed { reason } => write!(f, "embedding provider failed: {reason}"),
            Self::TimedOut { timeout_ms } => {
                write!(f, "embedding provider timed out after {timeout_ms} ms")
            }
            Self::CountMismatch { expected, actual } => {
                write!(f, "expected {expected} embeddings, provider returned {actual}")
            }
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "expected {expected}-dimensional embeddings, got {actual}")
            }
            Self::NonFiniteEmbedding { index } => {
                write!(f, "embedding {index} contains non-finite values")
            }
        }
    }
}

impl From<EmbedError> for Degradation {
    fn from(err: EmbedError) -> Self {
        match err {
            EmbedError::Timeout { elapsed } => Self::TimedOut {
                timeout_ms: elapsed.as_millis() as u64,
            },
            other => Self::ProviderFailed {
                reason: other.to_string(),
            },
        }
    }
}

/// One embedding per chunk, in chunk insertion order.
#[derive(Debug, Clone)]
pub struct SemanticIndex {
    embeddings: Vec<Vec<f16>>,
    dimension: usize,
}

impl SemanticIndex {
    /// Embed every text with `provider`, or explain why that was not possible.
    pub async fn build(
        provider: &dyn EmbeddingProvider,
        texts: &[String],
        timeout: Duration,
    ) -> Result<Self, Degradation> {
        let dimension = provider.embedding_dimension();
        if texts.is_empty() {
            return Ok(Self {
                embeddings: Vec::new(),
                dimension,
            });
        }

        debug!(
            "Embedding {} chunks with provider {}",
            texts.len(),
            provider.provider_name()
        );
        let result = embed_with_timeout(provider, texts, timeout).await?;

        if result.len() != texts.len() {
            return Err(Degradation::CountMismatch {
                expected: texts.len(),
                actual: result.len(),
            });
        }
        if let Some(bad) = result.embeddings.iter().find(|e| e.len() != dimension) {
            return Err(Degradation::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }
        if let Some(index) = result
            .embeddings
            .iter()
            .position(|e| e.iter().any(|x| !x.is_finite()))
        {
            return Err(Degradation::NonFiniteEmbedding { index });
        }

        Ok(Self {
            embeddings: result.embeddings,
            dimension,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Cosine similarity of `query` against every chunk, or `None` when the
    /// query vector has the wrong dimension.
    pub fn score_all(&self, query: &[f16]) -> Option<Vec<f32>> {
        if query.len() != self.dimension {
            warn!(
                "Query embedding has dimension {}, index expects {}",
                query.len(),
                self.dimension
            );
            return None;
        }
        Some(
            self.embeddings
                .iter()
                .map(|embedding| cosine_similarity(query, embedding))
                .collect(),
        )
    }
}

/// Calculate cosine similarity between two f16 embedding vectors.
///
/// Mismatched lengths, zero vectors and non-finite results score 0.
pub fn cosine_similarity(a: &[f16], b: &[f16]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f32::from(*x) * f32::from(*y))
        .sum();

    let norm_a: f32 = a.iter().map(|x| f32::from(*x).powi(2)).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| f32::from(*x).powi(2)).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot_product / (norm_a * norm_b);
    if similarity.is_finite() { similarity } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medrag_embed::{DisabledProvider, EmbedConfig, EmbeddingResult, HashingProvider};

    fn v(values: &[f32]) -> Vec<f16> {
        values.iter().copied().map(f16::from_f32).collect()
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&v(&[1.0, 0.0]), &v(&[1.0, 0.0])) - 1.0).abs() < 1e-3);
        assert!(cosine_similarity(&v(&[1.0, 0.0]), &v(&[0.0, 1.0])).abs() < 1e-3);
        assert_eq!(cosine_similarity(&v(&[1.0]), &v(&[1.0, 0.0])), 0.0);
        assert_eq!(cosine_similarity(&v(&[0.0, 0.0]), &v(&[1.0, 0.0])), 0.0);
        assert_eq!(cosine_similarity(&v(&[f32::NAN, 1.0]), &v(&[1.0, 0.0])), 0.0);
        assert_eq!(cosine_similarity(&v(&[f32::INFINITY, 1.0]), &v(&[1.0, 0.0])), 0.0);
    }

    #[tokio::test]
    async fn test_build_with_hashing_provider() {
        let provider = HashingProvider::new(EmbedConfig::new("hashing").with_dimension(32)).unwrap();
        let texts = vec!["heart failure".to_string(), "asthma".to_string()];

        let index = SemanticIndex::build(&provider, &texts, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.dimension(), 32);

        let query = provider.embed_text("heart failure").await.unwrap();
        let scores = index.score_all(&query).unwrap();
        assert!(scores[0] > scores[1]);
        assert!(index.score_all(&v(&[1.0])).is_none());
    }

    #[tokio::test]
    async fn test_provider_error_becomes_degradation() {
        let texts = vec!["text".to_string()];
        let err = SemanticIndex::build(&DisabledProvider::new("offline"), &texts, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Degradation::ProviderFailed { .. }));
        assert!(err.to_string().contains("offline"));
    }

    struct ShortProvider;

    #[async_trait]
    impl EmbeddingProvider for ShortProvider {
        async fn embed_texts(&self, _texts: &[String]) -> medrag_embed::Result<EmbeddingResult> {
            Ok(EmbeddingResult::new(vec![v(&[1.0, 0.0])]))
        }

        fn embedding_dimension(&self) -> usize {
            3
        }

        fn provider_name(&self) -> &str {
            "short"
        }
    }

    #[tokio::test]
    async fn test_mismatches_become_degradation() {
        let one = vec!["a".to_string()];
        let two = vec!["a".to_string(), "b".to_string()];

        let count = SemanticIndex::build(&ShortProvider, &two, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(
            count,
            Degradation::CountMismatch {
                expected: 2,
                actual: 1
            }
        );

        let dimension = SemanticIndex::build(&ShortProvider, &one, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(
            dimension,
            Degradation::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    struct NanProvider;

    #[async_trait]
    impl EmbeddingProvider for NanProvider {
        async fn embed_texts(&self, texts: &[String]) -> medrag_embed::Result<EmbeddingResult> {
            Ok(EmbeddingResult::new(
                texts.iter().map(|_| v(&[f32::NAN, 1.0])).collect(),
            ))
        }

        fn embedding_dimension(&self) -> usize {
            2
        }

        fn provider_name(&self) -> &str {
            "nan"
        }
    }

    #[tokio::test]
    async fn test_non_finite_embeddings_become_degradation() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let err = SemanticIndex::build(&NanProvider, &texts, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, Degradation::NonFiniteEmbedding { index: 0 });
        assert!(err.to_string().contains("non-finite"));
    }
}
