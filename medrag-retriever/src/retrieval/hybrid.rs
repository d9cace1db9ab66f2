//! Blending lexical and semantic scores into one ranking.

use super::index::Index;
use super::lexical::tokenize;
use crate::error::{PipelineError, Result};
use medrag_context::Chunk;
use medrag_embed::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Guards min-max normalization against a zero range.
pub const NORMALIZATION_EPSILON: f32 = 1e-8;

/// Which signals produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMethod {
    Hybrid,
    Lexical,
}

impl fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hybrid => write!(f, "hybrid"),
            Self::Lexical => write!(f, "lexical"),
        }
    }
}

/// A ranked chunk, borrowed from the Index that scored it.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalResult<'a> {
    pub chunk: &'a Chunk,
    /// Blended score in [0, 1]
    pub score: f32,
    pub method: RetrievalMethod,
}

/// Scale `scores` into [0, 1]. A vector whose values are all equal maps to
/// all zeros.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    let Some(&first) = scores.first() else {
        return Vec::new();
    };
    let (min, max) = scores
        .iter()
        .fold((first, first), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    let range = max - min + NORMALIZATION_EPSILON;
    scores.iter().map(|s| (s - min) / range).collect()
}

/// Ranks chunks of an [`Index`] for a query.
///
/// The provider embeds queries; it should be the one the Index was built
/// with, since vectors from different models are not comparable.
#[derive(Clone)]
pub struct HybridRetriever {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    embed_timeout: Duration,
}

impl HybridRetriever {
    pub fn new(provider: Option<Arc<dyn EmbeddingProvider>>, embed_timeout: Duration) -> Self {
        Self {
            provider,
            embed_timeout,
        }
    }

    /// Return at most `top_k` chunks ordered by blended score, highest first.
    ///
    /// Ties keep insertion order. Falls back to lexical scores alone when the
    /// Index has no semantic signal or the query cannot be embedded.
    pub async fn retrieve<'a>(
        &self,
        index: &'a Index,
        query: &str,
        top_k: usize,
        lexical_weight: f32,
    ) -> Result<Vec<RetrievalResult<'a>>> {
        if top_k == 0 {
            return Err(PipelineError::invalid_request("top_k must be at least 1"));
        }
        if !(0.0..=1.0).contains(&lexical_weight) {
            return Err(PipelineError::invalid_request(format!(
                "lexical weight must lie in [0, 1], got {lexical_weight}"
            )));
        }
        if index.is_empty() {
            return Ok(Vec::new());
        }

        let lexical = min_max_normalize(&index.lexical().score_all(&tokenize(query)));
        let (scores, method) = match self.semantic_scores(index, query).await {
            Some(semantic) => {
                let semantic = min_max_normalize(&semantic);
                let blended = lexical
                    .iter()
                    .zip(&semantic)
                    .map(|(lex, sem)| lexical_weight * lex + (1.0 - lexical_weight) * sem)
                    .collect();
                (blended, RetrievalMethod::Hybrid)
            }
            None => (lexical, RetrievalMethod::Lexical),
        };

        let mut ranked: Vec<RetrievalResult<'a>> = index
            .chunks()
            .iter()
            .zip(scores)
            .map(|(chunk, score)| RetrievalResult {
                chunk,
                score: score.clamp(0.0, 1.0),
                method,
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(top_k);

        debug!(
            "Retrieved {} results for {:?} ({})",
            ranked.len(),
            query,
            method
        );
        Ok(ranked)
    }

    async fn semantic_scores(&self, index: &Index, query: &str) -> Option<Vec<f32>> {
        let semantic = index.semantic()?;
        let provider = self.provider.as_deref()?;

        let texts = [query.to_string()];
        match medrag_embed::embed_with_timeout(provider, &texts, self.embed_timeout).await {
            Ok(result) => {
                let embedding = result.embeddings.into_iter().next()?;
                semantic.score_all(&embedding)
            }
            Err(err) => {
                warn!("Query embedding failed, ranking lexically: {}", err);
                None
            }
        }
    }
}
