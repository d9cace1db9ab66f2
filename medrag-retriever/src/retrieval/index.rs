//! The immutable per-generation Index.

use super::lexical::Bm25Index;
use super::semantic::{Degradation, SemanticIndex};
use chrono::{DateTime, Utc};
use medrag_context::Chunk;
use medrag_embed::EmbeddingProvider;
use std::time::Duration;
use tracing::{info, warn};

/// All chunks of one corpus generation plus the structures that rank them.
///
/// Built once per ingestion and never mutated; queries share it through an
/// `Arc`.
#[derive(Debug)]
pub struct Index {
    chunks: Vec<Chunk>,
    documents: Vec<String>,
    lexical: Bm25Index,
    semantic: Option<SemanticIndex>,
    degradation: Option<Degradation>,
    fingerprint: String,
    built_at: DateTime<Utc>,
}

impl Index {
    /// Index `chunks` lexically and, when `provider` allows it, semantically.
    ///
    /// Never fails: a missing or misbehaving provider yields a lexical-only
    /// Index with the reason recorded in [`Index::degradation`].
    pub async fn build(
        chunks: Vec<Chunk>,
        documents: Vec<String>,
        provider: Option<&dyn EmbeddingProvider>,
        embed_timeout: Duration,
    ) -> Self {
        let lexical = Bm25Index::build(chunks.iter().map(|c| c.text.as_str()));

        let (semantic, degradation) = match provider {
            None => (None, Some(Degradation::NoProvider)),
            Some(provider) => {
                let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
                match SemanticIndex::build(provider, &texts, embed_timeout).await {
                    Ok(semantic) => (Some(semantic), None),
                    Err(reason) => {
                        warn!("Semantic index unavailable, ranking lexically: {}", reason);
                        (None, Some(reason))
                    }
                }
            }
        };

        let fingerprint = fingerprint(&chunks);
        info!(
            "Built index with {} chunks from {} documents (semantic: {})",
            chunks.len(),
            documents.len(),
            semantic.is_some()
        );

        Self {
            chunks,
            documents,
            lexical,
            semantic,
            degradation,
            fingerprint,
            built_at: Utc::now(),
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn parent_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_parent()).count()
    }

    pub fn child_count(&self) -> usize {
        self.len() - self.parent_count()
    }

    /// Names of the documents that contributed to this generation.
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn lexical(&self) -> &Bm25Index {
        &self.lexical
    }

    pub fn semantic(&self) -> Option<&SemanticIndex> {
        self.semantic.as_ref()
    }

    pub fn degradation(&self) -> Option<&Degradation> {
        self.degradation.as_ref()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }
}

/// blake3 over chunk ids and texts in order, hex encoded.
pub fn fingerprint(chunks: &[Chunk]) -> String {
    let mut hasher = blake3::Hasher::new();
    for chunk in chunks {
        hasher.update(chunk.id.as_bytes());
        hasher.update(&[0]);
        hasher.update(chunk.text.as_bytes());
        hasher.update(&[0]);
    }
    hex::encode(hasher.finalize().as_bytes())
}
