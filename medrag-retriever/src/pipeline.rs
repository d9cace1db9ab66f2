//! The orchestrator that owns the live Index and answers queries against it.
//!
//! ```text
//! Documents → Segmenter → Index (BM25 + embeddings) → HybridRetriever
//!                                                          ↓
//!                         SearchResponse ← Verifier ← ResponseSynthesizer
//! ```
//!
//! A [`Pipeline`] moves through `Unbuilt → Building → Ready`. Every ingestion
//! is a full rebuild: the previous Index is dropped when building starts, and
//! queries issued meanwhile get [`PipelineError::NotReady`]. Only one
//! ingestion runs at a time. Queries take a snapshot `Arc<Index>` and hold no
//! lock while ranking.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::retrieval::{HybridRetriever, Index, RetrievalMethod, RetrievalResult};
use crate::status::{IngestionSummary, PipelineStatus, SkippedDocument, StateKind};
use crate::synthesis::ResponseSynthesizer;
use crate::verification::{self, VerificationVerdict};
use chrono::{DateTime, Utc};
use medrag_context::{Document, SegmentError, Segmenter};
use medrag_embed::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Results requested by [`Pipeline::clinical_search`].
pub const CLINICAL_TOP_K: usize = 15;
/// Characters of chunk text shown per ranked result.
pub const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub enum PipelineState {
    Unbuilt,
    Building,
    Ready(Arc<Index>),
}

impl PipelineState {
    pub fn kind(&self) -> StateKind {
        match self {
            Self::Unbuilt => StateKind::Unbuilt,
            Self::Building => StateKind::Building,
            Self::Ready(_) => StateKind::Ready,
        }
    }
}

/// One entry of [`SearchResponse::ranked_results`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub chunk_id: String,
    pub text_excerpt: String,
    pub score: f32,
    pub source_doc: String,
    pub page: u32,
    pub method: RetrievalMethod,
}

impl From<&RetrievalResult<'_>> for RankedResult {
    fn from(result: &RetrievalResult<'_>) -> Self {
        Self {
            chunk_id: result.chunk.id.clone(),
            text_excerpt: result.chunk.excerpt(EXCERPT_CHARS),
            score: result.score,
            source_doc: result.chunk.source_doc.clone(),
            page: result.chunk.page_number,
            method: result.method,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMetadata {
    pub total_chunks_indexed: usize,
    /// The risk tier, or `unknown` when verification was not requested
    pub hallucination_risk: String,
    pub retrieval_method: RetrievalMethod,
    pub elapsed_ms: u64,
    pub retrieved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub response: String,
    pub ranked_results: Vec<RankedResult>,
    pub verification: Option<VerificationVerdict>,
    pub metadata: SearchMetadata,
}

/// A question plus caller-supplied patient details.
///
/// The context is passed back untouched; it never reaches ranking.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClinicalQuery {
    pub question: String,
    #[serde(default)]
    pub patient_context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicalResponse {
    #[serde(flatten)]
    pub search: SearchResponse,
    pub patient_context: serde_json::Value,
    pub query_type: String,
}

pub struct Pipeline {
    config: PipelineConfig,
    segmenter: Segmenter,
    retriever: HybridRetriever,
    synthesizer: ResponseSynthesizer,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    state: RwLock<PipelineState>,
    ingest_guard: Mutex<()>,
    last_ingestion: RwLock<Option<IngestionSummary>>,
}

impl Pipeline {
    /// Build an idle pipeline. Without a provider every Index is lexical-only.
    pub fn new(
        config: PipelineConfig,
        provider: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Result<Self> {
        config.validate()?;
        let segmenter = Segmenter::new(config.segmenter_config())?;
        let synthesizer =
            ResponseSynthesizer::new(segmenter.extractor().clone(), config.max_context_chars);
        let retriever = HybridRetriever::new(provider.clone(), config.embed_timeout());

        Ok(Self {
            config,
            segmenter,
            retriever,
            synthesizer,
            provider,
            state: RwLock::new(PipelineState::Unbuilt),
            ingest_guard: Mutex::new(()),
            last_ingestion: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }

    pub async fn state(&self) -> StateKind {
        self.state.read().await.kind()
    }

    /// The live Index, or [`PipelineError::NotReady`].
    pub async fn index(&self) -> Result<Arc<Index>> {
        match &*self.state.read().await {
            PipelineState::Ready(index) => Ok(Arc::clone(index)),
            PipelineState::Unbuilt | PipelineState::Building => Err(PipelineError::NotReady),
        }
    }

    /// Replace the live Index with one built from `documents`.
    ///
    /// Documents that fail to segment, or that repeat the name of a document
    /// already ingested, are skipped and listed in the summary.
    /// Returns [`PipelineError::IngestionInProgress`] if another ingestion is
    /// running.
    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestionSummary> {
        let _guard = self
            .ingest_guard
            .try_lock()
            .map_err(|_| PipelineError::IngestionInProgress)?;
        let start = Instant::now();

        *self.state.write().await = PipelineState::Building;
        info!("Ingesting {} documents", documents.len());

        let mut chunks = Vec::new();
        let mut ingested = Vec::new();
        let mut skipped = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for document in documents {
            let segmented = if seen.contains(document.name.as_str()) {
                Err(SegmentError::malformed(
                    &document.name,
                    "another document with this name was already ingested",
                ))
            } else {
                self.segmenter.segment_document(document)
            };
            match segmented {
                Ok(document_chunks) => {
                    debug!(
                        "Document {} produced {} chunks",
                        document.name,
                        document_chunks.len()
                    );
                    chunks.extend(document_chunks);
                    seen.insert(&document.name);
                    ingested.push(document.name.clone());
                }
                Err(err) => {
                    warn!("Skipping document {:?}: {}", document.name, err);
                    skipped.push(SkippedDocument {
                        name: document.name.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let index = Index::build(
            chunks,
            ingested,
            self.provider.as_deref(),
            self.config.embed_timeout(),
        )
        .await;

        let summary = IngestionSummary {
            status: "success".to_string(),
            total_chunks: index.len(),
            documents_ingested: index.documents().len(),
            skipped_documents: skipped,
            semantic_enabled: index.semantic().is_some(),
            fingerprint: index.fingerprint().to_string(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        *self.last_ingestion.write().await = Some(summary.clone());
        *self.state.write().await = PipelineState::Ready(Arc::new(index));
        info!(
            "Ingestion complete: {} chunks from {} documents in {} ms",
            summary.total_chunks, summary.documents_ingested, summary.elapsed_ms
        );
        Ok(summary)
    }

    /// Rank, synthesize and optionally verify an answer for `query`.
    ///
    /// `top_k` defaults to the configured `default_top_k`.
    pub async fn search(
        &self,
        query: &str,
        top_k: Option<usize>,
        use_verification: bool,
    ) -> Result<SearchResponse> {
        let start = Instant::now();
        if query.trim().is_empty() {
            return Err(PipelineError::invalid_request("query is empty"));
        }
        let index = self.index().await?;
        let top_k = top_k.unwrap_or(self.config.default_top_k);

        let results = self
            .retriever
            .retrieve(&index, query, top_k, self.config.lexical_weight)
            .await?;
        let synthesized = self.synthesizer.synthesize(query, &results);

        let verification = use_verification.then(|| {
            let evidence: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
            verification::verify(&synthesized.body, &evidence)
        });

        let retrieval_method = match results.first() {
            Some(result) => result.method,
            None if index.semantic().is_some() => RetrievalMethod::Hybrid,
            None => RetrievalMethod::Lexical,
        };
        let hallucination_risk = verification
            .as_ref()
            .map(|v| v.risk_tier.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(SearchResponse {
            query: query.to_string(),
            response: synthesized.text,
            ranked_results: results.iter().map(RankedResult::from).collect(),
            verification,
            metadata: SearchMetadata {
                total_chunks_indexed: index.len(),
                hallucination_risk,
                retrieval_method,
                elapsed_ms: start.elapsed().as_millis() as u64,
                retrieved_at: Utc::now(),
            },
        })
    }

    /// Verified search with [`CLINICAL_TOP_K`] results, echoing the patient context.
    pub async fn clinical_search(&self, query: ClinicalQuery) -> Result<ClinicalResponse> {
        let patient_context = match query.patient_context {
            None => serde_json::Value::Object(serde_json::Map::new()),
            Some(context @ serde_json::Value::Object(_)) => context,
            Some(_) => {
                return Err(PipelineError::invalid_request(
                    "patient_context must be a JSON object",
                ));
            }
        };

        let search = self
            .search(&query.question, Some(CLINICAL_TOP_K), true)
            .await?;
        Ok(ClinicalResponse {
            search,
            patient_context,
            query_type: "clinical".to_string(),
        })
    }

    pub async fn status(&self) -> PipelineStatus {
        let (kind, index) = {
            let state = self.state.read().await;
            let index = match &*state {
                PipelineState::Ready(index) => Some(Arc::clone(index)),
                PipelineState::Unbuilt | PipelineState::Building => None,
            };
            (state.kind(), index)
        };
        let last_ingestion = self.last_ingestion.read().await;

        PipelineStatus::new(
            kind,
            index.as_deref(),
            self.provider.as_ref().map(|p| p.provider_name().to_string()),
            last_ingestion.as_ref(),
        )
    }
}
