//! Status reporting for the pipeline

use crate::retrieval::Index;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle position of a [`crate::Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Unbuilt,
    Building,
    Ready,
}

/// A document the last ingestion could not segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedDocument {
    pub name: String,
    pub reason: String,
}

/// Outcome of one ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionSummary {
    pub status: String,
    pub total_chunks: usize,
    pub documents_ingested: usize,
    pub skipped_documents: Vec<SkippedDocument>,
    pub semantic_enabled: bool,
    pub fingerprint: String,
    pub elapsed_ms: u64,
}

/// Snapshot of the pipeline for health checks and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub state: StateKind,
    /// `healthy` once an Index is live, `initializing` before
    pub health: String,
    pub total_chunks: usize,
    pub parent_chunks: usize,
    pub child_chunks: usize,
    pub documents: Vec<String>,
    pub semantic_enabled: bool,
    pub embedding_provider: Option<String>,
    pub degradation: Option<String>,
    pub fingerprint: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    pub skipped_documents: Vec<SkippedDocument>,
}

impl PipelineStatus {
    pub(crate) fn new(
        state: StateKind,
        index: Option<&Index>,
        embedding_provider: Option<String>,
        last_ingestion: Option<&IngestionSummary>,
    ) -> Self {
        let health = match state {
            StateKind::Ready => "healthy",
            StateKind::Unbuilt | StateKind::Building => "initializing",
        };

        Self {
            state,
            health: health.to_string(),
            total_chunks: index.map(Index::len).unwrap_or(0),
            parent_chunks: index.map(Index::parent_count).unwrap_or(0),
            child_chunks: index.map(Index::child_count).unwrap_or(0),
            documents: index.map(|i| i.documents().to_vec()).unwrap_or_default(),
            semantic_enabled: index.is_some_and(|i| i.semantic().is_some()),
            embedding_provider,
            degradation: index.and_then(|i| i.degradation()).map(|d| d.to_string()),
            fingerprint: index.map(|i| i.fingerprint().to_string()),
            last_update: index.map(Index::built_at),
            skipped_documents: last_ingestion
                .map(|s| s.skipped_documents.clone())
                .unwrap_or_default(),
        }
    }
}
