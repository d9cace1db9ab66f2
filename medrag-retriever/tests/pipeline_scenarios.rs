//! End-to-end behavior of the pipeline over small guideline corpora
//!
//! These tests cover:
//! - Ingestion output (terms, reconstruction, idempotence)
//! - Ranking validity and hybrid tagging
//! - Verified search and clinical search
//! - Degraded and concurrent operation

use anyhow::Result;
use async_trait::async_trait;
use medrag_context::{Chunk, Document};
use medrag_embed::{EmbedConfig, EmbeddingProvider, EmbeddingResult, HashingProvider};
use medrag_retriever::pipeline::CLINICAL_TOP_K;
use medrag_retriever::retrieval::RetrievalMethod;
use medrag_retriever::synthesis::NO_RESULTS_MESSAGE;
use medrag_retriever::verification::RiskTier;
use medrag_retriever::{ClinicalQuery, Pipeline, PipelineConfig, PipelineError, StateKind};
use std::sync::Arc;
use std::time::Duration;

const HEART_FAILURE_PAGE: &str =
    "Patients with heart failure should receive metoprolol 50 mg twice daily.";

const ASTHMA_PAGE: &str = "Beta blocker guidance for patients with respiratory disease. \
Metoprolol should be avoided in severe asthma. \
Cardioselective agents may be considered with caution.";

fn hashing() -> Arc<dyn EmbeddingProvider> {
    Arc::new(HashingProvider::new(EmbedConfig::new("hashing").with_dimension(128)).unwrap())
}

fn multi_page_corpus() -> Vec<Document> {
    let long_page = (0..400)
        .map(|i| match i % 4 {
            0 => "aspirin".to_string(),
            1 => "after".to_string(),
            2 => "stent".to_string(),
            _ => format!("word{i}"),
        })
        .collect::<Vec<_>>()
        .join(" ");
    vec![
        Document::from_page_texts("hf", [HEART_FAILURE_PAGE, ASTHMA_PAGE]),
        Document::from_page_texts(
            "af",
            [
                "Warfarin or apixaban is recommended for stroke prevention in atrial fibrillation.",
                long_page.as_str(),
            ],
        ),
    ]
}

fn children_of<'a>(chunks: &'a [Chunk], parent: &Chunk) -> Vec<&'a Chunk> {
    chunks
        .iter()
        .filter(|c| c.parent_id.as_deref() == Some(parent.id.as_str()))
        .collect()
}

#[tokio::test]
async fn test_single_page_ingestion_recognizes_terms() -> Result<()> {
    let pipeline = Pipeline::new(PipelineConfig::default(), None)?;
    pipeline
        .ingest(&[Document::from_page_texts("hf", [HEART_FAILURE_PAGE])])
        .await?;

    let index = pipeline.index().await?;
    let parent = index
        .chunks()
        .iter()
        .find(|c| c.is_parent())
        .expect("at least one parent chunk");
    for term in ["heart failure", "metoprolol", "50 mg"] {
        assert!(parent.terms.contains(&term.to_string()), "missing {term}");
    }
    Ok(())
}

#[tokio::test]
async fn test_heart_failure_query_ranks_matching_chunk_first() -> Result<()> {
    let pipeline = Pipeline::new(PipelineConfig::default(), None)?;
    pipeline
        .ingest(&[Document::from_page_texts("hf", [HEART_FAILURE_PAGE])])
        .await?;

    let response = pipeline.search("heart failure treatment", Some(5), false).await?;
    assert!(!response.ranked_results.is_empty());

    let index = pipeline.index().await?;
    let top = &response.ranked_results[0];
    let chunk = index
        .chunks()
        .iter()
        .find(|c| c.id == top.chunk_id)
        .expect("ranked chunk exists in the index");
    assert!(chunk.text.contains("heart failure"));
    Ok(())
}

#[tokio::test]
async fn test_verbatim_answer_is_low_risk() -> Result<()> {
    let pipeline = Pipeline::new(PipelineConfig::default(), None)?;
    pipeline
        .ingest(&[Document::from_page_texts("asthma", [ASTHMA_PAGE])])
        .await?;

    let response = pipeline.search("metoprolol asthma", Some(5), true).await?;
    let verification = response.verification.expect("verification requested");

    assert!(
        verification
            .supported_sentences
            .iter()
            .any(|s| s.contains("Metoprolol should be avoided in severe asthma"))
    );
    assert_eq!(verification.support_ratio, 1.0);
    assert_eq!(verification.risk_tier, RiskTier::Low);
    assert_eq!(response.metadata.hallucination_risk, "low");
    Ok(())
}

#[tokio::test]
async fn test_empty_corpus_returns_fixed_message() -> Result<()> {
    let pipeline = Pipeline::new(PipelineConfig::default(), Some(hashing()))?;
    let summary = pipeline.ingest(&[]).await?;
    assert_eq!(summary.total_chunks, 0);

    let response = pipeline.search("heart failure", None, true).await?;
    assert!(response.ranked_results.is_empty());
    assert_eq!(response.response, NO_RESULTS_MESSAGE);
    assert_eq!(response.metadata.total_chunks_indexed, 0);
    Ok(())
}

#[tokio::test]
async fn test_reingestion_is_idempotent() -> Result<()> {
    let pipeline = Pipeline::new(PipelineConfig::default().with_window_words(40, 10), None)?;
    let corpus = multi_page_corpus();

    let first = pipeline.ingest(&corpus).await?;
    let first_chunks = pipeline.index().await?.chunks().to_vec();
    let second = pipeline.ingest(&corpus).await?;
    let second_chunks = pipeline.index().await?.chunks().to_vec();

    assert_eq!(first.fingerprint, second.fingerprint);
    assert_eq!(first_chunks, second_chunks);
    Ok(())
}

#[tokio::test]
async fn test_reingestion_replaces_previous_corpus() -> Result<()> {
    let pipeline = Pipeline::new(PipelineConfig::default(), Some(hashing()))?;
    pipeline
        .ingest(&[Document::from_page_texts("hf", [HEART_FAILURE_PAGE, ASTHMA_PAGE])])
        .await?;
    pipeline
        .ingest(&[Document::from_page_texts(
            "af",
            ["Warfarin or apixaban is recommended for stroke prevention in atrial fibrillation."],
        )])
        .await?;

    let response = pipeline.search("metoprolol heart failure warfarin", Some(10), false).await?;
    assert!(!response.ranked_results.is_empty());
    assert!(response.ranked_results.iter().all(|r| r.source_doc == "af"));
    assert!(pipeline.index().await?.chunks().iter().all(|c| c.source_doc == "af"));
    assert_eq!(pipeline.status().await.documents, vec!["af".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_document_names_are_skipped() -> Result<()> {
    let pipeline = Pipeline::new(PipelineConfig::default(), None)?;
    let summary = pipeline
        .ingest(&[
            Document::from_page_texts("guide", [HEART_FAILURE_PAGE]),
            Document::from_page_texts("guide", [ASTHMA_PAGE]),
        ])
        .await?;

    assert_eq!(summary.documents_ingested, 1);
    assert_eq!(summary.skipped_documents.len(), 1);
    assert_eq!(summary.skipped_documents[0].name, "guide");
    assert!(summary.skipped_documents[0].reason.contains("Malformed document"));

    let index = pipeline.index().await?;
    let mut ids: Vec<&str> = index.chunks().iter().map(|c| c.id.as_str()).collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total);
    assert!(index.chunks().iter().all(|c| !c.text.contains("asthma")));
    Ok(())
}

#[tokio::test]
async fn test_same_stem_corpus_files_ingest_once() -> Result<()> {
    let dir = tempfile::tempdir()?;
    for (sub, text) in [("a", HEART_FAILURE_PAGE), ("b", ASTHMA_PAGE)] {
        std::fs::create_dir(dir.path().join(sub))?;
        std::fs::write(dir.path().join(sub).join("x.txt"), text)?;
    }
    let documents = medrag_retriever::corpus::load_corpus(dir.path())?;
    assert_eq!(documents.len(), 2);

    let pipeline = Pipeline::new(PipelineConfig::default(), None)?;
    let summary = pipeline.ingest(&documents).await?;
    assert_eq!(summary.documents_ingested, 1);
    assert_eq!(summary.skipped_documents.len(), 1);
    assert_eq!(pipeline.status().await.documents, vec!["x".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_children_reconstruct_parents() -> Result<()> {
    let pipeline = Pipeline::new(PipelineConfig::default().with_window_words(40, 10), None)?;
    pipeline.ingest(&multi_page_corpus()).await?;

    let index = pipeline.index().await?;
    let chunks = index.chunks();
    let parents: Vec<&Chunk> = chunks.iter().filter(|c| c.is_parent()).collect();
    assert!(parents.len() > 2);

    for parent in parents {
        let children = children_of(chunks, parent);
        assert!(!children.is_empty());
        let joined: String = children.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, parent.text, "parent {}", parent.id);
        for child in children {
            assert_eq!(child.source_doc, parent.source_doc);
            assert_eq!(child.page_number, parent.page_number);
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_ranking_validity() -> Result<()> {
    let pipeline = Pipeline::new(
        PipelineConfig::default().with_window_words(40, 10),
        Some(hashing()),
    )?;
    pipeline.ingest(&multi_page_corpus()).await?;

    for (query, top_k) in [
        ("aspirin after stent", 3),
        ("stroke prevention", 1),
        ("metoprolol asthma", 50),
        ("unrelated vocabulary", 7),
    ] {
        let response = pipeline.search(query, Some(top_k), false).await?;
        let scores: Vec<f32> = response.ranked_results.iter().map(|r| r.score).collect();

        assert!(scores.len() <= top_k);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
        assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{query}: {scores:?}");
        assert!(
            response
                .ranked_results
                .iter()
                .all(|r| r.method == RetrievalMethod::Hybrid)
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_excerpts_are_truncated() -> Result<()> {
    let pipeline = Pipeline::new(PipelineConfig::default(), None)?;
    pipeline.ingest(&multi_page_corpus()).await?;

    let response = pipeline.search("aspirin stent", Some(1), false).await?;
    let excerpt = &response.ranked_results[0].text_excerpt;
    assert_eq!(excerpt.chars().count(), 203);
    assert!(excerpt.ends_with("..."));
    Ok(())
}

#[tokio::test]
async fn test_clinical_search_echoes_context() -> Result<()> {
    let pipeline = Pipeline::new(PipelineConfig::default(), Some(hashing()))?;
    pipeline.ingest(&multi_page_corpus()).await?;

    let context = serde_json::json!({"age": 67, "conditions": ["asthma"], "notes": null});
    let response = pipeline
        .clinical_search(ClinicalQuery {
            question: "Is metoprolol safe in asthma?".to_string(),
            patient_context: Some(context.clone()),
        })
        .await?;

    assert_eq!(response.patient_context, context);
    assert_eq!(response.query_type, "clinical");
    assert!(response.search.ranked_results.len() <= CLINICAL_TOP_K);
    assert!(response.search.verification.is_some());

    let json = serde_json::to_value(&response)?;
    assert_eq!(json["query_type"], "clinical");
    assert!(json["ranked_results"].is_array());
    Ok(())
}

/// Answers only after a delay, to hold ingestion open.
struct SlowProvider {
    delay: Duration,
    inner: HashingProvider,
}

#[async_trait]
impl EmbeddingProvider for SlowProvider {
    async fn embed_texts(&self, texts: &[String]) -> medrag_embed::Result<EmbeddingResult> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed_texts(texts).await
    }

    fn embedding_dimension(&self) -> usize {
        self.inner.embedding_dimension()
    }

    fn provider_name(&self) -> &str {
        "slow"
    }
}

fn slow(delay: Duration) -> Arc<dyn EmbeddingProvider> {
    Arc::new(SlowProvider {
        delay,
        inner: HashingProvider::new(EmbedConfig::new("hashing").with_dimension(16)).unwrap(),
    })
}

#[tokio::test]
async fn test_concurrent_ingestion_is_rejected() -> Result<()> {
    let pipeline = Arc::new(Pipeline::new(
        PipelineConfig::default(),
        Some(slow(Duration::from_millis(300))),
    )?);

    let background = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move { pipeline.ingest(&multi_page_corpus()).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(pipeline.state().await, StateKind::Building);
    assert!(matches!(
        pipeline.ingest(&multi_page_corpus()).await,
        Err(PipelineError::IngestionInProgress)
    ));
    assert!(matches!(
        pipeline.search("aspirin", None, false).await,
        Err(PipelineError::NotReady)
    ));

    let summary = background.await??;
    assert!(summary.semantic_enabled);
    assert_eq!(pipeline.state().await, StateKind::Ready);
    Ok(())
}

#[tokio::test]
async fn test_embedding_timeout_degrades_to_lexical() -> Result<()> {
    let config = PipelineConfig::default().with_embed_timeout(Duration::from_millis(20));
    let pipeline = Pipeline::new(config, Some(slow(Duration::from_secs(5))))?;

    let summary = pipeline.ingest(&multi_page_corpus()).await?;
    assert!(!summary.semantic_enabled);

    let status = pipeline.status().await;
    assert!(status.degradation.unwrap_or_default().contains("timed out"));
    assert_eq!(status.embedding_provider.as_deref(), Some("slow"));

    let response = pipeline.search("stroke prevention", Some(3), false).await?;
    assert!(!response.ranked_results.is_empty());
    assert_eq!(response.metadata.retrieval_method, RetrievalMethod::Lexical);
    Ok(())
}

struct AlwaysFails;

#[async_trait]
impl EmbeddingProvider for AlwaysFails {
    async fn embed_texts(&self, _texts: &[String]) -> medrag_embed::Result<EmbeddingResult> {
        Err(anyhow::anyhow!("model offline").into())
    }

    fn embedding_dimension(&self) -> usize {
        384
    }

    fn provider_name(&self) -> &str {
        "always-fails"
    }
}

#[tokio::test]
async fn test_throwing_provider_never_breaks_retrieval() -> Result<()> {
    let pipeline = Pipeline::new(PipelineConfig::default(), Some(Arc::new(AlwaysFails)))?;
    pipeline.ingest(&multi_page_corpus()).await?;

    let index = pipeline.index().await?;
    let results = pipeline
        .retriever()
        .retrieve(&index, "warfarin", 2, 0.4)
        .await?;
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.method == RetrievalMethod::Lexical));
    assert!(results[0].chunk.text.contains("Warfarin"));
    Ok(())
}
