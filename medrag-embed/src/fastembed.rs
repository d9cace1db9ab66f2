//! Local ONNX embeddings through fastembed.

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult, to_f16};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::{Arc, Mutex};

/// Provider backed by the all-MiniLM-L6-v2 sentence model.
///
/// The model is fetched into fastembed's cache on first use, so construction
/// may take a while and may fail offline. Callers treat a failed
/// [`FastEmbedProvider::create`] as "semantic search unavailable".
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl FastEmbedProvider {
    /// Load the model and measure its output dimension.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!("Loading embedding model: {}", config.model_name);

        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                let init_options =
                    InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
                let mut model =
                    TextEmbedding::try_new(init_options).map_err(EmbedError::model_init)?;

                let sample = model
                    .embed(vec!["dimension check".to_string()], None)
                    .map_err(EmbedError::model_init)?;
                let dimension = sample.first().map(|emb| emb.len()).unwrap_or(0);
                Ok((model, dimension))
            })
            .await??;

        if dimension != config.dimension {
            return Err(EmbedError::invalid_config(format!(
                "model produces {dimension}-dimensional vectors but {} were configured",
                config.dimension
            )));
        }

        tracing::info!("Model loaded successfully. Dimension: {}", dimension);
        Ok(Self {
            config,
            model: Arc::new(Mutex::new(model)),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_texts(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size) {
            let batch = batch.to_vec();
            let model = Arc::clone(&self.model);

            let raw = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                let mut guard = model
                    .lock()
                    .map_err(|_| EmbedError::unavailable("embedding model lock poisoned"))?;
                guard
                    .embed(batch, None)
                    .map_err(EmbedError::embedding_gen)
            })
            .await??;

            all_embeddings.extend(to_f16(raw, self.config.normalize));
        }

        Ok(EmbeddingResult::new(all_embeddings))
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}
