//! # medrag-embed
//!
//! Text embeddings for the guideline retriever, stored as half-precision
//! vectors.
//!
//! Every provider implements [`EmbeddingProvider`]. The crate ships a
//! deterministic [`HashingProvider`] that needs no model files, a
//! [`DisabledProvider`] for running without semantic search, and, behind the
//! `fastembed` feature, a local ONNX sentence model.
//!
//! ```
//! use medrag_embed::{EmbedConfig, EmbeddingProvider, HashingProvider};
//!
//! # tokio_test::block_on(async {
//! let provider = HashingProvider::new(EmbedConfig::new("hashing").with_dimension(64))?;
//! let result = provider.embed_texts(&["Beta blockers in heart failure".to_string()]).await?;
//! assert_eq!(result.dimension, 64);
//! # Ok::<(), medrag_embed::EmbedError>(())
//! # }).unwrap();
//! ```
//!
//! Failures are reported through [`EmbedError`]. Consumers are expected to
//! degrade to lexical ranking on any of them.

pub mod config;
pub mod error;
#[cfg(feature = "fastembed")]
pub mod fastembed;
pub mod provider;

pub use config::{DEFAULT_DIMENSION, DEFAULT_MODEL_NAME, EmbedConfig};
pub use error::{EmbedError, Result};
#[cfg(feature = "fastembed")]
pub use fastembed::FastEmbedProvider;
pub use provider::{
    DisabledProvider, EmbeddingProvider, EmbeddingResult, HashingProvider, embed_with_timeout,
    to_f16,
};
