//! medrag-retriever: hybrid retrieval and answer verification over clinical guidelines
//!
//! Guideline documents are segmented into parent and child chunks, ranked by a
//! blend of BM25 and embedding similarity, summarized with a deterministic
//! template, and the summary is checked sentence by sentence against the
//! evidence.
//!
//! ## Key Modules
//!
//! - **[`pipeline`]**: the orchestrator owning the live Index
//! - **[`retrieval`]**: BM25, semantic index and the hybrid blend
//! - **[`synthesis`]** and **[`verification`]**: response template and support checks
//! - **[`status`]**: ingestion summaries and health reporting
//!
//! ## Quick Start
//!
//! ```rust
//! use medrag_context::Document;
//! use medrag_retriever::{Pipeline, PipelineConfig};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let pipeline = Pipeline::new(PipelineConfig::default(), None)?;
//! pipeline
//!     .ingest(&[Document::from_page_texts(
//!         "hf",
//!         ["Patients with heart failure should receive metoprolol 50 mg twice daily."],
//!     )])
//!     .await?;
//!
//! let response = pipeline.search("heart failure treatment", Some(5), true).await?;
//! assert!(!response.ranked_results.is_empty());
//! # Ok::<(), medrag_retriever::PipelineError>(())
//! # }).unwrap();
//! ```

pub mod config;
pub mod corpus;
pub mod error;
pub mod pipeline;
pub mod retrieval;
pub mod status;
pub mod synthesis;
pub mod verification;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{ClinicalQuery, ClinicalResponse, Pipeline, SearchResponse};
pub use status::{IngestionSummary, PipelineStatus, StateKind};
