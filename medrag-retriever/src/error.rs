//! Error types for the retrieval pipeline

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors surfaced to callers of the pipeline.
///
/// Embedding failures never appear here: they are absorbed into lexical-only
/// ranking. Malformed documents are not errors either; they are listed in the
/// ingestion summary.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A query arrived before the first ingestion finished
    #[error("Index not ready: no corpus has been ingested yet")]
    NotReady,

    /// Another ingestion holds the single-flight guard
    #[error("Ingestion already in progress")]
    IngestionInProgress,

    /// The request parameters are unusable
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The configuration is unusable
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// IO errors while reading a corpus or a config file
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<medrag_context::SegmentError> for PipelineError {
    fn from(err: medrag_context::SegmentError) -> Self {
        Self::config(err.to_string())
    }
}

impl From<ignore::Error> for PipelineError {
    fn from(err: ignore::Error) -> Self {
        let message = err.to_string();
        let source = err
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other(message));
        Self::Io { source }
    }
}
