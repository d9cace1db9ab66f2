//! Error types for segmentation

/// Result type for segmentation operations.
pub type Result<T> = std::result::Result<T, SegmentError>;

/// Reasons a document or segmenter configuration is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentError {
    /// The document cannot be segmented into chunks with unique ids.
    #[error("Malformed document '{document}': {reason}")]
    MalformedDocument { document: String, reason: String },

    /// A window size of zero words was configured.
    #[error("Invalid {name} window size: {size} words")]
    InvalidWindow { name: &'static str, size: usize },
}

impl SegmentError {
    /// Create a malformed document error with a custom reason.
    pub fn malformed<D: Into<String>, R: Into<String>>(document: D, reason: R) -> Self {
        Self::MalformedDocument {
            document: document.into(),
            reason: reason.into(),
        }
    }
}
