//! # medrag-context
//!
//! Turns guideline documents into indexable chunks. Pages are cut into coarse
//! parent windows and fine child windows, and every chunk is tagged with the
//! clinical terms recognized in its text.
//!
//! - [`terms`]: table-driven clinical term recognition
//! - [`segment`]: parent/child word-window segmentation
//! - [`chunk`]: the `Chunk`, `Document` and `Page` types
pub mod chunk;
pub mod error;
pub mod segment;
pub mod terms;

pub use chunk::{Chunk, ChunkLevel, Document, Page};
pub use error::{Result, SegmentError};
pub use segment::{Segmenter, SegmenterConfig};
pub use terms::{DEFAULT_TERM_PATTERNS, TermCategory, TermExtractor, TermPattern};
