//! Two-level segmentation of document pages into parent and child chunks.
//!
//! Every page is cut into non-overlapping windows of `parent_window_words` words,
//! and every parent into windows of `child_window_words` words. Windows are byte
//! ranges of the source text: a window begins at its first word and runs up to the
//! first word of the next window, so the whitespace between windows belongs to the
//! earlier one. Concatenating the children of a parent therefore reproduces the
//! parent text exactly.
//!
//! ```
//! use medrag_context::segment::{Segmenter, SegmenterConfig};
//!
//! let config = SegmenterConfig::default()
//!     .with_parent_window_words(8)
//!     .with_child_window_words(3)
//!     .with_min_page_chars(10);
//! let segmenter = Segmenter::new(config).unwrap();
//!
//! let text = "Beta blockers reduce mortality in heart failure with reduced ejection fraction.";
//! let chunks = segmenter.segment_page("esc-hf.txt", 1, text);
//!
//! let parent = &chunks[0];
//! let children: String = chunks
//!     .iter()
//!     .filter(|c| c.parent_id.as_deref() == Some(parent.id.as_str()))
//!     .map(|c| c.text.as_str())
//!     .collect();
//! assert_eq!(children, parent.text);
//! ```
use crate::chunk::{Chunk, ChunkLevel, Document};
use crate::error::{Result, SegmentError};
use crate::terms::TermExtractor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;

/// Default parent window, in words.
pub const DEFAULT_PARENT_WINDOW_WORDS: usize = 1200;
/// Default child window, in words.
pub const DEFAULT_CHILD_WINDOW_WORDS: usize = 300;
/// Pages with fewer trimmed characters than this are treated as blank.
pub const DEFAULT_MIN_PAGE_CHARS: usize = 50;

/// Window sizes and the blank-page threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub parent_window_words: usize,
    pub child_window_words: usize,
    pub min_page_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            parent_window_words: DEFAULT_PARENT_WINDOW_WORDS,
            child_window_words: DEFAULT_CHILD_WINDOW_WORDS,
            min_page_chars: DEFAULT_MIN_PAGE_CHARS,
        }
    }
}

impl SegmenterConfig {
    pub fn with_parent_window_words(mut self, words: usize) -> Self {
        self.parent_window_words = words;
        self
    }

    pub fn with_child_window_words(mut self, words: usize) -> Self {
        self.child_window_words = words;
        self
    }

    pub fn with_min_page_chars(mut self, chars: usize) -> Self {
        self.min_page_chars = chars;
        self
    }

    /// Reject zero-word windows.
    pub fn validate(&self) -> Result<()> {
        if self.parent_window_words == 0 {
            return Err(SegmentError::InvalidWindow {
                name: "parent",
                size: 0,
            });
        }
        if self.child_window_words == 0 {
            return Err(SegmentError::InvalidWindow {
                name: "child",
                size: 0,
            });
        }
        Ok(())
    }
}

/// Splits pages into parent and child chunks and tags them with domain terms.
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
    extractor: TermExtractor,
}

impl Segmenter {
    /// Create a segmenter using the built-in term table.
    pub fn new(config: SegmenterConfig) -> Result<Self> {
        Self::with_extractor(config, TermExtractor::default())
    }

    pub fn with_extractor(config: SegmenterConfig, extractor: TermExtractor) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, extractor })
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    pub fn extractor(&self) -> &TermExtractor {
        &self.extractor
    }

    /// Segment every page of a document.
    ///
    /// Chunks are returned page by page; within a page all parents come first,
    /// followed by the children of each parent in order.
    ///
    /// # Errors
    /// [`SegmentError::MalformedDocument`] if the document has no name, a page
    /// numbered 0, or two pages with the same number.
    pub fn segment_document(&self, document: &Document) -> Result<Vec<Chunk>> {
        if document.name.trim().is_empty() {
            return Err(SegmentError::malformed(
                document.name.clone(),
                "document name is empty",
            ));
        }

        let mut seen_pages = HashSet::new();
        for page in &document.pages {
            if page.number == 0 {
                return Err(SegmentError::malformed(
                    document.name.clone(),
                    "page numbers start at 1",
                ));
            }
            if !seen_pages.insert(page.number) {
                return Err(SegmentError::malformed(
                    document.name.clone(),
                    format!("page {} appears more than once", page.number),
                ));
            }
        }

        let chunks: Vec<Chunk> = document
            .pages
            .iter()
            .flat_map(|page| self.segment_page(&document.name, page.number, &page.text))
            .collect();

        tracing::debug!(
            "Segmented {} ({} pages) into {} chunks",
            document.name,
            document.pages.len(),
            chunks.len()
        );

        Ok(chunks)
    }

    /// Segment the text of a single page. Blank pages yield no chunks.
    pub fn segment_page(&self, source_doc: &str, page_number: u32, text: &str) -> Vec<Chunk> {
        let page_text = text.trim();
        if page_text.chars().count() < self.config.min_page_chars {
            tracing::debug!(
                "Skipping page {} of {}: below {} characters",
                page_number,
                source_doc,
                self.config.min_page_chars
            );
            return Vec::new();
        }

        let section_hierarchy = vec![format!("Page {page_number}")];

        let parents: Vec<Chunk> = word_windows(page_text, self.config.parent_window_words)
            .into_iter()
            .enumerate()
            .map(|(n, range)| {
                let text = &page_text[range];
                Chunk {
                    id: format!("{source_doc}_p{page_number}_parent_{n}"),
                    text: text.to_string(),
                    source_doc: source_doc.to_string(),
                    page_number,
                    section_hierarchy: section_hierarchy.clone(),
                    level: ChunkLevel::Parent,
                    parent_id: None,
                    terms: self.terms_for(text),
                }
            })
            .collect();

        let children: Vec<Chunk> = parents
            .iter()
            .flat_map(|parent| self.child_chunks(parent))
            .collect();

        let mut chunks = parents;
        chunks.extend(children);
        chunks
    }

    fn child_chunks(&self, parent: &Chunk) -> Vec<Chunk> {
        word_windows(&parent.text, self.config.child_window_words)
            .into_iter()
            .enumerate()
            .map(|(m, range)| {
                let text = &parent.text[range];
                Chunk {
                    id: format!("{}_child_{m}", parent.id),
                    text: text.to_string(),
                    source_doc: parent.source_doc.clone(),
                    page_number: parent.page_number,
                    section_hierarchy: parent.section_hierarchy.clone(),
                    level: ChunkLevel::Child,
                    parent_id: Some(parent.id.clone()),
                    terms: self.terms_for(text),
                }
            })
            .collect()
    }

    fn terms_for(&self, text: &str) -> Vec<String> {
        self.extractor.extract(text).into_iter().collect()
    }
}

/// Byte offsets at which each whitespace-separated word starts.
fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut in_word = false;
    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            in_word = false;
        } else if !in_word {
            starts.push(idx);
            in_word = true;
        }
    }
    starts
}

/// Split `text` into contiguous ranges of `window` words each.
///
/// The first range starts at the first word, every other range starts where the
/// previous one ends, and the last range runs to the end of `text`.
fn word_windows(text: &str, window: usize) -> Vec<Range<usize>> {
    let starts = word_starts(text);
    let mut ranges = Vec::with_capacity(starts.len().div_ceil(window.max(1)));
    let mut i = 0;
    while i < starts.len() {
        let end = starts.get(i + window).copied().unwrap_or(text.len());
        ranges.push(starts[i]..end);
        i += window;
    }
    ranges
}
