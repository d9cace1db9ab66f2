//! Indexable units of guideline text and the documents they come from.
use serde::{Deserialize, Serialize};

/// Granularity of a [`Chunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkLevel {
    /// Coarse window over a page.
    Parent,
    /// Fine window over a parent.
    Child,
}

impl std::fmt::Display for ChunkLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkLevel::Parent => write!(f, "parent"),
            ChunkLevel::Child => write!(f, "child"),
        }
    }
}

/// A single indexable segment of a document page.
///
/// Identifiers are derived from the document name, page number, level and window
/// position, so segmenting the same input twice yields the same ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub source_doc: String,
    pub page_number: u32,
    pub section_hierarchy: Vec<String>,
    pub level: ChunkLevel,
    /// Set only on [`ChunkLevel::Child`] chunks.
    pub parent_id: Option<String>,
    /// Recognized domain terms, sorted and deduplicated.
    pub terms: Vec<String>,
}

impl Chunk {
    pub fn is_parent(&self) -> bool {
        self.level == ChunkLevel::Parent
    }

    /// The first `max_chars` characters of the text, followed by `...` if anything was cut.
    pub fn excerpt(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &self.text[..cut]),
            None => self.text.clone(),
        }
    }
}

/// One page of raw text as supplied by a document source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub text: String,
}

impl Page {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// A named document made of ordered pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(name: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            name: name.into(),
            pages,
        }
    }

    /// Build a document from page texts, numbering pages from 1.
    pub fn from_page_texts<I, S>(name: impl Into<String>, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = texts
            .into_iter()
            .zip(1u32..)
            .map(|(text, number)| Page::new(number, text))
            .collect();
        Self::new(name, pages)
    }
}
