//! Deterministic response templates over ranked evidence.

use crate::retrieval::RetrievalResult;
use itertools::Itertools;
use medrag_context::TermExtractor;
use serde::Serialize;
use std::collections::BTreeSet;

/// Returned verbatim when no chunk matched.
pub const NO_RESULTS_MESSAGE: &str = "No relevant information found in the guidelines.";

/// Chunks quoted in the body.
pub const EVIDENCE_CHUNKS: usize = 3;
/// Terms listed in the rendered response.
pub const MAX_RENDERED_TERMS: usize = 10;

const DISCLAIMER: &str = "Note: This information is extracted from clinical guidelines. \
Always consult with healthcare professionals for medical decisions.";

/// A source document and page cited by a response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Citation {
    pub source_doc: String,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesizedResponse {
    /// The rendered response
    pub text: String,
    /// Quoted evidence, the part a verifier should check
    pub body: String,
    pub terms: Vec<String>,
    pub citations: Vec<Citation>,
}

impl SynthesizedResponse {
    fn empty() -> Self {
        Self {
            text: NO_RESULTS_MESSAGE.to_string(),
            body: String::new(),
            terms: Vec::new(),
            citations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseSynthesizer {
    extractor: TermExtractor,
    max_context_chars: usize,
}

impl ResponseSynthesizer {
    pub fn new(extractor: TermExtractor, max_context_chars: usize) -> Self {
        Self {
            extractor,
            max_context_chars,
        }
    }

    /// Render `query` against `results`, which must already be ranked.
    pub fn synthesize(&self, query: &str, results: &[RetrievalResult<'_>]) -> SynthesizedResponse {
        if results.is_empty() {
            return SynthesizedResponse::empty();
        }
        let evidence = &results[..results.len().min(EVIDENCE_CHUNKS)];

        let joined = evidence.iter().map(|r| r.chunk.text.as_str()).join("\n\n");
        let body = truncate_chars(&joined, self.max_context_chars).to_string();

        let mut terms: BTreeSet<String> = self.extractor.extract(query);
        for result in evidence {
            terms.extend(result.chunk.terms.iter().cloned());
        }
        let terms: Vec<String> = terms.into_iter().collect();

        let citations: Vec<Citation> = evidence
            .iter()
            .map(|r| Citation {
                source_doc: r.chunk.source_doc.clone(),
                page: r.chunk.page_number,
            })
            .unique()
            .collect();

        let rendered_terms = if terms.is_empty() {
            "none".to_string()
        } else {
            terms.iter().take(MAX_RENDERED_TERMS).join(", ")
        };
        let sources = citations.iter().map(|c| c.source_doc.as_str()).unique().join(", ");
        let pages = citations.iter().map(|c| c.page).unique().join(", ");

        let text = format!(
            "Based on the clinical guidelines, here is information about: {query}\n\n\
             {body}\n\n\
             Key medical terms identified: {rendered_terms}\n\n\
             Sources: {sources}\n\
             Pages: {pages}\n\n\
             {DISCLAIMER}"
        );

        SynthesizedResponse {
            text,
            body,
            terms,
            citations,
        }
    }
}

/// Longest prefix of `text` with at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}
