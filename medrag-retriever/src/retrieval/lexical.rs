//! Okapi BM25 over lowercase whitespace tokens.
//!
//! No stemming and no stop-word list: guideline vocabulary ("mg", "ecg") is
//! short and easily mangled by general-purpose stemmers.

use std::collections::HashMap;

/// Term frequency saturation.
pub const BM25_K1: f32 = 1.5;
/// Document length normalization.
pub const BM25_B: f32 = 0.75;

/// Split text into lowercase whitespace tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Inverted statistics for one corpus generation.
#[derive(Debug, Clone, Default)]
pub struct Bm25Index {
    term_frequencies: Vec<HashMap<String, u32>>,
    doc_lengths: Vec<usize>,
    document_frequency: HashMap<String, usize>,
    avg_doc_length: f32,
}

impl Bm25Index {
    pub fn build<'a, I>(texts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut index = Self::default();
        for text in texts {
            let tokens = tokenize(text);
            let mut frequencies: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                *frequencies.entry(token.clone()).or_default() += 1;
            }
            for term in frequencies.keys() {
                *index.document_frequency.entry(term.clone()).or_default() += 1;
            }
            index.doc_lengths.push(tokens.len());
            index.term_frequencies.push(frequencies);
        }

        let total: usize = index.doc_lengths.iter().sum();
        index.avg_doc_length = if index.doc_lengths.is_empty() {
            0.0
        } else {
            total as f32 / index.doc_lengths.len() as f32
        };
        index
    }

    pub fn len(&self) -> usize {
        self.doc_lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }

    /// Inverse document frequency, kept non-negative so terms present in most
    /// chunks of a tiny corpus still contribute.
    pub fn idf(&self, term: &str) -> f32 {
        let n = self.len() as f32;
        let df = self.document_frequency.get(term).copied().unwrap_or(0) as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// One score per indexed text, in insertion order.
    pub fn score_all(&self, query_tokens: &[String]) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.len()];
        if self.avg_doc_length == 0.0 {
            return scores;
        }

        for term in query_tokens {
            if !self.document_frequency.contains_key(term) {
                continue;
            }
            let idf = self.idf(term);
            for (doc, score) in scores.iter_mut().enumerate() {
                let Some(&tf) = self.term_frequencies[doc].get(term) else {
                    continue;
                };
                let tf = tf as f32;
                let length_ratio = self.doc_lengths[doc] as f32 / self.avg_doc_length;
                let denominator = tf + BM25_K1 * (1.0 - BM25_B + BM25_B * length_ratio);
                *score += idf * tf * (BM25_K1 + 1.0) / denominator;
            }
        }
        scores
    }
}
