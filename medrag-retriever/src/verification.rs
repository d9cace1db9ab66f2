//! Checking a synthesized answer against the evidence it came from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentence fragments this short or shorter are not checked.
pub const MIN_SENTENCE_CHARS: usize = 10;
/// Tokens this short or shorter are not key words.
pub const MIN_KEY_WORD_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn from_support_ratio(ratio: f32) -> Self {
        if ratio >= 0.9 {
            Self::Low
        } else if ratio >= 0.7 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationVerdict {
    pub support_ratio: f32,
    pub risk_tier: RiskTier,
    pub supported_sentences: Vec<String>,
    pub unsupported_sentences: Vec<String>,
}

/// Split on `". "`, dropping fragments of [`MIN_SENTENCE_CHARS`] characters or fewer.
pub fn split_sentences(answer: &str) -> Vec<&str> {
    answer
        .split(". ")
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .collect()
}

/// Lowercased whitespace tokens longer than [`MIN_KEY_WORD_CHARS`] characters.
pub fn key_words(sentence: &str) -> Vec<String> {
    sentence
        .split_whitespace()
        .filter(|w| w.chars().count() > MIN_KEY_WORD_CHARS)
        .map(str::to_lowercase)
        .collect()
}

/// A sentence is supported when one chunk contains at least half its key words.
fn is_supported(sentence: &str, chunks: &[String]) -> bool {
    let words = key_words(sentence);
    if words.is_empty() {
        return false;
    }
    chunks.iter().any(|chunk| {
        let found = words.iter().filter(|w| chunk.contains(w.as_str())).count();
        found * 2 >= words.len()
    })
}

/// Classify every sentence of `answer` against `supporting_chunks`.
pub fn verify<S: AsRef<str>>(answer: &str, supporting_chunks: &[S]) -> VerificationVerdict {
    let chunks: Vec<String> = supporting_chunks
        .iter()
        .map(|c| c.as_ref().to_lowercase())
        .collect();

    let (supported, unsupported): (Vec<&str>, Vec<&str>) = split_sentences(answer)
        .into_iter()
        .partition(|sentence| is_supported(sentence, &chunks));

    let total = supported.len() + unsupported.len();
    let support_ratio = if total == 0 {
        0.0
    } else {
        supported.len() as f32 / total as f32
    };
    tracing::debug!(
        "Verified {} sentences, {} supported",
        total,
        supported.len()
    );

    VerificationVerdict {
        support_ratio,
        risk_tier: RiskTier::from_support_ratio(support_ratio),
        supported_sentences: supported.into_iter().map(String::from).collect(),
        unsupported_sentences: unsupported.into_iter().map(String::from).collect(),
    }
}
