//! Pattern-based recognition of clinical terms in free text.
//!
//! Recognition is driven by a table of [`TermPattern`]s. Each pattern belongs to a
//! [`TermCategory`] and is compiled case-insensitively. A piece of text yields the
//! set of every full match of every pattern, lowercased and deduplicated, so a
//! dosage such as `50 MG` is recorded as `"50 mg"`.
//!
//! ```
//! use medrag_context::terms::TermExtractor;
//!
//! let extractor = TermExtractor::default();
//! let terms = extractor.extract("Patients with heart failure should receive metoprolol 50 mg twice daily.");
//!
//! assert!(terms.contains("heart failure"));
//! assert!(terms.contains("metoprolol"));
//! assert!(terms.contains("50 mg"));
//! ```
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

/// Groups of clinical vocabulary recognized by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TermCategory {
    Condition,
    Medication,
    Procedure,
    Measurement,
    Dosage,
}

impl std::fmt::Display for TermCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TermCategory::Condition => write!(f, "condition"),
            TermCategory::Medication => write!(f, "medication"),
            TermCategory::Procedure => write!(f, "procedure"),
            TermCategory::Measurement => write!(f, "measurement"),
            TermCategory::Dosage => write!(f, "dosage"),
        }
    }
}

/// One row of the recognition table.
#[derive(Debug, Clone, Copy)]
pub struct TermPattern {
    pub category: TermCategory,
    pub pattern: &'static str,
}

/// Built-in recognition table, applied in order.
pub const DEFAULT_TERM_PATTERNS: &[TermPattern] = &[
    TermPattern {
        category: TermCategory::Condition,
        pattern: r"\b(heart failure|atrial fibrillation|myocardial infarction|angina|arrhythmia|cardiomyopathy|hypertension|stroke|diabetes|asthma)\b",
    },
    TermPattern {
        category: TermCategory::Medication,
        pattern: r"\b(metoprolol|atenolol|bisoprolol|carvedilol|warfarin|aspirin|lisinopril|ramipril|amlodipine|digoxin|amiodarone|furosemide|apixaban)\b",
    },
    TermPattern {
        category: TermCategory::Procedure,
        pattern: r"\b(angioplasty|bypass|stent|catheterization|echocardiogram|ECG|EKG)\b",
    },
    TermPattern {
        category: TermCategory::Measurement,
        pattern: r"\b(blood pressure|heart rate|ejection fraction|cholesterol)\b",
    },
    TermPattern {
        category: TermCategory::Dosage,
        pattern: r"\b\d+\s*(mg|g|mcg|units?)\b",
    },
];

static DEFAULT_EXTRACTOR: LazyLock<TermExtractor> = LazyLock::new(|| {
    TermExtractor::new(DEFAULT_TERM_PATTERNS).expect("built-in term patterns are valid regexes")
});

/// Recognizes clinical terms using a compiled pattern table.
#[derive(Debug, Clone)]
pub struct TermExtractor {
    patterns: Vec<(TermCategory, Regex)>,
}

impl TermExtractor {
    /// Compile a custom recognition table.
    ///
    /// # Errors
    /// Returns the first pattern that fails to compile.
    pub fn new(patterns: &[TermPattern]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (p.category, re))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Number of patterns in the table.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// All recognized terms in `text`, lowercased and deduplicated.
    pub fn extract(&self, text: &str) -> BTreeSet<String> {
        self.patterns
            .iter()
            .flat_map(|(_, re)| re.find_iter(text))
            .map(|m| m.as_str().to_lowercase())
            .collect()
    }

    /// Recognized terms grouped by the category whose pattern matched them.
    ///
    /// A string matched by two categories appears under both.
    pub fn extract_by_category(&self, text: &str) -> BTreeMap<TermCategory, BTreeSet<String>> {
        let mut grouped: BTreeMap<TermCategory, BTreeSet<String>> = BTreeMap::new();
        for (category, re) in &self.patterns {
            for m in re.find_iter(text) {
                grouped
                    .entry(*category)
                    .or_default()
                    .insert(m.as_str().to_lowercase());
            }
        }
        grouped
    }
}

impl Default for TermExtractor {
    fn default() -> Self {
        DEFAULT_EXTRACTOR.clone()
    }
}
