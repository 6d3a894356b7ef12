//! String Similarity
//!
//! Pluggable similarity strategies. Every strategy is symmetric, bounded in
//! [0, 1] and returns 1.0 only for identical inputs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub trait Similarity: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;
}

/// Normalized Levenshtein distance over characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditRatio;

impl Similarity for EditRatio {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b)
    }
}

/// Jaro-Winkler, which favours shared prefixes.
#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinkler;

impl Similarity for JaroWinkler {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }
        // jaro_winkler is not exactly symmetric once the prefix boost applies
        let forward = strsim::jaro_winkler(a, b);
        let backward = strsim::jaro_winkler(b, a);
        forward.min(backward).min(1.0 - f64::EPSILON)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityStrategy {
    #[default]
    Levenshtein,
    JaroWinkler,
}

impl SimilarityStrategy {
    pub fn build(self) -> Box<dyn Similarity> {
        match self {
            SimilarityStrategy::Levenshtein => Box::new(EditRatio),
            SimilarityStrategy::JaroWinkler => Box::new(JaroWinkler),
        }
    }
}

/// `|A ∩ B| / max(|A|, |B|)`, zero when either set is empty.
pub fn keyword_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let largest = a.len().max(b.len());
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f64 / largest as f64
}
