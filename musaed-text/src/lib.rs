//! Text analysis for the assistant: normalization, keywords, language and
//! similarity scoring for informal Arabic and English chat messages.

mod dialect;
mod keywords;
mod language;
mod normalizer;
mod similarity;
mod stop_words;

use std::collections::HashSet;

pub use dialect::{DialectError, DialectTable};
pub use keywords::{KeywordExtractor, MAX_DROPPED_TOKEN_CHARS};
pub use language::{has_recognizable_char, is_arabic_char, Language, LanguageDetector};
pub use normalizer::{is_punctuation, ArabicNormalizer, TextNormalizer};
pub use similarity::{keyword_overlap, EditRatio, JaroWinkler, Similarity, SimilarityStrategy};
pub use stop_words::{StopWords, ARABIC_FILLERS, ENGLISH_FILLERS};

/// A message after every text stage has run over it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedText {
    pub raw: String,
    pub normalized: String,
    pub keywords: HashSet<String>,
    pub language: Language,
}

impl AnalyzedText {
    /// Whitespace tokens of the normalized text.
    pub fn tokens(&self) -> HashSet<&str> {
        self.normalized.split_whitespace().collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextAnalyzer {
    normalizer: TextNormalizer,
    extractor: KeywordExtractor,
    detector: LanguageDetector,
}

impl TextAnalyzer {
    pub fn new(normalizer: TextNormalizer, extractor: KeywordExtractor) -> Self {
        Self {
            normalizer,
            extractor,
            detector: LanguageDetector::new(),
        }
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    pub fn normalize(&self, text: &str) -> String {
        self.normalizer.normalize(text)
    }

    pub fn keywords(&self, normalized: &str) -> HashSet<String> {
        self.extractor.extract(normalized)
    }

    pub fn detect(&self, text: &str) -> Language {
        self.detector.detect(text)
    }

    pub fn analyze(&self, raw: &str) -> AnalyzedText {
        let normalized = self.normalizer.normalize(raw);
        let keywords = self.extractor.extract(&normalized);
        AnalyzedText {
            raw: raw.to_string(),
            keywords,
            language: self.detector.detect(raw),
            normalized,
        }
    }
}
