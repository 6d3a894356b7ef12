//! Keyword Extraction
//!
//! Turns normalized text into the set of significant tokens used for
//! overlap scoring.

use std::collections::HashSet;

use crate::stop_words::StopWords;

/// Tokens of this many characters or fewer are never keywords.
pub const MAX_DROPPED_TOKEN_CHARS: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct KeywordExtractor {
    stop_words: StopWords,
}

impl KeywordExtractor {
    pub fn new(stop_words: StopWords) -> Self {
        Self { stop_words }
    }

    pub fn stop_words(&self) -> &StopWords {
        &self.stop_words
    }

    /// Expects text that already went through the normalizer.
    pub fn extract(&self, normalized: &str) -> HashSet<String> {
        normalized
            .split_whitespace()
            .filter(|token| token.chars().count() > MAX_DROPPED_TOKEN_CHARS)
            .filter(|token| !self.stop_words.contains(token))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_drops_short_tokens_and_stop_words() {
        let extractor = KeywordExtractor::default();
        let keywords = extractor.extract("my ceiling has mold and a bad smell");
        assert_eq!(keywords, set(&["ceiling", "mold", "bad", "smell"]));
    }

    #[test]
    fn test_duplicates_collapse() {
        let extractor = KeywordExtractor::default();
        let keywords = extractor.extract("paint paint paint colors");
        assert_eq!(keywords, set(&["paint", "colors"]));
    }

    #[test]
    fn test_arabic_keywords() {
        let extractor = KeywordExtractor::default();
        let keywords = extractor.extract("اريد اعرف كم سعر المتر في الشقه");
        assert_eq!(keywords, set(&["سعر", "المتر", "الشقه"]));
    }

    #[test]
    fn test_empty_input() {
        let extractor = KeywordExtractor::default();
        assert!(extractor.extract("").is_empty());
        assert!(extractor.extract("a b cc").is_empty());
    }
}
