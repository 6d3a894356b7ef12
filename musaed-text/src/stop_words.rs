//! Filler words that never count as keywords.
//!
//! Only tokens longer than two characters are listed; the extractor drops
//! shorter ones before consulting this set. Entries are folded on insert so
//! lookups take normalized tokens.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::normalizer::{fold_text, ArabicNormalizer};

/// Standard and Egyptian colloquial fillers.
pub static ARABIC_FILLERS: &[&str] = &[
    // prepositions and conjunctions
    "على", "إلى", "بين", "حتى", "منذ", "لكن", "لولا", "إما",
    "بعد", "قبل", "خلال", "أثناء", "حول", "فوق", "تحت", "أمام", "جنب",
    // pronouns and demonstratives
    "أنا", "نحن", "احنا", "أنت", "انتو", "أنتم", "هذا", "هذه", "ذلك", "تلك", "دول",
    "الذي", "التي", "الذين", "اللي",
    // question words
    "ماذا", "أين", "متى", "كيف", "لماذا", "ليه", "ازاي", "امتى",
    // auxiliaries and particles
    "كان", "كانت", "يكون", "ليس", "لقد", "سوف", "إذا", "هناك", "هنا",
    // politeness and chat filler
    "يعني", "طيب", "برضه", "ممكن", "سمحت", "فضلك", "لوسمحت", "عايز", "عاوز",
    "أريد", "نريد", "أعرف", "عندي", "عندكم", "الآن", "فقط", "أيضا", "جدا",
];

pub static ENGLISH_FILLERS: &[&str] = &[
    // articles, conjunctions, prepositions
    "and", "the", "but", "for", "from", "with", "about", "into", "than", "then",
    // pronouns
    "you", "your", "our", "they", "this", "that", "these", "those", "its",
    // auxiliaries
    "are", "was", "were", "has", "have", "had", "does", "did", "will", "would",
    "can", "could", "should", "may", "might", "been", "being",
    // question words
    "what", "when", "who", "which", "why",
    // chat filler
    "please", "want", "need", "know", "tell", "any", "like", "get", "just", "some",
];

#[derive(Debug, Clone)]
pub struct StopWords {
    words: HashSet<String>,
    folder: ArabicNormalizer,
}

impl Default for StopWords {
    fn default() -> Self {
        let mut words = Self::empty();
        words.extend(ARABIC_FILLERS);
        words.extend(ENGLISH_FILLERS);
        words
    }
}

impl StopWords {
    pub fn empty() -> Self {
        Self {
            words: HashSet::new(),
            folder: ArabicNormalizer::new(),
        }
    }

    /// One word per line; blank lines and `#` comments are skipped.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let content = fs::read_to_string(path)?;
        let mut words = Self::empty();
        words.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        );
        Ok(words)
    }

    pub fn extend<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            let folded = fold_text(&self.folder, word.as_ref());
            let folded = folded.trim();
            if !folded.is_empty() {
                self.words.insert(folded.to_string());
            }
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_both_languages() {
        let words = StopWords::default();
        assert!(words.contains("the"));
        assert!(words.contains("please"));
        assert!(words.contains("يعني"));
        assert!(!words.contains("price"));
        assert!(!words.contains("سعر"));
    }

    #[test]
    fn lookups_use_folded_forms() {
        let words = StopWords::default();
        // listed as "إلى" and "أريد"
        assert!(words.contains("الي"));
        assert!(words.contains("اريد"));
        assert!(!words.contains("إلى"));
    }

    #[test]
    fn extend_folds_and_skips_blanks() {
        let mut words = StopWords::empty();
        words.extend(["  ", "Yeah", "إذن"]);
        assert_eq!(words.len(), 2);
        assert!(words.contains("yeah"));
        assert!(words.contains("اذن"));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fillers.txt");
        fs::write(&path, "# site specific\nkindly\n\nبقى\n").unwrap();
        let words = StopWords::from_file(&path).unwrap();
        assert_eq!(words.len(), 2);
        assert!(words.contains("kindly"));
        assert!(words.contains("بقي"));
    }
}
