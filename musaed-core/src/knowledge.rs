//! Curated knowledge base: an ordered, immutable list of bilingual topics.
//! Catalog order is priority order; the first entry with a matching
//! keyword wins.

use musaed_text::{Language, TextNormalizer};
use serde::{Deserialize, Serialize};

/// Keywords shorter than this only match as a whole token.
pub const MIN_SUBSTRING_KEYWORD_CHARS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("knowledge entry {0:?} has no keywords in either language")]
    NoKeywords(String),

    #[error("knowledge entry {topic:?} is missing its {language} response")]
    MissingResponse { topic: String, language: &'static str },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeEntry {
    pub topic: String,
    pub keywords_primary: Vec<String>,
    pub keywords_secondary: Vec<String>,
    pub response_primary: String,
    pub response_secondary: String,
    #[serde(default)]
    pub addresses_user: bool,
}

impl KnowledgeEntry {
    pub fn keywords(&self, language: Language) -> &[String] {
        match language {
            Language::Arabic => &self.keywords_primary,
            Language::English => &self.keywords_secondary,
        }
    }

    pub fn response(&self, language: Language) -> &str {
        match language {
            Language::Arabic => &self.response_primary,
            Language::English => &self.response_secondary,
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledKeyword {
    normalized: String,
    /// Match only on token boundaries. Set for short keywords and for
    /// keywords the dialect table rewrote, whose rewritten form can hide
    /// inside unrelated words.
    whole_words: bool,
}

impl CompiledKeyword {
    fn matches(&self, padded: &str) -> bool {
        if self.whole_words {
            padded.contains(&format!(" {} ", self.normalized))
        } else {
            padded.contains(self.normalized.as_str())
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledEntry {
    entry: KnowledgeEntry,
    primary: Vec<CompiledKeyword>,
    secondary: Vec<CompiledKeyword>,
}

impl CompiledEntry {
    /// Checked after compilation: a keyword that normalizes to nothing
    /// can never match.
    fn validate(&self) -> Result<(), KnowledgeError> {
        let entry = &self.entry;
        if self.primary.is_empty() && self.secondary.is_empty() {
            return Err(KnowledgeError::NoKeywords(entry.topic.clone()));
        }
        if !self.primary.is_empty() && entry.response_primary.trim().is_empty() {
            return Err(KnowledgeError::MissingResponse {
                topic: entry.topic.clone(),
                language: Language::Arabic.code(),
            });
        }
        if !self.secondary.is_empty() && entry.response_secondary.trim().is_empty() {
            return Err(KnowledgeError::MissingResponse {
                topic: entry.topic.clone(),
                language: Language::English.code(),
            });
        }
        Ok(())
    }

    fn keywords(&self, language: Language) -> &[CompiledKeyword] {
        match language {
            Language::Arabic => &self.primary,
            Language::English => &self.secondary,
        }
    }
}

fn compile(normalizer: &TextNormalizer, keywords: &[String]) -> Vec<CompiledKeyword> {
    keywords
        .iter()
        .filter_map(|keyword| {
            let normalized = normalizer.normalize(keyword);
            if normalized.is_empty() {
                return None;
            }
            let rewritten = normalized != normalizer.fold(keyword);
            Some(CompiledKeyword {
                whole_words: rewritten
                    || normalized.chars().count() < MIN_SUBSTRING_KEYWORD_CHARS,
                normalized,
            })
        })
        .collect()
}

/// A knowledge base hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnowledgeMatch<'a> {
    pub entry: &'a KnowledgeEntry,
    pub keyword: &'a str,
    pub response: &'a str,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<CompiledEntry>,
}

impl KnowledgeBase {
    /// Keywords are normalized with the same normalizer used for messages.
    pub fn new(
        entries: Vec<KnowledgeEntry>,
        normalizer: &TextNormalizer,
    ) -> Result<Self, KnowledgeError> {
        let entries = entries
            .into_iter()
            .map(|entry| {
                let compiled = CompiledEntry {
                    primary: compile(normalizer, &entry.keywords_primary),
                    secondary: compile(normalizer, &entry.keywords_secondary),
                    entry,
                };
                compiled.validate()?;
                Ok(compiled)
            })
            .collect::<Result<Vec<_>, KnowledgeError>>()?;
        Ok(Self { entries })
    }

    /// The compiled-in business catalog.
    pub fn builtin(normalizer: &TextNormalizer) -> Result<Self, KnowledgeError> {
        Self::new(crate::catalog::builtin_entries(), normalizer)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &KnowledgeEntry> {
        self.entries.iter().map(|compiled| &compiled.entry)
    }

    /// Only the keyword list of the detected language is consulted.
    pub fn find(&self, normalized: &str, language: Language) -> Option<KnowledgeMatch<'_>> {
        let padded = format!(" {normalized} ");
        self.entries.iter().find_map(|compiled| {
            compiled
                .keywords(language)
                .iter()
                .find(|keyword| keyword.matches(&padded))
                .map(|keyword| KnowledgeMatch {
                    entry: &compiled.entry,
                    keyword: &keyword.normalized,
                    response: compiled.entry.response(language),
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use musaed_text::TextAnalyzer;

    fn entry(topic: &str, ar: &[&str], en: &[&str]) -> KnowledgeEntry {
        KnowledgeEntry {
            topic: topic.to_string(),
            keywords_primary: ar.iter().map(|k| k.to_string()).collect(),
            keywords_secondary: en.iter().map(|k| k.to_string()).collect(),
            response_primary: format!("{topic}-ar"),
            response_secondary: format!("{topic}-en"),
            addresses_user: false,
        }
    }

    fn lookup<'a>(kb: &'a KnowledgeBase, message: &str) -> Option<KnowledgeMatch<'a>> {
        let analyzed = TextAnalyzer::default().analyze(message);
        kb.find(&analyzed.normalized, analyzed.language)
    }

    #[test]
    fn first_matching_entry_wins() {
        let normalizer = TextNormalizer::new();
        let kb = KnowledgeBase::new(
            vec![
                entry("price", &["سعر"], &["price"]),
                entry("paint", &["دهان"], &["paint"]),
            ],
            &normalizer,
        )
        .unwrap();
        let hit = lookup(&kb, "what is the paint price").unwrap();
        assert_eq!(hit.entry.topic, "price");
        assert_eq!(hit.response, "price-en");
    }

    #[test]
    fn answers_in_detected_language_only() {
        let normalizer = TextNormalizer::new();
        let kb = KnowledgeBase::new(vec![entry("price", &["سعر"], &["price"])], &normalizer)
            .unwrap();
        assert_eq!(lookup(&kb, "السعر كام؟").unwrap().response, "price-ar");
        // english keyword inside an arabic message is not consulted
        assert!(lookup(&kb, "عايز اعرف ال price").is_none());
    }

    #[test]
    fn short_keywords_match_whole_tokens_only() {
        let normalizer = TextNormalizer::new();
        let kb = KnowledgeBase::new(vec![entry("option-one", &["1"], &["1"])], &normalizer)
            .unwrap();
        assert!(lookup(&kb, "my number is 01129276218").is_none());
        assert!(lookup(&kb, "رقمي 01129276218").is_none());
        assert!(lookup(&kb, "1").is_some());
        assert!(lookup(&kb, "option 1 please").is_some());
    }

    #[test]
    fn keywords_are_normalized_like_messages() {
        let normalizer = TextNormalizer::new();
        let kb = KnowledgeBase::new(vec![entry("price", &["بكام"], &["how much"])], &normalizer)
            .unwrap();
        assert_eq!(lookup(&kb, "الدهان بكام؟").unwrap().keyword, "كم سعر");
        assert!(lookup(&kb, "How MUCH is it?").is_some());
    }

    #[test]
    fn rejects_entry_without_keywords() {
        let normalizer = TextNormalizer::new();
        let err = KnowledgeBase::new(vec![entry("empty", &[], &[])], &normalizer).unwrap_err();
        assert!(matches!(err, KnowledgeError::NoKeywords(_)));
    }

    #[test]
    fn rejects_entry_whose_keywords_normalize_away() {
        let normalizer = TextNormalizer::new();
        let err = KnowledgeBase::new(vec![entry("polite", &["حضرتك", "؟"], &[])], &normalizer)
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::NoKeywords(topic) if topic == "polite"));
    }

    #[test]
    fn requires_response_for_compiled_language() {
        let normalizer = TextNormalizer::new();
        let mut silent = entry("price", &["سعر"], &["price"]);
        silent.response_secondary = "  ".into();
        let err = KnowledgeBase::new(vec![silent], &normalizer).unwrap_err();
        assert!(matches!(err, KnowledgeError::MissingResponse { language: "en", .. }));
    }

    #[test]
    fn dialect_rewritten_keywords_match_whole_words() {
        let normalizer = TextNormalizer::new();
        let kb = KnowledgeBase::new(vec![entry("location", &["فين"], &["where"])], &normalizer)
            .unwrap();
        // "فين" compiles to "اين", which sits inside "معاينه"
        assert!(lookup(&kb, "عايز معاينة للشقة").is_none());
        assert_eq!(lookup(&kb, "انتم فين؟").unwrap().keyword, "اين");
        assert!(lookup(&kb, "فين مكانكم").is_some());
    }

    #[test]
    fn inspection_request_is_not_a_location_question() {
        let kb = KnowledgeBase::builtin(&TextNormalizer::new()).unwrap();
        let topic = lookup(&kb, "عايز معاينة للشقة").map(|hit| hit.entry.topic.clone());
        assert_ne!(topic.as_deref(), Some("location"));
    }

    #[test]
    fn builtin_catalog_compiles() {
        let kb = KnowledgeBase::builtin(&TextNormalizer::new()).unwrap();
        assert!(kb.len() >= 10);
        assert!(kb.entries().all(|e| !e.keywords_primary.is_empty()));
    }
}
