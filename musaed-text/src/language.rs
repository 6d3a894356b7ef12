//! Language Detection
//!
//! Classifies a message as Arabic (primary) or English (secondary) from its
//! character composition.

use serde::{Deserialize, Serialize};

/// Supported conversation languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Primary language, Egyptian and standard Arabic
    Arabic,
    /// Secondary language
    English,
}

impl Default for Language {
    fn default() -> Self {
        Language::Arabic
    }
}

impl Language {
    /// Parse language from a code or name.
    pub fn from_code(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ar" | "arabic" => Some(Language::Arabic),
            "en" | "english" => Some(Language::English),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::Arabic => "ar",
            Language::English => "en",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageDetector;

impl LanguageDetector {
    pub fn new() -> Self {
        Self
    }

    /// Arabic wins ties, including text with no letters at all.
    pub fn detect(&self, text: &str) -> Language {
        let mut arabic_chars = 0usize;
        let mut latin_chars = 0usize;

        for ch in text.chars() {
            if !ch.is_alphabetic() {
                continue;
            }
            if is_arabic_char(ch) {
                arabic_chars += 1;
            } else if ch.is_ascii_alphabetic() {
                latin_chars += 1;
            }
        }

        if arabic_chars >= latin_chars {
            Language::Arabic
        } else {
            Language::English
        }
    }
}

/// Check if a character belongs to one of the Arabic blocks.
pub fn is_arabic_char(ch: char) -> bool {
    matches!(ch as u32,
        0x0600..=0x06FF |  // Arabic
        0x0750..=0x077F |  // Arabic Supplement
        0x08A0..=0x08FF |  // Arabic Extended-A
        0xFB50..=0xFDFF |  // Arabic Presentation Forms-A
        0xFE70..=0xFEFF    // Arabic Presentation Forms-B
    )
}

/// True when the text has at least one Arabic-block character, Latin letter
/// or ASCII digit.
pub fn has_recognizable_char(text: &str) -> bool {
    text.chars()
        .any(|ch| matches!(ch, '\u{0600}'..='\u{06FF}') || ch.is_ascii_alphanumeric())
}
