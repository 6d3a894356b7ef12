//! Dialect Substitution Table
//!
//! A versioned word-level mapping from colloquial forms to their standard
//! equivalents. An empty replacement deletes the word (honorific fillers).
//! The built-in table is the Egyptian artifact shipped in `data/`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::normalizer::{fold_text, ArabicNormalizer};

static EGYPTIAN_ARTIFACT: &str = include_str!("../data/dialect_egyptian.json");

#[derive(Debug, thiserror::Error)]
pub enum DialectError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid dialect artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dialect key {0:?} must be a single non-empty word")]
    InvalidKey(String),

    #[error("replacement {replacement:?} for {key:?} is itself a dialect key")]
    Conflict { key: String, replacement: String },
}

#[derive(Debug, Deserialize)]
struct DialectArtifact {
    version: u32,
    locale: String,
    substitutions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct DialectTable {
    version: u32,
    locale: String,
    substitutions: HashMap<String, String>,
}

impl DialectTable {
    /// The embedded Egyptian table.
    pub fn builtin() -> &'static DialectTable {
        static TABLE: OnceLock<DialectTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            DialectTable::from_json(EGYPTIAN_ARTIFACT).expect("embedded dialect table is valid")
        })
    }

    /// A table that substitutes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DialectError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, DialectError> {
        let artifact: DialectArtifact = serde_json::from_str(json)?;
        Self::from_pairs(artifact.version, artifact.locale, artifact.substitutions)
    }

    /// Build a table, folding keys and replacements the same way message
    /// text is folded so authors can write either spelling.
    pub fn from_pairs<I, K, V>(
        version: u32,
        locale: impl Into<String>,
        pairs: I,
    ) -> Result<Self, DialectError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let arabic = ArabicNormalizer::new();
        let mut substitutions = HashMap::new();
        for (key, replacement) in pairs {
            let folded_key = fold_text(&arabic, key.as_ref());
            let folded_key = folded_key.trim();
            if folded_key.is_empty() || folded_key.contains(char::is_whitespace) {
                return Err(DialectError::InvalidKey(key.as_ref().to_string()));
            }
            let folded_replacement = fold_text(&arabic, replacement.as_ref())
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            substitutions.insert(folded_key.to_string(), folded_replacement);
        }

        for (key, replacement) in &substitutions {
            if let Some(word) = replacement
                .split_whitespace()
                .find(|word| substitutions.contains_key(*word))
            {
                return Err(DialectError::Conflict {
                    key: key.clone(),
                    replacement: word.to_string(),
                });
            }
        }

        Ok(Self {
            version,
            locale: locale.into(),
            substitutions,
        })
    }

    /// Replacement for an already folded word, if the table knows it.
    pub fn substitute(&self, word: &str) -> Option<&str> {
        self.substitutions.get(word).map(String::as_str)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn len(&self) -> usize {
        self.substitutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_loads() {
        let table = DialectTable::builtin();
        assert_eq!(table.version(), 1);
        assert_eq!(table.locale(), "ar-EG");
        assert!(table.len() > 20);
        assert_eq!(table.substitute("عايز"), Some("اريد"));
        assert_eq!(table.substitute("حضرتك"), Some(""));
    }

    #[test]
    fn test_keys_are_folded() {
        let table = DialectTable::builtin();
        // written with taa marbuta and alef maqsura in the artifact
        assert_eq!(table.substitute("عايزه"), Some("اريد"));
        assert_eq!(table.substitute("امتي"), Some("متي"));
        assert_eq!(table.substitute("دلوقتي"), Some("الان"));
    }

    #[test]
    fn test_rejects_chained_replacement() {
        let err = DialectTable::from_pairs(1, "test", [("كام", "كم"), ("كم", "عدد")]).unwrap_err();
        assert!(matches!(err, DialectError::Conflict { .. }));
    }

    #[test]
    fn test_rejects_multi_word_key() {
        let err = DialectTable::from_pairs(1, "test", [("لو سمحت", "")]).unwrap_err();
        assert!(matches!(err, DialectError::InvalidKey(_)));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dialect.json");
        fs::write(
            &path,
            r#"{"version": 7, "locale": "ar-LB", "substitutions": {"شو": "ماذا"}}"#,
        )
        .unwrap();
        let table = DialectTable::from_path(&path).unwrap();
        assert_eq!(table.version(), 7);
        assert_eq!(table.substitute("شو"), Some("ماذا"));
    }

    #[test]
    fn test_empty_table() {
        let table = DialectTable::empty();
        assert!(table.is_empty());
        assert_eq!(table.substitute("عايز"), None);
    }
}
