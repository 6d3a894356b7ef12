//! Text Normalizer
//!
//! Canonicalizes raw chat input so that matching is insensitive to:
//! - letter case
//! - punctuation
//! - Arabic letter variants (alef, yaa, taa marbuta, hamza carriers)
//! - Arabic diacritics (tashkeel) and tatweel
//! - Arabic-Indic digits
//! - colloquial Egyptian wording (see [`DialectTable`])
//!
//! `normalize(normalize(x)) == normalize(x)` holds for every input.

use crate::dialect::DialectTable;

/// Arabic character folding.
#[derive(Debug, Clone)]
pub struct ArabicNormalizer {
    /// Remove diacritical marks (tashkeel)
    pub remove_diacritics: bool,
    /// Remove tatweel (kashida)
    pub remove_tatweel: bool,
    /// Normalize hamza-bearing alef forms to bare alef
    pub normalize_alef: bool,
    /// Normalize alef maqsura and yaa-with-hamza to plain yaa
    pub normalize_yaa: bool,
    /// Normalize taa marbuta to haa
    pub normalize_taa_marbuta: bool,
    /// Normalize waw-with-hamza to waw
    pub normalize_hamza: bool,
    /// Fold Arabic-Indic and Extended Arabic-Indic digits to ASCII
    pub fold_digits: bool,
}

impl Default for ArabicNormalizer {
    fn default() -> Self {
        Self {
            remove_diacritics: true,
            remove_tatweel: true,
            normalize_alef: true,
            normalize_yaa: true,
            normalize_taa_marbuta: true,
            normalize_hamza: true,
            fold_digits: true,
        }
    }
}

impl ArabicNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a single character. `None` means the character is dropped.
    pub fn fold(&self, ch: char) -> Option<char> {
        if self.remove_diacritics && is_arabic_diacritic(ch) {
            return None;
        }
        if self.remove_tatweel && ch == '\u{0640}' {
            return None;
        }
        if self.normalize_alef && is_alef_variant(ch) {
            return Some('\u{0627}');
        }
        if self.normalize_yaa && matches!(ch, '\u{0649}' | '\u{0626}') {
            return Some('\u{064A}');
        }
        if self.normalize_taa_marbuta && ch == '\u{0629}' {
            return Some('\u{0647}');
        }
        if self.normalize_hamza && ch == '\u{0624}' {
            return Some('\u{0648}');
        }
        if self.fold_digits {
            if let Some(digit) = fold_digit(ch) {
                return Some(digit);
            }
        }
        Some(ch)
    }

    /// Fold every character of `text`.
    pub fn normalize(&self, text: &str) -> String {
        text.chars().filter_map(|ch| self.fold(ch)).collect()
    }
}

fn is_arabic_diacritic(ch: char) -> bool {
    matches!(ch,
        '\u{064B}'..='\u{0652}' | // Fathatan to Sukun
        '\u{0670}' |              // Superscript alef
        '\u{0653}'..='\u{0655}' | // Maddah, Hamza above/below
        '\u{065F}'                // Wavy hamza below
    )
}

fn is_alef_variant(ch: char) -> bool {
    matches!(ch,
        '\u{0622}' | // Alef with madda
        '\u{0623}' | // Alef with hamza above
        '\u{0625}' | // Alef with hamza below
        '\u{0671}'   // Alef wasla
    )
}

fn fold_digit(ch: char) -> Option<char> {
    let offset = match ch {
        '\u{0660}'..='\u{0669}' => ch as u32 - 0x0660,
        '\u{06F0}'..='\u{06F9}' => ch as u32 - 0x06F0,
        _ => return None,
    };
    char::from_digit(offset, 10)
}

/// Punctuation marks replaced by whitespace before tokenizing.
pub fn is_punctuation(ch: char) -> bool {
    ch.is_ascii_punctuation()
        || matches!(
            ch,
            '\u{060C}' // Arabic comma
                | '\u{061B}' // Arabic semicolon
                | '\u{061F}' // Arabic question mark
                | '\u{066A}' // Arabic percent sign
                | '\u{066B}'
                | '\u{066C}'
                | '\u{06D4}' // Arabic full stop
                | '«'
                | '»'
                | '…'
                | '“'
                | '”'
                | '‘'
                | '’'
                | '–'
                | '—'
                | '•'
                | '¿'
                | '¡'
        )
}

/// Lower-case, fold Arabic variants and blank out punctuation.
/// Whitespace is left as is; callers split on it.
pub(crate) fn fold_text(arabic: &ArabicNormalizer, text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter_map(|ch| arabic.fold(ch))
        .map(|ch| if is_punctuation(ch) { ' ' } else { ch })
        .collect()
}

/// Full normalization pipeline used for every matching key.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    arabic: ArabicNormalizer,
    dialect: DialectTable,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer {
    /// Normalizer with the built-in Egyptian dialect table.
    pub fn new() -> Self {
        Self::with_dialect(DialectTable::builtin().clone())
    }

    pub fn with_dialect(dialect: DialectTable) -> Self {
        Self {
            arabic: ArabicNormalizer::new(),
            dialect,
        }
    }

    pub fn dialect(&self) -> &DialectTable {
        &self.dialect
    }

    pub fn normalize(&self, text: &str) -> String {
        let folded = fold_text(&self.arabic, text);
        let mut out = String::with_capacity(folded.len());
        for token in folded.split_whitespace() {
            let piece = self.dialect.substitute(token).unwrap_or(token);
            if piece.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(piece);
        }
        out
    }

    /// Character folding and whitespace collapsing without dialect
    /// substitution.
    pub fn fold(&self, text: &str) -> String {
        fold_text(&self.arabic, text)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Missing input normalizes to the empty string.
    pub fn normalize_opt(&self, text: Option<&str>) -> String {
        text.map(|t| self.normalize(t)).unwrap_or_default()
    }
}
