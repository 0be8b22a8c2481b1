//! Garble Detector: heuristic reliability classification of extracted text.
//!
//! Broken font encodings in older exam PDFs extract as symbol soup rather
//! than prose. These heuristics decide whether extracted text can be trusted;
//! unreliable text is replaced by the placeholder, deferring correctness to
//! the cropped question image. Pure functions, tunable via thresholds.

use regex::Regex;
use std::sync::OnceLock;

/// Reliability verdict for a block of extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextClass {
    /// Looks like ordinary prose.
    Reliable,
    /// Long text with too few letters, or riddled with replacement/symbol
    /// noise — a broken extraction.
    Garbled,
    /// Not prose at all (symbols, bare numerals).
    NonTextual,
}

/// What to do with one option's extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionVerdict {
    /// Use as-is.
    Keep,
    /// An out-of-band block leaked in; keep only the text before this byte
    /// offset.
    TruncateAt(usize),
    /// Replace wholesale with the placeholder.
    Replace,
}

/// Thresholds for the garble heuristics.
///
/// The defaults are the loosest published revision; earlier, stricter values
/// were superseded fixes for specific badly-encoded years.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizeOptions {
    /// Texts longer than this are held to the letter-ratio test.
    pub long_text_len: usize,
    /// Minimum alphabetic-character ratio for long texts.
    pub min_letter_ratio: f64,
    /// Maximum tolerated count of "weird" symbol characters.
    pub max_weird_symbols: usize,
    /// Options with ≥ this many math/comparison symbols are non-textual.
    pub max_math_symbols: usize,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            long_text_len: 120,
            min_letter_ratio: 0.45,
            max_weird_symbols: 8,
            max_math_symbols: 3,
        }
    }
}

fn letter_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    letters as f64 / total as f64
}

/// Characters that never appear in clean exam prose.
fn is_weird(c: char) -> bool {
    if c.is_alphanumeric() || c.is_whitespace() {
        return false;
    }
    !matches!(
        c,
        '.' | ','
            | ';'
            | ':'
            | '!'
            | '?'
            | '('
            | ')'
            | '['
            | ']'
            | '-'
            | '–'
            | '—'
            | '\''
            | '"'
            | '“'
            | '”'
            | '‘'
            | '’'
            | '%'
            | '/'
            | '°'
            | 'º'
            | 'ª'
            | '…'
            | '$'
    )
}

fn is_math_symbol(c: char) -> bool {
    matches!(
        c,
        '=' | '<' | '>' | '≤' | '≥' | '+' | '±' | '×' | '÷' | '≈' | '≠' | '√' | '∑' | '∫'
    )
}

fn bracketed_letter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[\[(]?[A-Ea-e][\])]?\s*$").unwrap())
}

fn bare_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d{1,4}\s*$").unwrap())
}

fn sidebar_leak_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)note\s+e\s+adote").unwrap())
}

/// Classify a block of extracted text.
pub fn classify(text: &str, options: &SanitizeOptions) -> TextClass {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return TextClass::NonTextual;
    }

    let ratio = letter_ratio(trimmed);
    if trimmed.chars().count() <= 4 && ratio == 0.0 {
        return TextClass::NonTextual;
    }

    let weird = trimmed.chars().filter(|&c| is_weird(c)).count();
    if weird > options.max_weird_symbols {
        return TextClass::Garbled;
    }
    if trimmed.chars().count() > options.long_text_len && ratio < options.min_letter_ratio {
        return TextClass::Garbled;
    }
    TextClass::Reliable
}

/// Classify one option's text, with the stricter option-specific rules.
///
/// Options are short, so leaks and artifacts dominate: a lone bracketed
/// letter, a bare number, heavy math-symbol content, or a "NOTE E ADOTE"
/// sidebar bleeding past the column window all make the text unusable (or,
/// for the sidebar leak, usable only up to the leak point).
pub fn classify_option(text: &str, options: &SanitizeOptions) -> OptionVerdict {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return OptionVerdict::Replace;
    }

    if let Some(m) = sidebar_leak_re().find(text) {
        let head = text[..m.start()].trim();
        if head.is_empty() {
            return OptionVerdict::Replace;
        }
        return OptionVerdict::TruncateAt(m.start());
    }

    if bracketed_letter_re().is_match(trimmed) || bare_number_re().is_match(trimmed) {
        return OptionVerdict::Replace;
    }

    let math = trimmed.chars().filter(|&c| is_math_symbol(c)).count();
    if math >= options.max_math_symbols {
        return OptionVerdict::Replace;
    }

    let len = trimmed.chars().count();
    if len >= 12 && letter_ratio(trimmed) < 0.3 {
        return OptionVerdict::Replace;
    }

    match classify(trimmed, options) {
        TextClass::Reliable => OptionVerdict::Keep,
        TextClass::Garbled | TextClass::NonTextual => OptionVerdict::Replace,
    }
}
