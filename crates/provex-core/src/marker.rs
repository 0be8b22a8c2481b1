//! Marker Detector: find question-number tokens on a page.
//!
//! A marker is a short token like `12`, `{12}`, `12.` or `12)` set at the
//! start of a question. Exam bodies typeset these as their own text group, so
//! candidates are formed by joining words that share a (block, line) key and
//! testing the joined token against a strict numeric pattern.

use std::collections::HashMap;

use regex::Regex;
use std::sync::OnceLock;

use crate::fold_upper;
use crate::geometry::PointRect;
use crate::words::Word;

/// A candidate question-start marker.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Marker {
    /// Question number, 1..=90.
    pub number: u8,
    /// Bounding rectangle of the marker token, in points.
    pub rect: PointRect,
}

/// Tuning knobs for marker detection.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOptions {
    /// Lowest acceptable question number.
    pub min_number: u8,
    /// Highest acceptable question number.
    pub max_number: u8,
    /// Reject candidate groups whose token, after decoration stripping,
    /// exceeds this length. Keeps ordinary numerals inside running text
    /// from matching.
    pub max_token_len: usize,
    /// Only pages with index below this are tested for the cover guard.
    /// Later pages may repeat a masthead; that is not a cover indicator.
    pub cover_guard_pages: usize,
    /// How many leading characters of the page text the cover guard inspects.
    pub cover_scan_chars: usize,
}

impl Default for MarkerOptions {
    fn default() -> Self {
        Self {
            min_number: 1,
            max_number: 90,
            max_token_len: 4,
            cover_guard_pages: 2,
            cover_scan_chars: 500,
        }
    }
}

/// Instruction-banner phrases that mark a cover or instructions page.
/// Matched accent-insensitively against the head of the page text.
const COVER_PHRASES: &[&str] = &[
    "INSTRUCOES",
    "CADERNO DE PROVA",
    "SO ABRA ESTE CADERNO",
    "AGUARDE AUTORIZACAO",
    "DURANTE A PROVA",
    "ASSINATURA DO FISCAL",
];

fn number_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,2}$").unwrap())
}

/// True if the head of `page_text` reads like an exam cover/instructions page.
pub fn looks_like_cover(page_text: &str, options: &MarkerOptions) -> bool {
    let head: String = page_text.chars().take(options.cover_scan_chars).collect();
    let folded = fold_upper(&head);
    COVER_PHRASES.iter().any(|p| folded.contains(p))
}

/// Detect question-number markers on one page.
///
/// `page_index` is 0-based; together with the raw `page_text` it drives the
/// cover-page guard: a cover page yields no markers at all, so a numeral in
/// the cover's running text can never be misread as a question start.
///
/// Multiple occurrences of the same number keep only the topmost one.
/// Returns an empty list for pages without a word layer.
pub fn detect_markers(
    words: &[Word],
    page_index: usize,
    page_text: &str,
    options: &MarkerOptions,
) -> Vec<Marker> {
    if page_index < options.cover_guard_pages && looks_like_cover(page_text, options) {
        return Vec::new();
    }

    // Join words by their (block, line) grouping key.
    let mut groups: HashMap<(u32, u32), (String, PointRect)> = HashMap::new();
    for word in words {
        let key = (word.block, word.line);
        let token: String = word.text.chars().filter(|c| !c.is_whitespace()).collect();
        groups
            .entry(key)
            .and_modify(|(text, rect)| {
                text.push_str(&token);
                rect.x0 = rect.x0.min(word.rect.x0);
                rect.y0 = rect.y0.min(word.rect.y0);
                rect.x1 = rect.x1.max(word.rect.x1);
                rect.y1 = rect.y1.max(word.rect.y1);
            })
            .or_insert((token, word.rect));
    }

    let mut best: HashMap<u8, Marker> = HashMap::new();
    for (joined, rect) in groups.into_values() {
        let stripped: String = joined
            .chars()
            .filter(|c| !matches!(c, '{' | '}' | '.' | ')'))
            .collect();
        if stripped.is_empty() || stripped.len() > options.max_token_len {
            continue;
        }
        if !number_token_re().is_match(&stripped) {
            continue;
        }
        let number: u8 = match stripped.parse() {
            Ok(n) => n,
            Err(_) => continue,
        };
        if number < options.min_number || number > options.max_number {
            continue;
        }
        best.entry(number)
            .and_modify(|m| {
                if rect.y0 < m.rect.y0 {
                    m.rect = rect;
                }
            })
            .or_insert(Marker { number, rect });
    }

    let mut markers: Vec<Marker> = best.into_values().collect();
    markers.sort_by(|a, b| a.rect.y0.total_cmp(&b.rect.y0).then(a.number.cmp(&b.number)));
    markers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_at(text: &str, x0: f64, y0: f64, block: u32, line: u32) -> Word {
        Word::new(text, PointRect::new(x0, y0, x0 + 12.0, y0 + 10.0), block, line)
    }

    #[test]
    fn detects_plain_numbers() {
        let words = vec![word_at("7", 30.0, 100.0, 1, 0), word_at("8", 30.0, 400.0, 2, 0)];
        let markers = detect_markers(&words, 3, "", &MarkerOptions::default());
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].number, 7);
        assert_eq!(markers[1].number, 8);
    }

    #[test]
    fn strips_bracket_and_punctuation_decorations() {
        for decorated in ["{12}", "12.", "12)", "{12}."] {
            let words = vec![word_at(decorated, 30.0, 100.0, 1, 0)];
            let markers = detect_markers(&words, 3, "", &MarkerOptions::default());
            assert_eq!(markers.len(), 1, "token {decorated:?}");
            assert_eq!(markers[0].number, 12);
        }
    }

    #[test]
    fn rejects_numbers_out_of_range() {
        let words = vec![word_at("0", 30.0, 100.0, 1, 0), word_at("91", 30.0, 200.0, 2, 0)];
        assert!(detect_markers(&words, 3, "", &MarkerOptions::default()).is_empty());
    }

    #[test]
    fn rejects_long_tokens_from_running_text() {
        // "1964," keeps its comma through decoration stripping: 5 chars,
        // over the cap.
        let words = vec![word_at("1964,", 120.0, 100.0, 1, 0)];
        assert!(detect_markers(&words, 3, "", &MarkerOptions::default()).is_empty());
    }

    #[test]
    fn joins_words_sharing_block_and_line() {
        // "1" "2" split across two words of the same line group.
        let words = vec![word_at("1", 30.0, 100.0, 1, 0), word_at("2", 36.0, 100.0, 1, 0)];
        let markers = detect_markers(&words, 3, "", &MarkerOptions::default());
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].number, 12);
        assert_eq!(markers[0].rect.x0, 30.0);
        assert_eq!(markers[0].rect.x1, 48.0);
    }

    #[test]
    fn duplicate_number_keeps_topmost() {
        let words = vec![word_at("5", 30.0, 500.0, 1, 0), word_at("5", 30.0, 90.0, 2, 0)];
        let markers = detect_markers(&words, 3, "", &MarkerOptions::default());
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].rect.y0, 90.0);
    }

    #[test]
    fn cover_guard_suppresses_first_pages() {
        let words = vec![word_at("3", 30.0, 100.0, 1, 0)];
        let cover = "CADERNO DE PROVA — só abra este caderno quando autorizado";
        assert!(detect_markers(&words, 0, cover, &MarkerOptions::default()).is_empty());
        assert!(detect_markers(&words, 1, cover, &MarkerOptions::default()).is_empty());
    }

    #[test]
    fn cover_guard_never_applies_past_second_page() {
        // A repeated masthead on page 3 must not suppress markers.
        let words = vec![word_at("3", 30.0, 100.0, 1, 0)];
        let masthead = "instruções gerais da prova";
        let markers = detect_markers(&words, 2, masthead, &MarkerOptions::default());
        assert_eq!(markers.len(), 1);
    }

    #[test]
    fn cover_guard_is_accent_insensitive() {
        let opts = MarkerOptions::default();
        assert!(looks_like_cover("INSTRUÇÕES para o candidato", &opts));
        assert!(looks_like_cover("aguarde autorização do fiscal", &opts));
        assert!(!looks_like_cover("texto de literatura brasileira", &opts));
    }

    #[test]
    fn no_word_layer_means_no_markers() {
        assert!(detect_markers(&[], 5, "", &MarkerOptions::default()).is_empty());
    }
}
