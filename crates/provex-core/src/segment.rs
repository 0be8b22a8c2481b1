//! Text Segmenter: split a question rectangle's text into a stem and five
//! lettered options.
//!
//! Works on the words re-extracted inside the question rectangle. Lines are
//! reconstructed by y-proximity, then classified by left-alignment: options
//! open at (or very near) the column's base indentation, while sidebar boxes
//! sit deeper and are excluded. A question always yields exactly five options
//! keyed A–E; anything the heuristics could not recover is filled with the
//! placeholder so the downstream schema stays uniform.

use regex::Regex;
use std::sync::OnceLock;

use crate::words::{Line, Word, group_lines};
use crate::{OPTION_KEYS, PLACEHOLDER};

/// Tuning knobs for segmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentOptions {
    /// Vertical tolerance (points) when reconstructing lines.
    pub y_tolerance: f64,
    /// Width (points) of the window past the base indentation in which an
    /// option marker may open.
    pub option_window: f64,
    /// Width (points) of the window in which option continuation lines are
    /// accepted. Wider than the marker window: wrapped option text is often
    /// indented past the marker.
    pub continuation_window: f64,
    /// Minimum stem length (characters) for the segmentation to count as a
    /// success.
    pub min_stem_len: usize,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            y_tolerance: 2.0,
            option_window: 60.0,
            continuation_window: 85.0,
            min_stem_len: 20,
        }
    }
}

/// A successfully segmented question.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmented {
    /// The question's prose body.
    pub stem: String,
    /// Option texts in A..E order. Never empty; unrecovered entries hold the
    /// placeholder.
    pub options: [String; 5],
}

fn inline_option_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // (A) text | A) text | A - text | A: text
    RE.get_or_init(|| Regex::new(r"^\(?([A-E])(?:\)|\s*[-–:])\s*(.*)$").unwrap())
}

fn bare_option_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\(?([A-E])\)?$").unwrap())
}

fn leading_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\{?\d{1,2}\}?\s*[.)]\s*").unwrap())
}

fn bare_number_line(text: &str) -> bool {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(c, '{' | '}' | '.' | ')') && !c.is_whitespace())
        .collect();
    !stripped.is_empty() && stripped.len() <= 2 && stripped.chars().all(|c| c.is_ascii_digit())
}

fn option_index(key: char) -> usize {
    (key as u8 - b'A') as usize
}

/// An option marker found while scanning lines.
struct FoundOption {
    key: char,
    /// Index of the line the marker opened on.
    line_idx: usize,
    /// Inline text following the marker on the same line, if any.
    inline: Option<String>,
}

/// Segment the words inside a question rectangle into stem + options.
///
/// Returns `None` when the rectangle has no usable text (no words, or a stem
/// shorter than [`SegmentOptions::min_stem_len`]); the caller then falls back
/// to the image-only placeholder representation.
pub fn segment_question(words: &[Word], options: &SegmentOptions) -> Option<Segmented> {
    if words.is_empty() {
        return None;
    }

    let mut lines = group_lines(words, options.y_tolerance);

    // Drop a leading line that is only the bare question number.
    if lines.first().is_some_and(|l| bare_number_line(&l.text)) {
        lines.remove(0);
    }
    if lines.is_empty() {
        return None;
    }

    let base_x0 = lines.iter().map(|l| l.x0).fold(f64::INFINITY, f64::min);
    let in_option_window = |line: &Line| line.x0 <= base_x0 + options.option_window;
    let in_continuation = |line: &Line| line.x0 <= base_x0 + options.continuation_window;

    let mut found: Vec<FoundOption> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if !in_option_window(line) {
            continue;
        }
        let text = line.text.trim();
        if let Some(caps) = bare_option_re().captures(text) {
            found.push(FoundOption {
                key: caps[1].chars().next().unwrap(),
                line_idx: idx,
                inline: None,
            });
        } else if let Some(caps) = inline_option_re().captures(text) {
            let rest = caps[2].trim();
            found.push(FoundOption {
                key: caps[1].chars().next().unwrap(),
                line_idx: idx,
                inline: (!rest.is_empty()).then(|| rest.to_string()),
            });
        }
    }

    let stem_end = found.first().map(|f| f.line_idx).unwrap_or(lines.len());
    let mut stem = lines[..stem_end]
        .iter()
        .map(|l| l.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    stem = leading_number_re().replace(&stem, "").trim().to_string();

    if stem.chars().count() < options.min_stem_len {
        return None;
    }

    let mut option_texts: [String; 5] = std::array::from_fn(|_| String::new());
    for (i, opt) in found.iter().enumerate() {
        let slot = option_index(opt.key);
        let mut parts: Vec<String> = Vec::new();
        if let Some(inline) = &opt.inline {
            parts.push(inline.clone());
        }
        let next_line = found
            .get(i + 1)
            .map(|n| n.line_idx)
            .unwrap_or(lines.len());
        for line in &lines[opt.line_idx + 1..next_line] {
            if in_continuation(line) {
                let text = line.text.trim();
                if !text.is_empty() {
                    parts.push(text.to_string());
                }
            }
        }
        let joined = parts.join(" ");
        if !joined.is_empty() && option_texts[slot].is_empty() {
            option_texts[slot] = joined;
        }
    }

    let filled: [String; 5] = std::array::from_fn(|i| {
        if option_texts[i].is_empty() {
            PLACEHOLDER.to_string()
        } else {
            option_texts[i].clone()
        }
    });

    debug_assert_eq!(OPTION_KEYS.len(), filled.len());
    Some(Segmented {
        stem,
        options: filled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PointRect;

    fn word(text: &str, x0: f64, y0: f64) -> Word {
        Word::new(text, PointRect::new(x0, y0, x0 + 30.0, y0 + 10.0), 0, 0)
    }

    fn line_words(text: &str, x0: f64, y0: f64) -> Vec<Word> {
        // One synthetic word per token so group_lines reassembles the line.
        text.split_whitespace()
            .enumerate()
            .map(|(i, tok)| word(tok, x0 + i as f64 * 35.0, y0))
            .collect()
    }

    fn question_words() -> Vec<Word> {
        let mut words = Vec::new();
        words.extend(line_words("12", 30.0, 90.0));
        words.extend(line_words("Considere a reação química descrita no texto abaixo.", 30.0, 110.0));
        words.extend(line_words("(A) aumento da temperatura.", 30.0, 140.0));
        words.extend(line_words("(B) redução da pressão.", 30.0, 160.0));
        words.extend(line_words("(C) adição de catalisador.", 30.0, 180.0));
        words.extend(line_words("(D) remoção do produto.", 30.0, 200.0));
        words.extend(line_words("(E) diluição da solução.", 30.0, 220.0));
        words
    }

    #[test]
    fn segments_stem_and_five_options() {
        let seg = segment_question(&question_words(), &SegmentOptions::default()).unwrap();
        assert!(seg.stem.starts_with("Considere a reação"));
        assert_eq!(seg.options[0], "aumento da temperatura.");
        assert_eq!(seg.options[4], "diluição da solução.");
    }

    #[test]
    fn leading_bare_number_is_dropped() {
        let seg = segment_question(&question_words(), &SegmentOptions::default()).unwrap();
        assert!(!seg.stem.starts_with("12"));
    }

    #[test]
    fn no_words_is_failure() {
        assert!(segment_question(&[], &SegmentOptions::default()).is_none());
    }

    #[test]
    fn short_unsegmented_text_is_failure() {
        let words = line_words("texto curto", 30.0, 100.0);
        assert!(segment_question(&words, &SegmentOptions::default()).is_none());
    }

    #[test]
    fn no_option_markers_yields_unsegmented_stem() {
        let mut words = Vec::new();
        words.extend(line_words("Leia o poema a seguir com bastante atenção", 30.0, 100.0));
        words.extend(line_words("e responda com base na imagem da questão.", 30.0, 120.0));
        let seg = segment_question(&words, &SegmentOptions::default()).unwrap();
        assert!(seg.stem.contains("Leia o poema"));
        assert!(seg.options.iter().all(|o| o == PLACEHOLDER));
    }

    #[test]
    fn bare_letter_takes_text_from_next_line() {
        let mut words = Vec::new();
        words.extend(line_words("Assinale a alternativa correta sobre o tema.", 30.0, 100.0));
        words.extend(line_words("A", 30.0, 130.0));
        words.extend(line_words("uma resposta na linha seguinte.", 40.0, 150.0));
        let seg = segment_question(&words, &SegmentOptions::default()).unwrap();
        assert_eq!(seg.options[0], "uma resposta na linha seguinte.");
        assert_eq!(seg.options[1], PLACEHOLDER);
    }

    #[test]
    fn alternative_marker_styles_are_recognized() {
        for (marker_line, expected) in [
            ("A) primeira forma", "primeira forma"),
            ("A - segunda forma", "segunda forma"),
            ("A: terceira forma", "terceira forma"),
        ] {
            let mut words = Vec::new();
            words.extend(line_words("Enunciado longo o suficiente para o teste.", 30.0, 100.0));
            words.extend(line_words(marker_line, 30.0, 130.0));
            let seg = segment_question(&words, &SegmentOptions::default()).unwrap();
            assert_eq!(seg.options[0], expected, "marker {marker_line:?}");
        }
    }

    #[test]
    fn sidebar_text_outside_window_is_excluded() {
        let mut words = Vec::new();
        words.extend(line_words("Enunciado longo o suficiente para o teste.", 30.0, 100.0));
        words.extend(line_words("(A) resposta curta", 30.0, 130.0));
        // A note box indented far past the continuation window.
        words.extend(line_words("NOTE E ADOTE g = 10 m/s2", 150.0, 150.0));
        words.extend(line_words("(B) outra resposta", 30.0, 170.0));
        let seg = segment_question(&words, &SegmentOptions::default()).unwrap();
        assert_eq!(seg.options[0], "resposta curta");
        assert_eq!(seg.options[1], "outra resposta");
    }

    #[test]
    fn stem_continues_until_first_marker() {
        let mut words = Vec::new();
        words.extend(line_words("Primeira linha do enunciado da questão.", 30.0, 100.0));
        words.extend(line_words("Segunda linha do enunciado.", 30.0, 120.0));
        words.extend(line_words("(A) resposta", 30.0, 150.0));
        let seg = segment_question(&words, &SegmentOptions::default()).unwrap();
        assert!(seg.stem.contains("Primeira linha"));
        assert!(seg.stem.contains("Segunda linha"));
        assert!(!seg.stem.contains("resposta"));
    }

    #[test]
    fn a_word_starting_with_e_is_not_an_option_marker() {
        let mut words = Vec::new();
        words.extend(line_words("E assim terminou a longa jornada do autor.", 30.0, 100.0));
        words.extend(line_words("Sobre o trecho acima, é correto afirmar que:", 30.0, 120.0));
        let seg = segment_question(&words, &SegmentOptions::default()).unwrap();
        assert!(seg.stem.contains("E assim terminou"));
    }

    #[test]
    fn always_exactly_five_options_in_order() {
        let mut words = Vec::new();
        words.extend(line_words("Enunciado longo o suficiente para o teste.", 30.0, 100.0));
        words.extend(line_words("(B) só a segunda apareceu", 30.0, 130.0));
        let seg = segment_question(&words, &SegmentOptions::default()).unwrap();
        assert_eq!(seg.options.len(), 5);
        assert_eq!(seg.options[0], PLACEHOLDER);
        assert_eq!(seg.options[1], "só a segunda apareceu");
        for opt in &seg.options[2..] {
            assert_eq!(opt, PLACEHOLDER);
        }
    }
}
