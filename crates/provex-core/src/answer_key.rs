//! Answer-key parsing for gabarito PDFs.
//!
//! The official key is a table of `número – letra` pairs. The text layer of
//! those PDFs is noisy (headers, column labels, annulled questions), so the
//! parser just scans the whole text for pair-shaped matches and keeps the
//! first letter seen for each number.

use std::collections::BTreeMap;

use regex::Regex;
use std::sync::OnceLock;

/// Parsed answer key: question number → correct option letter (`A`..`E`).
pub type AnswerKey = BTreeMap<u8, char>;

fn pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Hyphen, en dash or em dash between number and letter.
    RE.get_or_init(|| Regex::new(r"(\d{1,2})\s*[-–—]\s*([A-E])\b").unwrap())
}

fn annulled_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d{1,2})\s*[-–—]\s*anulad").unwrap())
}

/// Scan free text for `número – letra` pairs.
///
/// Numbers outside `1..=max_number` are ignored (page numbers, years).
/// Duplicate numbers keep their first occurrence. Annulled questions
/// ("12 – ANULADA") are recorded as `*`.
pub fn parse_answer_key(text: &str, max_number: u8) -> AnswerKey {
    let mut key = AnswerKey::new();
    for caps in pair_re().captures_iter(text) {
        let Ok(number) = caps[1].parse::<u8>() else {
            continue;
        };
        if number == 0 || number > max_number {
            continue;
        }
        let letter = caps[2].chars().next().unwrap_or('?');
        key.entry(number).or_insert(letter);
    }
    for caps in annulled_re().captures_iter(text) {
        if let Ok(number) = caps[1].parse::<u8>() {
            if number >= 1 && number <= max_number {
                key.entry(number).or_insert('*');
            }
        }
    }
    key
}

/// Question numbers in `1..=expected` absent from the key.
pub fn missing_numbers(key: &AnswerKey, expected: u8) -> Vec<u8> {
    (1..=expected).filter(|n| !key.contains_key(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dash_separated_pairs() {
        let key = parse_answer_key("1 - C  2 - A  3 - E", 90);
        assert_eq!(key.get(&1), Some(&'C'));
        assert_eq!(key.get(&2), Some(&'A'));
        assert_eq!(key.get(&3), Some(&'E'));
    }

    #[test]
    fn accepts_en_and_em_dashes() {
        let key = parse_answer_key("10 – B\n11 — D", 90);
        assert_eq!(key.get(&10), Some(&'B'));
        assert_eq!(key.get(&11), Some(&'D'));
    }

    #[test]
    fn ignores_numbers_out_of_range() {
        let key = parse_answer_key("91 - A  0 - B  45 - C", 90);
        assert_eq!(key.len(), 1);
        assert_eq!(key.get(&45), Some(&'C'));
    }

    #[test]
    fn first_occurrence_wins_on_duplicates() {
        let key = parse_answer_key("7 - A ... 7 - E", 90);
        assert_eq!(key.get(&7), Some(&'A'));
    }

    #[test]
    fn annulled_question_is_starred() {
        let key = parse_answer_key("11 - B\n12 - ANULADA\n13 - C", 90);
        assert_eq!(key.get(&12), Some(&'*'));
    }

    #[test]
    fn reports_missing_numbers() {
        let key = parse_answer_key("1 - A  3 - B", 3);
        assert_eq!(missing_numbers(&key, 3), vec![2]);
        assert!(missing_numbers(&parse_answer_key("1 - A", 1), 1).is_empty());
    }

    #[test]
    fn noisy_header_text_is_skipped() {
        let text = "FUVEST 2020 Gabarito Oficial\nProva V\n1 - D";
        let key = parse_answer_key(text, 90);
        assert_eq!(key.len(), 1);
        assert_eq!(key.get(&1), Some(&'D'));
    }
}
