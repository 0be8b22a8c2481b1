//! provex-core: deterministic question-boundary detection and text
//! segmentation for two-column exam pages.
//!
//! This crate is the geometric/textual heart of the provex pipeline. It
//! operates purely on in-memory data — a page's word layer, its dimensions,
//! and a target render DPI — and produces, deterministically:
//!
//! - question-start markers ([`marker`]),
//! - per-column question rectangles ([`column`]),
//! - a whole-document rect index ([`rect_index`]),
//! - a stem + five lettered options per question ([`segment`]),
//! - reliability verdicts for extracted text ([`sanitize`]),
//! - shared reference-block associations ([`refblock`]),
//! - and parsed answer keys ([`answer_key`]).
//!
//! It performs no I/O and never talks to an external model; callers feed it
//! word tuples and consume rectangles and strings.

pub mod answer_key;
pub mod column;
pub mod geometry;
pub mod marker;
pub mod rect_index;
pub mod refblock;
pub mod sanitize;
pub mod segment;
pub mod words;

pub use answer_key::{AnswerKey, missing_numbers, parse_answer_key};
pub use column::{ColumnOptions, segment_columns};
pub use geometry::{PixelBox, PointRect, RenderScale};
pub use marker::{Marker, MarkerOptions, detect_markers};
pub use rect_index::{PageMarkers, QuestionRegion, build_rect_index};
pub use refblock::{
    ReferenceBlock, ReferenceTarget, TextBlock, build_reference_blocks, parse_target,
    stem_mentions_label,
};
pub use sanitize::{OptionVerdict, SanitizeOptions, TextClass, classify, classify_option};
pub use segment::{SegmentOptions, Segmented, segment_question};
pub use words::{Line, Word, group_lines};

/// Placeholder substituted wherever extracted text is missing or unreliable.
///
/// The cropped question image remains the human-visible source of truth.
pub const PLACEHOLDER: &str = "(Veja a imagem da questão)";

/// Number of questions in a full Fuvest first-phase exam.
pub const QUESTIONS_PER_EXAM: u8 = 90;

/// The five option keys, in schema order.
pub const OPTION_KEYS: [char; 5] = ['A', 'B', 'C', 'D', 'E'];

/// Fold a string for accent-insensitive matching: uppercase, NFKD, combining
/// marks stripped, whitespace runs collapsed to single spaces.
pub(crate) fn fold_upper(text: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    use unicode_normalization::char::is_combining_mark;

    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        for up in ch.to_uppercase() {
            out.push(up);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::fold_upper;

    #[test]
    fn fold_upper_strips_accents_and_case() {
        assert_eq!(fold_upper("questões"), "QUESTOES");
        assert_eq!(fold_upper("Instruções"), "INSTRUCOES");
    }

    #[test]
    fn fold_upper_collapses_whitespace() {
        assert_eq!(fold_upper("  texto   para\n as  "), "TEXTO PARA AS");
    }
}
