//! Reference Block Extractor: shared context attached to several questions.
//!
//! Exams interleave blocks like "TEXTO PARA AS QUESTÕES DE 45 A 47" (shared
//! by a numbered range) and labeled passages like "TEXTO III" (referenced
//! from inside a stem). This module parses the trigger phrases and carves the
//! block's rectangle, spanning from the trigger down to the next question
//! marker in the same column.

use regex::Regex;
use std::sync::OnceLock;

use crate::fold_upper;
use crate::geometry::{PixelBox, PointRect, RenderScale};
use crate::marker::Marker;

/// A paragraph-level text block as supplied by the document backend.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    /// The block's full text.
    pub text: String,
    /// Block rectangle in points, top-left origin.
    pub rect: PointRect,
}

/// Which questions a reference block belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    /// Explicit question numbers, parsed from a list or inclusive range.
    Numbers(Vec<u8>),
    /// A roman-numeral label ("III") referenced from question stems.
    Label(String),
}

/// Shared context text/figure spanning one or more questions.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceBlock {
    /// 1-based page number.
    pub page: u32,
    /// Region in points.
    pub rect: PointRect,
    /// Region in device pixels at the render DPI.
    pub bbox: PixelBox,
    /// The trigger/title line.
    pub title: String,
    /// Full text of the block.
    pub text: String,
    /// Owning questions.
    pub target: ReferenceTarget,
}

fn trigger_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"TEXTO\s+PARA\s+AS?\s+QUEST(?:OES|AO)").unwrap())
}

fn range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"DE\s+(\d{1,2})\s+A\s+(\d{1,2})").unwrap())
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{1,2}").unwrap())
}

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^TEXTO\s+([IVX]+)\b").unwrap())
}

/// Parse the target of a reference trigger from a block's text.
///
/// Returns `None` when the block is neither a range/list trigger nor a
/// labeled passage.
pub fn parse_target(block_text: &str) -> Option<ReferenceTarget> {
    let folded = fold_upper(block_text);

    if let Some(m) = trigger_re().find(&folded) {
        let tail = &folded[m.end()..];
        // Inclusive range: "DE 45 A 47".
        if let Some(caps) = range_re().captures(tail) {
            let start: u8 = caps[1].parse().ok()?;
            let end: u8 = caps[2].parse().ok()?;
            if start == 0 || end < start || end > 90 {
                return None;
            }
            return Some(ReferenceTarget::Numbers((start..=end).collect()));
        }
        // Explicit small list: "58 E 59", "55, 56 E 57".
        let mut numbers: Vec<u8> = Vec::new();
        for m in number_re().find_iter(tail).take(6) {
            if let Ok(n) = m.as_str().parse::<u8>() {
                if (1..=90).contains(&n) && !numbers.contains(&n) {
                    numbers.push(n);
                }
            }
        }
        if numbers.is_empty() {
            return None;
        }
        return Some(ReferenceTarget::Numbers(numbers));
    }

    if let Some(caps) = label_re().captures(&folded) {
        return Some(ReferenceTarget::Label(caps[1].to_string()));
    }
    None
}

/// True if `stem` mentions the labeled passage ("Texto III").
pub fn stem_mentions_label(stem: &str, label: &str) -> bool {
    let folded = fold_upper(stem);
    let needle = format!("TEXTO {}", fold_upper(label));
    match folded.find(&needle) {
        // Guard against "TEXTO II" matching inside "TEXTO III".
        Some(at) => folded[at + needle.len()..]
            .chars()
            .next()
            .is_none_or(|c| !matches!(c, 'I' | 'V' | 'X')),
        None => false,
    }
}

/// Build the reference blocks for one page.
///
/// A block's rectangle runs from the trigger's top edge down to the next
/// question marker in the same column (or the page bottom), across the
/// column's half of the page, padded by `pad` and clipped to the page.
pub fn build_reference_blocks(
    blocks: &[TextBlock],
    markers: &[Marker],
    page: u32,
    page_width: f64,
    page_height: f64,
    dpi: u32,
    pad: f64,
) -> Vec<ReferenceBlock> {
    let scale = RenderScale::from_dpi(dpi);
    let mid_x = page_width / 2.0;
    let mut out = Vec::new();

    for block in blocks {
        let Some(target) = parse_target(&block.text) else {
            continue;
        };

        let left = block.rect.x0 < mid_x;
        let (col_x0, col_x1) = if left { (0.0, mid_x) } else { (mid_x, page_width) };

        let y_end = markers
            .iter()
            .filter(|m| (m.rect.x0 < mid_x) == left && m.rect.y0 > block.rect.y0)
            .map(|m| m.rect.y0)
            .fold(page_height, f64::min);

        let rect = PointRect::new(col_x0, block.rect.y0, col_x1, y_end)
            .padded(pad)
            .clipped(page_width, page_height);

        let title = block
            .text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
            .to_string();

        out.push(ReferenceBlock {
            page,
            rect,
            bbox: scale.to_pixels(&rect),
            title,
            text: block.text.trim().to_string(),
            target,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inclusive_range() {
        let target = parse_target("TEXTO PARA AS QUESTÕES DE 45 A 47").unwrap();
        assert_eq!(target, ReferenceTarget::Numbers(vec![45, 46, 47]));
    }

    #[test]
    fn parses_two_element_list() {
        let target = parse_target("TEXTO PARA AS QUESTÕES 58 E 59").unwrap();
        assert_eq!(target, ReferenceTarget::Numbers(vec![58, 59]));
    }

    #[test]
    fn parses_comma_list() {
        let target = parse_target("Texto para as questões 55, 56 e 57").unwrap();
        assert_eq!(target, ReferenceTarget::Numbers(vec![55, 56, 57]));
    }

    #[test]
    fn parses_singular_trigger() {
        let target = parse_target("TEXTO PARA A QUESTÃO 12").unwrap();
        assert_eq!(target, ReferenceTarget::Numbers(vec![12]));
    }

    #[test]
    fn parses_roman_label() {
        let target = parse_target("TEXTO III\nNo meio do caminho tinha uma pedra").unwrap();
        assert_eq!(target, ReferenceTarget::Label("III".to_string()));
    }

    #[test]
    fn ordinary_paragraph_is_not_a_reference() {
        assert!(parse_target("O texto aborda a urbanização acelerada.").is_none());
        assert!(parse_target("").is_none());
    }

    #[test]
    fn stem_label_mention_is_exact() {
        let stem = "Considere o Texto III para responder.";
        assert!(stem_mentions_label(stem, "III"));
        assert!(!stem_mentions_label(stem, "II"));
        assert!(!stem_mentions_label("sem referência", "III"));
    }

    #[test]
    fn block_rect_spans_to_next_marker_in_column() {
        let blocks = vec![TextBlock {
            text: "TEXTO PARA AS QUESTÕES 58 E 59\nNo meio do caminho...".to_string(),
            rect: PointRect::new(30.0, 100.0, 280.0, 160.0),
        }];
        let markers = vec![
            Marker {
                number: 58,
                rect: PointRect::new(30.0, 300.0, 42.0, 310.0),
            },
            // Right-column marker above the block's end must not clip it.
            Marker {
                number: 60,
                rect: PointRect::new(320.0, 200.0, 332.0, 210.0),
            },
        ];
        let refs = build_reference_blocks(&blocks, &markers, 3, 595.0, 842.0, 200, 8.0);
        assert_eq!(refs.len(), 1);
        let r = &refs[0];
        assert_eq!(r.page, 3);
        assert_eq!(r.rect.y0, 92.0);
        assert_eq!(r.rect.y1, 308.0);
        assert_eq!(r.title, "TEXTO PARA AS QUESTÕES 58 E 59");
        assert_eq!(r.target, ReferenceTarget::Numbers(vec![58, 59]));
        assert!(r.bbox.area() > 0);
    }

    #[test]
    fn block_without_following_marker_runs_to_page_bottom() {
        let blocks = vec![TextBlock {
            text: "TEXTO I\nPoema completo aqui".to_string(),
            rect: PointRect::new(320.0, 500.0, 560.0, 640.0),
        }];
        let refs = build_reference_blocks(&blocks, &[], 5, 595.0, 842.0, 200, 8.0);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].rect.y1, 842.0);
        assert_eq!(refs[0].target, ReferenceTarget::Label("I".to_string()));
    }
}
