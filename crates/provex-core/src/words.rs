//! The word layer and visual-line reconstruction.
//!
//! Backends hand the core a flat list of words with bounding rectangles and
//! the grouping identifiers the PDF's text layer provides (block, line).
//! Everything downstream — marker detection, segmentation — works on these.

use crate::geometry::PointRect;

/// One word from a page's text layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Word {
    /// The word's text content.
    pub text: String,
    /// Bounding rectangle in points, top-left origin.
    pub rect: PointRect,
    /// Text-block identifier from the backend.
    pub block: u32,
    /// Line identifier within the block.
    pub line: u32,
}

impl Word {
    pub fn new(text: impl Into<String>, rect: PointRect, block: u32, line: u32) -> Self {
        Self {
            text: text.into(),
            rect,
            block,
            line,
        }
    }
}

/// A reconstructed visual line: words sharing a vertical band, joined
/// left-to-right.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Space-joined text of the line.
    pub text: String,
    /// Leftmost x of any word on the line (the line's indentation).
    pub x0: f64,
    /// Top edge of the line.
    pub y0: f64,
}

/// Group words into visual lines by y-proximity.
///
/// Words whose top edges lie within `y_tolerance` of the line's running top
/// are placed on the same line; within a line, tokens are ordered by `x0` and
/// joined with single spaces. Lines are returned top to bottom.
pub fn group_lines(words: &[Word], y_tolerance: f64) -> Vec<Line> {
    if words.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<&Word> = words.iter().collect();
    sorted.sort_by(|a, b| {
        a.rect
            .y0
            .total_cmp(&b.rect.y0)
            .then(a.rect.x0.total_cmp(&b.rect.x0))
    });

    let mut groups: Vec<Vec<&Word>> = Vec::new();
    for word in sorted {
        match groups.last_mut() {
            Some(group) if (word.rect.y0 - group[0].rect.y0).abs() <= y_tolerance => {
                group.push(word);
            }
            _ => groups.push(vec![word]),
        }
    }

    groups
        .into_iter()
        .map(|mut group| {
            group.sort_by(|a, b| a.rect.x0.total_cmp(&b.rect.x0));
            let x0 = group
                .iter()
                .map(|w| w.rect.x0)
                .fold(f64::INFINITY, f64::min);
            let y0 = group
                .iter()
                .map(|w| w.rect.y0)
                .fold(f64::INFINITY, f64::min);
            let text = group
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            Line { text, x0, y0 }
        })
        .collect()
}

/// Keep only the words whose center falls inside `clip`.
pub fn clip_words(words: &[Word], clip: &PointRect) -> Vec<Word> {
    words
        .iter()
        .filter(|w| {
            let cx = (w.rect.x0 + w.rect.x1) / 2.0;
            let cy = (w.rect.y0 + w.rect.y1) / 2.0;
            clip.contains(cx, cy)
        })
        .cloned()
        .collect()
}
