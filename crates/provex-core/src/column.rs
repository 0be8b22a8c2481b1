//! Column Segmenter: assign markers to page columns and carve out question
//! rectangles.
//!
//! Each page holds two independent top-to-bottom question sequences, one per
//! half of the page. A question's region runs from its marker down to the next
//! marker in the same column (or the page bottom), across the column's full
//! width plus a small padding.

use crate::geometry::PointRect;
use crate::marker::Marker;

/// Tuning knobs for column assignment and rectangle construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnOptions {
    /// Maximum distance (points) a marker's left edge may sit from its
    /// column's left edge. Numerals deeper in the body text are rejected as
    /// false positives.
    pub margin_tolerance: f64,
    /// Padding (points) applied to every side of the final rectangle.
    pub pad: f64,
}

impl Default for ColumnOptions {
    fn default() -> Self {
        Self {
            margin_tolerance: 45.0,
            pad: 8.0,
        }
    }
}

/// Which half of the page a marker belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Left,
    Right,
}

fn assign(marker: &Marker, mid_x: f64, options: &ColumnOptions) -> Option<Column> {
    let (column, col_x0) = if marker.rect.x0 < mid_x {
        (Column::Left, 0.0)
    } else {
        (Column::Right, mid_x)
    };
    if marker.rect.x0 - col_x0 > options.margin_tolerance {
        return None;
    }
    Some(column)
}

/// Build the question rectangle for every accepted marker on one page.
///
/// Within each column, markers are sorted by `y0`; marker `i` spans down to
/// marker `i+1`'s top edge, or the page bottom for the last one. Rectangles
/// take the column's full horizontal span, padded by [`ColumnOptions::pad`]
/// and clipped to the page.
///
/// Returns `(question number, rectangle)` pairs; order follows the column
/// sweep (left column top-to-bottom, then right).
pub fn segment_columns(
    markers: &[Marker],
    page_width: f64,
    page_height: f64,
    options: &ColumnOptions,
) -> Vec<(u8, PointRect)> {
    let mid_x = page_width / 2.0;

    let mut left: Vec<&Marker> = Vec::new();
    let mut right: Vec<&Marker> = Vec::new();
    for marker in markers {
        match assign(marker, mid_x, options) {
            Some(Column::Left) => left.push(marker),
            Some(Column::Right) => right.push(marker),
            None => {}
        }
    }

    let mut out = Vec::with_capacity(left.len() + right.len());
    for (column, col_x0, col_x1) in [
        (&mut left, 0.0, mid_x),
        (&mut right, mid_x, page_width),
    ] {
        column.sort_by(|a, b| a.rect.y0.total_cmp(&b.rect.y0));
        for i in 0..column.len() {
            let y0 = column[i].rect.y0;
            let y_end = column
                .get(i + 1)
                .map(|next| next.rect.y0)
                .unwrap_or(page_height);
            let rect = PointRect::new(col_x0, y0, col_x1, y_end)
                .padded(options.pad)
                .clipped(page_width, page_height);
            out.push((column[i].number, rect));
        }
    }
    out
}
