//! Rect Index Builder: the authoritative question → region map for a
//! document.
//!
//! Runs marker detection + column segmentation over every page and merges the
//! results into one map. The index is fully deterministic for a fixed
//! document and DPI, which is what makes re-running ingestion safe: crops
//! never silently move between runs.

use std::collections::BTreeMap;

use crate::column::{ColumnOptions, segment_columns};
use crate::geometry::{PixelBox, PointRect, RenderScale};
use crate::marker::Marker;

/// Markers found on one page, with the page geometry needed to segment them.
#[derive(Debug, Clone, PartialEq)]
pub struct PageMarkers {
    /// 1-based page number.
    pub page: u32,
    /// Page width in points.
    pub width: f64,
    /// Page height in points.
    pub height: f64,
    /// Markers detected on this page.
    pub markers: Vec<Marker>,
}

/// The authoritative region for one question.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuestionRegion {
    /// 1-based page number the question appears on.
    pub page: u32,
    /// Region in PDF points.
    pub rect: PointRect,
    /// Region in device pixels at the render DPI.
    pub bbox: PixelBox,
}

/// Merge per-page segmentation into one map keyed by question number.
///
/// Pages are processed in the order given; when the same number appears on
/// more than one page, the first page processed wins. Malformed PDFs do
/// repeat numbers, and stable precedence keeps rebuilds reproducible.
///
/// The map is total over detected markers: every number with at least one
/// accepted marker gets exactly one region. It is *not* forced to cover
/// 1..=90 — gaps are a pipeline-level concern surfaced by the QA gate.
pub fn build_rect_index(
    pages: &[PageMarkers],
    dpi: u32,
    options: &ColumnOptions,
) -> BTreeMap<u8, QuestionRegion> {
    let scale = RenderScale::from_dpi(dpi);
    let mut index = BTreeMap::new();

    for page in pages {
        for (number, rect) in segment_columns(&page.markers, page.width, page.height, options) {
            index.entry(number).or_insert_with(|| QuestionRegion {
                page: page.page,
                rect,
                bbox: scale.to_pixels(&rect),
            });
        }
    }
    index
}
