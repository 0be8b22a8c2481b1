//! Crop audit: advisory reports over the per-question PNGs.
//!
//! Measures how white and how small each crop is; crops that are mostly
//! background or suspiciously tiny usually mean a bad interval. Writes a
//! JSON report plus a semicolon-separated CSV for spreadsheet triage.

use std::fs;

use image::GenericImageView;
use log::info;
use serde::Serialize;

use crate::dataset;
use crate::error::Result;
use crate::layout::DataLayout;

/// Grayscale values at or above this count as white for the ratio.
const WHITE_PIXEL: u8 = 245;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuditOptions {
    /// Flag crops whose white-pixel ratio is at least this.
    pub white_threshold: f64,
    /// Flag crops whose pixel area is at most this.
    pub min_area: u64,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            white_threshold: 0.72,
            min_area: 220_000,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditRow {
    pub year: u16,
    pub number: u8,
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub area: u64,
    pub white_ratio: f64,
    pub content_ratio: f64,
    pub flag_white: bool,
    pub flag_small: bool,
    pub missing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub year: u16,
    pub white_threshold: f64,
    pub min_area: u64,
    pub total: usize,
    pub flagged: usize,
    pub rows: Vec<AuditRow>,
}

/// Fraction of near-white pixels in a crop.
pub fn white_ratio(image: &image::DynamicImage) -> f64 {
    let gray = image.to_luma8();
    let total = gray.pixels().len();
    if total == 0 {
        return 1.0;
    }
    let white = gray.pixels().filter(|p| p.0[0] >= WHITE_PIXEL).count();
    white as f64 / total as f64
}

/// Fraction of the crop covered by the bounding box of non-white content.
/// Low values mean the crop is mostly margin.
pub fn content_bbox_ratio(image: &image::DynamicImage) -> f64 {
    let gray = image.to_luma8();
    let (w, h) = gray.dimensions();
    let mut min_x = w;
    let mut min_y = h;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    for (x, y, pixel) in gray.enumerate_pixels() {
        if pixel.0[0] < WHITE_PIXEL {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if min_x > max_x || min_y > max_y {
        return 0.0;
    }
    let bbox_area = ((max_x - min_x + 1) as u64 * (max_y - min_y + 1) as u64).max(1);
    let total_area = (w as u64 * h as u64).max(1);
    bbox_area as f64 / total_area as f64
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Audit one year's crops and write the JSON + CSV reports.
pub fn audit_year(layout: &DataLayout, year: u16, options: &AuditOptions) -> Result<AuditReport> {
    let dataset = dataset::load(&layout.dataset_path(year))?;

    let mut rows = Vec::with_capacity(dataset.questions.len());
    for question in &dataset.questions {
        let reference = question.assets.question_image.trim();
        let path = layout.resolve_asset_ref(reference);
        let mut row = AuditRow {
            year,
            number: question.number,
            path: path.display().to_string().replace('\\', "/"),
            width: 0,
            height: 0,
            area: 0,
            white_ratio: 0.0,
            content_ratio: 0.0,
            flag_white: false,
            flag_small: false,
            missing: true,
        };
        if reference.is_empty() || !path.is_file() {
            rows.push(row);
            continue;
        }
        let image = image::open(&path)?;
        let (w, h) = image.dimensions();
        row.width = w;
        row.height = h;
        row.area = w as u64 * h as u64;
        row.white_ratio = round4(white_ratio(&image));
        row.content_ratio = round4(content_bbox_ratio(&image));
        row.flag_white = row.white_ratio >= options.white_threshold;
        row.flag_small = row.area <= options.min_area;
        row.missing = false;
        rows.push(row);
    }

    // Flagged rows first, then by number.
    rows.sort_by_key(|r| (!r.flag_white, !r.flag_small, !r.missing, r.number));

    let report = AuditReport {
        year,
        white_threshold: options.white_threshold,
        min_area: options.min_area,
        total: rows.len(),
        flagged: rows
            .iter()
            .filter(|r| r.flag_white || r.flag_small || r.missing)
            .count(),
        rows,
    };

    let json_path = layout.audit_report(year, "json");
    if let Some(parent) = json_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&json_path, serde_json::to_vec_pretty(&report)?)?;
    fs::write(layout.audit_report(year, "csv"), to_csv(&report))?;
    info!("audit written to {}", json_path.display());

    Ok(report)
}

fn to_csv(report: &AuditReport) -> String {
    let mut out = String::from(
        "year;number;width;height;area;white_ratio;content_ratio;flag_white;flag_small;missing;path\n",
    );
    for row in &report.rows {
        out.push_str(&format!(
            "{};{};{};{};{};{};{};{};{};{};{}\n",
            row.year,
            row.number,
            row.width,
            row.height,
            row.area,
            row.white_ratio,
            row.content_ratio,
            row.flag_white,
            row.flag_small,
            row.missing,
            row.path,
        ));
    }
    out
}
