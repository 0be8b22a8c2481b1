//! Asset Cropper: cut per-question PNGs out of rendered pages.
//!
//! Crops take the question's pixel bbox plus a small padding, then near-white
//! borders are trimmed away and a uniform white margin is re-applied. A
//! question owning a reference block gets the block's crop composited above
//! its own, centered on a white canvas.

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage, imageops};
use provex_core::PixelBox;

/// Padding in pixels added around the bbox before cropping.
pub const CROP_PADDING: u32 = 15;

/// Grayscale values at or above this count as background white.
pub const WHITE_THRESHOLD: u8 = 245;

/// Margin re-applied after trimming near-white borders.
pub const TRIM_MARGIN: u32 = 12;

/// Crop `bbox` out of a rendered page with [`CROP_PADDING`], clamped to the
/// page bounds.
pub fn crop_question(page: &DynamicImage, bbox: &PixelBox) -> DynamicImage {
    crop_padded(page, bbox, CROP_PADDING)
}

pub fn crop_padded(page: &DynamicImage, bbox: &PixelBox, padding: u32) -> DynamicImage {
    let (page_w, page_h) = page.dimensions();
    let x = bbox.x.saturating_sub(padding).min(page_w.saturating_sub(1));
    let y = bbox.y.saturating_sub(padding).min(page_h.saturating_sub(1));
    let w = (bbox.w + 2 * padding).min(page_w - x).max(1);
    let h = (bbox.h + 2 * padding).min(page_h - y).max(1);
    page.crop_imm(x, y, w, h)
}

/// Shrink a crop to its content plus [`TRIM_MARGIN`].
///
/// The content box is the bounding box of every pixel darker than
/// [`WHITE_THRESHOLD`]. A crop with no content at all is returned unchanged;
/// so is one whose trim would not actually shrink it.
pub fn auto_trim(crop: &DynamicImage) -> DynamicImage {
    let gray = crop.to_luma8();
    let (w, h) = gray.dimensions();

    let mut min_x = w;
    let mut min_y = h;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    for (x, y, pixel) in gray.enumerate_pixels() {
        if pixel.0[0] < WHITE_THRESHOLD {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if min_x > max_x || min_y > max_y {
        return crop.clone();
    }

    let x = min_x.saturating_sub(TRIM_MARGIN);
    let y = min_y.saturating_sub(TRIM_MARGIN);
    let x1 = (max_x + 1 + TRIM_MARGIN).min(w);
    let y1 = (max_y + 1 + TRIM_MARGIN).min(h);
    if x == 0 && y == 0 && x1 == w && y1 == h {
        return crop.clone();
    }
    crop.crop_imm(x, y, x1 - x, y1 - y)
}

/// Stack a reference-block crop above a question crop.
///
/// The canvas takes the wider of the two widths; each image is centered
/// horizontally on white, with a [`TRIM_MARGIN`] band between them.
pub fn stack_vertical(top: &DynamicImage, bottom: &DynamicImage) -> DynamicImage {
    let (top_w, top_h) = top.dimensions();
    let (bottom_w, bottom_h) = bottom.dimensions();
    let width = top_w.max(bottom_w);
    let height = top_h + TRIM_MARGIN + bottom_h;

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    imageops::overlay(
        &mut canvas,
        &top.to_rgba8(),
        ((width - top_w) / 2) as i64,
        0,
    );
    imageops::overlay(
        &mut canvas,
        &bottom.to_rgba8(),
        ((width - bottom_w) / 2) as i64,
        (top_h + TRIM_MARGIN) as i64,
    );
    DynamicImage::ImageRgba8(canvas)
}
