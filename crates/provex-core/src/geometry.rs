//! Rectangles in PDF points and device pixels, and the scale between them.

/// Rectangle in PDF points with top-left origin.
///
/// - `x0`: left edge
/// - `y0`: top edge (distance from top of page)
/// - `x1`: right edge
/// - `y1`: bottom edge
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PointRect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Width of the rectangle.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height of the rectangle.
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Grow the rectangle by `pad` on every side.
    pub fn padded(&self, pad: f64) -> PointRect {
        PointRect {
            x0: self.x0 - pad,
            y0: self.y0 - pad,
            x1: self.x1 + pad,
            y1: self.y1 + pad,
        }
    }

    /// Clip the rectangle to a page of `width` × `height` points.
    pub fn clipped(&self, width: f64, height: f64) -> PointRect {
        PointRect {
            x0: self.x0.max(0.0),
            y0: self.y0.max(0.0),
            x1: self.x1.min(width),
            y1: self.y1.min(height),
        }
    }

    /// True if the point `(x, y)` lies inside (or on the edge of) the rect.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// True if `other` has the same edges within `tol` points.
    pub fn approx_eq(&self, other: &PointRect, tol: f64) -> bool {
        (self.x0 - other.x0).abs() <= tol
            && (self.y0 - other.y0).abs() <= tol
            && (self.x1 - other.x1).abs() <= tol
            && (self.y1 - other.y1).abs() <= tol
    }
}

/// Axis-aligned box in device pixels, as persisted in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl PixelBox {
    /// Area in pixels.
    pub fn area(&self) -> u64 {
        u64::from(self.w) * u64::from(self.h)
    }
}

/// Scale factor between PDF points and device pixels at a render DPI.
///
/// PDF pages are measured in points (72 per inch), so the factor is `dpi/72`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderScale {
    factor: f64,
}

impl RenderScale {
    pub fn from_dpi(dpi: u32) -> Self {
        Self {
            factor: f64::from(dpi) / 72.0,
        }
    }

    /// The raw `dpi/72` factor.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Convert a point rectangle to a pixel box.
    ///
    /// Width and height are floored at 1 pixel so a degenerate rectangle
    /// still produces a croppable region.
    pub fn to_pixels(&self, rect: &PointRect) -> PixelBox {
        let x = (rect.x0 * self.factor).max(0.0) as u32;
        let y = (rect.y0 * self.factor).max(0.0) as u32;
        let w = ((rect.width() * self.factor) as u32).max(1);
        let h = ((rect.height() * self.factor) as u32).max(1);
        PixelBox { x, y, w, h }
    }
}
