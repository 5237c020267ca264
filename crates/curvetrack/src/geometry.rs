//! Image-plane points and the small geometric predicates shared by every stage.
//!
//! Coordinates are `(row, col)` in pixels, matching `GrayImage::get_pixel(col, row)`.

use std::f64::consts::{FRAC_PI_2, PI};
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Sub-pixel image point in `(row, col)` order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImagePoint {
    /// Row (y), pixels.
    pub row: f64,
    /// Column (x), pixels.
    pub col: f64,
}

impl ImagePoint {
    pub const fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }

    #[inline]
    pub fn sq_distance(self, other: ImagePoint) -> f64 {
        let dr = self.row - other.row;
        let dc = self.col - other.col;
        dr * dr + dc * dc
    }

    #[inline]
    pub fn distance(self, other: ImagePoint) -> f64 {
        self.sq_distance(other).sqrt()
    }

    /// Euclidean norm when the point is used as a displacement.
    #[inline]
    pub fn norm(self) -> f64 {
        (self.row * self.row + self.col * self.col).sqrt()
    }

    #[inline]
    pub fn scale(self, k: f64) -> Self {
        Self::new(self.row * k, self.col * k)
    }

    /// Nearest integer pixel `(row, col)`.
    #[inline]
    pub fn rounded(self) -> [i64; 2] {
        [self.row.round() as i64, self.col.round() as i64]
    }

    pub fn is_finite(self) -> bool {
        self.row.is_finite() && self.col.is_finite()
    }
}

impl Add for ImagePoint {
    type Output = ImagePoint;
    fn add(self, rhs: ImagePoint) -> ImagePoint {
        ImagePoint::new(self.row + rhs.row, self.col + rhs.col)
    }
}

impl Sub for ImagePoint {
    type Output = ImagePoint;
    fn sub(self, rhs: ImagePoint) -> ImagePoint {
        ImagePoint::new(self.row - rhs.row, self.col - rhs.col)
    }
}

/// Wrap an angle into `[0, π)`.
pub fn normalize_half_turn(angle: f64) -> f64 {
    let a = angle.rem_euclid(PI);
    // rem_euclid of a tiny negative value rounds up to exactly π
    if a >= PI {
        0.0
    } else {
        a
    }
}

/// Site orientation from a curve tangent `(d_row, d_col)`.
///
/// The tangent direction `atan2(d_row, d_col)` is rotated by −π/2 so the
/// result is the direction of the edge normal, normalised into `[0, π)`.
/// A site with orientation `α` searches along `(sin α, cos α)`.
pub fn tangent_normal_angle(d_row: f64, d_col: f64) -> f64 {
    normalize_half_turn(d_row.atan2(d_col) - FRAC_PI_2)
}

/// `true` when `p` is too close to the border for a `half`-wide neighbourhood.
///
/// The accepted region is `[half + 1, dim − half − 3]` on both axes.
pub fn out_of_image(p: ImagePoint, half: u32, rows: u32, cols: u32) -> bool {
    let half = half as f64;
    p.row < half + 1.0
        || p.row > rows as f64 - half - 3.0
        || p.col < half + 1.0
        || p.col > cols as f64 - half - 3.0
}

/// `true` when `p` lies strictly more than `margin` pixels from every border.
pub fn far_from_border(p: ImagePoint, margin: f64, rows: u32, cols: u32) -> bool {
    p.row > margin
        && p.col > margin
        && p.row < rows as f64 - margin
        && p.col < cols as f64 - margin
}

/// Axis-aligned integer pixel rectangle: rows `[top, top+height)`, cols `[left, left+width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub top: i64,
    pub left: i64,
    pub height: u32,
    pub width: u32,
}

impl PixelRect {
    /// Whether a sub-pixel point falls inside the rectangle (open on the far edge).
    pub fn contains(&self, p: ImagePoint) -> bool {
        p.row >= self.top as f64
            && p.col >= self.left as f64
            && p.row < (self.top + self.height as i64) as f64
            && p.col < (self.left + self.width as i64) as f64
    }

    /// Whether the whole rectangle fits inside a `rows × cols` image.
    pub fn fits_in(&self, rows: u32, cols: u32) -> bool {
        self.top >= 0
            && self.left >= 0
            && self.top + self.height as i64 <= rows as i64
            && self.left + self.width as i64 <= cols as i64
    }

    pub fn top_left(&self) -> ImagePoint {
        ImagePoint::new(self.top as f64, self.left as f64)
    }
}
