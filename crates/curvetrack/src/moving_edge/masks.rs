//! Oriented step-edge masks and the exhaustive orientation search.

use std::f64::consts::PI;

use image::GrayImage;

use crate::config::MovingEdgeConfig;
use crate::error::TrackError;
use crate::geometry::{out_of_image, ImagePoint};

/// Bank of square convolution masks, one per sampled normal orientation.
///
/// Mask `k` responds to an intensity step along the normal angle
/// `k · angle_step`. Weights are the signed distance to the edge line,
/// clamped to `[-1, 1]` and restricted to the inscribed disk, then scaled so
/// the positive weights sum to 1: an ideal step of height `h` centred on the
/// mask yields a response of `±h`.
#[derive(Debug, Clone)]
pub struct MaskBank {
    size: usize,
    angle_step_deg: u32,
    masks: Vec<Vec<f64>>,
}

impl MaskBank {
    /// Build `ceil(180 / angle_step_deg)` masks of side `size` (odd).
    pub fn new(size: usize, angle_step_deg: u32) -> Result<Self, TrackError> {
        if angle_step_deg == 0 {
            return Err(TrackError::ZeroAngleStep);
        }
        if size == 0 || size % 2 == 0 {
            return Err(TrackError::InvalidConfig {
                field: "moving_edge.mask_size",
                reason: "must be odd",
            });
        }
        let n = 180_u32.div_ceil(angle_step_deg) as usize;
        let masks = (0..n)
            .map(|k| build_mask(size, (k as u32 * angle_step_deg) as f64 * PI / 180.0))
            .collect();
        Ok(Self {
            size,
            angle_step_deg,
            masks,
        })
    }

    pub fn from_config(config: &MovingEdgeConfig) -> Result<Self, TrackError> {
        Self::new(config.mask_size, config.angle_step_deg)
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn half(&self) -> u32 {
        (self.size / 2) as u32
    }

    pub fn angle_step_deg(&self) -> u32 {
        self.angle_step_deg
    }

    /// Index of the mask closest to the normal angle `alpha` (radians).
    pub fn index_for_angle(&self, alpha: f64) -> usize {
        let deg = alpha.to_degrees().rem_euclid(180.0);
        let k = (deg / self.angle_step_deg as f64).round() as usize;
        k % self.masks.len()
    }

    /// Normal angle (radians) of mask `k`.
    pub fn angle_of(&self, k: usize) -> f64 {
        (k as u32 * self.angle_step_deg) as f64 * PI / 180.0
    }

    /// Signed response of mask `k` centred on pixel `(row, col)`.
    ///
    /// The caller guarantees the whole mask lies inside the image.
    pub fn response(&self, image: &GrayImage, k: usize, row: i64, col: i64) -> f64 {
        let half = (self.size / 2) as i64;
        let mask = &self.masks[k % self.masks.len()];
        let mut acc = 0.0;
        for (idx, w) in mask.iter().enumerate() {
            if *w == 0.0 {
                continue;
            }
            let di = (idx / self.size) as i64 - half;
            let dj = (idx % self.size) as i64 - half;
            let px = image.get_pixel((col + dj) as u32, (row + di) as u32)[0];
            acc += w * px as f64;
        }
        acc
    }
}

fn build_mask(size: usize, phi: f64) -> Vec<f64> {
    let half = (size / 2) as i64;
    let radius_sq = (half as f64 + 0.5).powi(2);
    let (s, c) = phi.sin_cos();
    let mut w = Vec::with_capacity(size * size);
    for di in -half..=half {
        for dj in -half..=half {
            let (fi, fj) = (di as f64, dj as f64);
            if fi * fi + fj * fj > radius_sq {
                w.push(0.0);
                continue;
            }
            let v = (fi * s + fj * c).clamp(-1.0, 1.0);
            // snap rounding noise so pixels on the edge line stay neutral
            w.push(if v.abs() < 1e-9 { 0.0 } else { v });
        }
    }
    let positive: f64 = w.iter().filter(|v| **v > 0.0).sum();
    if positive > 0.0 {
        for v in &mut w {
            *v /= positive;
        }
    }
    w
}

/// Exhaustive orientation search at `point`.
///
/// Tries every mask at `0, step, 2·step, … < 180°` and returns the normal
/// angle (radians, `[0, π)`) with the strongest absolute response, together
/// with that response. A point whose mask would leave the image (half mask
/// plus `strip`) yields `(0, 0)`.
pub fn find_angle(
    image: &GrayImage,
    point: ImagePoint,
    masks: &MaskBank,
    config: &MovingEdgeConfig,
) -> Result<(f64, f64), TrackError> {
    if config.angle_step_deg == 0 {
        return Err(TrackError::ZeroAngleStep);
    }
    let (cols, rows) = image.dimensions();
    if out_of_image(point, masks.half() + config.strip, rows, cols) {
        return Ok((0.0, 0.0));
    }
    let [row, col] = point.rounded();
    let mut best = (0.0, 0.0);
    for deg in (0..180_u32).step_by(config.angle_step_deg as usize) {
        let alpha = deg as f64 * PI / 180.0;
        let k = masks.index_for_angle(alpha);
        let score = masks.response(image, k, row, col).abs();
        if score > best.1 {
            best = (masks.angle_of(k), score);
        }
    }
    Ok(best)
}
