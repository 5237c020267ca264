//! Parametric curve model and the coarse parameter searches built on it.
//!
//! All searches walk a fixed grid `u_k = k · 0.01`, `k = 0..=100`, which keeps
//! results bit-reproducible across runs.

mod basis;
mod bspline;

pub use bspline::{BSplineCurve, MAX_DEGREE};

use crate::geometry::ImagePoint;

/// Grid step of every coarse parametric sweep.
pub(crate) const PARAM_STEP: f64 = 0.01;
/// Number of grid intervals in `[0, 1]`.
pub(crate) const PARAM_SAMPLES: usize = 100;

#[inline]
pub(crate) fn grid_u(k: usize) -> f64 {
    k as f64 * PARAM_STEP
}

/// Grid index whose curve point is closest to `p`, scanning the whole curve.
///
/// Heuristic: returns the global minimum over the grid, not an exact projection.
pub fn coarse_nearest_index(curve: &BSplineCurve, p: ImagePoint) -> usize {
    let mut best_k = 0;
    let mut best_d = f64::INFINITY;
    for k in 0..=PARAM_SAMPLES {
        let d = curve.point(grid_u(k)).sq_distance(p);
        if d < best_d {
            best_d = d;
            best_k = k;
        }
    }
    best_k
}

/// Monotonic descent on the grid starting at `start`.
///
/// Walks towards `u = 1` while the distance to `p` does not increase and
/// returns the last grid index before it does. Callers must visit points in
/// curve order for the result to be the nearest parameter.
pub fn descend_nearest_index(curve: &BSplineCurve, p: ImagePoint, start: usize) -> usize {
    let mut k = start.min(PARAM_SAMPLES);
    let mut best_d = curve.point(grid_u(k)).sq_distance(p);
    while k < PARAM_SAMPLES {
        let d = curve.point(grid_u(k + 1)).sq_distance(p);
        if d > best_d {
            break;
        }
        best_d = d;
        k += 1;
    }
    k
}
