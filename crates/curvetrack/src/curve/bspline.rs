//! Clamped B-spline curve: global interpolation, least-squares approximation
//! and evaluation with first derivative.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::basis::{basis_funs, find_span};
use super::{PARAM_SAMPLES, PARAM_STEP};
use crate::error::CurveFitError;
use crate::geometry::ImagePoint;

/// Highest degree used by the fits (cubic).
pub const MAX_DEGREE: usize = 3;

/// Parametric image curve over `u ∈ [0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BSplineCurve {
    degree: usize,
    knots: Vec<f64>,
    control_points: Vec<ImagePoint>,
}

impl BSplineCurve {
    /// Straight segment from `a` to `b` (degree 1).
    pub fn segment(a: ImagePoint, b: ImagePoint) -> Self {
        Self {
            degree: 1,
            knots: vec![0.0, 0.0, 1.0, 1.0],
            control_points: vec![a, b],
        }
    }

    /// Curve passing exactly through `points` (in order).
    ///
    /// Consecutive duplicates are dropped first. Requires at least two
    /// distinct points; the degree is `min(3, n − 1)`.
    pub fn interpolate(points: &[ImagePoint]) -> Result<Self, CurveFitError> {
        let q = distinct_points(points);
        if q.len() < 2 {
            return Err(CurveFitError::TooFewPoints {
                needed: 2,
                got: q.len(),
            });
        }
        if q.len() == 2 {
            return Ok(Self::segment(q[0], q[1]));
        }

        let n_pts = q.len();
        let p = MAX_DEGREE.min(n_pts - 1);
        let params = chord_length_parameters(&q);
        let knots = averaging_knot_vector(&params, p);

        // Collocation matrix A[k][i] = N_{i,p}(u_k)
        let mut a = DMatrix::<f64>::zeros(n_pts, n_pts);
        for (k, &u) in params.iter().enumerate() {
            let span = find_span(n_pts - 1, p, u, &knots);
            for (r, v) in basis_funs(span, u, p, &knots).into_iter().enumerate() {
                a[(k, span - p + r)] = v;
            }
        }

        let sol = a
            .lu()
            .solve(&points_matrix(&q))
            .ok_or(CurveFitError::Singular)?;
        let control_points = matrix_points(&sol)?;

        Ok(Self {
            degree: p,
            knots,
            control_points,
        })
    }

    /// Least-squares curve with `n_control` control points and fixed endpoints.
    ///
    /// Smooths noisy input. When there are no more distinct points than
    /// control points the fit degenerates to [`Self::interpolate`].
    pub fn approximate(points: &[ImagePoint], n_control: usize) -> Result<Self, CurveFitError> {
        let q = distinct_points(points);
        if q.len() < 2 {
            return Err(CurveFitError::TooFewPoints {
                needed: 2,
                got: q.len(),
            });
        }
        let n_control = n_control.max(2);
        if q.len() <= n_control {
            return Self::interpolate(&q);
        }
        let m = q.len() - 1;
        if n_control == 2 {
            return Ok(Self::segment(q[0], q[m]));
        }

        let n = n_control - 1;
        let p = MAX_DEGREE.min(n);
        let ub = chord_length_parameters(&q);

        // Knot placement: every interior span holds at least one parameter.
        let mut knots = vec![0.0; p + 1];
        let d = (m + 1) as f64 / (n - p + 1) as f64;
        for j in 1..=(n - p) {
            let jd = j as f64 * d;
            let i = jd.floor() as usize;
            let alpha = jd - i as f64;
            knots.push((1.0 - alpha) * ub[i - 1] + alpha * ub[i]);
        }
        knots.extend(std::iter::repeat(1.0).take(p + 1));

        let q0 = q[0];
        let qm = q[m];
        let mut nmat = DMatrix::<f64>::zeros(m - 1, n - 1);
        let mut rk = DMatrix::<f64>::zeros(m - 1, 2);
        for k in 1..m {
            let u = ub[k];
            let span = find_span(n, p, u, &knots);
            let mut n0 = 0.0;
            let mut nn = 0.0;
            for (t, v) in basis_funs(span, u, p, &knots).into_iter().enumerate() {
                let i = span - p + t;
                if i == 0 {
                    n0 = v;
                } else if i == n {
                    nn = v;
                } else {
                    nmat[(k - 1, i - 1)] = v;
                }
            }
            rk[(k - 1, 0)] = q[k].row - n0 * q0.row - nn * qm.row;
            rk[(k - 1, 1)] = q[k].col - n0 * q0.col - nn * qm.col;
        }

        let nt = nmat.transpose();
        let lhs = &nt * &nmat;
        let rhs = &nt * &rk;
        let sol = lhs.lu().solve(&rhs).ok_or(CurveFitError::Singular)?;

        let mut control_points = Vec::with_capacity(n + 1);
        control_points.push(q0);
        control_points.extend(matrix_points(&sol)?);
        control_points.push(qm);

        Ok(Self {
            degree: p,
            knots,
            control_points,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn control_points(&self) -> &[ImagePoint] {
        &self.control_points
    }

    /// Curve point `C(u)`; `u` is clamped to `[0, 1]`.
    pub fn point(&self, u: f64) -> ImagePoint {
        let u = u.clamp(0.0, 1.0);
        let n = self.control_points.len() - 1;
        let p = self.degree;
        let span = find_span(n, p, u, &self.knots);
        basis_funs(span, u, p, &self.knots)
            .into_iter()
            .enumerate()
            .fold(ImagePoint::default(), |acc, (r, v)| {
                acc + self.control_points[span - p + r].scale(v)
            })
    }

    /// `(C(u), C'(u))`; the derivative is with respect to `u`.
    pub fn point_and_derivative(&self, u: f64) -> (ImagePoint, ImagePoint) {
        let point = self.point(u);
        let p = self.degree;
        if p == 0 {
            return (point, ImagePoint::default());
        }
        let u = u.clamp(0.0, 1.0);
        let n = self.control_points.len() - 1;
        let span = find_span(n, p, u, &self.knots);

        // C'(u) = Σ N_{i+1,p−1}(u) · p (P_{i+1} − P_i) / (u_{i+p+1} − u_{i+1})
        let mut deriv = ImagePoint::default();
        for (r, v) in basis_funs(span, u, p - 1, &self.knots)
            .into_iter()
            .enumerate()
        {
            let i = span - p + r;
            let denom = self.knots[i + p + 1] - self.knots[i + 1];
            if denom > 0.0 {
                let q = (self.control_points[i + 1] - self.control_points[i])
                    .scale(p as f64 / denom);
                deriv = deriv + q.scale(v);
            }
        }
        (point, deriv)
    }

    /// Length as the chord sum over a fixed `Δu = 0.01` sweep.
    pub fn arc_length(&self) -> f64 {
        let mut prev = self.point(0.0);
        let mut length = 0.0;
        for k in 1..=PARAM_SAMPLES {
            let pt = self.point(k as f64 * PARAM_STEP);
            length += pt.distance(prev);
            prev = pt;
        }
        length
    }

    /// `samples + 1` evenly spaced (in `u`) curve points, for consumers that render.
    pub fn polyline(&self, samples: usize) -> Vec<ImagePoint> {
        let samples = samples.max(1);
        (0..=samples)
            .map(|k| self.point(k as f64 / samples as f64))
            .collect()
    }
}

fn distinct_points(points: &[ImagePoint]) -> Vec<ImagePoint> {
    let mut out: Vec<ImagePoint> = Vec::with_capacity(points.len());
    for &p in points.iter().filter(|p| p.is_finite()) {
        match out.last() {
            Some(&last) if last.sq_distance(p) < 1e-12 => {}
            _ => out.push(p),
        }
    }
    out
}

/// Cumulative chord length normalised to `[0, 1]`.
fn chord_length_parameters(points: &[ImagePoint]) -> Vec<f64> {
    let mut params = Vec::with_capacity(points.len());
    params.push(0.0);
    let mut total = 0.0;
    for w in points.windows(2) {
        total += w[1].distance(w[0]);
        params.push(total);
    }
    if total > 0.0 {
        for t in &mut params {
            *t /= total;
        }
    } else {
        let last = (points.len() - 1).max(1) as f64;
        for (i, t) in params.iter_mut().enumerate() {
            *t = i as f64 / last;
        }
    }
    if let Some(last) = params.last_mut() {
        *last = 1.0;
    }
    params
}

/// Clamped knot vector with interior knots averaged over `p` consecutive parameters.
fn averaging_knot_vector(params: &[f64], p: usize) -> Vec<f64> {
    let n = params.len();
    let mut knots = Vec::with_capacity(n + p + 1);
    knots.extend(std::iter::repeat(0.0).take(p + 1));
    for j in 1..n.saturating_sub(p) {
        let sum: f64 = params[j..j + p].iter().sum();
        knots.push(sum / p as f64);
    }
    knots.extend(std::iter::repeat(1.0).take(p + 1));
    knots
}

fn points_matrix(points: &[ImagePoint]) -> DMatrix<f64> {
    DMatrix::from_fn(points.len(), 2, |r, c| {
        if c == 0 {
            points[r].row
        } else {
            points[r].col
        }
    })
}

fn matrix_points(m: &DMatrix<f64>) -> Result<Vec<ImagePoint>, CurveFitError> {
    let pts: Vec<ImagePoint> = (0..m.nrows())
        .map(|r| ImagePoint::new(m[(r, 0)], m[(r, 1)]))
        .collect();
    if pts.iter().all(|p| p.is_finite()) {
        Ok(pts)
    } else {
        Err(CurveFitError::Singular)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn arc_points(n: usize, radius: f64, from_deg: f64, to_deg: f64) -> Vec<ImagePoint> {
        (0..n)
            .map(|i| {
                let t = (from_deg + (to_deg - from_deg) * i as f64 / (n - 1) as f64).to_radians();
                ImagePoint::new(100.0 + radius * t.sin(), 100.0 + radius * t.cos())
            })
            .collect()
    }

    #[test]
    fn interpolation_passes_through_data() {
        let pts = vec![
            ImagePoint::new(10.0, 10.0),
            ImagePoint::new(20.0, 35.0),
            ImagePoint::new(45.0, 40.0),
            ImagePoint::new(60.0, 20.0),
            ImagePoint::new(80.0, 30.0),
        ];
        let c = BSplineCurve::interpolate(&pts).unwrap();
        assert_eq!(c.degree(), 3);
        let params = chord_length_parameters(&pts);
        for (p, &u) in pts.iter().zip(&params) {
            let e = c.point(u);
            assert_abs_diff_eq!(e.row, p.row, epsilon = 1e-9);
            assert_abs_diff_eq!(e.col, p.col, epsilon = 1e-9);
        }
    }

    #[test]
    fn two_points_make_a_segment() {
        let c = BSplineCurve::interpolate(&[ImagePoint::new(0.0, 0.0), ImagePoint::new(10.0, 20.0)])
            .unwrap();
        assert_eq!(c.degree(), 1);
        let mid = c.point(0.5);
        assert_abs_diff_eq!(mid.row, 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mid.col, 10.0, epsilon = 1e-12);
        let (_, d) = c.point_and_derivative(0.3);
        assert_abs_diff_eq!(d.row, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d.col, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn duplicate_points_are_rejected() {
        let p = ImagePoint::new(3.0, 4.0);
        assert_eq!(
            BSplineCurve::interpolate(&[p, p, p]),
            Err(CurveFitError::TooFewPoints { needed: 2, got: 1 })
        );
        assert!(BSplineCurve::approximate(&[], 10).is_err());
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let c = BSplineCurve::interpolate(&arc_points(9, 40.0, -80.0, 80.0)).unwrap();
        let h = 1e-6;
        for &u in &[0.05, 0.2, 0.5, 0.77, 0.95] {
            let (_, d) = c.point_and_derivative(u);
            let a = c.point(u - h);
            let b = c.point(u + h);
            assert_abs_diff_eq!(d.row, (b.row - a.row) / (2.0 * h), epsilon = 1e-3);
            assert_abs_diff_eq!(d.col, (b.col - a.col) / (2.0 * h), epsilon = 1e-3);
        }
    }

    #[test]
    fn approximation_is_deterministic() {
        let pts = arc_points(60, 50.0, -70.0, 70.0);
        let a = BSplineCurve::approximate(&pts, 20).unwrap();
        let b = BSplineCurve::approximate(&pts, 20).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.control_points().len(), 20);
    }

    #[test]
    fn approximation_keeps_endpoints_and_shape() {
        let pts = arc_points(80, 50.0, -60.0, 60.0);
        let c = BSplineCurve::approximate(&pts, 12).unwrap();
        let b = c.point(0.0);
        let e = c.point(1.0);
        assert_abs_diff_eq!(b.row, pts[0].row, epsilon = 1e-9);
        assert_abs_diff_eq!(e.col, pts[79].col, epsilon = 1e-9);
        for k in 0..=100 {
            let p = c.point(k as f64 / 100.0);
            let r = p.distance(ImagePoint::new(100.0, 100.0));
            assert!((r - 50.0).abs() < 0.2, "radius {} at k={}", r, k);
        }
    }

    #[test]
    fn few_points_fall_back_to_interpolation() {
        let pts = arc_points(5, 30.0, 0.0, 90.0);
        let a = BSplineCurve::approximate(&pts, 20).unwrap();
        let b = BSplineCurve::interpolate(&pts).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn arc_length_of_segment_and_arc() {
        let seg = BSplineCurve::segment(ImagePoint::new(0.0, 0.0), ImagePoint::new(60.0, 80.0));
        assert_abs_diff_eq!(seg.arc_length(), 100.0, epsilon = 1e-9);

        let arc = BSplineCurve::approximate(&arc_points(90, 50.0, 0.0, 180.0), 16).unwrap();
        let expected = std::f64::consts::PI * 50.0;
        assert!((arc.arc_length() - expected).abs() / expected < 0.01);
    }

    #[test]
    fn polyline_spans_the_curve() {
        let seg = BSplineCurve::segment(ImagePoint::new(0.0, 0.0), ImagePoint::new(0.0, 10.0));
        let pl = seg.polyline(10);
        assert_eq!(pl.len(), 11);
        assert_abs_diff_eq!(pl[10].col, 10.0, epsilon = 1e-12);
    }
}
