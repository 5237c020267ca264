use crate::curve::BSplineCurve;
use crate::geometry::{out_of_image, tangent_normal_angle, ImagePoint};
use crate::site::{Site, SiteList};

/// Build a fresh site list by stepping `u` uniformly over `[0, 1]`.
///
/// `points_to_track + 1` parameters are visited; a point is kept when it lies
/// inside the image and at least `sample_step` from the last kept point.
/// Orientations come from the curve tangent.
pub(crate) fn sample_curve(
    curve: &BSplineCurve,
    rows: u32,
    cols: u32,
    sample_step: f64,
    points_to_track: usize,
) -> SiteList {
    let n = points_to_track.max(1);
    let min_sq = sample_step * sample_step;
    let mut sites = SiteList::new();
    let mut last: Option<ImagePoint> = None;
    for k in 0..=n {
        let (p, d) = curve.point_and_derivative(k as f64 / n as f64);
        if out_of_image(p, 0, rows, cols) {
            continue;
        }
        if last.is_some_and(|q| q.sq_distance(p) < min_sq) {
            continue;
        }
        sites.push_back(Site::new(p, tangent_normal_angle(d.row, d.col)));
        last = Some(p);
    }
    sites
}
