use crate::curve::{descend_nearest_index, grid_u, BSplineCurve};
use crate::geometry::tangent_normal_angle;
use crate::site::SiteList;

/// Refresh every site's orientation from the curve tangent at its nearest parameter.
///
/// Sites are visited in list order and each descent starts at the previous
/// site's solution, so the list must follow the curve direction. Sites past
/// the curve end solve to `u = 1`.
pub(crate) fn update_orientations(sites: &mut SiteList, curve: &BSplineCurve) {
    let mut k = 0;
    sites.for_each_mut(|site| {
        k = descend_nearest_index(curve, site.position(), k);
        let (_, d) = curve.point_and_derivative(grid_u(k));
        site.alpha = tangent_normal_angle(d.row, d.col);
    });
}
