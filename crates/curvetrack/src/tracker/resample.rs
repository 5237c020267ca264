use image::GrayImage;

use crate::config::TrackerConfig;
use crate::curve::{coarse_nearest_index, grid_u, BSplineCurve};
use crate::geometry::{out_of_image, tangent_normal_angle};
use crate::moving_edge::{SiteSearch, SiteTracker};
use crate::site::{Site, SiteList};

/// Gaps wider than this (squared pixels) are treated as real discontinuities.
const MAX_GAP_SQ: f64 = 1600.0;

/// Fill gaps between consecutive sites by re-sampling the curve between them.
///
/// A gap is a pair at squared distance in `(4·s², 1600]`. Both endpoints are
/// located on the coarse parameter grid, then the grid is walked from the
/// first towards the second; a candidate is tracked when it is in-image and
/// at least `s` from the previous insertion, and inserted only if tracking
/// succeeds. The walk stops within `s` of the second endpoint. The pass is
/// skipped once the list holds more than `points_to_track` sites.
///
/// Returns the number of inserted sites.
pub(crate) fn resample_gaps<T: SiteTracker + ?Sized>(
    sites: &mut SiteList,
    curve: &BSplineCurve,
    image: &GrayImage,
    tracker: &T,
    config: &TrackerConfig,
) -> usize {
    if sites.len() > config.points_to_track {
        return 0;
    }
    let (cols, rows) = image.dimensions();
    let step_sq = config.sample_step * config.sample_step;
    let search = SiteSearch::nominal(&config.moving_edge).without_contrast();

    let mut added = 0;
    let mut cur = sites.cursor_front_mut();
    while let Some(begin) = cur.current().map(|s| s.position()) {
        let Some(end) = cur.peek_next().map(|s| s.position()) else {
            break;
        };
        let gap = begin.sq_distance(end);
        if gap > 4.0 * step_sq && gap <= MAX_GAP_SQ {
            let k_begin = coarse_nearest_index(curve, begin);
            let k_end = coarse_nearest_index(curve, end);
            let mut last = begin;
            for k in k_begin + 1..=k_end {
                let (p, d) = curve.point_and_derivative(grid_u(k));
                if p.sq_distance(end) < step_sq {
                    break;
                }
                if p.sq_distance(last) < step_sq || out_of_image(p, 0, rows, cols) {
                    continue;
                }
                let mut site = Site::new(p, tangent_normal_angle(d.row, d.col));
                tracker.track(image, &mut site, &config.moving_edge, search);
                if site.is_ok() {
                    cur.insert_after(site);
                    cur.move_next();
                    last = p;
                    added += 1;
                }
            }
        }
        cur.move_next();
    }
    added
}

/// Expected-count guard: `true` when fewer than 70 % of `⌊length / s⌋` sites remain.
pub(crate) fn needs_global_resample(n_sites: usize, length: f64, sample_step: f64) -> bool {
    (n_sites as f64) < 0.7 * (length / sample_step).floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ImagePoint;
    use crate::test_utils::{AcceptAll, RejectAll};

    fn setup(rows: &[f64]) -> (SiteList, BSplineCurve, GrayImage) {
        let sites = rows
            .iter()
            .map(|&r| Site::new(ImagePoint::new(r, 100.0), 0.0))
            .collect();
        let curve =
            BSplineCurve::segment(ImagePoint::new(0.0, 100.0), ImagePoint::new(200.0, 100.0));
        (sites, curve, GrayImage::new(200, 210))
    }

    #[test]
    fn gap_is_filled_between_its_endpoints() {
        let (mut sites, curve, img) = setup(&[60.0, 90.0]);
        let cfg = TrackerConfig::default();
        let added = resample_gaps(&mut sites, &curve, &img, &AcceptAll, &cfg);
        assert!(added >= 1);
        let rows: Vec<f64> = sites.iter().map(|s| s.position().row).collect();
        assert_eq!(rows.first(), Some(&60.0));
        assert_eq!(rows.last(), Some(&90.0));
        for w in rows.windows(2) {
            assert!(w[1] > w[0]);
            assert!(w[1] - w[0] >= cfg.sample_step - 1e-9, "{rows:?}");
        }
    }

    #[test]
    fn wide_discontinuity_is_left_alone() {
        let (mut sites, curve, img) = setup(&[20.0, 70.0]);
        let added = resample_gaps(&mut sites, &curve, &img, &AcceptAll, &TrackerConfig::default());
        assert_eq!(added, 0);
        assert_eq!(sites.len(), 2);
    }

    #[test]
    fn rejected_candidates_are_not_inserted() {
        let (mut sites, curve, img) = setup(&[60.0, 90.0]);
        let added = resample_gaps(&mut sites, &curve, &img, &RejectAll, &TrackerConfig::default());
        assert_eq!(added, 0);
        assert_eq!(sites.len(), 2);
    }

    #[test]
    fn crowded_list_skips_resampling() {
        let (mut sites, curve, img) = setup(&[60.0, 90.0]);
        let cfg = TrackerConfig {
            points_to_track: 1,
            ..Default::default()
        };
        assert_eq!(resample_gaps(&mut sites, &curve, &img, &AcceptAll, &cfg), 0);
    }

    #[test]
    fn guard_uses_seventy_percent_of_expected() {
        assert!(needs_global_resample(6, 100.0, 10.0));
        assert!(!needs_global_resample(7, 100.0, 10.0));
        assert!(!needs_global_resample(0, 9.0, 10.0));
    }
}
