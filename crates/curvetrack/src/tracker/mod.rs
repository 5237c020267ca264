//! Frame-to-frame curve tracking.
//!
//! [`CurveTracker`] owns the site list, the current curve and the per-end
//! failure counters. Each call to [`CurveTracker::track`] runs one cycle:
//!
//! 1. refine every site with the [`SiteTracker`],
//! 2. purge lost and near-duplicate sites,
//! 3. refit the curve,
//! 4. fill gaps by local resampling,
//! 5. extend both ends (or merge a closed curve), and run contour recovery
//!    at ends that keep failing when an [`EdgeDetector`] is attached,
//! 6. refit the curve and measure its length,
//! 7. refresh site orientations from the curve,
//! 8. rebuild the list from the curve when too few sites remain.

mod extremity;
mod orientation;
mod recovery;
mod resample;
mod sampler;
mod suppress;

pub use extremity::{Extremity, ExtremityFailures};
pub use recovery::{trace_chain, ChainTrace, RecoveryOutcome};

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::curve::BSplineCurve;
use crate::edges::EdgeDetector;
use crate::error::TrackError;
use crate::geometry::ImagePoint;
use crate::moving_edge::{ConvolutionSiteTracker, MaskBank, SiteSearch, SiteTracker};
use crate::site::SiteList;

use extremity::extend_extremities;
use orientation::update_orientations;
use recovery::{recover_extremity, RecoveryContext};
use resample::{needs_global_resample, resample_gaps};
use sampler::sample_curve;
use suppress::suppress;

/// Per-cycle report returned by [`CurveTracker::track`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleStats {
    /// Sites present after refinement, before suppression.
    pub refined: usize,
    /// Sites dropped because refinement failed.
    pub lost: usize,
    /// Sites dropped as near duplicates.
    pub near: usize,
    /// Sites inserted by local resampling.
    pub resampled: usize,
    pub extended_begin: usize,
    pub extended_end: usize,
    /// The curve ends met; the head site was dropped and nothing was extended.
    pub closed: bool,
    pub recovery_begin: RecoveryOutcome,
    pub recovery_end: RecoveryOutcome,
    /// The list was rebuilt from the curve.
    pub global_resample: bool,
    /// Sites at the end of the cycle.
    pub n_sites: usize,
    /// Length of the refit curve, in pixels.
    pub curve_length: f64,
}

/// Moving-edges B-spline tracker.
pub struct CurveTracker<T: SiteTracker = ConvolutionSiteTracker> {
    config: TrackerConfig,
    site_tracker: T,
    edge_detector: Option<Box<dyn EdgeDetector>>,
    masks: MaskBank,
    sites: SiteList,
    curve: Option<BSplineCurve>,
    curve_length: f64,
    failures: ExtremityFailures,
}

impl CurveTracker {
    /// Tracker with the default moving-edges site tracker and no edge detector.
    pub fn new(config: TrackerConfig) -> Result<Self, TrackError> {
        config.validate()?;
        let site_tracker = ConvolutionSiteTracker::new(&config.moving_edge)?;
        Self::with_site_tracker(config, site_tracker)
    }
}

impl<T: SiteTracker> CurveTracker<T> {
    pub fn with_site_tracker(config: TrackerConfig, site_tracker: T) -> Result<Self, TrackError> {
        config.validate()?;
        let masks = MaskBank::from_config(&config.moving_edge)?;
        Ok(Self {
            config,
            site_tracker,
            edge_detector: None,
            masks,
            sites: SiteList::new(),
            curve: None,
            curve_length: 0.0,
            failures: ExtremityFailures::default(),
        })
    }

    /// Attach an edge detector; enables contour recovery.
    pub fn with_edge_detector<D: EdgeDetector + 'static>(mut self, detector: D) -> Self {
        self.edge_detector = Some(Box::new(detector));
        self
    }

    /// Replace the configuration between frames.
    pub fn set_config(&mut self, config: TrackerConfig) -> Result<(), TrackError> {
        config.validate()?;
        self.masks = MaskBank::from_config(&config.moving_edge)?;
        self.site_tracker.reconfigure(&config.moving_edge)?;
        self.config = config;
        Ok(())
    }

    /// Interpolate `points` (in boundary order), sample the curve and run a first cycle.
    pub fn init_from_points(
        &mut self,
        image: &GrayImage,
        points: &[ImagePoint],
    ) -> Result<CycleStats, TrackError> {
        if points.is_empty() {
            return Err(TrackError::NotInitialized);
        }
        let curve = BSplineCurve::interpolate(points)?;
        self.init_from_curve(image, curve)
    }

    /// Start from an existing curve: sample it, track every site and run a first cycle.
    pub fn init_from_curve(
        &mut self,
        image: &GrayImage,
        curve: BSplineCurve,
    ) -> Result<CycleStats, TrackError> {
        let (cols, rows) = image.dimensions();
        let cfg = &self.config;
        self.sites = sample_curve(&curve, rows, cols, cfg.sample_step, cfg.points_to_track);
        let search = SiteSearch::nominal(&cfg.moving_edge).without_contrast();
        let tracker = &self.site_tracker;
        self.sites
            .for_each_mut(|site| tracker.track(image, site, &cfg.moving_edge, search));
        self.curve_length = curve.arc_length();
        self.curve = Some(curve);
        self.failures = ExtremityFailures::default();
        info!(
            n_sites = self.sites.len(),
            length = self.curve_length,
            "curve tracker initialised"
        );
        self.track(image)
    }

    /// Run one tracking cycle on `image`.
    pub fn track(&mut self, image: &GrayImage) -> Result<CycleStats, TrackError> {
        let Some(mut curve) = self.curve.clone() else {
            return Err(TrackError::NotInitialized);
        };
        let cfg = &self.config;
        let me = &cfg.moving_edge;
        let tracker = &self.site_tracker;
        let mut stats = CycleStats::default();

        let search = SiteSearch::nominal(me);
        self.sites
            .for_each_mut(|site| tracker.track(image, site, me, search));
        stats.refined = self.sites.len();

        let suppressed = suppress(&mut self.sites, cfg.sample_step);
        stats.lost = suppressed.lost;
        stats.near = suppressed.near;
        if self.sites.is_empty() {
            warn!(lost = stats.lost, "every site was lost");
        }

        refit(&self.sites, &mut curve, cfg.n_control_points);
        stats.resampled = resample_gaps(&mut self.sites, &curve, image, tracker, cfg);

        let extension =
            extend_extremities(&mut self.sites, &curve, image, tracker, cfg, &mut self.failures);
        stats.extended_begin = extension.added_begin;
        stats.extended_end = extension.added_end;
        stats.closed = extension.closed;

        if let Some(detector) = self.edge_detector.as_deref() {
            let ctx = RecoveryContext {
                image,
                curve: &curve,
                tracker,
                detector,
                masks: &self.masks,
                config: cfg,
            };
            stats.recovery_begin =
                recover_extremity(&ctx, &mut self.sites, Extremity::Begin, &mut self.failures)?;
            stats.recovery_end =
                recover_extremity(&ctx, &mut self.sites, Extremity::End, &mut self.failures)?;
        }

        refit(&self.sites, &mut curve, cfg.n_control_points);
        let length = curve.arc_length();
        update_orientations(&mut self.sites, &curve);

        if needs_global_resample(self.sites.len(), length, cfg.sample_step) {
            let (cols, rows) = image.dimensions();
            info!(
                n_sites = self.sites.len(),
                length,
                "too few sites for the curve length, resampling"
            );
            self.sites = sample_curve(&curve, rows, cols, cfg.sample_step, cfg.points_to_track);
            let search = SiteSearch::nominal(me).without_contrast();
            self.sites
                .for_each_mut(|site| tracker.track(image, site, me, search));
            stats.global_resample = true;
        }

        stats.n_sites = self.sites.len();
        stats.curve_length = length;
        debug!(
            refined = stats.refined,
            lost = stats.lost,
            near = stats.near,
            resampled = stats.resampled,
            extended_begin = stats.extended_begin,
            extended_end = stats.extended_end,
            closed = stats.closed,
            n_sites = stats.n_sites,
            "tracking cycle done"
        );

        self.curve = Some(curve);
        self.curve_length = length;
        Ok(stats)
    }

    pub fn sites(&self) -> &SiteList {
        &self.sites
    }

    /// Current curve; `None` before initialisation.
    pub fn curve(&self) -> Option<&BSplineCurve> {
        self.curve.as_ref()
    }

    pub fn curve_length(&self) -> f64 {
        self.curve_length
    }

    pub fn failure_counts(&self) -> ExtremityFailures {
        self.failures
    }

    /// Number of sites whose last refinement succeeded.
    pub fn n_signal(&self) -> usize {
        self.sites.iter().filter(|s| s.is_ok()).count()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn has_edge_detector(&self) -> bool {
        self.edge_detector.is_some()
    }

    pub fn site_tracker(&self) -> &T {
        &self.site_tracker
    }
}

/// Least-squares refit from the site positions; keeps `curve` on failure.
fn refit(sites: &SiteList, curve: &mut BSplineCurve, n_control: usize) {
    match BSplineCurve::approximate(&sites.positions(), n_control) {
        Ok(c) => *curve = c,
        Err(e) => warn!(
            n_sites = sites.len(),
            error = %e,
            "curve refit failed, keeping previous curve"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MovingEdgeConfig;
    use crate::curve::coarse_nearest_index;
    use crate::site::{Site, SiteStatus};
    use crate::test_utils::{draw_disk, draw_vertical_edge, AcceptAll, FixedEdgeMap};
    use image::Luma;

    /// Loses every site whose row falls inside `rows`.
    struct Occluder {
        rows: std::ops::Range<f64>,
    }

    impl SiteTracker for Occluder {
        fn track(&self, _: &GrayImage, site: &mut Site, _: &MovingEdgeConfig, _: SiteSearch) {
            site.status = if self.rows.contains(&site.position().row) {
                SiteStatus::SuppressLost
            } else {
                SiteStatus::Ok
            };
        }
    }

    /// Vertical edge at col 100 for rows `< 150`, uniform below.
    fn edge_ending_mid_image() -> GrayImage {
        GrayImage::from_fn(200, 200, |x, y| {
            Luma([if x >= 100 && y < 150 { 200 } else { 40 }])
        })
    }

    fn assert_curve_ordered(tracker: &CurveTracker<impl SiteTracker>) {
        let curve = tracker.curve().unwrap();
        let ks: Vec<usize> = tracker
            .sites()
            .iter()
            .map(|s| coarse_nearest_index(curve, s.position()))
            .collect();
        assert!(ks.windows(2).all(|w| w[0] <= w[1]), "{ks:?}");
    }

    #[test]
    fn track_requires_initialisation() {
        let mut tracker = CurveTracker::new(TrackerConfig::default()).unwrap();
        let img = GrayImage::new(50, 50);
        assert_eq!(tracker.track(&img).unwrap_err(), TrackError::NotInitialized);
        assert_eq!(
            tracker.init_from_points(&img, &[]).unwrap_err(),
            TrackError::NotInitialized
        );
        assert!(tracker.curve().is_none());
    }

    #[test]
    fn zero_angle_step_is_fatal() {
        let mut cfg = TrackerConfig::default();
        cfg.moving_edge.angle_step_deg = 0;
        assert_eq!(CurveTracker::new(cfg.clone()).err(), Some(TrackError::ZeroAngleStep));

        let mut tracker = CurveTracker::new(TrackerConfig::default()).unwrap();
        assert_eq!(tracker.set_config(cfg), Err(TrackError::ZeroAngleStep));
        assert_eq!(tracker.config(), &TrackerConfig::default());
    }

    #[test]
    fn straight_edge_is_tracked_and_grown() {
        let img = draw_vertical_edge(200, 200, 100, 40, 200);
        let mut tracker = CurveTracker::new(TrackerConfig::default()).unwrap();
        let first = tracker
            .init_from_points(&img, &[ImagePoint::new(40.0, 98.0), ImagePoint::new(160.0, 98.0)])
            .unwrap();
        assert_eq!(first.extended_begin, 3);
        assert_eq!(first.extended_end, 3);

        for _ in 0..4 {
            let stats = tracker.track(&img).unwrap();
            assert!(!stats.closed);
            assert!(!stats.global_resample);
            assert_eq!(stats.lost, 0);
            assert_curve_ordered(&tracker);
        }
        let sites = tracker.sites();
        assert!(sites.len() >= 17);
        assert_eq!(tracker.n_signal(), sites.len());
        for s in sites {
            assert!((98.5..=100.5).contains(&s.position().col), "{s:?}");
        }
        assert!(tracker.curve_length() > 150.0);
        // Both ends sit against the border and keep failing to extend.
        let f = tracker.failure_counts();
        assert!(f.begin >= 3 && f.end >= 3);
    }

    #[test]
    fn occlusion_triggers_a_global_resample() {
        let cfg = TrackerConfig::default();
        let occluder = Occluder { rows: 35.0..145.0 };
        let mut tracker = CurveTracker::with_site_tracker(cfg, occluder).unwrap();
        let img = GrayImage::new(200, 200);
        let stats = tracker
            .init_from_points(&img, &[ImagePoint::new(20.0, 100.0), ImagePoint::new(180.0, 100.0)])
            .unwrap();
        assert!(stats.global_resample);
        assert_eq!(stats.n_sites, tracker.sites().len());
        assert!(stats.n_sites >= 18);
        let rows: Vec<f64> = tracker.sites().iter().map(|s| s.position().row).collect();
        assert!(rows[0] < 11.0, "{rows:?}");
        assert!(rows.windows(2).all(|w| w[1] > w[0]));
        // The occluded part is rebuilt but still fails to track.
        assert!(tracker.n_signal() < stats.n_sites);
    }

    #[test]
    fn closed_contour_drops_its_head_and_stays_on_the_disk() {
        let img = draw_disk(200, 200, [100.0, 100.0], 40.0, 210, 30);
        let points: Vec<ImagePoint> = (0..12)
            .map(|i| {
                let t = i as f64 * std::f64::consts::PI / 6.0;
                ImagePoint::new(100.0 + 41.0 * t.sin(), 100.0 + 41.0 * t.cos())
            })
            .collect();
        let mut tracker = CurveTracker::new(TrackerConfig::default()).unwrap();
        let first = tracker.init_from_points(&img, &points).unwrap();
        assert!(first.closed);
        assert_eq!(first.extended_begin + first.extended_end, 0);

        for _ in 0..5 {
            tracker.track(&img).unwrap();
        }
        assert!(tracker.sites().len() >= 15);
        for s in tracker.sites() {
            let r = s.position().distance(ImagePoint::new(100.0, 100.0));
            assert!((r - 40.0).abs() <= 2.0, "site off the disk edge: {s:?} (r = {r})");
        }
    }

    #[test]
    fn closed_contour_still_runs_recovery_on_failing_ends() {
        let img = draw_disk(200, 200, [100.0, 100.0], 40.0, 210, 30);
        let points: Vec<ImagePoint> = (0..12)
            .map(|i| {
                let t = i as f64 * std::f64::consts::PI / 6.0;
                ImagePoint::new(100.0 + 41.0 * t.sin(), 100.0 + 41.0 * t.cos())
            })
            .collect();
        let mut tracker = CurveTracker::new(TrackerConfig::default())
            .unwrap()
            .with_edge_detector(FixedEdgeMap::blank(32, 32));
        tracker.init_from_points(&img, &points).unwrap();

        let mut closed_cycles = 0;
        for _ in 0..8 {
            tracker.failures = ExtremityFailures { begin: 5, end: 5 };
            let stats = tracker.track(&img).unwrap();
            if stats.closed {
                closed_cycles += 1;
            }
            assert_eq!(stats.recovery_begin, RecoveryOutcome::NoSeed, "{stats:?}");
            assert_eq!(stats.recovery_end, RecoveryOutcome::NoSeed, "{stats:?}");
            assert_eq!(tracker.failure_counts(), ExtremityFailures::default());
        }
        assert!(closed_cycles > 0);
    }

    #[test]
    fn set_config_rebuilds_the_site_tracker_masks() {
        let mut tracker = CurveTracker::new(TrackerConfig::default()).unwrap();
        assert_eq!(tracker.site_tracker().masks().len(), 180);

        let mut cfg = TrackerConfig::default();
        cfg.moving_edge.angle_step_deg = 2;
        tracker.set_config(cfg.clone()).unwrap();
        let masks = tracker.site_tracker().masks();
        assert_eq!(masks.angle_step_deg(), 2);
        assert_eq!(masks.len(), 90);
        assert_eq!(tracker.config(), &cfg);
    }

    #[test]
    fn recovery_needs_an_edge_detector() {
        let img = edge_ending_mid_image();
        let points = [ImagePoint::new(40.0, 99.0), ImagePoint::new(140.0, 99.0)];

        let mut plain = CurveTracker::new(TrackerConfig::default()).unwrap();
        assert!(!plain.has_edge_detector());
        plain.init_from_points(&img, &points).unwrap();
        for _ in 0..5 {
            let stats = plain.track(&img).unwrap();
            assert_eq!(stats.recovery_end, RecoveryOutcome::NotTriggered);
        }
        assert!(plain.failure_counts().end >= 3);

        let mut recovering = CurveTracker::new(TrackerConfig::default())
            .unwrap()
            .with_edge_detector(FixedEdgeMap::column(32, 32, 15));
        assert!(recovering.has_edge_detector());
        recovering.init_from_points(&img, &points).unwrap();
        let mut outcomes = Vec::new();
        for _ in 0..5 {
            outcomes.push(recovering.track(&img).unwrap().recovery_end);
            assert!(recovering.failure_counts().end < 3);
        }
        assert!(
            outcomes
                .iter()
                .any(|o| matches!(o, RecoveryOutcome::Recovered { .. })),
            "{outcomes:?}"
        );
    }

    #[test]
    fn stub_tracker_keeps_sampled_positions() {
        let mut tracker =
            CurveTracker::with_site_tracker(TrackerConfig::default(), AcceptAll).unwrap();
        let img = GrayImage::new(300, 300);
        tracker
            .init_from_points(
                &img,
                &[
                    ImagePoint::new(50.0, 50.0),
                    ImagePoint::new(100.0, 150.0),
                    ImagePoint::new(150.0, 250.0),
                ],
            )
            .unwrap();
        assert_curve_ordered(&tracker);
        assert_eq!(tracker.n_signal(), tracker.sites().len());
        let json = serde_json::to_value(tracker.sites()).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(tracker.sites().len()));
    }
}
