use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::curve::BSplineCurve;
use crate::geometry::{out_of_image, ImagePoint};
use crate::moving_edge::{SiteSearch, SiteTracker};
use crate::site::{Site, SiteId, SiteList};

/// Number of tangential steps tried at each open end per cycle.
const EXTENSION_STEPS: usize = 3;
/// Minimum distance (pixels) an extension candidate keeps from the border.
const EXTENSION_BORDER: u32 = 5;

/// One end of the tracked curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extremity {
    /// `u = 0`, the front of the site list.
    Begin,
    /// `u = 1`, the back of the site list.
    End,
}

impl Extremity {
    pub const BOTH: [Extremity; 2] = [Extremity::Begin, Extremity::End];

    /// Curve parameter of this end.
    pub fn parameter(self) -> f64 {
        match self {
            Extremity::Begin => 0.0,
            Extremity::End => 1.0,
        }
    }

    pub(crate) fn end_site(self, sites: &SiteList) -> Option<&Site> {
        match self {
            Extremity::Begin => sites.front(),
            Extremity::End => sites.back(),
        }
    }

    pub(crate) fn push(self, sites: &mut SiteList, site: Site) -> SiteId {
        match self {
            Extremity::Begin => sites.push_front(site),
            Extremity::End => sites.push_back(site),
        }
    }

    pub(crate) fn pop(self, sites: &mut SiteList) -> Option<Site> {
        match self {
            Extremity::Begin => sites.pop_front(),
            Extremity::End => sites.pop_back(),
        }
    }
}

/// Consecutive extension failures per end.
///
/// Incremented when a cycle adds nothing at an open end; reset only when
/// contour recovery runs for that end. Persists across frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtremityFailures {
    pub begin: u32,
    pub end: u32,
}

impl ExtremityFailures {
    pub fn get(&self, end: Extremity) -> u32 {
        match end {
            Extremity::Begin => self.begin,
            Extremity::End => self.end,
        }
    }

    pub(crate) fn increment(&mut self, end: Extremity) {
        match end {
            Extremity::Begin => self.begin = self.begin.saturating_add(1),
            Extremity::End => self.end = self.end.saturating_add(1),
        }
    }

    pub(crate) fn reset(&mut self, end: Extremity) {
        match end {
            Extremity::Begin => self.begin = 0,
            Extremity::End => self.end = 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Extension {
    pub closed: bool,
    pub added_begin: usize,
    pub added_end: usize,
}

/// Grow the list past both ends by stepping along the curve tangent.
///
/// When the curve ends are within `3·s` of each other the curve is treated
/// as closed: the head site is dropped and nothing is extended this cycle.
/// Otherwise each end tries up to three steps of `s`, starting from its end
/// site; a step that would land within `3·s` of the opposite curve end stops
/// that end. Candidates inherit the end site's orientation and contrast and
/// are tracked with twice the range without the contrast test.
pub(crate) fn extend_extremities<T: SiteTracker + ?Sized>(
    sites: &mut SiteList,
    curve: &BSplineCurve,
    image: &GrayImage,
    tracker: &T,
    config: &TrackerConfig,
    failures: &mut ExtremityFailures,
) -> Extension {
    let s = config.sample_step;
    let (p_begin, d_begin) = curve.point_and_derivative(0.0);
    let (p_end, d_end) = curve.point_and_derivative(1.0);
    let closed_sq = (3.0 * s) * (3.0 * s);

    if p_begin.sq_distance(p_end) <= closed_sq {
        sites.pop_front();
        return Extension {
            closed: true,
            ..Default::default()
        };
    }

    let mut out = Extension::default();
    for end in Extremity::BOTH {
        let (direction, opposite) = match end {
            Extremity::Begin => (d_begin.scale(-1.0), p_end),
            Extremity::End => (d_end, p_begin),
        };
        let added = extend_one(sites, end, direction, opposite, image, tracker, config);
        match end {
            Extremity::Begin => out.added_begin = added,
            Extremity::End => out.added_end = added,
        }
        if added == 0 {
            failures.increment(end);
        }
    }
    out
}

fn extend_one<T: SiteTracker + ?Sized>(
    sites: &mut SiteList,
    end: Extremity,
    direction: ImagePoint,
    opposite: ImagePoint,
    image: &GrayImage,
    tracker: &T,
    config: &TrackerConfig,
) -> usize {
    let s = config.sample_step;
    let norm = direction.norm();
    let Some(seed) = end.end_site(sites).cloned() else {
        return 0;
    };
    if !(norm > 0.0) {
        return 0;
    }
    let step = direction.scale(s / norm);
    let (cols, rows) = image.dimensions();
    let closed_sq = (3.0 * s) * (3.0 * s);
    let search = SiteSearch::widened(&config.moving_edge, 2);

    let mut from = seed.position();
    let mut added = 0;
    for _ in 0..EXTENSION_STEPS {
        let candidate = from + step;
        if candidate.sq_distance(opposite) < closed_sq
            || out_of_image(candidate, EXTENSION_BORDER, rows, cols)
        {
            break;
        }
        let mut site = Site::new(candidate, seed.alpha).with_contrast(seed.contrast);
        tracker.track(image, &mut site, &config.moving_edge, search);
        if site.is_ok() {
            from = site.position();
            end.push(sites, site);
            added += 1;
        } else {
            from = candidate;
        }
    }
    added
}
