//! Contour recovery at an extremity that keeps failing to extend.
//!
//! A 32×32 window around the extremity is passed to the edge detector, the
//! edge map is traced from a border seed next to where the curve leaves the
//! window, and the traced pixels replace the sites inside the window.

mod chain_code;

pub use chain_code::{trace_chain, ChainTrace};

use image::GrayImage;
use serde::{Deserialize, Serialize};

use super::extremity::{Extremity, ExtremityFailures};
use crate::config::TrackerConfig;
use crate::curve::BSplineCurve;
use crate::edges::EdgeDetector;
use crate::error::TrackError;
use crate::geometry::{far_from_border, ImagePoint, PixelRect};
use crate::moving_edge::{find_angle, MaskBank, SiteSearch, SiteTracker};
use crate::site::{Site, SiteList};

/// Failure count at which recovery runs for an end.
pub(crate) const RECOVERY_TRIGGER: u32 = 3;
/// Recovery needs the extremity this far (pixels) from every border.
const BORDER_MARGIN: f64 = 20.0;
const WINDOW_SIZE: u32 = 32;
/// Offset of the extremity from the window's top-left corner.
const WINDOW_OFFSET: i64 = 15;
const SEED_RADIUS_SQ: f64 = 16.0;
const CENTER_RADIUS_SQ: f64 = 16.0;
/// Parameter step of the inward scan for the last in-window curve point.
const ANCHOR_STEP: f64 = 1e-3;

/// What contour recovery did at one end during a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RecoveryOutcome {
    /// Counter below threshold, extremity near the border, closed curve or no detector.
    #[default]
    NotTriggered,
    /// The window around the extremity does not fit in the image.
    WindowOutsideImage,
    /// No edge pixel on the window border near the curve.
    NoSeed,
    /// The traced contour never reaches the window centre.
    NoCenterHit,
    /// The trace was accepted; `added` sites survived re-tracking.
    Recovered { added: usize },
}

/// Everything recovery reads besides the site list.
pub(crate) struct RecoveryContext<'a, T: SiteTracker + ?Sized> {
    pub image: &'a GrayImage,
    pub curve: &'a BSplineCurve,
    pub tracker: &'a T,
    pub detector: &'a dyn EdgeDetector,
    pub masks: &'a MaskBank,
    pub config: &'a TrackerConfig,
}

/// Run recovery at `end` if its failure counter has reached the trigger.
///
/// Once triggered the counter is reset, whatever the outcome.
pub(crate) fn recover_extremity<T: SiteTracker + ?Sized>(
    ctx: &RecoveryContext<'_, T>,
    sites: &mut SiteList,
    end: Extremity,
    failures: &mut ExtremityFailures,
) -> Result<RecoveryOutcome, TrackError> {
    if failures.get(end) < RECOVERY_TRIGGER {
        return Ok(RecoveryOutcome::NotTriggered);
    }
    let (cols, rows) = ctx.image.dimensions();
    let extremity = ctx.curve.point(end.parameter());
    if !far_from_border(extremity, BORDER_MARGIN, rows, cols) {
        return Ok(RecoveryOutcome::NotTriggered);
    }
    failures.reset(end);

    let outcome = recover_window(ctx, sites, end, extremity)?;
    tracing::trace!(?end, ?outcome, "contour recovery");
    Ok(outcome)
}

fn recover_window<T: SiteTracker + ?Sized>(
    ctx: &RecoveryContext<'_, T>,
    sites: &mut SiteList,
    end: Extremity,
    extremity: ImagePoint,
) -> Result<RecoveryOutcome, TrackError> {
    let (cols, rows) = ctx.image.dimensions();
    let [er, ec] = [extremity.row.floor() as i64, extremity.col.floor() as i64];
    let rect = PixelRect {
        top: er - WINDOW_OFFSET,
        left: ec - WINDOW_OFFSET,
        height: WINDOW_SIZE,
        width: WINDOW_SIZE,
    };
    if !rect.fits_in(rows, cols) {
        return Ok(RecoveryOutcome::WindowOutsideImage);
    }

    let window = image::imageops::crop_imm(
        ctx.image,
        rect.left as u32,
        rect.top as u32,
        rect.width,
        rect.height,
    )
    .to_image();
    let map = ctx.detector.edge_map(
        &window,
        ctx.config.recovery.canny_low,
        ctx.config.recovery.canny_high,
    );

    let origin = rect.top_left();
    let anchor = last_point_inside(ctx.curve, end, &rect) - origin;
    let Some(seed) = nearest_border_edge(&map, anchor) else {
        return Ok(RecoveryOutcome::NoSeed);
    };

    let trace = trace_chain(&map, seed);
    tracing::trace!(
        ?end,
        points = trace.points.len(),
        closed = trace.closed,
        "recovery trace"
    );
    let center = ImagePoint::new(WINDOW_OFFSET as f64, WINDOW_OFFSET as f64);
    let hits_center = trace
        .points
        .iter()
        .any(|&[r, c]| ImagePoint::new(r as f64, c as f64).sq_distance(center) <= CENTER_RADIUS_SQ);
    if !hits_center {
        return Ok(RecoveryOutcome::NoCenterHit);
    }

    while end.end_site(sites).is_some_and(|s| rect.contains(s.position())) {
        end.pop(sites);
    }

    let existing = sites.positions();
    let step_sq = ctx.config.sample_step * ctx.config.sample_step;
    let mut placed: Vec<ImagePoint> = Vec::new();
    let mut ids = Vec::new();
    for &[r, c] in &trace.points {
        let p = origin + ImagePoint::new(r as f64, c as f64);
        let crowded = existing
            .iter()
            .chain(placed.iter())
            .any(|q| q.sq_distance(p) < step_sq);
        if crowded {
            continue;
        }
        let (alpha, contrast) = find_angle(ctx.image, p, ctx.masks, &ctx.config.moving_edge)?;
        ids.push(end.push(sites, Site::new(p, alpha).with_contrast(contrast)));
        placed.push(p);
    }

    let search = SiteSearch::widened(&ctx.config.moving_edge, 3);
    let mut added = 0;
    for id in ids {
        let keep = match sites.get_mut(id) {
            Some(site) => {
                ctx.tracker.track(ctx.image, site, &ctx.config.moving_edge, search);
                site.is_ok()
            }
            None => false,
        };
        if keep {
            added += 1;
        } else {
            sites.remove(id);
        }
    }
    Ok(RecoveryOutcome::Recovered { added })
}

/// Last curve point still inside `rect` when walking inward from `end`.
fn last_point_inside(curve: &BSplineCurve, end: Extremity, rect: &PixelRect) -> ImagePoint {
    let steps = (1.0 / ANCHOR_STEP).round() as usize;
    let mut last = curve.point(end.parameter());
    for i in 1..=steps {
        let t = i as f64 * ANCHOR_STEP;
        let u = match end {
            Extremity::Begin => t,
            Extremity::End => 1.0 - t,
        };
        let p = curve.point(u);
        if !rect.contains(p) {
            break;
        }
        last = p;
    }
    last
}

/// Edge pixel on the window border closest to `anchor`, within the seed radius.
fn nearest_border_edge(map: &GrayImage, anchor: ImagePoint) -> Option<[u32; 2]> {
    let (w, h) = map.dimensions();
    let mut best: Option<([u32; 2], f64)> = None;
    for r in 0..h {
        for c in 0..w {
            let on_border = r == 0 || c == 0 || r + 1 == h || c + 1 == w;
            if !on_border || map.get_pixel(c, r)[0] == 0 {
                continue;
            }
            let d = ImagePoint::new(r as f64, c as f64).sq_distance(anchor);
            if d <= SEED_RADIUS_SQ && best.map_or(true, |(_, bd)| d < bd) {
                best = Some(([r, c], d));
            }
        }
    }
    best.map(|(p, _)| p)
}
