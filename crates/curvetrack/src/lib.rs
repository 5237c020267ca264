//! curvetrack: moving-edges tracking of an image boundary with a B-spline.
//!
//! Given a rough outline of a boundary (clicked points or the previous
//! frame's curve), the tracker keeps an ordered list of boundary sites locked
//! on the edge frame after frame. Each cycle runs:
//!
//! 1. **Refine**: every site searches along its normal for the strongest
//!    oriented step edge.
//! 2. **Suppress**: lost sites and near duplicates are dropped.
//! 3. **Refit**: a least-squares B-spline through the survivors.
//! 4. **Resample**: gaps are refilled from the curve.
//! 5. **Extremities**: both ends grow along the tangent; ends that keep
//!    failing are recovered by chain-code tracing of an edge map.
//! 6. **Orientation**: site normals are refreshed from the refit curve.
//! 7. **Guard**: the list is rebuilt when too few sites remain for the
//!    curve length.
//!
//! # Public API
//! - [`CurveTracker`] is the entry point, tuned by [`TrackerConfig`].
//! - [`SiteTracker`] and [`EdgeDetector`] are the seams for per-site
//!   refinement and recovery edge maps; [`ConvolutionSiteTracker`] and
//!   [`CannyEdgeDetector`] are the default implementations.
//! - [`BSplineCurve`], [`SiteList`] and [`Site`] expose the tracked state.

mod config;
mod curve;
mod edges;
mod error;
mod geometry;
mod moving_edge;
mod site;
mod tracker;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{MovingEdgeConfig, RecoveryConfig, TrackerConfig};
pub use curve::{coarse_nearest_index, descend_nearest_index, BSplineCurve, MAX_DEGREE};
pub use edges::{CannyEdgeDetector, EdgeDetector};
pub use error::{CurveFitError, TrackError};
pub use geometry::{
    far_from_border, normalize_half_turn, out_of_image, tangent_normal_angle, ImagePoint,
    PixelRect,
};
pub use moving_edge::{find_angle, ConvolutionSiteTracker, MaskBank, SiteSearch, SiteTracker};
pub use site::{CursorMut, Iter, Site, SiteId, SiteList, SiteStatus};
pub use tracker::{
    trace_chain, ChainTrace, CurveTracker, CycleStats, Extremity, ExtremityFailures,
    RecoveryOutcome,
};
