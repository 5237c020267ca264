//! Moving-edges primitives: oriented masks and the per-site tracker.
//!
//! A site searches for the strongest step edge on a short segment along its
//! normal. Scores come from a bank of oriented masks indexed by the site
//! orientation; [`find_angle`] runs the same masks exhaustively to estimate
//! the orientation of a fresh point.

mod masks;
mod site_tracker;

pub use masks::{find_angle, MaskBank};
pub use site_tracker::{ConvolutionSiteTracker, SiteSearch, SiteTracker};
