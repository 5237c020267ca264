//! Tracked boundary points and their ordered container.

mod list;

pub use list::{CursorMut, Iter, SiteId, SiteList};

use serde::{Deserialize, Serialize};

use crate::geometry::ImagePoint;

/// Tracking status of a site after its last refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    /// Edge found; the site is kept.
    #[default]
    Ok,
    /// Candidate edges failed the contrast-ratio test.
    SuppressContrast,
    /// No edge above threshold inside the search segment (or off-image).
    SuppressLost,
    /// Too close to its predecessor in the list.
    SuppressNear,
}

/// One tracked point on the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    position: ImagePoint,
    pixel: [i64; 2],
    /// Edge-normal orientation in `[0, π)`; the search runs along `(sin α, cos α)`.
    pub alpha: f64,
    pub status: SiteStatus,
    /// Absolute mask response at the last accepted edge (0 before the first one).
    pub contrast: f64,
}

impl Site {
    pub fn new(position: ImagePoint, alpha: f64) -> Self {
        Self {
            position,
            pixel: position.rounded(),
            alpha,
            status: SiteStatus::Ok,
            contrast: 0.0,
        }
    }

    pub fn with_contrast(mut self, contrast: f64) -> Self {
        self.contrast = contrast;
        self
    }

    pub fn position(&self) -> ImagePoint {
        self.position
    }

    /// Rounded `(row, col)` pixel of the current position.
    pub fn pixel(&self) -> [i64; 2] {
        self.pixel
    }

    /// Move the site; the pixel cache follows.
    pub fn set_position(&mut self, position: ImagePoint) {
        self.position = position;
        self.pixel = position.rounded();
    }

    pub fn is_ok(&self) -> bool {
        self.status == SiteStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_cache_follows_position() {
        let mut s = Site::new(ImagePoint::new(10.4, 20.6), 0.0);
        assert_eq!(s.pixel(), [10, 21]);
        s.set_position(ImagePoint::new(11.5, 19.2));
        assert_eq!(s.pixel(), [12, 19]);
        assert!(s.is_ok());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&SiteStatus::SuppressNear).unwrap();
        assert_eq!(json, "\"suppress_near\"");
    }
}
