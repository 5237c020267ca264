use image::GrayImage;

use super::masks::MaskBank;
use crate::config::MovingEdgeConfig;
use crate::error::TrackError;
use crate::geometry::{out_of_image, ImagePoint};
use crate::site::{Site, SiteStatus};

/// Search parameters for one tracking call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteSearch {
    /// Half-length (pixels) of the search segment along the site normal.
    pub range: u32,
    /// Reject candidates whose contrast ratio to the previous edge is out of band.
    pub test_contrast: bool,
}

impl SiteSearch {
    /// Configured range with the contrast test.
    pub fn nominal(config: &MovingEdgeConfig) -> Self {
        Self {
            range: config.range,
            test_contrast: true,
        }
    }

    /// `factor ×` the configured range, without the contrast test.
    pub fn widened(config: &MovingEdgeConfig, factor: u32) -> Self {
        Self {
            range: config.range.saturating_mul(factor),
            test_contrast: false,
        }
    }

    pub fn without_contrast(self) -> Self {
        Self {
            test_contrast: false,
            ..self
        }
    }
}

/// Per-site refinement seam.
///
/// Implementations move `site` onto the nearby edge along its normal
/// `(sin α, cos α)`, update its contrast and set its status. A failed search
/// is reported through the status, never as an error.
pub trait SiteTracker {
    fn track(
        &self,
        image: &GrayImage,
        site: &mut Site,
        config: &MovingEdgeConfig,
        search: SiteSearch,
    );

    /// Called when the tracker configuration changes.
    fn reconfigure(&mut self, _config: &MovingEdgeConfig) -> Result<(), TrackError> {
        Ok(())
    }
}

/// Moving-edges tracker: 1-D search along the normal scored by oriented masks.
#[derive(Debug, Clone)]
pub struct ConvolutionSiteTracker {
    masks: MaskBank,
}

impl ConvolutionSiteTracker {
    pub fn new(config: &MovingEdgeConfig) -> Result<Self, TrackError> {
        Ok(Self {
            masks: MaskBank::from_config(config)?,
        })
    }

    pub fn masks(&self) -> &MaskBank {
        &self.masks
    }
}

/// Offset of the `i`-th candidate: `0, −1, +1, −2, +2, …`.
fn candidate_offset(i: u32) -> f64 {
    if i == 0 {
        0.0
    } else if i % 2 == 1 {
        -(i.div_ceil(2) as f64)
    } else {
        (i / 2) as f64
    }
}

impl SiteTracker for ConvolutionSiteTracker {
    fn track(
        &self,
        image: &GrayImage,
        site: &mut Site,
        config: &MovingEdgeConfig,
        search: SiteSearch,
    ) {
        let (cols, rows) = image.dimensions();
        let margin = self.masks.half() + config.strip;
        let k = self.masks.index_for_angle(site.alpha);
        let (s, c) = site.alpha.sin_cos();
        let origin = site.position();
        let use_contrast = search.test_contrast && site.contrast > 0.0;

        let mut best: Option<(ImagePoint, f64)> = None;
        let mut rejected_by_contrast = false;
        for i in 0..=2 * search.range {
            let t = candidate_offset(i);
            let p = ImagePoint::new(origin.row + t * s, origin.col + t * c);
            if out_of_image(p, margin, rows, cols) {
                continue;
            }
            let [row, col] = p.rounded();
            let score = self.masks.response(image, k, row, col).abs();
            if score < config.threshold {
                continue;
            }
            if use_contrast {
                let ratio = score / site.contrast;
                if ratio < 1.0 - config.mu1 || ratio > 1.0 + config.mu2 {
                    rejected_by_contrast = true;
                    continue;
                }
            }
            // strict: the nearest offset wins ties
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((p, score));
            }
        }

        match best {
            Some((p, score)) => {
                site.set_position(p);
                site.contrast = score;
                site.status = SiteStatus::Ok;
            }
            None if rejected_by_contrast => site.status = SiteStatus::SuppressContrast,
            None => site.status = SiteStatus::SuppressLost,
        }
    }

    fn reconfigure(&mut self, config: &MovingEdgeConfig) -> Result<(), TrackError> {
        self.masks = MaskBank::from_config(config)?;
        Ok(())
    }
}
