//! Shared test utilities: synthetic images and stub collaborators.

use image::{GrayImage, Luma};

use crate::config::MovingEdgeConfig;
use crate::edges::EdgeDetector;
use crate::moving_edge::{SiteSearch, SiteTracker};
use crate::site::{Site, SiteStatus};

/// Two-tone image split by a vertical edge: columns `< edge_col` get `left`.
pub(crate) fn draw_vertical_edge(w: u32, h: u32, edge_col: u32, left: u8, right: u8) -> GrayImage {
    GrayImage::from_fn(w, h, |x, _| Luma([if x < edge_col { left } else { right }]))
}

/// Filled disk of value `fg` on `bg`; `center` is `[row, col]`.
pub(crate) fn draw_disk(w: u32, h: u32, center: [f64; 2], radius: f64, fg: u8, bg: u8) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        let dr = y as f64 - center[0];
        let dc = x as f64 - center[1];
        Luma([if dr * dr + dc * dc <= radius * radius { fg } else { bg }])
    })
}

/// Gaussian-blur a `GrayImage` via `imageproc`.
pub(crate) fn blur_gray(img: &GrayImage, sigma: f32) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut f = image::ImageBuffer::<Luma<f32>, Vec<f32>>::new(w, h);
    for y in 0..h {
        for x in 0..w {
            f.put_pixel(x, y, Luma([img.get_pixel(x, y)[0] as f32 / 255.0]));
        }
    }
    let blurred = imageproc::filter::gaussian_blur_f32(&f, sigma);
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let v = blurred.get_pixel(x, y)[0].clamp(0.0, 1.0);
            out.put_pixel(x, y, Luma([(v * 255.0).round() as u8]));
        }
    }
    out
}

/// Accepts every site where it stands.
pub(crate) struct AcceptAll;

impl SiteTracker for AcceptAll {
    fn track(&self, _: &GrayImage, site: &mut Site, _: &MovingEdgeConfig, _: SiteSearch) {
        site.status = SiteStatus::Ok;
    }
}

/// Loses every site.
pub(crate) struct RejectAll;

impl SiteTracker for RejectAll {
    fn track(&self, _: &GrayImage, site: &mut Site, _: &MovingEdgeConfig, _: SiteSearch) {
        site.status = SiteStatus::SuppressLost;
    }
}

/// Edge detector returning the same map for every window.
pub(crate) struct FixedEdgeMap(pub GrayImage);

impl FixedEdgeMap {
    pub(crate) fn blank(w: u32, h: u32) -> Self {
        Self(GrayImage::new(w, h))
    }

    /// Full-height column of edge pixels at `col`.
    pub(crate) fn column(w: u32, h: u32, col: u32) -> Self {
        Self::column_stub(w, h, col, h)
    }

    /// Column of edge pixels at `col`, rows `0..len`.
    pub(crate) fn column_stub(w: u32, h: u32, col: u32, len: u32) -> Self {
        Self(GrayImage::from_fn(w, h, |x, y| {
            Luma([if x == col && y < len { 255 } else { 0 }])
        }))
    }
}

impl EdgeDetector for FixedEdgeMap {
    fn edge_map(&self, _: &GrayImage, _: f32, _: f32) -> GrayImage {
        self.0.clone()
    }
}
