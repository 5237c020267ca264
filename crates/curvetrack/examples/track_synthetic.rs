use curvetrack::{CannyEdgeDetector, CurveTracker, ImagePoint, TrackerConfig};
use image::{GrayImage, Luma};
use std::error::Error;

/// Bright ellipse drifting right by `shift` pixels per frame.
fn frame(index: u32, shift: f64) -> GrayImage {
    let (cr, cc) = (200.0, 220.0 + shift * index as f64);
    GrayImage::from_fn(480, 400, |x, y| {
        let dr = (y as f64 - cr) / 90.0;
        let dc = (x as f64 - cc) / 130.0;
        Luma([if dr * dr + dc * dc <= 1.0 { 200 } else { 45 }])
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    let frames: u32 = std::env::args()
        .nth(1)
        .map(|s| s.parse::<u32>())
        .transpose()?
        .unwrap_or(20);

    // Upper half of the ellipse outline, clicked from left to right.
    let clicks: Vec<ImagePoint> = (0..=8)
        .map(|i| {
            let t = std::f64::consts::PI * (1.0 - i as f64 / 8.0);
            ImagePoint::new(200.0 - 88.0 * t.sin(), 220.0 + 128.0 * t.cos())
        })
        .collect();

    let config = TrackerConfig {
        sample_step: 8.0,
        ..Default::default()
    };
    let mut tracker = CurveTracker::new(config)?.with_edge_detector(CannyEdgeDetector);

    let first = tracker.init_from_points(&frame(0, 1.5), &clicks)?;
    println!(
        "frame 0: {} sites, length {:.1}px",
        first.n_sites, first.curve_length
    );
    for i in 1..frames {
        let stats = tracker.track(&frame(i, 1.5))?;
        println!(
            "frame {i}: {} sites ({} lost, +{}/+{} at ends), length {:.1}px{}",
            stats.n_sites,
            stats.lost,
            stats.extended_begin,
            stats.extended_end,
            stats.curve_length,
            if stats.global_resample { ", resampled" } else { "" }
        );
    }
    Ok(())
}
