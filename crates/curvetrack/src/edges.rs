//! Binary edge maps for contour recovery.

use image::GrayImage;

/// Produces a binary edge map (0 = background, non-zero = edge) of the same
/// size as the input window.
pub trait EdgeDetector {
    fn edge_map(&self, window: &GrayImage, low: f32, high: f32) -> GrayImage;
}

/// Canny detector from `imageproc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannyEdgeDetector;

impl EdgeDetector for CannyEdgeDetector {
    fn edge_map(&self, window: &GrayImage, low: f32, high: f32) -> GrayImage {
        imageproc::edges::canny(window, low, high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::draw_vertical_edge;

    #[test]
    fn canny_marks_a_step_edge() {
        let img = draw_vertical_edge(32, 32, 16, 20, 230);
        let map = CannyEdgeDetector.edge_map(&img, 50.0, 100.0);
        assert_eq!(map.dimensions(), (32, 32));
        let on_edge = (4..28)
            .filter(|&y| (14..=17).any(|x| map.get_pixel(x, y)[0] > 0))
            .count();
        assert!(on_edge >= 20, "edge rows found: {on_edge}");
        assert!(map.get_pixel(4, 16)[0] == 0 && map.get_pixel(28, 16)[0] == 0);
    }
}
