//! Engrave: a binary tone from an adaptive threshold with the contour
//! strokes cut out of it.

use image::GrayImage;

use crate::arith::fill_where_mut;
use crate::blur::{Gaussian, bilateral_filter};
use crate::gradient::laplacian_abs;
use crate::line::line_sketch;
use crate::morphology::{close_mut, dilate_mut};
use crate::threshold::adaptive_threshold;
use crate::types::{Layers, Percent};

/// Only contours of large shapes survive: Laplacian of a sigma 4 blur.
const CONTOUR_LEVEL: u8 = 18;

/// Adaptive threshold block: `(25 + (100 - detail) / 3) | 1`.
pub(super) const fn threshold_block(detail: Percent) -> u32 {
    (25 + detail.inverse() / 3) | 1
}

pub(super) fn generate(gray: &GrayImage, detail: Percent, strength: Percent) -> Layers {
    let smooth = Gaussian::sigma(2.0).blur(&bilateral_filter(gray, 9, 70.0, 70.0));

    let mut tone = adaptive_threshold(&smooth, threshold_block(detail), 4);
    close_mut(&mut tone, 3, 2);

    let mut line = line_sketch(&smooth, detail, strength);
    let contours = laplacian_abs(&Gaussian::sigma(4.0).blur(gray));
    fill_where_mut(&mut line, 0, |x, y| contours.get_pixel(x, y).0[0] < CONTOUR_LEVEL);
    dilate_mut(&mut line, 1 + strength.get() / 20);

    for (t, l) in tone.pixels_mut().zip(line.pixels()) {
        t.0[0] &= !l.0[0];
    }

    Layers { tone, line }
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;

    #[test]
    fn block_size_is_odd_and_shrinks_with_detail() {
        assert_eq!(threshold_block(Percent::new(100)), 25);
        assert_eq!(threshold_block(Percent::new(0)), 59);
        assert_eq!(threshold_block(Percent::new(50)), 41);
    }

    #[test]
    fn tone_is_binary() {
        let gray = GrayImage::from_fn(70, 50, |x, y| Luma([((x * 5) ^ (y * 3)) as u8]));
        let layers = generate(&gray, Percent::new(50), Percent::new(50));
        assert!(layers.tone.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn flat_input_is_blank() {
        let gray = GrayImage::from_pixel(50, 50, Luma([120]));
        let layers = generate(&gray, Percent::new(50), Percent::new(50));
        // Every stroke is suppressed to 0, so nothing is cut from the tone.
        assert!(layers.tone.pixels().all(|p| p.0[0] == 255));
        assert!(layers.line.pixels().all(|p| p.0[0] == 0));
    }
}
