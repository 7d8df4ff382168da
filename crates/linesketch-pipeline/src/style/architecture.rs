//! Architecture: posterised flat planes, straight segments reinforced by
//! a Hough pass, and small-scale texture removed from the strokes.

use image::{GrayImage, Luma};

use crate::arith::{fill_where_mut, saturate_trunc};
use crate::blur::{Gaussian, bilateral_filter};
use crate::edge::canny;
use crate::gradient::laplacian_abs;
use crate::hough::{HoughParams, detect_segments, draw_segments_mut};
use crate::line::line_sketch;
use crate::tone::tone_sketch;
use crate::types::{Layers, Percent};

/// Laplacian response below which a stroke is treated as texture.
const TEXTURE_LEVEL: u8 = 14;

/// Number of tone levels: `6 + detail / 20`.
pub(super) const fn tone_levels(detail: Percent) -> u32 {
    6 + detail.get() / 20
}

/// `floor(v / 255 * levels) / levels * 255`, truncated.
fn posterize(image: &GrayImage, levels: u32) -> GrayImage {
    #[allow(clippy::cast_precision_loss)]
    let levels = levels as f32;
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let v = f32::from(image.get_pixel(x, y).0[0]) / 255.0;
        Luma([saturate_trunc((v * levels).floor() / levels * 255.0)])
    })
}

pub(super) fn generate(gray: &GrayImage, detail: Percent, strength: Percent) -> Layers {
    let smooth = Gaussian::sigma(1.5).blur(&bilateral_filter(gray, 11, 60.0, 60.0));
    let tone = posterize(&tone_sketch(&smooth, detail, strength), tone_levels(detail));

    let mut line = line_sketch(&smooth, detail, strength);
    let segments = detect_segments(&canny(&smooth, 60.0, 140.0), HoughParams::default());
    draw_segments_mut(&mut line, &segments, 255, 2);

    let texture = laplacian_abs(gray);
    fill_where_mut(&mut line, 0, |x, y| texture.get_pixel(x, y).0[0] < TEXTURE_LEVEL);

    Layers { tone, line }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_grow_with_detail() {
        assert_eq!(tone_levels(Percent::new(0)), 6);
        assert_eq!(tone_levels(Percent::new(50)), 8);
        assert_eq!(tone_levels(Percent::new(100)), 11);
    }

    #[test]
    fn posterize_uses_few_values() {
        let ramp = GrayImage::from_fn(256, 1, |x, _| Luma([x as u8]));
        let out = posterize(&ramp, 6);
        let mut values: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        values.dedup();
        assert_eq!(values.len(), 7, "got {values:?}");
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(255, 0).0[0], 255);
    }

    #[test]
    fn flat_walls_have_no_strokes() {
        // No Laplacian response anywhere, so every stroke is suppressed.
        let gray = GrayImage::from_pixel(64, 64, Luma([150]));
        let layers = generate(&gray, Percent::new(50), Percent::new(50));
        assert!(layers.line.pixels().all(|p| p.0[0] == 0));
    }
}
