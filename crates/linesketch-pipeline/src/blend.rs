//! Combining the tone and line layers into the sketch.

use image::GrayImage;

use crate::arith::{add_weighted, invert};
use crate::blur::bilateral_filter;
use crate::types::{DrawMode, Percent};

impl DrawMode {
    /// `(tone weight, inverted line weight)` for this mode.
    #[must_use]
    pub fn weights(self, strength: Percent) -> (f32, f32) {
        let s = strength.as_f32();
        match self {
            Self::Soft => (1.0, 0.35 + s / 300.0),
            Self::Strong => (0.75, 0.85 + s / 150.0),
        }
    }
}

/// Weighted sum of the tone layer and the inverted line layer,
/// saturated to 8 bits.
#[must_use = "returns the blended sketch"]
pub fn blend(tone: &GrayImage, line: &GrayImage, mode: DrawMode, strength: Percent) -> GrayImage {
    if tone.dimensions() != line.dimensions() {
        log::warn!(
            "layer sizes differ ({:?} vs {:?}); keeping tone only",
            tone.dimensions(),
            line.dimensions()
        );
        return tone.clone();
    }
    let (tone_weight, line_weight) = mode.weights(strength);
    add_weighted(tone, tone_weight, &invert(line), line_weight, 0.0)
}

/// Soften paper noise with a bilateral pass whose strength follows
/// `clean` (`sigma_color = 10 + 1.2 * clean`,
/// `sigma_space = 2 + 0.25 * clean`). `clean == 0` is the identity.
#[must_use = "returns the cleaned sketch"]
pub fn clean_background(sketch: &GrayImage, clean: Percent) -> GrayImage {
    if clean.get() == 0 {
        return sketch.clone();
    }
    let c = f64::from(clean.get());
    bilateral_filter(sketch, 0, 1.2f64.mul_add(c, 10.0), 0.25f64.mul_add(c, 2.0))
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;

    #[test]
    fn weights_follow_mode() {
        let (t, l) = DrawMode::Soft.weights(Percent::new(30));
        assert!((t - 1.0).abs() < 1e-6 && (l - 0.45).abs() < 1e-6);
        let (t, l) = DrawMode::Strong.weights(Percent::new(30));
        assert!((t - 0.75).abs() < 1e-6 && (l - 1.05).abs() < 1e-6);
    }

    #[test]
    fn paper_in_line_layer_leaves_tone_untouched_in_soft_mode() {
        let tone = GrayImage::from_fn(8, 8, |x, _| Luma([(x * 20) as u8]));
        let line = GrayImage::from_pixel(8, 8, Luma([255]));
        assert_eq!(blend(&tone, &line, DrawMode::Soft, Percent::new(50)), tone);
    }

    #[test]
    fn strong_mode_dims_tone() {
        let tone = GrayImage::from_pixel(2, 2, Luma([200]));
        let line = GrayImage::from_pixel(2, 2, Luma([255]));
        let out = blend(&tone, &line, DrawMode::Strong, Percent::new(50));
        assert_eq!(out.get_pixel(0, 0).0[0], 150);
    }

    #[test]
    fn strokes_change_the_blend() {
        let tone = GrayImage::from_pixel(4, 4, Luma([100]));
        let mut line = GrayImage::from_pixel(4, 4, Luma([255]));
        line.put_pixel(1, 1, Luma([0]));
        let out = blend(&tone, &line, DrawMode::Soft, Percent::new(0));
        assert_eq!(out.get_pixel(0, 0).0[0], 100);
        assert_eq!(out.get_pixel(1, 1).0[0], 189);
    }

    #[test]
    fn mismatched_layers_keep_tone() {
        let tone = GrayImage::from_pixel(4, 4, Luma([90]));
        let line = GrayImage::new(3, 3);
        assert_eq!(blend(&tone, &line, DrawMode::Soft, Percent::new(50)), tone);
    }

    #[test]
    fn zero_clean_is_identity() {
        let sketch = GrayImage::from_fn(10, 10, |x, y| Luma([((x ^ y) * 20) as u8]));
        assert_eq!(clean_background(&sketch, Percent::new(0)), sketch);
    }

    #[test]
    fn clean_keeps_uniform_paper() {
        let sketch = GrayImage::from_pixel(12, 12, Luma([240]));
        assert_eq!(clean_background(&sketch, Percent::new(80)), sketch);
    }
}
