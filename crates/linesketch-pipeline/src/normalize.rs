//! Min-max normalisation.

use image::{GrayImage, Luma};

use crate::arith::saturate_round;
use crate::types::FloatImage;

/// Linear map `(v - min) / (max - min)` onto a target range.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Affine {
    scale: f32,
    shift: f32,
}

impl Affine {
    /// A constant input (or an empty one) maps everything to `lo`.
    fn fit(min: f32, max: f32, lo: f32, hi: f32) -> Self {
        let span = max - min;
        let scale = if span > f32::EPSILON {
            (hi - lo) / span
        } else {
            0.0
        };
        Self {
            scale,
            shift: min.mul_add(-scale, lo),
        }
    }

    fn apply(self, v: f32) -> f32 {
        v.mul_add(self.scale, self.shift)
    }
}

fn bounds(values: impl Iterator<Item = f32>) -> (f32, f32) {
    values.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Stretch a float image so its minimum maps to `lo` and its maximum to
/// `hi`.
#[must_use = "returns the normalised image"]
pub fn normalize_min_max(image: &FloatImage, lo: f32, hi: f32) -> FloatImage {
    let (min, max) = bounds(image.pixels().map(|p| p.0[0]));
    let map = Affine::fit(min, max, lo, hi);
    let mut out = image.clone();
    for p in out.pixels_mut() {
        p.0[0] = map.apply(p.0[0]);
    }
    out
}

/// Stretch an 8-bit image onto `0..=255`, rounding the result.
#[must_use = "returns the normalised image"]
pub fn normalize_gray(image: &GrayImage) -> GrayImage {
    let (min, max) = bounds(image.pixels().map(|p| f32::from(p.0[0])));
    let map = Affine::fit(min, max, 0.0, 255.0);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([saturate_round(map.apply(f32::from(image.get_pixel(x, y).0[0])))])
    })
}
