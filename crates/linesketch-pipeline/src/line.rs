//! The line layer: contour strokes from multi-scale gradients.
//!
//! Lighting is flattened first (divide by a sigma-25 blur) so contour
//! strength does not depend on exposure. Gradient magnitude from 3x3, 5x5
//! and 9x9 Sobel kernels is blended toward the fine scale, then damped
//! wherever the local gradient direction disagrees with its smoothed
//! neighbourhood. That removes dense parallel texture (fabric, brick,
//! foliage) while long contours survive. A threshold that rises with
//! local variance picks the strokes.

use image::{GrayImage, Luma};

use crate::arith::{saturate_round, saturate_trunc, to_float};
use crate::blur::Gaussian;
use crate::gradient::Gradient;
use crate::morphology::dilate_mut;
use crate::normalize::normalize_min_max;
use crate::types::{FloatImage, Percent};

/// Weights of the 3x3, 5x5 and 9x9 gradient magnitudes.
const SCALE_WEIGHTS: [(u32, f32); 3] = [(3, 0.5), (5, 0.35), (9, 0.15)];

/// Window of the direction smoothing behind the coherence term.
const ANGLE_SMOOTHING: u32 = 9;

/// Window of the local variance estimate.
const VARIANCE_WINDOW: u32 = 31;

/// Extra threshold applied in the busiest neighbourhoods.
const VARIANCE_PENALTY: f32 = 60.0;

/// Divide by a wide blur so exposure gradients do not read as edges:
/// `round(gray * 255 / blur(gray, sigma 25))`, with `0` where the blur
/// is zero.
#[must_use]
pub fn normalize_lighting(gray: &GrayImage) -> GrayImage {
    let light = Gaussian::sigma(25.0).blur(gray);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let l = light.get_pixel(x, y).0[0];
        if l == 0 {
            return Luma([0]);
        }
        Luma([saturate_round(
            f32::from(gray.get_pixel(x, y).0[0]) * 255.0 / f32::from(l),
        )])
    })
}

/// `|sin(angle - smoothed angle)|` stretched to `[0, 1]`.
fn incoherence(angle: &FloatImage) -> FloatImage {
    let smoothed = Gaussian::ksize(ANGLE_SMOOTHING).blur_f32(angle);
    let raw = FloatImage::from_fn(angle.width(), angle.height(), |x, y| {
        Luma([(angle.get_pixel(x, y).0[0] - smoothed.get_pixel(x, y).0[0])
            .sin()
            .abs()])
    });
    normalize_min_max(&raw, 0.0, 1.0)
}

/// Blended multi-scale magnitude, damped by incoherence and stretched to
/// 8 bits (truncated).
#[must_use]
pub fn edge_strength(gray: &GrayImage) -> GrayImage {
    let norm = to_float(&normalize_lighting(gray));
    let (w, h) = norm.dimensions();

    let mut magnitude = FloatImage::new(w, h);
    let mut fine: Option<Gradient> = None;
    for (ksize, weight) in SCALE_WEIGHTS {
        let gradient = Gradient::sobel(&norm, ksize);
        for (acc, m) in magnitude.pixels_mut().zip(gradient.magnitude().pixels()) {
            acc.0[0] = m.0[0].mul_add(weight, acc.0[0]);
        }
        if ksize == 3 {
            fine = Some(gradient);
        }
    }

    if let Some(fine) = fine {
        let damping = incoherence(&fine.angle());
        for (m, c) in magnitude.pixels_mut().zip(damping.pixels()) {
            m.0[0] *= 1.0 - c.0[0];
        }
    }

    let stretched = normalize_min_max(&magnitude, 0.0, 255.0);
    GrayImage::from_fn(w, h, |x, y| Luma([saturate_trunc(stretched.get_pixel(x, y).0[0])]))
}

/// Local variance `E[m^2] - E[m]^2` over a 31x31 Gaussian window,
/// stretched to `[0, 1]`.
fn local_variance(magnitude: &GrayImage) -> FloatImage {
    let window = Gaussian::ksize(VARIANCE_WINDOW);
    let m = to_float(magnitude);
    let squared = FloatImage::from_fn(m.width(), m.height(), |x, y| {
        let v = m.get_pixel(x, y).0[0];
        Luma([v * v])
    });
    let mean_sq = window.blur_f32(&squared);
    let mean = window.blur_f32(&m);
    let variance = FloatImage::from_fn(m.width(), m.height(), |x, y| {
        let mu = mean.get_pixel(x, y).0[0];
        Luma([mu.mul_add(-mu, mean_sq.get_pixel(x, y).0[0])])
    });
    normalize_min_max(&variance, 0.0, 1.0)
}

/// Smoothing window of the edge strength: `int(3 + (100 - detail) / 18) | 1`.
#[must_use]
pub const fn strength_blur_size(detail: Percent) -> u32 {
    (3 + detail.inverse() / 18) | 1
}

/// Stroke thickness: `1 + strength / 12`, coerced odd by the dilation.
#[must_use]
pub const fn stroke_thickness(strength: Percent) -> u32 {
    1 + strength.get() / 12
}

/// Generate the line layer: dark strokes on white.
///
/// A pixel is a stroke where the smoothed edge strength exceeds
/// `140 - 0.9 * detail + 60 * local_variance`. Strokes are then thinned
/// by a [`stroke_thickness`] max filter on the white paper.
#[must_use = "returns the line layer"]
pub fn line_sketch(gray: &GrayImage, detail: Percent, strength: Percent) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }

    let magnitude = Gaussian::ksize(strength_blur_size(detail)).blur(&edge_strength(gray));
    let variance = local_variance(&magnitude);
    let base = 0.9f32.mul_add(-detail.as_f32(), 140.0);

    let mut line = GrayImage::from_fn(w, h, |x, y| {
        let threshold = variance.get_pixel(x, y).0[0].mul_add(VARIANCE_PENALTY, base);
        let stroke = f32::from(magnitude.get_pixel(x, y).0[0]) > threshold;
        Luma([if stroke { 0 } else { 255 }])
    });
    dilate_mut(&mut line, stroke_thickness(strength));
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disc(size: u32, radius: f32) -> GrayImage {
        let c = size as f32 / 2.0;
        GrayImage::from_fn(size, size, |x, y| {
            let d = (x as f32 - c).hypot(y as f32 - c);
            Luma([if d < radius { 40 } else { 220 }])
        })
    }

    #[test]
    fn flat_image_has_no_strokes() {
        let gray = GrayImage::from_pixel(64, 48, Luma([128]));
        let line = line_sketch(&gray, Percent::new(50), Percent::new(50));
        assert!(line.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn output_is_binary_and_sized() {
        let line = line_sketch(&disc(96, 30.0), Percent::new(60), Percent::new(10));
        assert_eq!(line.dimensions(), (96, 96));
        assert!(line.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn contour_produces_strokes_near_edge() {
        let line = line_sketch(&disc(96, 30.0), Percent::new(80), Percent::new(0));
        let strokes: Vec<(u32, u32)> = line
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] == 0)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!strokes.is_empty(), "expected strokes around the disc");
        for (x, y) in strokes {
            let d = (x as f32 - 48.0).hypot(y as f32 - 48.0);
            assert!((20.0..=40.0).contains(&d), "stroke at ({x}, {y}) is {d} from centre");
        }
    }

    #[test]
    fn line_is_deterministic() {
        let gray = disc(80, 22.0);
        let a = line_sketch(&gray, Percent::new(40), Percent::new(40));
        let b = line_sketch(&gray, Percent::new(40), Percent::new(40));
        assert_eq!(a, b);
    }

    #[test]
    fn size_formulas() {
        assert_eq!(strength_blur_size(Percent::new(50)), 5);
        assert_eq!(strength_blur_size(Percent::new(100)), 3);
        assert_eq!(strength_blur_size(Percent::new(0)), 9);
        assert_eq!(stroke_thickness(Percent::new(0)), 1);
        assert_eq!(stroke_thickness(Percent::new(50)), 5);
    }

    #[test]
    fn lighting_normalisation_flattens_uniform_image() {
        let norm = normalize_lighting(&GrayImage::from_pixel(30, 30, Luma([90])));
        assert!(norm.pixels().all(|p| p.0[0] == 255));
        let black = normalize_lighting(&GrayImage::new(10, 10));
        assert!(black.pixels().all(|p| p.0[0] == 0));
    }
}
