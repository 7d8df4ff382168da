//! Per-pixel arithmetic with 8-bit saturation.
//!
//! Two conversion policies appear throughout the pipeline: rounding
//! saturation (the result of a filter written back to 8 bits) and
//! truncating saturation (an explicit integer cast of a float result).
//! Each function names the one it applies.

use image::{GrayImage, Luma};

use crate::types::FloatImage;

/// Round to nearest, halves to even, and clamp into `0..=255`.
#[must_use]
pub fn saturate_round(v: f32) -> u8 {
    // Clamped first, so the cast is exact.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out = v.round_ties_even().clamp(0.0, 255.0) as u8;
    out
}

/// Clamp into `0..=255` and drop the fraction.
#[must_use]
pub fn saturate_trunc(v: f32) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out = v.clamp(0.0, 255.0) as u8;
    out
}

/// Widen an 8-bit image to floats.
#[must_use]
pub fn to_float(image: &GrayImage) -> FloatImage {
    FloatImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([f32::from(image.get_pixel(x, y).0[0])])
    })
}

/// Narrow a float image with [`saturate_round`].
#[must_use]
pub fn to_gray_round(image: &FloatImage) -> GrayImage {
    map_float(image, saturate_round)
}

fn map_float(image: &FloatImage, f: impl Fn(f32) -> u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([f(image.get_pixel(x, y).0[0])])
    })
}

/// `255 - v` for every pixel.
#[must_use]
pub fn invert(image: &GrayImage) -> GrayImage {
    let mut out = image.clone();
    for p in out.pixels_mut() {
        p.0[0] = 255 - p.0[0];
    }
    out
}

/// `max(a - b, 0)` per pixel.
#[must_use]
pub fn subtract(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0].saturating_sub(b.get_pixel(x, y).0[0])])
    })
}

/// `a * wa + b * wb + gamma` with rounding saturation.
#[must_use]
pub fn add_weighted(a: &GrayImage, wa: f32, b: &GrayImage, wb: f32, gamma: f32) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        let va = f32::from(a.get_pixel(x, y).0[0]);
        let vb = f32::from(b.get_pixel(x, y).0[0]);
        Luma([saturate_round(va.mul_add(wa, vb.mul_add(wb, gamma)))])
    })
}

/// `|v * alpha + beta|` with rounding saturation, over an 8-bit image.
#[must_use]
pub fn convert_scale_abs(image: &GrayImage, alpha: f32, beta: f32) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let v = f32::from(image.get_pixel(x, y).0[0]);
        Luma([saturate_round(v.mul_add(alpha, beta).abs())])
    })
}

/// `|v * alpha + beta|` with rounding saturation, over a float image.
#[must_use]
pub fn convert_scale_abs_f32(image: &FloatImage, alpha: f32, beta: f32) -> GrayImage {
    map_float(image, |v| saturate_round(v.mul_add(alpha, beta).abs()))
}

/// Scale every pixel by `factor`, clamping and truncating the result.
///
/// Applied only where `select` returns `true`. Mutates `image` in place.
pub fn scale_where_mut(image: &mut GrayImage, factor: f32, select: impl Fn(u32, u32) -> bool) {
    for (x, y, p) in image.enumerate_pixels_mut() {
        if select(x, y) {
            p.0[0] = saturate_trunc(f32::from(p.0[0]) * factor);
        }
    }
}

/// Set every pixel to `value` where `select` returns `true`. Mutates
/// `image` in place.
pub fn fill_where_mut(image: &mut GrayImage, value: u8, select: impl Fn(u32, u32) -> bool) {
    for (x, y, p) in image.enumerate_pixels_mut() {
        if select(x, y) {
            p.0[0] = value;
        }
    }
}

/// Population mean and standard deviation.
#[must_use]
pub fn mean_stddev(image: &GrayImage) -> (f64, f64) {
    let n = f64::from(image.width()) * f64::from(image.height());
    if n == 0.0 {
        return (0.0, 0.0);
    }
    let (sum, sum_sq) = image.pixels().fold((0.0_f64, 0.0_f64), |(s, sq), p| {
        let v = f64::from(p.0[0]);
        (s + v, v.mul_add(v, sq))
    });
    let mean = sum / n;
    let var = (sum_sq / n - mean * mean).max(0.0);
    (mean, var.sqrt())
}
