//! Global and adaptive thresholds, and the "ink" masks derived from them.

use image::{GrayImage, Luma};

use crate::blur::Gaussian;
use crate::border::BorderMode;

/// `255` where `v > threshold`, `0` elsewhere.
#[must_use]
pub fn binary_threshold(image: &GrayImage, threshold: u8) -> GrayImage {
    map(image, |v| v > threshold)
}

/// Adaptive Gaussian threshold: `255` where `v - mean > -c`, with `mean`
/// a replicate-border Gaussian blur of `block` (coerced odd, at least 3).
#[must_use = "returns the thresholded image"]
pub fn adaptive_threshold(image: &GrayImage, block: u32, c: i16) -> GrayImage {
    let mean = Gaussian::ksize(block)
        .with_border(BorderMode::Replicate)
        .blur(image);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let v = i16::from(image.get_pixel(x, y).0[0]);
        let m = i16::from(mean.get_pixel(x, y).0[0]);
        Luma([if v - m > -c { 255 } else { 0 }])
    })
}

/// `255` where `v < below` (a pixel counts as ink), `0` elsewhere.
#[must_use]
pub fn ink_mask(image: &GrayImage, below: u8) -> GrayImage {
    map(image, |v| v < below)
}

fn map(image: &GrayImage, set: impl Fn(u8) -> bool) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([if set(image.get_pixel(x, y).0[0]) { 255 } else { 0 }])
    })
}
