//! Resizing to and from the working resolution.
//!
//! The generators run on an image whose longest side is at most the
//! configured maximum. [`resize_for_processing`] shrinks the cropped
//! photo and reports the scale it used; the `upscale_*` helpers bring
//! generated layers back to the cropped size.

use std::fmt;

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::types::FloatImage;

/// Resampling filter used when shrinking to the working resolution.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality,
/// with a `None` variant to skip downsampling entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DownsampleFilter {
    /// Disabled: process at the cropped size regardless of how large it is.
    None,
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Linear interpolation over the source footprint: the area-averaging
    /// choice for shrinking photos.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom).
    CatmullRom,
    /// Gaussian.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl DownsampleFilter {
    /// Convert to the `image` crate's `FilterType`, or `None` when
    /// resizing is disabled.
    const fn to_image_filter(self) -> Option<FilterType> {
        match self {
            Self::None => Option::None,
            Self::Nearest => Some(FilterType::Nearest),
            Self::Triangle => Some(FilterType::Triangle),
            Self::CatmullRom => Some(FilterType::CatmullRom),
            Self::Gaussian => Some(FilterType::Gaussian),
            Self::Lanczos3 => Some(FilterType::Lanczos3),
        }
    }
}

impl fmt::Display for DownsampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// An image at the working resolution plus the factor it was shrunk by.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaled {
    /// The (possibly unchanged) image.
    pub image: RgbImage,
    /// `working / original`, in `(0, 1]`.
    pub scale: f64,
}

/// Shrink `image` so its longest side is at most `max_side`.
///
/// The scale is `min(1, max_side / longest)` and the new size is
/// `floor(side * scale)` per axis, never below 1. Images already within
/// budget (or a `None` filter) come back unchanged with scale `1.0`.
#[must_use]
pub fn resize_for_processing(image: &RgbImage, max_side: u32, filter: DownsampleFilter) -> Scaled {
    let (w, h) = image.dimensions();
    let longest = w.max(h);
    let Some(image_filter) = filter.to_image_filter() else {
        return Scaled {
            image: image.clone(),
            scale: 1.0,
        };
    };
    if longest == 0 || longest <= max_side {
        return Scaled {
            image: image.clone(),
            scale: 1.0,
        };
    }

    let scale = f64::from(max_side) / f64::from(longest);
    let (nw, nh) = (
        scaled_side(w, max_side, longest),
        scaled_side(h, max_side, longest),
    );
    log::debug!("resizing {w}x{h} to {nw}x{nh} (scale {scale:.4})");
    Scaled {
        image: imageops::resize(image, nw, nh, image_filter),
        scale,
    }
}

/// `floor(side * max_side / longest)` in exact integer arithmetic.
fn scaled_side(side: u32, max_side: u32, longest: u32) -> u32 {
    let scaled = u64::from(side) * u64::from(max_side) / u64::from(longest);
    u32::try_from(scaled).unwrap_or(max_side).max(1)
}

/// Resize a grayscale layer with bilinear interpolation.
#[must_use]
pub fn upscale_linear(image: &GrayImage, width: u32, height: u32) -> GrayImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Triangle)
}

/// Resize a grayscale layer with nearest-neighbour sampling, keeping
/// binary layers binary.
#[must_use]
pub fn upscale_nearest(image: &GrayImage, width: u32, height: u32) -> GrayImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Nearest)
}

/// Resize a float mask with bilinear interpolation.
#[must_use]
pub fn resize_float(image: &FloatImage, width: u32, height: u32) -> FloatImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, image::Rgb([128, 128, 128]))
    }

    #[test]
    fn default_filter_is_triangle() {
        assert_eq!(DownsampleFilter::default(), DownsampleFilter::Triangle);
    }

    #[test]
    fn no_resize_when_within_budget() {
        let out = resize_for_processing(&test_image(300, 200), 1600, DownsampleFilter::Triangle);
        assert!((out.scale - 1.0).abs() < f64::EPSILON);
        assert_eq!(out.image.dimensions(), (300, 200));
    }

    #[test]
    fn no_resize_when_exact_match() {
        let out = resize_for_processing(&test_image(256, 100), 256, DownsampleFilter::Triangle);
        assert!((out.scale - 1.0).abs() < f64::EPSILON);
        assert_eq!(out.image.dimensions(), (256, 100));
    }

    #[test]
    fn landscape_shrinks_longest_side() {
        let out = resize_for_processing(&test_image(2000, 1500), 1600, DownsampleFilter::Triangle);
        assert!((out.scale - 0.8).abs() < 1e-12);
        assert_eq!(out.image.dimensions(), (1600, 1200));
    }

    #[test]
    fn portrait_shrinks_longest_side() {
        let out = resize_for_processing(&test_image(300, 1000), 500, DownsampleFilter::Nearest);
        assert_eq!(out.image.dimensions(), (150, 500));
    }

    #[test]
    fn sides_floor_and_never_vanish() {
        let out = resize_for_processing(&test_image(3000, 2), 100, DownsampleFilter::Triangle);
        assert_eq!(out.image.dimensions(), (100, 1));
    }

    #[test]
    fn aspect_ratio_round_trips() {
        let original = test_image(1999, 1001);
        let out = resize_for_processing(&original, 640, DownsampleFilter::Triangle);
        let (w, h) = out.image.dimensions();
        let back = upscale_linear(&image::imageops::grayscale(&out.image), 1999, 1001);
        assert_eq!(back.dimensions(), original.dimensions());
        let ratio = f64::from(w) / f64::from(h);
        assert!((ratio - 1999.0 / 1001.0).abs() < 0.01, "ratio drifted to {ratio}");
    }

    #[test]
    fn none_filter_skips_resizing() {
        let out = resize_for_processing(&test_image(4000, 10), 64, DownsampleFilter::None);
        assert_eq!(out.image.dimensions(), (4000, 10));
    }

    #[test]
    fn nearest_upscale_keeps_binary_values() {
        let small = GrayImage::from_fn(4, 4, |x, _| image::Luma([if x < 2 { 0 } else { 255 }]));
        let big = upscale_nearest(&small, 16, 16);
        assert!(big.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }
}
