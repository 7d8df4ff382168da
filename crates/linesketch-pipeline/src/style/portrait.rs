//! Portrait: smoothed skin, no contours inside shadows, and a little
//! extra weight on high-contrast features (eyes, mouth).

use image::{GrayImage, Luma};

use crate::arith::{saturate_trunc, scale_where_mut, subtract};
use crate::blur::{Gaussian, bilateral_filter};
use crate::gradient::laplacian_abs;
use crate::line::line_sketch;
use crate::tone::tone_sketch;
use crate::types::{Layers, Percent};

/// Tone below this counts as shadow.
const SHADOW_LEVEL: u8 = 90;

/// Laplacian response that marks a facial feature.
const FEATURE_LEVEL: u8 = 18;

pub(super) fn generate(gray: &GrayImage, detail: Percent, strength: Percent) -> Layers {
    let sigma = 40.0 + f64::from(detail.get());
    let smooth = bilateral_filter(gray, 9, sigma, sigma);
    let texture = Gaussian::sigma(1.2).blur(&subtract(gray, &smooth));
    let skin = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let s = f32::from(smooth.get_pixel(x, y).0[0]);
        let t = f32::from(texture.get_pixel(x, y).0[0]);
        Luma([saturate_trunc(t.mul_add(0.35, s))])
    });
    let tone = tone_sketch(&skin, detail, strength);

    let structure = bilateral_filter(gray, 7, 25.0, 25.0);
    let mut line = line_sketch(&structure, detail, strength);
    scale_where_mut(&mut line, 0.4, |x, y| tone.get_pixel(x, y).0[0] < SHADOW_LEVEL);

    let features = laplacian_abs(gray);
    scale_where_mut(&mut line, 1.25, |x, y| {
        features.get_pixel(x, y).0[0] > FEATURE_LEVEL
    });

    Layers { tone, line }
}
