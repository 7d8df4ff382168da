//! Vehicle: glossy body panels, darkened windows, and emphasis on large
//! round features such as wheels and lamps.

use image::{GrayImage, Luma};

use crate::arith::{fill_where_mut, saturate_trunc, scale_where_mut, subtract};
use crate::blur::{Gaussian, bilateral_filter};
use crate::gradient::laplacian_abs;
use crate::line::line_sketch;
use crate::tone::tone_sketch;
use crate::types::{Layers, Percent};

/// Smoothed brightness below which a region reads as glass.
const WINDOW_LEVEL: u8 = 85;

const TEXTURE_LEVEL: u8 = 14;

const FEATURE_LEVEL: u8 = 18;

pub(super) fn generate(gray: &GrayImage, detail: Percent, strength: Percent) -> Layers {
    let smoothed = Gaussian::sigma(1.2).blur(&bilateral_filter(gray, 9, 55.0, 55.0));
    let texture = subtract(gray, &smoothed);
    let body = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let b = f32::from(smoothed.get_pixel(x, y).0[0]);
        let t = f32::from(texture.get_pixel(x, y).0[0]);
        Luma([saturate_trunc(t.mul_add(0.25, b))])
    });

    let mut tone = tone_sketch(&body, detail, strength);
    let dark = Gaussian::sigma(4.0).blur(gray);
    scale_where_mut(&mut tone, 0.7, |x, y| dark.get_pixel(x, y).0[0] < WINDOW_LEVEL);

    let structure = bilateral_filter(gray, 7, 35.0, 35.0);
    let mut line = line_sketch(&structure, detail, strength);

    let fine = laplacian_abs(gray);
    fill_where_mut(&mut line, 0, |x, y| fine.get_pixel(x, y).0[0] < TEXTURE_LEVEL);

    let coarse = laplacian_abs(&Gaussian::sigma(3.0).blur(gray));
    scale_where_mut(&mut line, 1.35, |x, y| coarse.get_pixel(x, y).0[0] > FEATURE_LEVEL);

    Layers { tone, line }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_darken_the_tone() {
        let gray = GrayImage::from_fn(100, 60, |x, _| Luma([if x < 50 { 20 } else { 200 }]));
        let layers = generate(&gray, Percent::new(50), Percent::new(50));
        // Deep inside the dark half the dodge gives paper (240), scaled by 0.7.
        let window = layers.tone.get_pixel(10, 30).0[0];
        assert!((167..=168).contains(&window), "got {window}");
        assert_eq!(layers.tone.get_pixel(90, 30).0[0], 240);
    }
}
