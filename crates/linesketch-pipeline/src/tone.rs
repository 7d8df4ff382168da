//! The tone layer: a pencil-shading "dodge" of the prepared image, and
//! the contrast rescue applied to washed-out inputs before it.

use image::{GrayImage, Luma};

use crate::arith::{add_weighted, convert_scale_abs, invert, mean_stddev, saturate_trunc, subtract};
use crate::blur::Gaussian;
use crate::normalize::normalize_gray;
use crate::types::Percent;

/// Gamma applied before the dodge; darkens midtones.
const TONE_GAMMA: f32 = 1.35;

/// Diagonal (pixels) at which the dodge blur uses its nominal size.
const REFERENCE_DIAGONAL: f64 = 1500.0;

/// Lower bound of the dodge denominator, keeping highlights finite.
const MIN_DODGE_DENOMINATOR: u8 = 8;

/// Highlights are clipped to this value.
const HIGHLIGHT_CEILING: u8 = 240;

/// Whether `gray` is too flat for the generators to find structure:
/// `stddev < 18 + 0.01 * mean`.
#[must_use]
pub fn needs_tone_reconstruction(gray: &GrayImage) -> bool {
    if gray.width() == 0 || gray.height() == 0 {
        return false;
    }
    let (mean, stddev) = mean_stddev(gray);
    stddev < 0.01f64.mul_add(mean, 18.0)
}

/// Rebuild contrast in a flat image from its large-scale shape
/// (sigma 35) and mid-scale texture (sigma 9 minus shape), recombined as
/// `1.2 * shape + 0.6 * texture` and stretched to the full range.
#[must_use = "returns the reconstructed image"]
pub fn reconstruct_tone(gray: &GrayImage) -> GrayImage {
    let large = Gaussian::sigma(35.0).blur(gray);
    let medium = Gaussian::sigma(9.0).blur(gray);
    let texture = subtract(&medium, &large);
    normalize_gray(&add_weighted(&large, 1.2, &texture, 0.6, 0.0))
}

/// Size of the dodge blur: `(15 + (100 - detail) * 0.6)` scaled by the
/// image diagonal relative to [`REFERENCE_DIAGONAL`], at least 3, odd.
#[must_use]
pub fn dodge_blur_size(width: u32, height: u32, detail: Percent) -> u32 {
    let diagonal = f64::from(width).hypot(f64::from(height));
    let scale = diagonal / REFERENCE_DIAGONAL;
    let nominal = f64::from(detail.inverse()).mul_add(0.6, 15.0);
    // Non-negative and far below u32::MAX for any real image.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let size = (nominal * scale) as u32;
    let size = size.max(3);
    if size % 2 == 0 { size + 1 } else { size }
}

/// Generate the tone layer.
///
/// 1. Gamma 1.35 (truncated to 8 bits).
/// 2. Blur the inverse with [`dodge_blur_size`].
/// 3. Color-dodge: `gamma / max(255 - blur, 8) * 256`, clipped.
/// 4. Contrast stretch `|v * (1 + strength / 40) - 20|`.
/// 5. Clip highlights at 240.
#[must_use = "returns the tone layer"]
pub fn tone_sketch(gray: &GrayImage, detail: Percent, strength: Percent) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }

    let gamma = GrayImage::from_fn(w, h, |x, y| {
        let v = f32::from(gray.get_pixel(x, y).0[0]) / 255.0;
        Luma([saturate_trunc(v.powf(TONE_GAMMA) * 255.0)])
    });

    let blurred = Gaussian::ksize(dodge_blur_size(w, h, detail)).blur(&invert(&gamma));

    let dodged = GrayImage::from_fn(w, h, |x, y| {
        let denominator = (255 - blurred.get_pixel(x, y).0[0]).max(MIN_DODGE_DENOMINATOR);
        let v = f32::from(gamma.get_pixel(x, y).0[0]) / f32::from(denominator) * 256.0;
        Luma([saturate_trunc(v)])
    });

    let alpha = 1.0 + strength.as_f32() / 40.0;
    let mut tone = convert_scale_abs(&dodged, alpha, -20.0);
    for p in tone.pixels_mut() {
        p.0[0] = p.0[0].min(HIGHLIGHT_CEILING);
    }
    tone
}
