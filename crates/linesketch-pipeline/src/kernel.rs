//! 1-D kernels and separable correlation.
//!
//! Kernel construction matches the classic OpenCV derivation so tuned
//! parameters (a 9x9 angle smoothing, a sigma-25 lighting estimate, ...)
//! produce the same smoothing footprint.

use crate::border::{BorderMode, tap_table};
use crate::types::FloatImage;

/// Coerce a kernel size to the nearest odd integer at least `min`,
/// rounding even sizes up.
#[must_use]
pub const fn odd_ksize(k: u32, min: u32) -> u32 {
    let k = if k < min { min } else { k };
    if k % 2 == 0 { k + 1 } else { k }
}

/// Pre-computed binomial Gaussian kernels used when no sigma is given.
const SMALL_GAUSSIAN_TABLES: [&[f32]; 4] = [
    &[1.0],
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[
        0.031_25, 0.109_375, 0.218_75, 0.281_25, 0.218_75, 0.109_375, 0.031_25,
    ],
];

/// Sigma implied by a kernel size when none is given.
#[must_use]
pub fn sigma_for_ksize(ksize: u32) -> f64 {
    0.3 * (f64::from(ksize.saturating_sub(1)) * 0.5 - 1.0) + 0.8
}

/// Kernel size implied by a sigma when none is given.
///
/// `float_source` selects the wider `8 sigma` footprint used for float
/// rasters instead of the `6 sigma` footprint used for 8-bit ones.
#[must_use]
pub fn ksize_for_sigma(sigma: f64, float_source: bool) -> u32 {
    let per_side = if float_source { 4.0 } else { 3.0 };
    // Sigmas in this crate are small positive constants.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let k = (sigma * per_side).mul_add(2.0, 1.0).round().max(1.0) as u32;
    k | 1
}

/// Normalised Gaussian kernel of `ksize` taps.
///
/// `sigma <= 0` derives sigma from the size, and for sizes up to 7 uses
/// the fixed binomial tables instead.
#[must_use]
pub fn gaussian_kernel(ksize: u32, sigma: f64) -> Vec<f32> {
    let ksize = odd_ksize(ksize, 1);
    if sigma <= 0.0 && ksize <= 7 {
        return SMALL_GAUSSIAN_TABLES[(ksize / 2) as usize].to_vec();
    }
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        sigma_for_ksize(ksize)
    };
    let centre = f64::from(ksize / 2);
    let scale = -0.5 / (sigma * sigma);
    let raw: Vec<f64> = (0..ksize)
        .map(|i| {
            let x = f64::from(i) - centre;
            (scale * x * x).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    #[allow(clippy::cast_possible_truncation)]
    raw.iter().map(|v| (v / sum) as f32).collect()
}

/// Row `taps - 1` of Pascal's triangle.
fn binomial(taps: usize) -> Vec<f32> {
    let mut row = vec![1.0_f32];
    for _ in 1..taps {
        let mut next = vec![0.0; row.len() + 1];
        for (i, v) in row.iter().enumerate() {
            next[i] += v;
            next[i + 1] += v;
        }
        row = next;
    }
    row
}

/// First-derivative Sobel kernel pair `(derivative, smoothing)` for an
/// odd size of at least 3.
///
/// The derivative kernel is `binomial(k - 2)` correlated with
/// `[-1, 0, 1]`; the smoothing kernel is `binomial(k)`. Neither is
/// normalised.
#[must_use]
pub fn sobel_kernels(ksize: u32) -> (Vec<f32>, Vec<f32>) {
    let k = odd_ksize(ksize, 3) as usize;
    let base = binomial(k - 2);
    let mut deriv = vec![0.0_f32; k];
    for (i, v) in base.iter().enumerate() {
        deriv[i] -= v;
        deriv[i + 2] += v;
    }
    (deriv, binomial(k))
}

/// Separable correlation: `kx` across each row, then `ky` down each
/// column.
#[must_use]
pub fn correlate_separable(
    image: &FloatImage,
    kx: &[f32],
    ky: &[f32],
    border: BorderMode,
) -> FloatImage {
    let (w, h) = (image.width() as usize, image.height() as usize);
    if w == 0 || h == 0 {
        return image.clone();
    }
    let src = image.as_raw();

    let xs = tap_table(w, kx.len(), border);
    let mut rows = vec![0.0_f32; w * h];
    for y in 0..h {
        let line = &src[y * w..(y + 1) * w];
        for x in 0..w {
            let taps = &xs[x * kx.len()..(x + 1) * kx.len()];
            rows[y * w + x] = taps.iter().zip(kx).map(|(&i, &k)| line[i] * k).sum();
        }
    }

    let ys = tap_table(h, ky.len(), border);
    let mut out = vec![0.0_f32; w * h];
    for y in 0..h {
        let taps = &ys[y * ky.len()..(y + 1) * ky.len()];
        for (&sy, &k) in taps.iter().zip(ky) {
            let line = &rows[sy * w..(sy + 1) * w];
            for (o, &v) in out[y * w..(y + 1) * w].iter_mut().zip(line) {
                *o += v * k;
            }
        }
    }

    FloatImage::from_raw(image.width(), image.height(), out).unwrap_or_else(|| image.clone())
}
