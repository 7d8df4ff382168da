//! Gaussian and bilateral smoothing.
//!
//! [`Gaussian`] is a separable blur described either by a kernel size
//! (sigma derived from it) or by a sigma (size derived from it), the two
//! ways every smoothing step in the sketch pipeline is tuned.
//! [`bilateral_filter`] is the edge-preserving smoother used by the
//! style generators and the background clean pass.

use image::{GrayImage, Luma};

use crate::arith::{saturate_round, to_float, to_gray_round};
use crate::border::{BorderMode, tap_table};
use crate::kernel::{correlate_separable, gaussian_kernel, ksize_for_sigma, odd_ksize};
use crate::types::FloatImage;

/// A separable Gaussian blur.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    /// Kernel size; `0` derives it from `sigma`.
    ksize: u32,
    /// Standard deviation; `<= 0` derives it from `ksize`.
    sigma: f64,
    border: BorderMode,
}

impl Gaussian {
    /// Blur with the given sigma and a size derived from it.
    #[must_use]
    pub const fn sigma(sigma: f64) -> Self {
        Self {
            ksize: 0,
            sigma,
            border: BorderMode::Reflect101,
        }
    }

    /// Blur with a square kernel of the given size (coerced odd, at least
    /// 3) and a sigma derived from it.
    #[must_use]
    pub const fn ksize(ksize: u32) -> Self {
        Self {
            ksize: odd_ksize(ksize, 3),
            sigma: 0.0,
            border: BorderMode::Reflect101,
        }
    }

    /// Use a different border mode (the default is reflect-101).
    #[must_use]
    pub const fn with_border(mut self, border: BorderMode) -> Self {
        self.border = border;
        self
    }

    /// Resolved kernel size for a source of the given depth, or `None`
    /// when neither size nor sigma is usable.
    fn resolved_ksize(&self, float_source: bool) -> Option<u32> {
        if self.ksize > 0 {
            Some(self.ksize)
        } else if self.sigma > 0.0 {
            Some(ksize_for_sigma(self.sigma, float_source))
        } else {
            None
        }
    }

    /// Blur an 8-bit image, rounding back to 8 bits.
    #[must_use = "returns the blurred image"]
    pub fn blur(&self, image: &GrayImage) -> GrayImage {
        let Some(ksize) = self.resolved_ksize(false) else {
            return image.clone();
        };
        let kernel = gaussian_kernel(ksize, self.sigma);
        to_gray_round(&correlate_separable(
            &to_float(image),
            &kernel,
            &kernel,
            self.border,
        ))
    }

    /// Blur a float image.
    #[must_use = "returns the blurred image"]
    pub fn blur_f32(&self, image: &FloatImage) -> FloatImage {
        let Some(ksize) = self.resolved_ksize(true) else {
            return image.clone();
        };
        let kernel = gaussian_kernel(ksize, self.sigma);
        correlate_separable(image, &kernel, &kernel, self.border)
    }
}

/// Edge-preserving bilateral filter over a circular window.
///
/// `diameter <= 0` derives the radius as `round(1.5 * sigma_space)`.
/// Each neighbour is weighted by its spatial distance and by its
/// intensity difference from the centre pixel. Borders reflect-101.
#[must_use = "returns the filtered image"]
pub fn bilateral_filter(
    image: &GrayImage,
    diameter: i32,
    sigma_color: f64,
    sigma_space: f64,
) -> GrayImage {
    let (w, h) = (image.width() as usize, image.height() as usize);
    if w == 0 || h == 0 {
        return image.clone();
    }
    let sigma_color = if sigma_color > 0.0 { sigma_color } else { 1.0 };
    let sigma_space = if sigma_space > 0.0 { sigma_space } else { 1.0 };

    // Both branches produce small positive radii.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let radius = if diameter <= 0 {
        (sigma_space * 1.5).round() as usize
    } else {
        (diameter / 2) as usize
    }
    .max(1);

    let space_coeff = -0.5 / (sigma_space * sigma_space);
    let color_coeff = -0.5 / (sigma_color * sigma_color);
    #[allow(clippy::cast_possible_truncation)]
    let color_weight: Vec<f32> = (0..256)
        .map(|d| (f64::from(d * d) * color_coeff).exp() as f32)
        .collect();

    // (dx, dy, spatial weight) for every offset inside the circle.
    let taps = 2 * radius + 1;
    let mut offsets = Vec::new();
    for j in 0..taps {
        for i in 0..taps {
            #[allow(clippy::cast_precision_loss)]
            let (dx, dy) = (i as f64 - radius as f64, j as f64 - radius as f64);
            let r2 = dx.mul_add(dx, dy * dy);
            #[allow(clippy::cast_precision_loss)]
            if r2.sqrt() > radius as f64 {
                continue;
            }
            #[allow(clippy::cast_possible_truncation)]
            offsets.push((i, j, (r2 * space_coeff).exp() as f32));
        }
    }

    let xs = tap_table(w, taps, BorderMode::Reflect101);
    let ys = tap_table(h, taps, BorderMode::Reflect101);
    let src = image.as_raw();

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let (x, y) = (x as usize, y as usize);
        let centre = src[y * w + x];
        let (mut sum, mut norm) = (0.0_f32, 0.0_f32);
        for &(i, j, ws) in &offsets {
            let v = src[ys[y * taps + j] * w + xs[x * taps + i]];
            let weight = ws * color_weight[usize::from(v.abs_diff(centre))];
            sum += weight * f32::from(v);
            norm += weight;
        }
        Luma([saturate_round(sum / norm)])
    })
}
