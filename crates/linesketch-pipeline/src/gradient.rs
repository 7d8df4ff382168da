//! Image derivatives: multi-size Sobel gradients and the Laplacian.

use std::f32::consts::TAU;

use image::GrayImage;

use crate::arith::convert_scale_abs_f32;
use crate::border::{BorderMode, map_index};
use crate::kernel::{correlate_separable, sobel_kernels};
use crate::types::FloatImage;

/// Horizontal and vertical first derivatives.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    /// d/dx.
    pub gx: FloatImage,
    /// d/dy.
    pub gy: FloatImage,
}

impl Gradient {
    /// Sobel derivatives with an odd kernel size (3, 5, 9, ...).
    ///
    /// Responses are unnormalised, so larger kernels produce larger
    /// magnitudes for the same edge.
    #[must_use]
    pub fn sobel(image: &FloatImage, ksize: u32) -> Self {
        let (deriv, smooth) = sobel_kernels(ksize);
        Self {
            gx: correlate_separable(image, &deriv, &smooth, BorderMode::Reflect101),
            gy: correlate_separable(image, &smooth, &deriv, BorderMode::Reflect101),
        }
    }

    /// `hypot(gx, gy)` per pixel.
    #[must_use]
    pub fn magnitude(&self) -> FloatImage {
        FloatImage::from_fn(self.gx.width(), self.gx.height(), |x, y| {
            image::Luma([self.gx.get_pixel(x, y).0[0].hypot(self.gy.get_pixel(x, y).0[0])])
        })
    }

    /// Gradient direction in radians, in `[0, 2*pi)`.
    #[must_use]
    pub fn angle(&self) -> FloatImage {
        FloatImage::from_fn(self.gx.width(), self.gx.height(), |x, y| {
            let a = self.gy.get_pixel(x, y).0[0].atan2(self.gx.get_pixel(x, y).0[0]);
            let a = if a < 0.0 { a + TAU } else { a };
            image::Luma([if a >= TAU { 0.0 } else { a }])
        })
    }
}

/// 4-neighbour Laplacian (`[0 1 0; 1 -4 1; 0 1 0]`) with reflect-101
/// borders.
#[must_use]
pub fn laplacian(image: &GrayImage) -> FloatImage {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let at = |x: isize, y: isize| -> f32 {
        let xi = map_index(x, w, BorderMode::Reflect101).unwrap_or(0);
        let yi = map_index(y, h, BorderMode::Reflect101).unwrap_or(0);
        f32::from(image.as_raw()[yi * w + xi])
    };
    FloatImage::from_fn(image.width(), image.height(), |x, y| {
        let (x, y) = (x as isize, y as isize);
        image::Luma([
            at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y),
        ])
    })
}

/// `|laplacian(image)|` saturated to 8 bits: the "focus" measure the
/// style generators threshold.
#[must_use]
pub fn laplacian_abs(image: &GrayImage) -> GrayImage {
    convert_scale_abs_f32(&laplacian(image), 1.0, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arith::to_float;

    fn sobel_magnitude(image: &GrayImage, ksize: u32) -> FloatImage {
        Gradient::sobel(&to_float(image), ksize).magnitude()
    }

    fn vertical_edge() -> GrayImage {
        GrayImage::from_fn(12, 12, |x, _| image::Luma([if x < 6 { 0 } else { 200 }]))
    }

    #[test]
    fn sobel_detects_vertical_edge_direction() {
        let g = Gradient::sobel(&to_float(&vertical_edge()), 3);
        let gx = g.gx.get_pixel(6, 6).0[0];
        let gy = g.gy.get_pixel(6, 6).0[0];
        assert!((gx - 800.0).abs() < 1e-3, "expected 4*200, got {gx}");
        assert!(gy.abs() < 1e-3);
        let angle = g.angle().get_pixel(6, 6).0[0];
        assert!(angle.abs() < 1e-6, "edge pointing +x has angle 0, got {angle}");
    }

    #[test]
    fn angle_is_non_negative() {
        let image = GrayImage::from_fn(12, 12, |x, y| image::Luma([if x + y < 12 { 200 } else { 0 }]));
        let angles = Gradient::sobel(&to_float(&image), 3).angle();
        assert!(angles.pixels().all(|p| (0.0..TAU).contains(&p.0[0])));
    }

    #[test]
    fn larger_kernels_respond_more_strongly() {
        let image = vertical_edge();
        let m3 = sobel_magnitude(&image, 3).get_pixel(6, 6).0[0];
        let m9 = sobel_magnitude(&image, 9).get_pixel(6, 6).0[0];
        assert!(m9 > m3, "expected unnormalised 9x9 response above 3x3, got {m9} vs {m3}");
    }

    #[test]
    fn flat_image_has_zero_gradient() {
        let image = GrayImage::from_pixel(10, 10, image::Luma([90]));
        assert!(sobel_magnitude(&image, 5).pixels().all(|p| p.0[0] == 0.0));
        assert!(laplacian_abs(&image).pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn laplacian_peaks_on_isolated_dot() {
        let mut image = GrayImage::new(5, 5);
        image.put_pixel(2, 2, image::Luma([10]));
        let lap = laplacian_abs(&image);
        assert_eq!(lap.get_pixel(2, 2).0[0], 40);
        assert_eq!(lap.get_pixel(1, 2).0[0], 10);
        assert_eq!(lap.get_pixel(0, 0).0[0], 0);
    }
}
