//! Post-blend adjustments applied to the finished sketch.

use image::GrayImage;

use crate::arith::convert_scale_abs;
use crate::morphology::{dilate_mut, open_mut};
use crate::threshold::binary_threshold;
use crate::types::Adjustments;

impl Adjustments {
    /// Apply the non-zero adjustments in order: ink, comic, logo, minimal.
    ///
    /// - ink: `|v * (1 + ink / 40) - ink|`
    /// - comic: max filter of size `1 + comic / 20`
    /// - logo: binary threshold at `180 - logo`
    /// - minimal: open with size `1 + minimal / 25`
    #[must_use = "returns the adjusted sketch"]
    pub fn apply(&self, sketch: &GrayImage) -> GrayImage {
        let mut image = sketch.clone();
        if self.is_identity() {
            return image;
        }

        let ink = self.ink.get();
        if ink > 0 {
            image = convert_scale_abs(&image, 1.0 + self.ink.as_f32() / 40.0, -self.ink.as_f32());
        }
        let comic = self.comic.get();
        if comic > 0 {
            dilate_mut(&mut image, 1 + comic / 20);
        }
        let logo = self.logo.get();
        if logo > 0 {
            // logo <= 100, so the threshold stays in 80..=179.
            let threshold = u8::try_from(180 - logo).unwrap_or(u8::MAX);
            image = binary_threshold(&image, threshold);
        }
        let minimal = self.minimal.get();
        if minimal > 0 {
            open_mut(&mut image, 1 + minimal / 25, 1);
        }

        log::debug!(
            "adjustments: ink {ink}, comic {comic}, logo {logo}, minimal {minimal}"
        );
        image
    }
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;
    use crate::types::Percent;

    fn sample() -> GrayImage {
        GrayImage::from_fn(30, 30, |x, y| Luma([((x * 8 + y * 3) % 256) as u8]))
    }

    #[test]
    fn zero_adjustments_are_identity() {
        let image = sample();
        assert_eq!(Adjustments::default().apply(&image), image);
    }

    #[test]
    fn logo_binarizes() {
        let adjustments = Adjustments {
            logo: Percent::new(30),
            ..Adjustments::default()
        };
        let out = adjustments.apply(&sample());
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        let image = sample();
        for (a, b) in image.pixels().zip(out.pixels()) {
            assert_eq!(b.0[0] == 255, a.0[0] > 150);
        }
    }

    #[test]
    fn ink_darkens_midtones() {
        let image = GrayImage::from_pixel(4, 4, Luma([40]));
        let adjustments = Adjustments {
            ink: Percent::new(40),
            ..Adjustments::default()
        };
        // 40 * 2 - 40
        assert_eq!(adjustments.apply(&image).get_pixel(0, 0).0[0], 40);
        let bright = GrayImage::from_pixel(4, 4, Luma([200]));
        assert_eq!(adjustments.apply(&bright).get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn comic_thins_dark_strokes() {
        let mut image = GrayImage::from_pixel(20, 20, Luma([255]));
        for y in 0..20 {
            image.put_pixel(10, y, Luma([0]));
        }
        let adjustments = Adjustments {
            comic: Percent::new(40),
            ..Adjustments::default()
        };
        let out = adjustments.apply(&image);
        assert!(out.pixels().all(|p| p.0[0] == 255), "a 1px stroke vanishes under a 3x3 max");
    }

    #[test]
    fn minimal_removes_specks() {
        let mut image = GrayImage::new(20, 20);
        image.put_pixel(5, 5, Luma([255]));
        let adjustments = Adjustments {
            minimal: Percent::new(50),
            ..Adjustments::default()
        };
        assert_eq!(adjustments.apply(&image).get_pixel(5, 5).0[0], 0);
    }
}
