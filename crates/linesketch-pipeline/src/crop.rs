//! Automatic removal of flat scanner borders.
//!
//! The content box is the bounding box of the Canny edges of a lightly
//! blurred grayscale copy. A box covering nearly the whole image means
//! there is no frame to strip, and the photo is kept as is.

use image::RgbImage;

use crate::blur::Gaussian;
use crate::edge::{canny, nonzero_bounds};
use crate::grayscale::to_gray;

/// Pixels of margin kept around the detected content.
pub const CROP_PADDING: u32 = 4;

/// Content boxes larger than this fraction of the image are not cropped.
pub const MAX_CONTENT_FRACTION: f64 = 0.97;

const CANNY_LOW: f32 = 20.0;
const CANNY_HIGH: f32 = 80.0;

/// Crop rectangle `(x, y, width, height)` for `image`, or `None` when the
/// image should be kept whole.
#[must_use]
pub fn content_bounds(image: &RgbImage) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let blurred = Gaussian::ksize(5).blur(&to_gray(image));
    let (bx, by, bw, bh) = nonzero_bounds(&canny(&blurred, CANNY_LOW, CANNY_HIGH))?;

    let covered = f64::from(bw) * f64::from(bh);
    if covered > MAX_CONTENT_FRACTION * f64::from(w) * f64::from(h) {
        return None;
    }

    let x = bx.saturating_sub(CROP_PADDING);
    let y = by.saturating_sub(CROP_PADDING);
    let cw = (bw + 2 * CROP_PADDING).min(w - x);
    let ch = (bh + 2 * CROP_PADDING).min(h - y);
    Some((x, y, cw, ch))
}

/// Strip a flat frame around the photographed content.
///
/// Returns the image unchanged when no edges are found or when the edges
/// already span more than [`MAX_CONTENT_FRACTION`] of the area.
#[must_use = "returns the cropped image"]
pub fn auto_crop(image: &RgbImage) -> RgbImage {
    match content_bounds(image) {
        Some((x, y, w, h)) => {
            log::debug!(
                "auto-crop {}x{} to {w}x{h} at ({x}, {y})",
                image.width(),
                image.height()
            );
            image::imageops::crop_imm(image, x, y, w, h).to_image()
        }
        None => image.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// A textured photo region on a flat white frame.
    fn framed(width: u32, height: u32, inner: (u32, u32, u32, u32)) -> RgbImage {
        let (ix, iy, iw, ih) = inner;
        RgbImage::from_fn(width, height, |x, y| {
            let inside = (ix..ix + iw).contains(&x) && (iy..iy + ih).contains(&y);
            if !inside {
                return Rgb([255, 255, 255]);
            }
            // Coarse checkerboard so edges exist inside the content too.
            let v = if ((x - ix) / 8 + (y - iy) / 8) % 2 == 0 { 30 } else { 140 };
            Rgb([v, v, v])
        })
    }

    #[test]
    fn flat_image_is_unchanged() {
        let image = RgbImage::from_pixel(50, 40, Rgb([128, 128, 128]));
        assert_eq!(auto_crop(&image), image);
    }

    #[test]
    fn frame_is_removed_with_padding() {
        let image = framed(120, 100, (30, 20, 48, 40));
        let cropped = auto_crop(&image);
        let (w, h) = cropped.dimensions();
        assert!(w < 120 && h < 100, "expected a crop, got {w}x{h}");
        assert!((48..=48 + 2 * CROP_PADDING + 4).contains(&w), "width {w}");
        assert!((40..=40 + 2 * CROP_PADDING + 4).contains(&h), "height {h}");
    }

    #[test]
    fn full_bleed_content_is_unchanged() {
        // Two thick diagonals running corner to corner.
        let image = RgbImage::from_fn(200, 200, |x, y| {
            let (x, y) = (i64::from(x), i64::from(y));
            let on_line = (x - y).abs() < 3 || (x + y - 199).abs() < 3;
            if on_line { Rgb([20, 20, 20]) } else { Rgb([235, 235, 235]) }
        });
        assert!(content_bounds(&image).is_none());
        assert_eq!(auto_crop(&image), image);
    }

    #[test]
    fn crop_is_idempotent_once_frame_is_gone() {
        let image = framed(160, 120, (40, 30, 64, 48));
        let once = auto_crop(&image);
        let twice = auto_crop(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_image_is_unchanged() {
        let image = RgbImage::new(0, 0);
        assert_eq!(auto_crop(&image).dimensions(), (0, 0));
    }
}
