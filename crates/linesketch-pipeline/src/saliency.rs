//! Subject isolation with an optional saliency mask.
//!
//! The mask comes from an external model behind [`SaliencyProvider`].
//! Inference is expensive, so masks are memoised in a [`MaskCache`]
//! keyed by a sparse content fingerprint plus the image dimensions.

use std::hash::Hasher;

use image::{GrayImage, Luma, RgbImage};

use crate::arith::saturate_trunc;
use crate::blur::Gaussian;
use crate::downsample::resize_float;
use crate::types::FloatImage;

/// A foreground-probability model.
///
/// Implementations return a mask with values in `[0, 1]`, or `None` when
/// the model is unavailable. Masks of another size are resized; values
/// outside `[0, 1]` are clamped.
pub trait SaliencyProvider {
    /// Estimate the foreground probability of every pixel.
    fn infer(&self, image: &RgbImage) -> Option<FloatImage>;
}

/// The provider used when no model is installed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoSaliency;

impl SaliencyProvider for NoSaliency {
    fn infer(&self, _image: &RgbImage) -> Option<FloatImage> {
        None
    }
}

impl<F> SaliencyProvider for F
where
    F: Fn(&RgbImage) -> Option<FloatImage>,
{
    fn infer(&self, image: &RgbImage) -> Option<FloatImage> {
        self(image)
    }
}

/// SipHash of the pixels on a sparse grid: every `max(h / 4, 1)`-th row
/// and `max(w / 4, 1)`-th column.
#[must_use]
pub fn fingerprint(image: &RgbImage) -> u64 {
    let (w, h) = image.dimensions();
    let row_step = (h / 4).max(1) as usize;
    let col_step = (w / 4).max(1) as usize;
    let mut hasher = siphasher::sip::SipHasher13::new();
    for y in (0..h).step_by(row_step) {
        for x in (0..w).step_by(col_step) {
            hasher.write(&image.get_pixel(x, y).0);
        }
    }
    hasher.finish()
}

/// Identity of an image for caching purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaskKey {
    /// Sparse content hash from [`fingerprint`].
    pub fingerprint: u64,
    /// Image width.
    pub width: u32,
    /// Image height.
    pub height: u32,
}

impl MaskKey {
    /// Key for `image`.
    #[must_use]
    pub fn of(image: &RgbImage) -> Self {
        Self {
            fingerprint: fingerprint(image),
            width: image.width(),
            height: image.height(),
        }
    }
}

/// Single-entry cache of the most recent saliency mask.
#[derive(Debug, Clone, Default)]
pub struct MaskCache {
    entry: Option<(MaskKey, FloatImage)>,
}

impl MaskCache {
    /// An empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self { entry: None }
    }

    /// The cached mask for `image`, inferring (and caching) it on a miss.
    ///
    /// A provider that returns `None` leaves the cache empty, so a later
    /// call retries.
    pub fn get_or_infer(
        &mut self,
        image: &RgbImage,
        provider: &dyn SaliencyProvider,
    ) -> Option<FloatImage> {
        let key = MaskKey::of(image);
        if let Some((cached, mask)) = &self.entry
            && *cached == key
        {
            log::debug!("saliency cache hit ({:016x})", key.fingerprint);
            return Some(mask.clone());
        }

        let Some(raw) = provider.infer(image) else {
            log::warn!("saliency model unavailable; continuing without subject isolation");
            self.entry = None;
            return None;
        };
        let mask = conform_mask(&raw, image.width(), image.height());
        self.entry = Some((key, mask.clone()));
        Some(mask)
    }

    /// Drop the cached mask.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Whether a mask is cached.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}

/// Resize to `width x height` and clamp to `[0, 1]`.
fn conform_mask(mask: &FloatImage, width: u32, height: u32) -> FloatImage {
    let mut out = resize_float(mask, width, height);
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0].is_nan() { 0.0 } else { p.0[0].clamp(0.0, 1.0) };
    }
    out
}

/// Replace the background with a blurred copy of itself:
/// `gray * m + blur(gray, sigma 5) * (1 - m)`, truncated.
#[must_use = "returns the flattened image"]
pub fn flatten_background(gray: &GrayImage, mask: &FloatImage) -> GrayImage {
    let background = Gaussian::sigma(5.0).blur(gray);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let m = mask.get_pixel(x, y).0[0].clamp(0.0, 1.0);
        let fg = f32::from(gray.get_pixel(x, y).0[0]);
        let bg = f32::from(background.get_pixel(x, y).0[0]);
        Luma([saturate_trunc(fg.mul_add(m, bg * (1.0 - m)))])
    })
}

/// The `mask > 0.5` binarisation used for the final composite.
#[must_use]
pub fn binarize(mask: &FloatImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([u8::from(mask.get_pixel(x, y).0[0] > 0.5)])
    })
}

/// Composite the sketch foreground over a cleaned background.
///
/// `mask` holds foreground weights (any 8-bit values; anything above 1
/// counts as fully foreground). With `clean < 100` the background is the
/// sketch faded toward white by `clean / 100`; at `clean >= 100` it is
/// pure white. The faded background is truncated to 8 bits before the
/// result `sketch * m + background * (1 - m)` is formed.
///
/// A mask of another size leaves the sketch unchanged.
#[must_use = "returns the composited sketch"]
pub fn apply_saliency_mask(sketch: &GrayImage, mask: &GrayImage, clean: u32) -> GrayImage {
    if mask.dimensions() != sketch.dimensions() {
        log::warn!(
            "saliency mask is {:?} but the sketch is {:?}; skipping subject isolation",
            mask.dimensions(),
            sketch.dimensions()
        );
        return sketch.clone();
    }
    // `clean` is at most a percentage.
    #[allow(clippy::cast_precision_loss)]
    let fade = (clean.min(100) as f32) / 100.0;
    GrayImage::from_fn(sketch.width(), sketch.height(), |x, y| {
        let m = f32::from(mask.get_pixel(x, y).0[0]).min(1.0);
        let s = f32::from(sketch.get_pixel(x, y).0[0]);
        let background = if clean < 100 {
            f32::from(saturate_trunc(s.mul_add(1.0 - fade, 255.0 * fade)))
        } else {
            255.0
        };
        Luma([saturate_trunc(s.mul_add(m, background * (1.0 - m)))])
    })
}
