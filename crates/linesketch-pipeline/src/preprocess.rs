//! Preparing the working image for the style generators.

use std::fmt;

use image::{GrayImage, RgbImage};

use crate::grayscale::to_gray;
use crate::saliency::{MaskCache, NoSaliency, SaliencyProvider, flatten_background};
use crate::tone::{needs_tone_reconstruction, reconstruct_tone};
use crate::types::FloatImage;

/// The working-resolution grayscale image plus the saliency mask it was
/// flattened with, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    /// Input of the style generators.
    pub gray: GrayImage,
    /// Foreground probability in `[0, 1]` at the working resolution.
    pub mask: Option<FloatImage>,
}

/// Owns the saliency provider and the mask cache.
///
/// The cache is the only state kept between runs: preparing the same
/// working image twice infers its mask once.
pub struct Preprocessor {
    provider: Box<dyn SaliencyProvider>,
    cache: MaskCache,
}

impl Preprocessor {
    /// A preprocessor backed by `provider`.
    #[must_use]
    pub fn new(provider: impl SaliencyProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            cache: MaskCache::new(),
        }
    }

    /// Gray conversion, then background flattening (when isolation is on
    /// and a mask is available), then tone reconstruction of flat inputs.
    #[must_use = "returns the prepared image"]
    pub fn prepare(&mut self, working: &RgbImage, subject_isolation: bool) -> PreparedImage {
        let mut gray = to_gray(working);

        let mask = if subject_isolation {
            self.cache.get_or_infer(working, self.provider.as_ref())
        } else {
            None
        };
        if let Some(mask) = &mask {
            log::debug!("flattening background with saliency mask");
            gray = flatten_background(&gray, mask);
        }

        if needs_tone_reconstruction(&gray) {
            log::debug!("low contrast input; reconstructing tone");
            gray = reconstruct_tone(&gray);
        }

        PreparedImage { gray, mask }
    }

    /// Forget the cached mask, e.g. when a new photo is loaded.
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    /// The mask cache.
    #[must_use]
    pub const fn cache(&self) -> &MaskCache {
        &self.cache
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(NoSaliency)
    }
}

impl fmt::Debug for Preprocessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preprocessor")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
