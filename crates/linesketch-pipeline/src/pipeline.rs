//! Staged pipeline: advance one step at a time, inspecting each
//! intermediate before continuing.
//!
//! ```rust
//! # use linesketch_pipeline::{Pipeline, Preprocessor, SketchConfig, SketchError};
//! # fn run(bytes: Vec<u8>) -> Result<(), SketchError> {
//! let mut preprocessor = Preprocessor::default();
//! let result = Pipeline::new(bytes, SketchConfig::default())
//!     .decode()?
//!     .crop()
//!     .downsample()
//!     .prepare(&mut preprocessor)
//!     .generate()
//!     .blend()
//!     .finish();
//! # let _ = result;
//! # Ok(())
//! # }
//! ```
//!
//! Each stage consumes `self` and carries the intermediates forward, so
//! stages cannot be skipped or reordered. [`process`] and [`process_with`]
//! run every stage in one call.

use image::{GrayImage, RgbImage};

use crate::blend::{blend, clean_background};
use crate::crop::auto_crop;
use crate::downsample::{resize_for_processing, upscale_linear, upscale_nearest};
use crate::preprocess::{PreparedImage, Preprocessor};
use crate::saliency::{apply_saliency_mask, binarize};
use crate::style::SketchStyle;
use crate::types::{Dimensions, FloatImage, Layers, SketchConfig, SketchError};

/// Everything a finished run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct SketchResult {
    /// The decoded photo, before cropping.
    pub original: RgbImage,
    /// The prepared grayscale image at the working resolution.
    pub gray: GrayImage,
    /// Tone layer at the working resolution.
    pub tone: GrayImage,
    /// Line layer at the output resolution (dark strokes on white).
    pub line: GrayImage,
    /// The finished sketch at the output resolution.
    pub sketch: GrayImage,
    /// Output resolution: the size of the cropped photo.
    pub dimensions: Dimensions,
    /// Working resolution divided by output resolution.
    pub scale: f64,
}

/// Entry point of the staged pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Store the source bytes and config without processing anything.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: SketchConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
        }
    }
}

/// Before decoding.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
#[derive(Debug)]
pub struct Pending {
    config: SketchConfig,
    source: Vec<u8>,
}

impl Pending {
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Decode the source bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SketchError::EmptyInput`] for empty bytes and
    /// [`SketchError::ImageDecode`] for unrecognised or corrupt data.
    pub fn decode(self) -> Result<Decoded, SketchError> {
        let original = crate::grayscale::decode(&self.source)?;
        log::debug!(
            "decoded {} bytes to {}x{}",
            self.source.len(),
            original.width(),
            original.height()
        );
        Ok(Decoded {
            config: self.config,
            source_len: self.source.len(),
            original,
        })
    }
}

/// After decoding.
#[must_use = "pipeline stages are consumed by advancing; call .crop() to continue"]
#[derive(Debug)]
pub struct Decoded {
    config: SketchConfig,
    source_len: usize,
    original: RgbImage,
}

impl Decoded {
    #[must_use]
    pub const fn original(&self) -> &RgbImage {
        &self.original
    }

    /// Size of the source bytes.
    #[must_use]
    pub const fn source_len(&self) -> usize {
        self.source_len
    }

    /// Strip a flat frame around the content.
    pub fn crop(self) -> Cropped {
        let cropped = auto_crop(&self.original);
        Cropped {
            config: self.config,
            original: self.original,
            cropped,
        }
    }
}

/// After auto-crop.
#[must_use = "pipeline stages are consumed by advancing; call .downsample() to continue"]
#[derive(Debug)]
pub struct Cropped {
    config: SketchConfig,
    original: RgbImage,
    cropped: RgbImage,
}

impl Cropped {
    #[must_use]
    pub const fn cropped(&self) -> &RgbImage {
        &self.cropped
    }

    /// Whether the crop removed anything.
    #[must_use]
    pub fn applied(&self) -> bool {
        self.cropped.dimensions() != self.original.dimensions()
    }

    /// Shrink to the working resolution.
    pub fn downsample(self) -> Downsampled {
        let scaled = resize_for_processing(
            &self.cropped,
            self.config.effective_max_side(),
            self.config.downsample_filter,
        );
        Downsampled {
            config: self.config,
            original: self.original,
            output: Dimensions::of(&self.cropped),
            working: scaled.image,
            scale: scaled.scale,
        }
    }
}

/// At the working resolution.
#[must_use = "pipeline stages are consumed by advancing; call .prepare() to continue"]
#[derive(Debug)]
pub struct Downsampled {
    config: SketchConfig,
    original: RgbImage,
    output: Dimensions,
    working: RgbImage,
    scale: f64,
}

impl Downsampled {
    #[must_use]
    pub const fn working(&self) -> &RgbImage {
        &self.working
    }

    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// Grayscale, optional background flattening and tone rescue.
    pub fn prepare(self, preprocessor: &mut Preprocessor) -> Prepared {
        let PreparedImage { gray, mask } =
            preprocessor.prepare(&self.working, self.config.subject_isolation);
        Prepared {
            config: self.config,
            original: self.original,
            output: self.output,
            scale: self.scale,
            gray,
            mask,
        }
    }
}

/// After preparation.
#[must_use = "pipeline stages are consumed by advancing; call .generate() to continue"]
#[derive(Debug)]
pub struct Prepared {
    config: SketchConfig,
    original: RgbImage,
    output: Dimensions,
    scale: f64,
    gray: GrayImage,
    mask: Option<FloatImage>,
}

impl Prepared {
    #[must_use]
    pub const fn gray(&self) -> &GrayImage {
        &self.gray
    }

    /// The saliency mask, when subject isolation found one.
    #[must_use]
    pub const fn mask(&self) -> Option<&FloatImage> {
        self.mask.as_ref()
    }

    /// Run the configured style generator.
    pub fn generate(self) -> Generated {
        let params = self.config.params;
        let layers = self
            .config
            .style
            .generate(&self.gray, params.detail, params.strength);
        Generated {
            config: self.config,
            original: self.original,
            output: self.output,
            scale: self.scale,
            gray: self.gray,
            mask: self.mask,
            layers,
        }
    }
}

/// After the style generator.
#[must_use = "pipeline stages are consumed by advancing; call .blend() to continue"]
#[derive(Debug)]
pub struct Generated {
    config: SketchConfig,
    original: RgbImage,
    output: Dimensions,
    scale: f64,
    gray: GrayImage,
    mask: Option<FloatImage>,
    layers: Layers,
}

impl Generated {
    #[must_use]
    pub const fn layers(&self) -> &Layers {
        &self.layers
    }

    /// Blend the layers and run the background clean pass.
    pub fn blend(self) -> Blended {
        let params = self.config.params;
        let mixed = blend(
            &self.layers.tone,
            &self.layers.line,
            self.config.mode,
            params.strength,
        );
        let sketch = clean_background(&mixed, params.clean);
        log::debug!(
            "blended ({} mode, clean {})",
            self.config.mode,
            params.clean
        );
        Blended {
            config: self.config,
            original: self.original,
            output: self.output,
            scale: self.scale,
            gray: self.gray,
            mask: self.mask,
            layers: self.layers,
            sketch,
        }
    }
}

/// After blending, still at the working resolution.
#[must_use = "pipeline stages are consumed by advancing; call .finish() to continue"]
#[derive(Debug)]
pub struct Blended {
    config: SketchConfig,
    original: RgbImage,
    output: Dimensions,
    scale: f64,
    gray: GrayImage,
    mask: Option<FloatImage>,
    layers: Layers,
    sketch: GrayImage,
}

impl Blended {
    #[must_use]
    pub const fn sketch(&self) -> &GrayImage {
        &self.sketch
    }

    /// Upscale to the output resolution, composite the saliency mask
    /// when there is one, then apply the adjustments.
    #[must_use = "returns the finished result"]
    pub fn finish(self) -> SketchResult {
        let Dimensions { width, height } = self.output;
        let mut sketch = upscale_linear(&self.sketch, width, height);
        let line = upscale_nearest(&self.layers.line, width, height);

        if let Some(mask) = &self.mask {
            let mask = upscale_nearest(&binarize(mask), width, height);
            sketch = apply_saliency_mask(&sketch, &mask, self.config.params.clean.get());
        }
        if !self.config.adjustments.is_identity() {
            sketch = self.config.adjustments.apply(&sketch);
        }
        log::debug!("finished {width}x{height} sketch");

        SketchResult {
            original: self.original,
            gray: self.gray,
            tone: self.layers.tone,
            line,
            sketch,
            dimensions: self.output,
            scale: self.scale,
        }
    }
}

/// Run every stage without a saliency model.
///
/// # Errors
///
/// Returns [`SketchError`] if the bytes cannot be decoded.
pub fn process(image_bytes: &[u8], config: &SketchConfig) -> Result<SketchResult, SketchError> {
    process_with(image_bytes, config, &mut Preprocessor::default())
}

/// Run every stage with an injected preprocessor (and so saliency
/// provider and mask cache).
///
/// # Errors
///
/// Returns [`SketchError`] if the bytes cannot be decoded.
pub fn process_with(
    image_bytes: &[u8],
    config: &SketchConfig,
    preprocessor: &mut Preprocessor,
) -> Result<SketchResult, SketchError> {
    Ok(Pipeline::new(image_bytes.to_vec(), config.clone())
        .decode()?
        .crop()
        .downsample()
        .prepare(preprocessor)
        .generate()
        .blend()
        .finish())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{Luma, Rgb};

    use super::*;
    use crate::grayscale::encode_png;
    use crate::style::StyleKind;

    fn png_bytes(image: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// A dark disc on a light gradient inside a thin dark rule, so the
    /// auto-crop keeps the whole frame.
    fn photo(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
            let d = (x as f32 - cx).hypot(y as f32 - cy);
            let rule = x < 2 || y < 2 || x >= width - 2 || y >= height - 2;
            let v = if rule {
                20
            } else if d < height as f32 / 3.0 {
                50
            } else {
                (150 + (x * 80 / width)) as u8
            };
            Rgb([v, v, v])
        })
    }

    #[test]
    fn empty_bytes_are_rejected() {
        let err = process(&[], &SketchConfig::default()).unwrap_err();
        assert!(matches!(err, SketchError::EmptyInput), "got {err:?}");
    }

    #[test]
    fn corrupt_bytes_are_rejected() {
        let err = process(b"not an image", &SketchConfig::default()).unwrap_err();
        assert!(matches!(err, SketchError::ImageDecode(_)), "got {err:?}");
    }

    #[test]
    fn staged_matches_one_shot() {
        let bytes = png_bytes(&photo(160, 120));
        let config = SketchConfig::default();
        let staged = Pipeline::new(bytes.clone(), config.clone())
            .decode()
            .unwrap()
            .crop()
            .downsample()
            .prepare(&mut Preprocessor::default())
            .generate()
            .blend()
            .finish();
        assert_eq!(staged, process(&bytes, &config).unwrap());
    }

    #[test]
    fn output_matches_cropped_size_while_generators_run_smaller() {
        let bytes = png_bytes(&photo(400, 300));
        let config = SketchConfig {
            max_side: 100,
            ..SketchConfig::default()
        };
        let result = process(&bytes, &config).unwrap();
        assert_eq!(result.dimensions, Dimensions { width: 400, height: 300 });
        assert_eq!(result.sketch.dimensions(), (400, 300));
        assert_eq!(result.line.dimensions(), (400, 300));
        assert_eq!(result.gray.dimensions(), (100, 75));
        assert!((result.scale - 0.25).abs() < 1e-9);
    }

    #[test]
    fn every_style_runs_end_to_end() {
        let bytes = png_bytes(&photo(96, 72));
        for style in StyleKind::ALL {
            let config = SketchConfig {
                style,
                ..SketchConfig::default()
            };
            let result = process(&bytes, &config).unwrap();
            assert_eq!(result.sketch.dimensions(), (96, 72), "{style}");
        }
    }

    #[test]
    fn subject_isolation_whitens_background_at_full_clean() {
        let bytes = png_bytes(&photo(80, 60));
        let mut preprocessor = Preprocessor::new(|image: &RgbImage| {
            Some(FloatImage::from_fn(image.width(), image.height(), |x, _| {
                Luma([if x < 40 { 1.0 } else { 0.0 }])
            }))
        });
        let mut config = SketchConfig {
            subject_isolation: true,
            ..SketchConfig::default()
        };
        config.params.clean = crate::types::Percent::new(100);
        let result = process_with(&bytes, &config, &mut preprocessor).unwrap();
        assert!((40..80).all(|x| (0..60).all(|y| result.sketch.get_pixel(x, y).0[0] == 255)));
    }

    #[test]
    fn sketch_encodes_as_png() {
        let result = process(&png_bytes(&photo(64, 48)), &SketchConfig::default()).unwrap();
        let bytes = encode_png(&result.sketch).unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
