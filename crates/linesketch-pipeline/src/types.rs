//! Core types shared across the sketch pipeline.

use image::{ImageBuffer, Luma};
use serde::{Deserialize, Serialize};

use crate::downsample::DownsampleFilter;
use crate::style::StyleKind;

/// Single-channel floating-point raster used for intermediate results
/// (gradients, saliency masks, local variance).
pub type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of any image buffer.
    #[must_use]
    pub fn of<P: image::Pixel, C>(image: &ImageBuffer<P, C>) -> Self
    where
        C: std::ops::Deref<Target = [P::Subpixel]>,
    {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Number of pixels.
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether either side is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A percentage-style slider value in `0..=100`.
///
/// Out-of-range inputs are clamped, never rejected. Deserialization
/// applies the same clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct Percent(u8);

impl Percent {
    /// Largest representable value.
    pub const MAX: Self = Self(100);

    /// Clamp `value` into `0..=100`.
    #[must_use]
    pub fn new(value: i64) -> Self {
        // Clamped to 0..=100 so the narrowing is lossless.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self(value.clamp(0, 100) as u8)
    }

    /// The value as an integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0 as u32
    }

    /// The value as a float, for use in weighting formulas.
    #[must_use]
    pub fn as_f32(self) -> f32 {
        f32::from(self.0)
    }

    /// `100 - self`, the form most size formulas are written in.
    #[must_use]
    pub const fn inverse(self) -> u32 {
        100 - self.0 as u32
    }
}

impl From<i64> for Percent {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<Percent> for i64 {
    fn from(value: Percent) -> Self {
        Self::from(value.0)
    }
}

impl std::fmt::Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three pipeline-wide tuning inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SketchParams {
    /// How much fine structure survives (higher keeps more edges and a
    /// tighter dodge blur).
    pub detail: Percent,
    /// Contrast of the tone layer and thickness of the line layer.
    pub strength: Percent,
    /// Background cleaning: bilateral smoothing after the blend and the
    /// fade-to-white of the saliency background.
    pub clean: Percent,
}

impl SketchParams {
    /// Build params from raw slider values, clamping each into `0..=100`.
    #[must_use]
    pub fn new(detail: i64, strength: i64, clean: i64) -> Self {
        Self {
            detail: Percent::new(detail),
            strength: Percent::new(strength),
            clean: Percent::new(clean),
        }
    }
}

impl Default for SketchParams {
    fn default() -> Self {
        Self::new(50, 50, 0)
    }
}

/// How the tone and line layers are weighted in the final blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    /// Tone dominates; lines are a light accent.
    #[default]
    Soft,
    /// Lines are weighted heavily and tone is dimmed.
    Strong,
}

impl std::fmt::Display for DrawMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Soft => write!(f, "soft"),
            Self::Strong => write!(f, "strong"),
        }
    }
}

/// Post-blend slider adjustments. All zero is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjustments {
    /// Darkens ink with a contrast stretch.
    pub ink: Percent,
    /// Thickens light regions with a max filter.
    pub comic: Percent,
    /// Hard binary threshold, lowered as the value grows.
    pub logo: Percent,
    /// Morphological open that drops small detail.
    pub minimal: Percent,
}

impl Adjustments {
    /// Whether every adjustment is zero.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Smallest accepted value for [`SketchConfig::max_side`].
pub const MIN_PROCESSING_SIDE: u32 = 64;

/// Largest accepted value for [`SketchConfig::max_side`].
///
/// Inputs larger than this are always downscaled before the generators
/// run, which bounds the memory of every intermediate raster.
pub const MAX_PROCESSING_SIDE: u32 = 8192;

/// Default longest side of the working resolution.
pub const DEFAULT_MAX_SIDE: u32 = 1600;

/// Default filter for shrinking to the working resolution.
pub const DEFAULT_DOWNSAMPLE_FILTER: DownsampleFilter = DownsampleFilter::Triangle;

/// Full configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SketchConfig {
    /// Detail, strength and clean sliders.
    pub params: SketchParams,
    /// Blend weighting.
    pub mode: DrawMode,
    /// Which style generator produces the layers.
    pub style: StyleKind,
    /// Longest side of the working resolution, clamped to
    /// [`MIN_PROCESSING_SIDE`]..=[`MAX_PROCESSING_SIDE`] when used.
    pub max_side: u32,
    /// Filter used to shrink the image to the working resolution.
    pub downsample_filter: DownsampleFilter,
    /// Separate the subject from the background with a saliency mask
    /// when a provider is available.
    pub subject_isolation: bool,
    /// Post-blend adjustments.
    pub adjustments: Adjustments,
}

impl SketchConfig {
    /// [`Self::max_side`] clamped to the supported processing range.
    #[must_use]
    pub fn effective_max_side(&self) -> u32 {
        self.max_side.clamp(MIN_PROCESSING_SIDE, MAX_PROCESSING_SIDE)
    }
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            params: SketchParams::default(),
            mode: DrawMode::default(),
            style: StyleKind::default(),
            max_side: DEFAULT_MAX_SIDE,
            downsample_filter: DEFAULT_DOWNSAMPLE_FILTER,
            subject_isolation: false,
            adjustments: Adjustments::default(),
        }
    }
}

/// The two layers every style generator produces, at the same size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layers {
    /// Shading mass without line detail.
    pub tone: image::GrayImage,
    /// Contour strokes, dark on white.
    pub line: image::GrayImage,
}

/// An integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl PixelPoint {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        f64::from(self.x - other.x).hypot(f64::from(self.y - other.y))
    }
}

/// An ordered stroke of pixel coordinates. Produced only by the
/// vectorizer, which guarantees at least two points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path(Vec<PixelPoint>);

impl Path {
    /// Wrap a point list, or `None` if it has fewer than two points.
    #[must_use]
    pub fn new(points: Vec<PixelPoint>) -> Option<Self> {
        (points.len() >= 2).then_some(Self(points))
    }

    /// The points in stroke order.
    #[must_use]
    pub fn points(&self) -> &[PixelPoint] {
        &self.0
    }

    /// First point.
    #[must_use]
    pub fn start(&self) -> PixelPoint {
        self.0[0]
    }

    /// Last point.
    #[must_use]
    pub fn end(&self) -> PixelPoint {
        self.0[self.0.len() - 1]
    }

    /// Number of points (always at least 2).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Continue this stroke with the points of `other`.
    pub(crate) fn append(&mut self, other: Self) {
        self.0.extend(other.0);
    }
}

/// Errors at the image I/O boundary. Every numeric stage degrades to a
/// no-op instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum SketchError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to encode the output raster.
    #[error("failed to encode image: {0}")]
    ImageEncode(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn percent_clamps_out_of_range() {
        assert_eq!(Percent::new(-5).get(), 0);
        assert_eq!(Percent::new(250).get(), 100);
        assert_eq!(Percent::new(42).get(), 42);
        assert_eq!(Percent::new(30).inverse(), 70);
    }

    #[test]
    fn percent_deserialization_clamps() {
        let params: SketchParams =
            serde_json::from_str(r#"{"detail": 140, "strength": -3}"#).unwrap();
        assert_eq!(params.detail, Percent::MAX);
        assert_eq!(params.strength.get(), 0);
        assert_eq!(params.clean.get(), 0, "missing field takes the default");
    }

    #[test]
    fn config_defaults() {
        let config = SketchConfig::default();
        assert_eq!(config.params.detail.get(), 50);
        assert_eq!(config.params.strength.get(), 50);
        assert_eq!(config.mode, DrawMode::Soft);
        assert_eq!(config.max_side, DEFAULT_MAX_SIDE);
        assert_eq!(config.downsample_filter, DownsampleFilter::default());
        assert!(config.adjustments.is_identity());
    }

    #[test]
    fn config_serde_round_trip() {
        let config = SketchConfig {
            mode: DrawMode::Strong,
            style: StyleKind::Engrave,
            subject_isolation: true,
            ..SketchConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SketchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn max_side_is_clamped_when_used() {
        let tiny = SketchConfig {
            max_side: 1,
            ..SketchConfig::default()
        };
        assert_eq!(tiny.effective_max_side(), MIN_PROCESSING_SIDE);
        let huge = SketchConfig {
            max_side: u32::MAX,
            ..SketchConfig::default()
        };
        assert_eq!(huge.effective_max_side(), MAX_PROCESSING_SIDE);
    }

    #[test]
    fn path_requires_two_points() {
        assert!(Path::new(vec![PixelPoint::new(0, 0)]).is_none());
        let path = Path::new(vec![PixelPoint::new(0, 0), PixelPoint::new(3, 4)]).unwrap();
        assert_eq!(path.len(), 2);
        assert!((path.start().distance(path.end()) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn empty_input_error_displays() {
        assert_eq!(SketchError::EmptyInput.to_string(), "input image data is empty");
    }
}
