//! linesketch-pipeline: photo-to-sketch pipeline, edit session and line
//! vectorizer (sans-IO).
//!
//! Turns a photograph into a pencil or line sketch through:
//! decode -> auto-crop -> downsample -> grayscale / background flattening
//! -> style generator (tone + line layers) -> blend -> clean -> upscale
//! -> saliency composite -> adjustments.
//!
//! A finished sketch can then be refined by hand in a
//! [`SketchDocument`]: erase or restore with the brush, remove specks,
//! smooth strokes, and trace the strokes into [`Path`]s that are
//! re-rasterized as a clean line drawing.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory byte
//! slices and `image` buffers. Reading and writing files lives in
//! `linesketch-cli`. The optional saliency model is injected through
//! [`SaliencyProvider`].

pub mod adjust;
pub mod arith;
pub mod blend;
pub mod blur;
pub mod border;
pub mod components;
pub mod crop;
pub mod diagnostics;
pub mod document;
pub mod downsample;
pub mod edge;
pub mod edit;
pub mod gradient;
pub mod grayscale;
pub mod hough;
pub mod kernel;
pub mod line;
pub mod morphology;
pub mod normalize;
pub mod pipeline;
pub mod preprocess;
pub mod saliency;
pub mod style;
pub mod threshold;
pub mod tone;
pub mod types;
pub mod vectorize;

pub use document::SketchDocument;
pub use downsample::DownsampleFilter;
pub use edit::{Brush, BrushMode, CleanTool, EditSession, EditState, HistoryStack, SimplifyTool, Tool};
pub use grayscale::{decode, encode_png};
pub use pipeline::{Pipeline, SketchResult, process, process_with};
pub use preprocess::{PreparedImage, Preprocessor};
pub use saliency::{MaskCache, NoSaliency, SaliencyProvider};
pub use style::{SketchStyle, StyleKind};
pub use types::{
    Adjustments, Dimensions, DrawMode, FloatImage, Layers, Path, Percent, PixelPoint, SketchConfig,
    SketchError, SketchParams,
};
pub use vectorize::{Tracer, TracerKind, VectorizeParams, draw_preview, vectorize};
