//! linesketch: turn a photo into a pencil or line sketch from the command line.
//!
//! Reads an image file, runs the sketch pipeline with the given sliders,
//! optionally refines the result (clean, simplify, reconstruct from
//! vectors, or the full illustration sequence) and writes the sketch as a
//! grayscale PNG. Per-stage diagnostics go to stdout, as a table or JSON.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin linesketch -- [OPTIONS] <IMAGE_PATH> -o <OUT.png>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use linesketch_pipeline::diagnostics::Clock;
use linesketch_pipeline::types::{DEFAULT_DOWNSAMPLE_FILTER, DEFAULT_MAX_SIDE};
use linesketch_pipeline::{
    Adjustments, DownsampleFilter, DrawMode, Path, Preprocessor, SketchConfig, SketchDocument,
    SketchParams, StyleKind, VectorizeParams,
};

/// Photo-to-sketch conversion with optional vector refinement.
#[derive(Parser)]
#[command(name = "linesketch", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Where to write the sketch PNG.
    #[arg(short, long)]
    output: PathBuf,

    /// Blend weighting of tone and lines.
    #[arg(long, value_enum, default_value_t = Mode::Soft)]
    mode: Mode,

    /// Style generator.
    #[arg(long, value_enum, default_value_t = Style::Default)]
    style: Style,

    /// Detail slider (0-100).
    #[arg(long, default_value_t = 50)]
    detail: i64,

    /// Strength slider (0-100).
    #[arg(long, default_value_t = 50)]
    strength: i64,

    /// Background clean slider (0-100).
    #[arg(long, default_value_t = 0)]
    clean: i64,

    /// Longest side of the working resolution (clamped to 64-8192).
    #[arg(long, default_value_t = DEFAULT_MAX_SIDE)]
    max_side: u32,

    /// Downsample filter (none, nearest, triangle, catmull-rom, gaussian, lanczos3).
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    filter: Filter,

    /// Ink adjustment (0-100): darken strokes.
    #[arg(long, default_value_t = 0)]
    ink: i64,

    /// Comic adjustment (0-100): thicken light areas.
    #[arg(long, default_value_t = 0)]
    comic: i64,

    /// Logo adjustment (0-100): hard black and white.
    #[arg(long, default_value_t = 0)]
    logo: i64,

    /// Minimal adjustment (0-100): drop small detail.
    #[arg(long, default_value_t = 0)]
    minimal: i64,

    /// Refinement applied to the finished sketch.
    #[arg(long, value_enum, default_value_t = Refine::None)]
    refine: Refine,

    /// Vectorizer detail (0-100): higher keeps shorter strokes.
    #[arg(long, default_value_t = 0)]
    vec_detail: i64,

    /// Vectorizer smoothing (0-100).
    #[arg(long, default_value_t = 0)]
    vec_smooth: i64,

    /// Vectorizer merge (0-100): join strokes across small gaps.
    #[arg(long, default_value_t = 0)]
    vec_merge: i64,

    /// Also write a PNG of the traced paths.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, the slider, mode, style, size and adjustment flags
    /// are ignored. The JSON must be a valid `SketchConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,
}

/// Blend weighting selection.
#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Tone first, light lines.
    Soft,
    /// Heavy lines, dimmed tone.
    Strong,
}

/// Style generator selection.
#[derive(Clone, Copy, ValueEnum)]
enum Style {
    /// General-purpose pencil sketch.
    Default,
    /// Smoothed skin, darker facial features.
    Portrait,
    /// Posterized tone with straight structural lines.
    Architecture,
    /// Glossy body tone with strong contours.
    Vehicle,
    /// Binary hatching-like engraving.
    Engrave,
}

/// Downsample resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Skip downsampling regardless of image size.
    None,
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Linear interpolation (fast, smooth).
    Triangle,
    /// Bicubic Catmull-Rom.
    CatmullRom,
    /// Gaussian.
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

/// Refinement selection.
#[derive(Clone, Copy, ValueEnum)]
enum Refine {
    /// Write the sketch as generated.
    None,
    /// Remove small specks.
    Clean,
    /// Smooth strokes with a close and open.
    Simplify,
    /// Redraw from traced vector paths.
    Reconstruct,
    /// Simplify, reconstruct, clean, reconstruct.
    Illustrate,
}

/// Maps a [`DownsampleFilter`] to the local CLI [`Filter`] enum.
const fn filter_from_pipeline(f: DownsampleFilter) -> Filter {
    match f {
        DownsampleFilter::None => Filter::None,
        DownsampleFilter::Nearest => Filter::Nearest,
        DownsampleFilter::Triangle => Filter::Triangle,
        DownsampleFilter::CatmullRom => Filter::CatmullRom,
        DownsampleFilter::Gaussian => Filter::Gaussian,
        DownsampleFilter::Lanczos3 => Filter::Lanczos3,
    }
}

/// The CLI default filter, derived from [`DEFAULT_DOWNSAMPLE_FILTER`] so
/// the two cannot silently diverge.
const CLI_DEFAULT_FILTER: Filter = filter_from_pipeline(DEFAULT_DOWNSAMPLE_FILTER);

/// Build a [`SketchConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<SketchConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(SketchConfig {
        params: SketchParams::new(cli.detail, cli.strength, cli.clean),
        mode: match cli.mode {
            Mode::Soft => DrawMode::Soft,
            Mode::Strong => DrawMode::Strong,
        },
        style: match cli.style {
            Style::Default => StyleKind::Default,
            Style::Portrait => StyleKind::Portrait,
            Style::Architecture => StyleKind::Architecture,
            Style::Vehicle => StyleKind::Vehicle,
            Style::Engrave => StyleKind::Engrave,
        },
        max_side: cli.max_side,
        downsample_filter: match cli.filter {
            Filter::None => DownsampleFilter::None,
            Filter::Nearest => DownsampleFilter::Nearest,
            Filter::Triangle => DownsampleFilter::Triangle,
            Filter::CatmullRom => DownsampleFilter::CatmullRom,
            Filter::Gaussian => DownsampleFilter::Gaussian,
            Filter::Lanczos3 => DownsampleFilter::Lanczos3,
        },
        adjustments: Adjustments {
            ink: cli.ink.into(),
            comic: cli.comic.into(),
            logo: cli.logo.into(),
            minimal: cli.minimal.into(),
        },
        ..SketchConfig::default()
    })
}

/// Run the requested refinement, returning traced paths when it
/// vectorized.
fn refine(document: &mut SketchDocument, refine: Refine) -> Option<Vec<Path>> {
    match refine {
        Refine::None => None,
        Refine::Clean => {
            document.clean();
            None
        }
        Refine::Simplify => {
            document.simplify();
            None
        }
        Refine::Reconstruct => Some(document.reconstruct()),
        Refine::Illustrate => Some(document.illustrate()),
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!();

    let mut preprocessor = Preprocessor::default();
    let (result, diagnostics) = match linesketch_pipeline::diagnostics::process_with_diagnostics(
        &image_bytes,
        &config,
        &mut preprocessor,
        &StdClock,
    ) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&diagnostics) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing diagnostics: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", diagnostics.report());
    }

    let mut document = SketchDocument::from_result(&result);
    document.vectorize = VectorizeParams::new(cli.vec_detail, cli.vec_smooth, cli.vec_merge);

    let start = Instant::now();
    let mut paths = refine(&mut document, cli.refine);
    if paths.is_none() && cli.preview.is_some() {
        let rendered = document.rendered();
        paths = Some(linesketch_pipeline::vectorize(&rendered, document.vectorize));
    }
    if let Some(ref paths) = paths {
        let points: usize = paths.iter().map(Path::len).sum();
        eprintln!(
            "Traced {} paths ({points} points) in {:.3}ms",
            paths.len(),
            start.elapsed().as_secs_f64() * 1000.0,
        );
    }

    let png = match document.to_png() {
        Ok(png) => png,
        Err(e) => {
            eprintln!("Error encoding sketch: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = std::fs::write(&cli.output, &png) {
        eprintln!("Error writing {}: {e}", cli.output.display());
        return ExitCode::FAILURE;
    }
    eprintln!(
        "Sketch written to {} ({} bytes)",
        cli.output.display(),
        png.len()
    );

    if let (Some(preview_path), Some(paths)) = (&cli.preview, &paths) {
        let preview = linesketch_pipeline::draw_preview(document.dimensions(), paths);
        match linesketch_pipeline::encode_png(&preview) {
            Ok(bytes) => match std::fs::write(preview_path, &bytes) {
                Ok(()) => eprintln!(
                    "Preview written to {} ({} bytes)",
                    preview_path.display(),
                    bytes.len(),
                ),
                Err(e) => eprintln!("Error writing preview to {}: {e}", preview_path.display()),
            },
            Err(e) => eprintln!("Error encoding preview: {e}"),
        }
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
