//! Pipeline diagnostics: timing and per-stage metrics.
//!
//! [`process_with_diagnostics`] runs the same stages as
//! [`process_with`](crate::process_with) and records how long each took
//! along with a few sizes and counts, for tuning the sliders and spotting
//! slow stages. Time comes from a caller-supplied [`Clock`], so the
//! library itself never reads the system time.
//!
//! Durations are serialized as fractional seconds (`f64`) because
//! `std::time::Duration` does not implement serde traits.

use std::time::Duration;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::pipeline::{Pipeline, SketchResult};
use crate::preprocess::Preprocessor;
use crate::types::{SketchConfig, SketchError};

/// Pixels darker than this count as ink in the metrics.
const INK_METRIC_LEVEL: u8 = 128;

/// A monotonic time source.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 0: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 1: frame removal.
    pub crop: StageDiagnostics,
    /// Stage 2: shrink to the working resolution.
    pub downsample: StageDiagnostics,
    /// Stage 3: grayscale, background flattening, tone rescue.
    pub prepare: StageDiagnostics,
    /// Stage 4: style generator.
    pub generate: StageDiagnostics,
    /// Stage 5: layer blend and background clean.
    pub blend: StageDiagnostics,
    /// Stage 6: upscale, saliency composite, adjustments.
    pub finish: StageDiagnostics,
    /// Wall-clock duration of the whole run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    Decode {
        /// Size of the input bytes.
        input_bytes: usize,
        width: u32,
        height: u32,
    },
    Crop {
        width: u32,
        height: u32,
        /// Whether a frame was removed.
        cropped: bool,
    },
    Downsample {
        width: u32,
        height: u32,
        /// Working / output resolution.
        scale: f64,
    },
    Prepare {
        /// Whether subject isolation was requested.
        subject_isolation: bool,
        /// Whether a saliency mask was available and used.
        mask_applied: bool,
        /// Mean of the prepared grayscale image.
        mean_gray: f64,
    },
    Generate {
        /// Style generator used.
        style: String,
        /// Ink pixels in the line layer.
        line_ink_pixels: u64,
        total_pixels: u64,
    },
    Blend {
        /// Blend weighting used.
        mode: String,
        /// Clean slider.
        clean: u32,
    },
    Finish {
        width: u32,
        height: u32,
        mask_applied: bool,
        /// Whether any adjustment slider was non-zero.
        adjusted: bool,
    },
}

/// High-level sizes for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Decoded photo size.
    pub image_width: u32,
    pub image_height: u32,
    /// Working resolution.
    pub working_width: u32,
    pub working_height: u32,
    /// Output (cropped) resolution.
    pub output_width: u32,
    pub output_height: u32,
    /// Ink pixels in the finished sketch.
    pub sketch_ink_pixels: u64,
}

impl PipelineDiagnostics {
    /// Format the diagnostics as a human-readable table.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{}  working {}x{}  output {}x{}",
            self.summary.image_width,
            self.summary.image_height,
            self.summary.working_width,
            self.summary.working_height,
            self.summary.output_width,
            self.summary.output_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Sketch ink pixels: {}",
            self.summary.sketch_ink_pixels
        ));

        lines.join("\n")
    }

    /// Every stage in pipeline order.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 7] {
        [
            ("Decode", &self.decode),
            ("Crop", &self.crop),
            ("Downsample", &self.downsample),
            ("Prepare", &self.prepare),
            ("Generate", &self.generate),
            ("Blend", &self.blend),
            ("Finish", &self.finish),
        ]
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Crop {
            width,
            height,
            cropped,
        } => {
            if *cropped {
                format!("cropped to {width}x{height}")
            } else {
                format!("{width}x{height} (no frame)")
            }
        }
        StageMetrics::Downsample {
            width,
            height,
            scale,
        } => format!("{width}x{height} scale={scale:.4}"),
        StageMetrics::Prepare {
            subject_isolation,
            mask_applied,
            mean_gray,
        } => format!("isolation={subject_isolation} mask={mask_applied} mean={mean_gray:.1}"),
        StageMetrics::Generate {
            style,
            line_ink_pixels,
            total_pixels,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixels > 0 {
                *line_ink_pixels as f64 / *total_pixels as f64 * 100.0
            } else {
                0.0
            };
            format!("style={style} line ink={line_ink_pixels} ({density:.1}%)")
        }
        StageMetrics::Blend { mode, clean } => format!("mode={mode} clean={clean}"),
        StageMetrics::Finish {
            width,
            height,
            mask_applied,
            adjusted,
        } => format!("{width}x{height} mask={mask_applied} adjusted={adjusted}"),
    }
}

fn ink_pixels(image: &GrayImage) -> u64 {
    image
        .pixels()
        .filter(|p| p.0[0] < INK_METRIC_LEVEL)
        .count() as u64
}

fn mean(image: &GrayImage) -> f64 {
    let n = u64::from(image.width()) * u64::from(image.height());
    if n == 0 {
        return 0.0;
    }
    let sum: u64 = image.pixels().map(|p| u64::from(p.0[0])).sum();
    // Pixel counts stay far below 2^52.
    #[allow(clippy::cast_precision_loss)]
    let mean = sum as f64 / n as f64;
    mean
}

/// Run the pipeline and collect per-stage diagnostics.
///
/// # Errors
///
/// Returns [`SketchError`] if the bytes cannot be decoded.
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &SketchConfig,
    preprocessor: &mut Preprocessor,
    clock: &C,
) -> Result<(SketchResult, PipelineDiagnostics), SketchError> {
    let total_start = clock.now();

    let start = clock.now();
    let decoded = Pipeline::new(image_bytes.to_vec(), config.clone()).decode()?;
    let (image_width, image_height) = decoded.original().dimensions();
    let decode = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Decode {
            input_bytes: decoded.source_len(),
            width: image_width,
            height: image_height,
        },
    };

    let start = clock.now();
    let cropped = decoded.crop();
    let (output_width, output_height) = cropped.cropped().dimensions();
    let crop = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Crop {
            width: output_width,
            height: output_height,
            cropped: cropped.applied(),
        },
    };

    let start = clock.now();
    let downsampled = cropped.downsample();
    let (working_width, working_height) = downsampled.working().dimensions();
    let downsample = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Downsample {
            width: working_width,
            height: working_height,
            scale: downsampled.scale(),
        },
    };

    let start = clock.now();
    let prepared = downsampled.prepare(preprocessor);
    let mask_applied = prepared.mask().is_some();
    let prepare = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Prepare {
            subject_isolation: config.subject_isolation,
            mask_applied,
            mean_gray: mean(prepared.gray()),
        },
    };

    let start = clock.now();
    let generated = prepared.generate();
    let line = &generated.layers().line;
    let generate = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Generate {
            style: config.style.to_string(),
            line_ink_pixels: ink_pixels(line),
            total_pixels: u64::from(line.width()) * u64::from(line.height()),
        },
    };

    let start = clock.now();
    let blended = generated.blend();
    let blend = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Blend {
            mode: config.mode.to_string(),
            clean: config.params.clean.get(),
        },
    };

    let start = clock.now();
    let result = blended.finish();
    let finish = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Finish {
            width: result.dimensions.width,
            height: result.dimensions.height,
            mask_applied,
            adjusted: !config.adjustments.is_identity(),
        },
    };

    let diagnostics = PipelineDiagnostics {
        decode,
        crop,
        downsample,
        prepare,
        generate,
        blend,
        finish,
        total_duration: clock.elapsed(&total_start),
        summary: PipelineSummary {
            image_width,
            image_height,
            working_width,
            working_height,
            output_width,
            output_height,
            sketch_ink_pixels: ink_pixels(&result.sketch),
        },
    };
    Ok((result, diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use image::{Rgb, RgbImage};

    use super::*;

    /// Advances one millisecond every time it is read.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get() + 1;
            self.0.set(t);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn png() -> Vec<u8> {
        let image = RgbImage::from_fn(90, 60, |x, y| {
            let v = if x < 2 || y < 2 || x >= 88 || y >= 58 {
                10
            } else if (30..60).contains(&x) {
                60
            } else {
                200
            };
            Rgb([v, v, v])
        });
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn diagnostics_match_plain_run() {
        let config = SketchConfig::default();
        let bytes = png();
        let clock = TickClock(Cell::new(0));
        let (result, diag) =
            process_with_diagnostics(&bytes, &config, &mut Preprocessor::default(), &clock)
                .unwrap();
        assert_eq!(result, crate::process(&bytes, &config).unwrap());
        assert_eq!(
            (diag.summary.output_width, diag.summary.output_height),
            (result.dimensions.width, result.dimensions.height)
        );
        assert!(matches!(
            diag.decode.metrics,
            StageMetrics::Decode { width: 90, height: 60, .. }
        ));
    }

    #[test]
    fn stage_durations_fit_in_total() {
        let clock = TickClock(Cell::new(0));
        let (_, diag) = process_with_diagnostics(
            &png(),
            &SketchConfig::default(),
            &mut Preprocessor::default(),
            &clock,
        )
        .unwrap();
        let stages: Duration = diag.stages().iter().map(|(_, s)| s.duration).sum();
        assert!(diag.stages().iter().all(|(_, s)| s.duration == Duration::from_millis(1)));
        assert!(stages < diag.total_duration);
    }

    #[test]
    fn report_lists_every_stage() {
        let clock = TickClock(Cell::new(0));
        let (_, diag) = process_with_diagnostics(
            &png(),
            &SketchConfig::default(),
            &mut Preprocessor::default(),
            &clock,
        )
        .unwrap();
        let report = diag.report();
        for (name, _) in diag.stages() {
            assert!(report.contains(name), "missing {name}");
        }
        assert!(report.contains("style=Default"));
    }

    #[test]
    fn json_round_trip_keeps_durations() {
        let clock = TickClock(Cell::new(0));
        let (_, diag) = process_with_diagnostics(
            &png(),
            &SketchConfig::default(),
            &mut Preprocessor::default(),
            &clock,
        )
        .unwrap();
        let json = serde_json::to_string(&diag).unwrap();
        let parsed: PipelineDiagnostics = serde_json::from_str(&json).unwrap();
        let drift = parsed.total_duration.abs_diff(diag.total_duration);
        assert!(drift < Duration::from_micros(1), "drift {drift:?}");
        assert_eq!(parsed.summary, diag.summary);
    }

    #[test]
    fn decode_errors_propagate() {
        let clock = TickClock(Cell::new(0));
        let err = process_with_diagnostics(
            &[],
            &SketchConfig::default(),
            &mut Preprocessor::default(),
            &clock,
        )
        .unwrap_err();
        assert!(matches!(err, SketchError::EmptyInput));
    }
}
