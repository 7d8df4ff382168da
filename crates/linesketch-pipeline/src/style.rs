//! Style generators: alternative ways of producing the tone and line
//! layers from the prepared grayscale image.
//!
//! This module defines the [`SketchStyle`] trait and the closed
//! [`StyleKind`] enum that implements it. Every variant returns
//! same-sized [`Layers`], so the blend step never needs to know which
//! one ran.

mod architecture;
mod engrave;
mod portrait;
mod vehicle;

use std::fmt;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::line::line_sketch;
use crate::tone::tone_sketch;
use crate::types::{Layers, Percent};

/// Selects which style generator produces the layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StyleKind {
    /// Plain tone and line layers of the prepared image.
    #[default]
    Default,
    /// Smoothed skin, softer strokes in shadow, crisper features.
    Portrait,
    /// Posterised planes reinforced with straight segments.
    Architecture,
    /// Smooth body panels, darkened windows, emphasised wheels and lamps.
    Vehicle,
    /// Binary engraving: thresholded tone with strokes cut out of it.
    Engrave,
}

impl StyleKind {
    /// All variants, in menu order.
    pub const ALL: [Self; 5] = [
        Self::Default,
        Self::Portrait,
        Self::Architecture,
        Self::Vehicle,
        Self::Engrave,
    ];
}

impl fmt::Display for StyleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Portrait => f.write_str("Portrait"),
            Self::Architecture => f.write_str("Architecture"),
            Self::Vehicle => f.write_str("Vehicle"),
            Self::Engrave => f.write_str("Engrave"),
        }
    }
}

/// Trait for style generators.
///
/// Input: the prepared grayscale image and the detail/strength sliders.
/// Output: a tone layer and a line layer of the same size as the input.
pub trait SketchStyle {
    /// Produce the two layers.
    fn generate(&self, gray: &GrayImage, detail: Percent, strength: Percent) -> Layers;
}

impl SketchStyle for StyleKind {
    fn generate(&self, gray: &GrayImage, detail: Percent, strength: Percent) -> Layers {
        if gray.width() == 0 || gray.height() == 0 {
            return Layers {
                tone: gray.clone(),
                line: gray.clone(),
            };
        }
        log::debug!("generating {self} layers (detail {detail}, strength {strength})");
        match *self {
            Self::Default => Layers {
                tone: tone_sketch(gray, detail, strength),
                line: line_sketch(gray, detail, strength),
            },
            Self::Portrait => portrait::generate(gray, detail, strength),
            Self::Architecture => architecture::generate(gray, detail, strength),
            Self::Vehicle => vehicle::generate(gray, detail, strength),
            Self::Engrave => engrave::generate(gray, detail, strength),
        }
    }
}
