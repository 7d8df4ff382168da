//! Whole-sketch cleanup tools.

use image::GrayImage;

use crate::components::Components;
use crate::morphology::{close_mut, open_mut};
use crate::threshold::ink_mask;

/// Pixels darker than this are ink.
pub const INK_LEVEL: u8 = 200;

/// Removes isolated specks: 8-connected ink components smaller than
/// `min_size` pixels are painted white.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanTool {
    /// Smallest component area kept.
    pub min_size: u32,
}

impl Default for CleanTool {
    fn default() -> Self {
        Self { min_size: 25 }
    }
}

impl CleanTool {
    #[must_use = "returns the cleaned sketch"]
    pub fn apply(&self, sketch: &GrayImage) -> GrayImage {
        let components = Components::label(&ink_mask(sketch, INK_LEVEL));
        let mut cleaned = sketch.clone();
        let mut removed = 0_usize;
        for (x, y, p) in cleaned.enumerate_pixels_mut() {
            if components.area_at(x, y).is_some_and(|area| area < self.min_size) {
                p.0[0] = 255;
                removed += 1;
            }
        }
        log::debug!(
            "clean: {} components, {removed} speck pixels removed",
            components.count()
        );
        cleaned
    }
}

/// Smooths strokes with a close then an open of size `1 + 2 * strength`
/// over the ink mask. The result is binary: ink `0`, paper `255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimplifyTool {
    strength: u32,
}

impl SimplifyTool {
    /// `strength` is raised to at least 1; 1 to 3 is the useful range.
    #[must_use]
    pub fn new(strength: u32) -> Self {
        Self {
            strength: strength.max(1),
        }
    }

    #[must_use]
    pub const fn strength(&self) -> u32 {
        self.strength
    }

    /// Structuring element size.
    #[must_use]
    pub const fn kernel_size(&self) -> u32 {
        1 + 2 * self.strength
    }

    #[must_use = "returns the simplified sketch"]
    pub fn apply(&self, sketch: &GrayImage) -> GrayImage {
        let mut ink = ink_mask(sketch, INK_LEVEL);
        let k = self.kernel_size();
        close_mut(&mut ink, k, 1);
        open_mut(&mut ink, k, 1);
        for p in ink.pixels_mut() {
            p.0[0] = if p.0[0] > 0 { 0 } else { 255 };
        }
        ink
    }
}

impl Default for SimplifyTool {
    fn default() -> Self {
        Self::new(1)
    }
}
