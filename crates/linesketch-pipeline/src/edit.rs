//! Hand edits on a finished sketch.
//!
//! Edits live in a mask the size of the sketch (`255` = erase to white,
//! `0` = untouched) rather than in the sketch itself, so they can be
//! composited onto a regenerated sketch with [`EditSession::apply_to`].
//! Each stroke snapshots the mask first; undo and redo swap whole masks.

mod denoise;
mod history;

pub use denoise::{CleanTool, INK_LEVEL, SimplifyTool};
pub use history::{DEFAULT_HISTORY_LIMIT, HistoryStack};

use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_circle_mut;

/// Default brush radius in pixels.
pub const DEFAULT_BRUSH_RADIUS: u32 = 12;

/// The active editing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Editing is on but clicks do nothing.
    #[default]
    None,
    /// Circular brush painting into the mask.
    Brush,
}

/// Whether a session accepts edits, and with which tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Disabled,
    Enabled(Tool),
}

/// What the brush paints into the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrushMode {
    /// Paint `255`: the sketch shows white here.
    #[default]
    Erase,
    /// Paint `0`: undo earlier erasing.
    Restore,
}

impl BrushMode {
    const fn value(self) -> u8 {
        match self {
            Self::Erase => 255,
            Self::Restore => 0,
        }
    }
}

/// A filled-circle brush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brush {
    radius: u32,
    /// Erase or restore.
    pub mode: BrushMode,
}

impl Brush {
    #[must_use]
    pub const fn radius(&self) -> u32 {
        self.radius
    }

    /// Set the radius, raised to at least 1.
    pub fn set_radius(&mut self, radius: u32) {
        self.radius = radius.max(1);
    }

    /// Paint a circle centred on `(x, y)`. Centres outside the mask are
    /// ignored. Mutates `mask` in place.
    pub fn paint_mut(&self, mask: &mut GrayImage, x: i32, y: i32) {
        let inside = u32::try_from(x).is_ok_and(|x| x < mask.width())
            && u32::try_from(y).is_ok_and(|y| y < mask.height());
        if !inside {
            return;
        }
        let radius = i32::try_from(self.radius).unwrap_or(i32::MAX);
        draw_filled_circle_mut(mask, (x, y), radius, Luma([self.mode.value()]));
    }
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            radius: DEFAULT_BRUSH_RADIUS,
            mode: BrushMode::default(),
        }
    }
}

/// The user edit mask, its history and the tool state.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    state: EditState,
    mask: GrayImage,
    history: HistoryStack<GrayImage>,
    /// The brush used by [`Tool::Brush`].
    pub brush: Brush,
}

impl EditSession {
    /// A disabled session with an empty mask.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> EditState {
        self.state
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        matches!(self.state, EditState::Enabled(_))
    }

    /// The current tool, [`Tool::None`] while disabled.
    #[must_use]
    pub const fn tool(&self) -> Tool {
        match self.state {
            EditState::Enabled(tool) => tool,
            EditState::Disabled => Tool::None,
        }
    }

    #[must_use]
    pub const fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// Turn editing on or off. Disabling drops the tool.
    pub fn enable(&mut self, enabled: bool) {
        self.state = match (enabled, self.state) {
            (false, _) => EditState::Disabled,
            (true, EditState::Enabled(tool)) => EditState::Enabled(tool),
            (true, EditState::Disabled) => EditState::Enabled(Tool::None),
        };
    }

    /// Select a tool. Ignored while disabled.
    pub fn set_tool(&mut self, tool: Tool) {
        if self.is_enabled() {
            self.state = EditState::Enabled(tool);
        }
    }

    /// Start over on a new sketch: zero mask of its size, empty history.
    pub fn set_base_image(&mut self, sketch: &GrayImage) {
        self.mask = GrayImage::new(sketch.width(), sketch.height());
        self.history.clear();
    }

    /// Snapshot the mask before a stroke. Ignored while disabled.
    pub fn begin_stroke(&mut self) {
        if self.is_enabled() {
            self.history.push(self.mask.clone());
        }
    }

    /// Paint with the brush at `(x, y)`. Ignored unless the brush is
    /// selected.
    pub fn apply_at(&mut self, x: i32, y: i32) {
        if self.state == EditState::Enabled(Tool::Brush) {
            self.brush.paint_mut(&mut self.mask, x, y);
        }
    }

    /// `sketch` with every masked pixel set to white.
    ///
    /// A mask of another size is reset to fit `sketch` first, which
    /// drops all edits.
    #[must_use = "returns the edited sketch"]
    pub fn apply_to(&mut self, sketch: &GrayImage) -> GrayImage {
        if self.mask.dimensions() != sketch.dimensions() {
            log::debug!(
                "edit mask {:?} does not match sketch {:?}; resetting",
                self.mask.dimensions(),
                sketch.dimensions()
            );
            self.set_base_image(sketch);
        }
        let mut out = sketch.clone();
        for (p, m) in out.pixels_mut().zip(self.mask.pixels()) {
            if m.0[0] > 0 {
                p.0[0] = 255;
            }
        }
        out
    }

    /// Restore the mask from before the last stroke.
    pub fn undo(&mut self) -> bool {
        let current = std::mem::take(&mut self.mask);
        match self.history.undo(current) {
            Ok(previous) => {
                self.mask = previous;
                true
            }
            Err(current) => {
                self.mask = current;
                false
            }
        }
    }

    /// Re-apply a stroke removed by [`undo`](Self::undo).
    pub fn redo(&mut self) -> bool {
        let current = std::mem::take(&mut self.mask);
        match self.history.redo(current) {
            Ok(next) => {
                self.mask = next;
                true
            }
            Err(current) => {
                self.mask = current;
                false
            }
        }
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}
