//! A sketch being refined by hand: the current raster, the line layer
//! the edit tools work from, a sketch-level undo history and the edit
//! session.

use image::GrayImage;

use crate::edge::canny;
use crate::edit::{CleanTool, EditSession, HistoryStack, SimplifyTool};
use crate::grayscale::encode_png;
use crate::pipeline::SketchResult;
use crate::threshold::ink_mask;
use crate::types::{Dimensions, Path, SketchError};
use crate::vectorize::{VectorizeParams, draw_preview, vectorize};

/// Refreshed line layers mark everything darker than this.
const LINE_LAYER_LEVEL: u8 = 250;

const CLEAN_CANNY_LOW: f32 = 40.0;
const CLEAN_CANNY_HIGH: f32 = 120.0;

/// Document state for interactive refinement.
#[derive(Debug, Clone)]
pub struct SketchDocument {
    sketch: GrayImage,
    line_layer: GrayImage,
    history: HistoryStack<GrayImage>,
    edit: EditSession,
    /// Sliders used by [`reconstruct`](Self::reconstruct).
    pub vectorize: VectorizeParams,
    /// Speck removal used by [`clean`](Self::clean).
    pub clean_tool: CleanTool,
    /// Stroke smoothing used by [`simplify`](Self::simplify).
    pub simplify_tool: SimplifyTool,
}

impl SketchDocument {
    /// Start from a sketch and its line layer.
    #[must_use]
    pub fn new(sketch: GrayImage, line_layer: GrayImage) -> Self {
        let mut edit = EditSession::new();
        edit.set_base_image(&sketch);
        Self {
            sketch,
            line_layer,
            history: HistoryStack::default(),
            edit,
            vectorize: VectorizeParams::default(),
            clean_tool: CleanTool::default(),
            simplify_tool: SimplifyTool::default(),
        }
    }

    /// Start from a finished pipeline run.
    #[must_use]
    pub fn from_result(result: &SketchResult) -> Self {
        Self::new(result.sketch.clone(), result.line.clone())
    }

    /// Replace the sketch (e.g. after regenerating with new sliders).
    /// Resets the edit session; sketch history is kept.
    pub fn set_sketch(&mut self, sketch: GrayImage, line_layer: GrayImage) {
        self.edit.set_base_image(&sketch);
        self.sketch = sketch;
        self.line_layer = line_layer;
    }

    /// The sketch without pending edits.
    #[must_use]
    pub const fn sketch(&self) -> &GrayImage {
        &self.sketch
    }

    #[must_use]
    pub const fn line_layer(&self) -> &GrayImage {
        &self.line_layer
    }

    #[must_use]
    pub const fn edit(&self) -> &EditSession {
        &self.edit
    }

    /// The edit session, for brush input.
    pub const fn edit_mut(&mut self) -> &mut EditSession {
        &mut self.edit
    }

    #[must_use]
    pub const fn history(&self) -> &HistoryStack<GrayImage> {
        &self.history
    }

    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.sketch)
    }

    /// The sketch with edits applied.
    #[must_use = "returns the rendered sketch"]
    pub fn rendered(&mut self) -> GrayImage {
        self.edit.apply_to(&self.sketch)
    }

    /// PNG bytes of [`rendered`](Self::rendered).
    ///
    /// # Errors
    ///
    /// Returns [`SketchError::ImageEncode`] if encoding fails.
    pub fn to_png(&mut self) -> Result<Vec<u8>, SketchError> {
        encode_png(&self.rendered())
    }

    fn checkpoint(&mut self) {
        self.history.push(self.sketch.clone());
    }

    /// Remove small specks. The line layer becomes the Canny edges of
    /// the cleaned sketch.
    pub fn clean(&mut self) {
        self.checkpoint();
        let base = self.rendered();
        self.sketch = self.clean_tool.apply(&base);
        self.line_layer = canny(&self.sketch, CLEAN_CANNY_LOW, CLEAN_CANNY_HIGH);
        log::debug!("document: clean");
    }

    /// Smooth strokes. The line layer becomes the ink of the result.
    pub fn simplify(&mut self) {
        self.checkpoint();
        let base = self.rendered();
        self.sketch = self.simplify_tool.apply(&base);
        self.line_layer = ink_mask(&self.sketch, LINE_LAYER_LEVEL);
        log::debug!(
            "document: simplify (kernel {})",
            self.simplify_tool.kernel_size()
        );
    }

    /// Redraw the sketch from its own vectorization and return the paths.
    /// Edits are baked in and the edit session restarts.
    pub fn reconstruct(&mut self) -> Vec<Path> {
        self.checkpoint();
        let base = self.rendered();
        let paths = vectorize(&base, self.vectorize);
        let preview = draw_preview(Dimensions::of(&base), &paths);
        self.line_layer = ink_mask(&preview, LINE_LAYER_LEVEL);
        self.edit.set_base_image(&preview);
        self.sketch = preview;
        log::debug!("document: reconstructed from {} paths", paths.len());
        paths
    }

    /// The whole refinement sequence: simplify, reconstruct, clean,
    /// reconstruct. Returns the final paths.
    pub fn illustrate(&mut self) -> Vec<Path> {
        self.simplify();
        let _ = self.reconstruct();
        self.clean();
        self.reconstruct()
    }

    /// Step back one document operation.
    pub fn undo(&mut self) -> bool {
        let current = std::mem::take(&mut self.sketch);
        let (sketch, changed) = match self.history.undo(current) {
            Ok(previous) => (previous, true),
            Err(current) => (current, false),
        };
        self.restore(sketch, changed)
    }

    /// Re-apply an undone document operation.
    pub fn redo(&mut self) -> bool {
        let current = std::mem::take(&mut self.sketch);
        let (sketch, changed) = match self.history.redo(current) {
            Ok(next) => (next, true),
            Err(current) => (current, false),
        };
        self.restore(sketch, changed)
    }

    fn restore(&mut self, sketch: GrayImage, changed: bool) -> bool {
        self.sketch = sketch;
        if changed {
            self.edit.set_base_image(&self.sketch);
        }
        changed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::Luma;

    use super::*;
    use crate::edit::Tool;

    /// A white page with one long diagonal stroke and a few specks.
    fn page() -> GrayImage {
        let mut image = GrayImage::from_pixel(120, 100, Luma([255]));
        for i in 10..90 {
            for t in 0..3 {
                image.put_pixel(i + t, i, Luma([0]));
            }
        }
        for (x, y) in [(100, 10), (105, 15), (110, 80)] {
            image.put_pixel(x, y, Luma([30]));
        }
        image
    }

    fn document() -> SketchDocument {
        let sketch = page();
        let line = ink_mask(&sketch, LINE_LAYER_LEVEL);
        SketchDocument::new(sketch, line)
    }

    #[test]
    fn clean_removes_specks_and_is_undoable() {
        let mut doc = document();
        doc.clean();
        assert_eq!(doc.sketch().get_pixel(100, 10).0[0], 255);
        assert_eq!(doc.sketch().get_pixel(50, 50).0[0], 0);
        assert!(doc.undo());
        assert_eq!(doc.sketch(), &page());
        assert!(doc.redo());
        assert_eq!(doc.sketch().get_pixel(100, 10).0[0], 255);
    }

    #[test]
    fn simplify_yields_binary_sketch_and_matching_line_layer() {
        let mut doc = document();
        doc.simplify();
        assert!(doc.sketch().pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert_eq!(doc.line_layer(), &ink_mask(doc.sketch(), LINE_LAYER_LEVEL));
    }

    #[test]
    fn reconstruct_redraws_from_paths() {
        let mut doc = document();
        let paths = doc.reconstruct();
        assert!(!paths.is_empty());
        assert_eq!(doc.dimensions(), Dimensions { width: 120, height: 100 });
        assert!(doc.sketch().get_pixel(5, 90).0[0] == 255);
        assert!(doc.edit().mask().pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn illustrate_pushes_four_snapshots() {
        let mut doc = document();
        let _ = doc.illustrate();
        assert_eq!(doc.history().undo_len(), 4);
        for _ in 0..4 {
            assert!(doc.undo());
        }
        assert!(!doc.undo());
        assert_eq!(doc.sketch(), &page());
    }

    #[test]
    fn edits_are_baked_into_operations() {
        let mut doc = document();
        let edit = doc.edit_mut();
        edit.enable(true);
        edit.set_tool(Tool::Brush);
        edit.begin_stroke();
        edit.apply_at(50, 50);
        assert_eq!(doc.rendered().get_pixel(50, 50).0[0], 255);
        doc.clean();
        assert_eq!(doc.sketch().get_pixel(50, 50).0[0], 255);
    }

    #[test]
    fn png_export_decodes_back() {
        let mut doc = document();
        let bytes = doc.to_png().unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_luma8();
        assert_eq!(decoded, page());
    }
}
