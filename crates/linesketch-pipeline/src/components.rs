//! 8-connected component labelling with per-component areas.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};

/// Labelled foreground of a binary image.
#[derive(Debug, Clone)]
pub struct Components {
    /// Label per pixel; `0` is background, components start at `1`.
    pub labels: ImageBuffer<Luma<u32>, Vec<u32>>,
    /// Pixel count indexed by label. `areas[0]` counts background.
    pub areas: Vec<u32>,
}

impl Components {
    /// Label every non-zero pixel of `binary` with 8-connectivity.
    #[must_use]
    pub fn label(binary: &GrayImage) -> Self {
        let labels = connected_components(binary, Connectivity::Eight, Luma([0_u8]));
        let count = labels.pixels().map(|p| p.0[0]).max().unwrap_or(0) as usize;
        let mut areas = vec![0_u32; count + 1];
        for p in labels.pixels() {
            areas[p.0[0] as usize] += 1;
        }
        Self { labels, areas }
    }

    /// Number of foreground components.
    #[must_use]
    pub fn count(&self) -> usize {
        self.areas.len() - 1
    }

    /// Area of the component containing `(x, y)`, or `None` for
    /// background.
    #[must_use]
    pub fn area_at(&self, x: u32, y: u32) -> Option<u32> {
        match self.labels.get_pixel(x, y).0[0] {
            0 => None,
            label => Some(self.areas[label as usize]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_neighbours_join() {
        let mut image = GrayImage::new(6, 6);
        for i in 0..4 {
            image.put_pixel(i, i, Luma([255]));
        }
        image.put_pixel(5, 0, Luma([255]));
        let components = Components::label(&image);
        assert_eq!(components.count(), 2);
        assert_eq!(components.area_at(2, 2), Some(4));
        assert_eq!(components.area_at(5, 0), Some(1));
        assert_eq!(components.area_at(0, 5), None);
    }

    #[test]
    fn blank_image_has_no_components() {
        let components = Components::label(&GrayImage::new(4, 4));
        assert_eq!(components.count(), 0);
        assert_eq!(components.areas, vec![16]);
    }
}
