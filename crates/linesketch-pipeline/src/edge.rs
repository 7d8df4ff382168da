//! Canny edge detection.
//!
//! Operates on the image as given (callers blur first when they want
//! to), uses the L1 gradient norm `|gx| + |gy|` of a 3x3 Sobel, thins
//! with four-direction non-maximum suppression and links with
//! 8-neighbour hysteresis. Edge pixels are 255, everything else 0.

use image::{GrayImage, Luma};

use crate::arith::to_float;
use crate::gradient::Gradient;
use crate::types::FloatImage;

/// Detect edges with the given hysteresis thresholds.
///
/// Thresholds are swapped if given in the wrong order. Gradients above
/// `high` seed edges; gradients above `low` extend them.
#[must_use = "returns the edge map"]
pub fn canny(image: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (low, high) = if low <= high { (low, high) } else { (high, low) };
    let (w, h) = image.dimensions();
    if w < 3 || h < 3 {
        return GrayImage::new(w, h);
    }
    let gradient = Gradient::sobel(&to_float(image), 3);
    let magnitude = FloatImage::from_fn(w, h, |x, y| {
        Luma([gradient.gx.get_pixel(x, y).0[0].abs() + gradient.gy.get_pixel(x, y).0[0].abs()])
    });
    let thinned = non_maximum_suppression(&magnitude, &gradient);
    hysteresis(&thinned, low, high)
}

/// Keep only pixels that are a local maximum across the edge direction.
fn non_maximum_suppression(magnitude: &FloatImage, gradient: &Gradient) -> FloatImage {
    // tan(22.5 deg) and tan(67.5 deg).
    const TAN_22_5: f32 = 0.414_213_57;
    const TAN_67_5: f32 = 2.414_213_6;

    let (w, h) = magnitude.dimensions();
    let m = |x: u32, y: u32| magnitude.get_pixel(x, y).0[0];
    let mut out = FloatImage::new(w, h);
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let value = m(x, y);
            if value == 0.0 {
                continue;
            }
            let gx = gradient.gx.get_pixel(x, y).0[0];
            let gy = gradient.gy.get_pixel(x, y).0[0];
            let (ax, ay) = (gx.abs(), gy.abs());
            let (a, b) = if ay <= ax * TAN_22_5 {
                (m(x - 1, y), m(x + 1, y))
            } else if ay >= ax * TAN_67_5 {
                (m(x, y - 1), m(x, y + 1))
            } else if (gx > 0.0) == (gy > 0.0) {
                (m(x - 1, y - 1), m(x + 1, y + 1))
            } else {
                (m(x + 1, y - 1), m(x - 1, y + 1))
            };
            if value > a && value >= b {
                out.put_pixel(x, y, Luma([value]));
            }
        }
    }
    out
}

/// Grow edges from strong pixels through connected weak ones.
fn hysteresis(thinned: &FloatImage, low: f32, high: f32) -> GrayImage {
    let (w, h) = thinned.dimensions();
    let mut out = GrayImage::new(w, h);
    let mut stack = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if thinned.get_pixel(x, y).0[0] <= high || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, Luma([255]));
            stack.push((x, y));
            while let Some((cx, cy)) = stack.pop() {
                for ny in cy.saturating_sub(1)..=(cy + 1).min(h - 1) {
                    for nx in cx.saturating_sub(1)..=(cx + 1).min(w - 1) {
                        if out.get_pixel(nx, ny).0[0] == 0 && thinned.get_pixel(nx, ny).0[0] > low {
                            out.put_pixel(nx, ny, Luma([255]));
                            stack.push((nx, ny));
                        }
                    }
                }
            }
        }
    }
    out
}

/// Bounding box `(x, y, width, height)` of the non-zero pixels, or
/// `None` when there are none.
#[must_use]
pub fn nonzero_bounds(image: &GrayImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, p) in image.enumerate_pixels() {
        if p.0[0] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds.map(|(x0, y0, x1, y1)| (x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_image() -> GrayImage {
        GrayImage::from_fn(40, 40, |x, y| {
            Luma([if (10..30).contains(&x) && (10..30).contains(&y) { 220 } else { 20 }])
        })
    }

    #[test]
    fn flat_image_has_no_edges() {
        let out = canny(&GrayImage::from_pixel(20, 20, Luma([128])), 20.0, 80.0);
        assert!(out.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn square_edges_are_found_and_thin() {
        let out = canny(&square_image(), 20.0, 80.0);
        let along_row: Vec<u32> = (0..40).filter(|&x| out.get_pixel(x, 20).0[0] == 255).collect();
        assert!(!along_row.is_empty(), "expected edges across the square");
        assert!(
            along_row.iter().all(|&x| (8..=11).contains(&x) || (28..=31).contains(&x)),
            "edges only near the square sides, got {along_row:?}"
        );
        assert!(along_row.len() <= 4, "expected thin edges, got {along_row:?}");
    }

    #[test]
    fn output_is_binary() {
        let out = canny(&square_image(), 20.0, 80.0);
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn tiny_image_has_no_edges() {
        assert_eq!(canny(&GrayImage::new(2, 2), 1.0, 2.0).dimensions(), (2, 2));
    }

    #[test]
    fn bounds_of_edges() {
        let out = canny(&square_image(), 20.0, 80.0);
        let (x, y, w, h) = nonzero_bounds(&out).unwrap_or_default();
        assert!((8..=11).contains(&x) && (8..=11).contains(&y), "origin ({x}, {y})");
        assert!((18..=24).contains(&w) && (18..=24).contains(&h), "size {w}x{h}");
        assert_eq!(nonzero_bounds(&GrayImage::new(5, 5)), None);
    }
}
