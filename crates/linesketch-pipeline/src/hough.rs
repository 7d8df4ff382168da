//! Progressive probabilistic Hough transform for straight segments.
//!
//! Edge pixels vote into a (theta, rho) accumulator one at a time. As
//! soon as a pixel pushes some bin to the threshold, the corresponding
//! line is walked in both directions from that pixel, bridging gaps of
//! up to `max_gap`. Walked pixels leave the pool (and withdraw their
//! votes if the segment was long enough), so each pixel belongs to at
//! most one segment.
//!
//! Pixels are visited in row-major order rather than at random, which
//! keeps the output reproducible.

use std::f64::consts::PI;

use image::{GrayImage, Luma};
use imageproc::drawing::draw_line_segment_mut;

use crate::types::PixelPoint;

/// Fixed-point fraction bits used while walking a line.
const SHIFT: u32 = 16;

/// Detection parameters. Angles are sampled at one degree and distances
/// at one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoughParams {
    /// Votes a line needs before it is walked.
    pub threshold: u32,
    /// Shortest segment (along either axis) that is reported.
    pub min_length: i32,
    /// Largest run of missing pixels bridged inside one segment.
    pub max_gap: i32,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            threshold: 60,
            min_length: 40,
            max_gap: 10,
        }
    }
}

/// A detected straight segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// One end.
    pub start: PixelPoint,
    /// The other end.
    pub end: PixelPoint,
}

struct Accumulator {
    trig: Vec<(f64, f64)>,
    num_rho: usize,
    votes: Vec<u32>,
}

impl Accumulator {
    fn new(width: u32, height: u32) -> Self {
        let num_angle = 180_usize;
        let num_rho = ((width as usize + height as usize) * 2) + 1;
        #[allow(clippy::cast_precision_loss)]
        let trig = (0..num_angle)
            .map(|n| {
                let theta = n as f64 * PI / num_angle as f64;
                (theta.cos(), theta.sin())
            })
            .collect();
        Self {
            trig,
            num_rho,
            votes: vec![0; num_angle * num_rho],
        }
    }

    fn bin(&self, n: usize, x: i32, y: i32) -> usize {
        let (c, s) = self.trig[n];
        // |rho| <= w + h, so the offset bin is in range.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let r = (f64::from(x).mul_add(c, f64::from(y) * s).round() as i64
            + (self.num_rho as i64 - 1) / 2) as usize;
        n * self.num_rho + r
    }

    /// Add the votes of `(x, y)`; returns the strongest bin's count and
    /// angle index.
    fn vote(&mut self, x: i32, y: i32) -> (u32, usize) {
        let mut best = (0, 0);
        for n in 0..self.trig.len() {
            let bin = self.bin(n, x, y);
            self.votes[bin] += 1;
            if self.votes[bin] > best.0 {
                best = (self.votes[bin], n);
            }
        }
        best
    }

    fn unvote(&mut self, x: i32, y: i32) {
        for n in 0..self.trig.len() {
            let bin = self.bin(n, x, y);
            self.votes[bin] = self.votes[bin].saturating_sub(1);
        }
    }
}

/// Fixed-point walker along a line through a pixel.
#[derive(Debug, Clone, Copy)]
struct Walker {
    x0: i64,
    y0: i64,
    dx: i64,
    dy: i64,
    x_major: bool,
}

impl Walker {
    // Step ratios are bounded by one pixel per step.
    #[allow(clippy::cast_possible_truncation)]
    fn new(x: i32, y: i32, cos: f64, sin: f64) -> Self {
        let (a, b) = (-sin, cos);
        let one = f64::from(1_u32 << SHIFT);
        let half = 1_i64 << (SHIFT - 1);
        if a.abs() > b.abs() {
            Self {
                x0: i64::from(x),
                y0: (i64::from(y) << SHIFT) + half,
                dx: if a > 0.0 { 1 } else { -1 },
                dy: (b * one / a.abs()).round() as i64,
                x_major: true,
            }
        } else {
            Self {
                x0: (i64::from(x) << SHIFT) + half,
                y0: i64::from(y),
                dx: (a * one / b.abs()).round() as i64,
                dy: if b > 0.0 { 1 } else { -1 },
                x_major: false,
            }
        }
    }

    /// Pixel `k` steps along the line (negative `k` walks backwards).
    fn pixel(&self, k: i64) -> (i64, i64) {
        let (x, y) = (self.x0 + k * self.dx, self.y0 + k * self.dy);
        if self.x_major {
            (x, y >> SHIFT)
        } else {
            (x >> SHIFT, y)
        }
    }
}

/// Detect straight segments among the non-zero pixels of `edges`.
#[must_use]
pub fn detect_segments(edges: &GrayImage, params: HoughParams) -> Vec<Segment> {
    let (w, h) = edges.dimensions();
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let (wi, hi) = (i64::from(w), i64::from(h));
    let idx = |x: i64, y: i64| -> Option<usize> {
        ((0..wi).contains(&x) && (0..hi).contains(&y)).then(|| {
            // Both coordinates were just bounds-checked.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let i = (y * wi + x) as usize;
            i
        })
    };

    let mut pool: Vec<bool> = edges.pixels().map(|p| p.0[0] != 0).collect();
    let points: Vec<(i32, i32)> = edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] != 0)
        .filter_map(|(x, y, _)| Some((i32::try_from(x).ok()?, i32::try_from(y).ok()?)))
        .collect();

    let mut acc = Accumulator::new(w, h);
    let mut segments = Vec::new();

    for (px, py) in points {
        if idx(i64::from(px), i64::from(py)).is_none_or(|i| !pool[i]) {
            continue;
        }
        let (votes, best) = acc.vote(px, py);
        if votes < params.threshold {
            continue;
        }

        let (cos, sin) = acc.trig[best];
        let walker = Walker::new(px, py, cos, sin);

        // Find both ends, bridging short gaps.
        let mut ends = [(i64::from(px), i64::from(py)); 2];
        let mut reach = [0_i64; 2];
        for (side, sign) in [1_i64, -1].into_iter().enumerate() {
            let mut gap = 0;
            for k in 0.. {
                let (x, y) = walker.pixel(sign * k);
                let Some(i) = idx(x, y) else { break };
                if pool[i] {
                    gap = 0;
                    ends[side] = (x, y);
                    reach[side] = k;
                } else {
                    gap += 1;
                    if gap > params.max_gap {
                        break;
                    }
                }
            }
        }

        let min_length = i64::from(params.min_length);
        let long_enough = (ends[1].0 - ends[0].0).abs() >= min_length
            || (ends[1].1 - ends[0].1).abs() >= min_length;

        // Consume the walked pixels.
        for (side, sign) in [1_i64, -1].into_iter().enumerate() {
            for k in 0..=reach[side] {
                let (x, y) = walker.pixel(sign * k);
                let Some(i) = idx(x, y) else { break };
                if pool[i] {
                    if long_enough {
                        // In-bounds, so they fit i32.
                        #[allow(clippy::cast_possible_truncation)]
                        acc.unvote(x as i32, y as i32);
                    }
                    pool[i] = false;
                }
            }
        }

        if long_enough {
            #[allow(clippy::cast_possible_truncation)]
            segments.push(Segment {
                start: PixelPoint::new(ends[0].0 as i32, ends[0].1 as i32),
                end: PixelPoint::new(ends[1].0 as i32, ends[1].1 as i32),
            });
        }
    }

    log::debug!("hough: {} segments", segments.len());
    segments
}

/// Draw segments with the given value and thickness (in pixels across
/// the segment). Mutates `image` in place.
pub fn draw_segments_mut(image: &mut GrayImage, segments: &[Segment], value: u8, thickness: u32) {
    let spread = i32::try_from(thickness.max(1)).unwrap_or(1);
    for segment in segments {
        let (s, e) = (segment.start, segment.end);
        let shallow = (e.x - s.x).abs() >= (e.y - s.y).abs();
        for t in 0..spread {
            let offset = t - (spread - 1) / 2;
            let (ox, oy) = if shallow { (0, offset) } else { (offset, 0) };
            #[allow(clippy::cast_precision_loss)]
            draw_line_segment_mut(
                image,
                ((s.x + ox) as f32, (s.y + oy) as f32),
                ((e.x + ox) as f32, (e.y + oy) as f32),
                Luma([value]),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horizontal_line(width: u32, height: u32, row: u32, from: u32, to: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            Luma([if y == row && (from..to).contains(&x) { 255 } else { 0 }])
        })
    }

    #[test]
    fn finds_one_long_horizontal_segment() {
        let edges = horizontal_line(120, 40, 20, 10, 110);
        let segments = detect_segments(&edges, HoughParams::default());
        assert_eq!(segments.len(), 1, "got {segments:?}");
        let s = segments[0];
        let (lo, hi) = (s.start.x.min(s.end.x), s.start.x.max(s.end.x));
        assert!(lo <= 12 && hi >= 107, "segment spans {lo}..{hi}");
        assert_eq!(s.start.y, 20);
        assert_eq!(s.end.y, 20);
    }

    #[test]
    fn short_segments_are_dropped() {
        let edges = horizontal_line(120, 40, 20, 10, 30);
        assert!(detect_segments(&edges, HoughParams::default()).is_empty());
    }

    #[test]
    fn small_gaps_are_bridged() {
        let mut edges = horizontal_line(150, 40, 5, 10, 140);
        for x in 60..66 {
            edges.put_pixel(x, 5, Luma([0]));
        }
        let segments = detect_segments(&edges, HoughParams::default());
        assert_eq!(segments.len(), 1, "got {segments:?}");
    }

    #[test]
    fn detection_is_deterministic() {
        let edges = GrayImage::from_fn(100, 100, |x, y| Luma([if x == y || x == 30 { 255 } else { 0 }]));
        let a = detect_segments(&edges, HoughParams::default());
        let b = detect_segments(&edges, HoughParams::default());
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn empty_edges_have_no_segments() {
        assert!(detect_segments(&GrayImage::new(50, 50), HoughParams::default()).is_empty());
        assert!(detect_segments(&GrayImage::new(0, 0), HoughParams::default()).is_empty());
    }

    #[test]
    fn drawn_segment_is_two_pixels_thick() {
        let mut canvas = GrayImage::new(40, 20);
        let segment = Segment {
            start: PixelPoint::new(5, 10),
            end: PixelPoint::new(35, 10),
        };
        draw_segments_mut(&mut canvas, &[segment], 255, 2);
        assert_eq!(canvas.get_pixel(20, 10).0[0], 255);
        assert_eq!(canvas.get_pixel(20, 11).0[0], 255);
        assert_eq!(canvas.get_pixel(20, 9).0[0], 0);
        assert_eq!(canvas.get_pixel(20, 12).0[0], 0);
    }
}
