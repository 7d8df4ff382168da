//! Grayscale morphology with square structuring elements.
//!
//! Dilation is a `k x k` maximum filter and erosion a `k x k` minimum
//! filter. Samples outside the image are ignored, so borders never
//! introduce ink or paper. The `_mut` functions overwrite their argument
//! in place.

use std::collections::VecDeque;

use image::GrayImage;

use crate::kernel::odd_ksize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extremum {
    Max,
    Min,
}

impl Extremum {
    /// Whether `a` can never be the window extremum once `b` has entered.
    const fn dominated(self, a: u8, b: u8) -> bool {
        match self {
            Self::Max => a <= b,
            Self::Min => a >= b,
        }
    }
}

/// Sliding-window extremum of radius `r` over `line`, written to `out`.
fn sliding(line: &[u8], r: usize, op: Extremum, out: &mut [u8]) {
    let n = line.len();
    let mut window: VecDeque<usize> = VecDeque::with_capacity(2 * r + 1);
    for i in 0..n + r {
        if i < n {
            while window.back().is_some_and(|&b| op.dominated(line[b], line[i])) {
                window.pop_back();
            }
            window.push_back(i);
        }
        if i >= r {
            let centre = i - r;
            while window.front().is_some_and(|&f| f + r < centre) {
                window.pop_front();
            }
            if let Some(&f) = window.front() {
                out[centre] = line[f];
            }
        }
    }
}

fn filter_mut(image: &mut GrayImage, ksize: u32, op: Extremum) {
    let k = odd_ksize(ksize, 1) as usize;
    let (w, h) = (image.width() as usize, image.height() as usize);
    if k == 1 || w == 0 || h == 0 {
        return;
    }
    let r = k / 2;
    let buf: &mut [u8] = image;

    let mut scratch = vec![0_u8; w.max(h)];
    for row in buf.chunks_exact_mut(w) {
        sliding(row, r, op, &mut scratch[..w]);
        row.copy_from_slice(&scratch[..w]);
    }

    let mut column = vec![0_u8; h];
    for x in 0..w {
        for (y, v) in column.iter_mut().enumerate() {
            *v = buf[y * w + x];
        }
        sliding(&column, r, op, &mut scratch[..h]);
        for (y, &v) in scratch[..h].iter().enumerate() {
            buf[y * w + x] = v;
        }
    }
}

/// `k x k` maximum filter, in place.
pub fn dilate_mut(image: &mut GrayImage, ksize: u32) {
    filter_mut(image, ksize, Extremum::Max);
}

/// `k x k` minimum filter, in place.
pub fn erode_mut(image: &mut GrayImage, ksize: u32) {
    filter_mut(image, ksize, Extremum::Min);
}

/// Erode `iterations` times, then dilate `iterations` times. In place.
pub fn open_mut(image: &mut GrayImage, ksize: u32, iterations: u32) {
    for _ in 0..iterations {
        erode_mut(image, ksize);
    }
    for _ in 0..iterations {
        dilate_mut(image, ksize);
    }
}

/// Dilate `iterations` times, then erode `iterations` times. In place.
pub fn close_mut(image: &mut GrayImage, ksize: u32, iterations: u32) {
    for _ in 0..iterations {
        dilate_mut(image, ksize);
    }
    for _ in 0..iterations {
        erode_mut(image, ksize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn dilate(image: &GrayImage, ksize: u32) -> GrayImage {
        let mut out = image.clone();
        dilate_mut(&mut out, ksize);
        out
    }

    fn dot(size: u32, at: (u32, u32), value: u8) -> GrayImage {
        let mut image = GrayImage::new(size, size);
        image.put_pixel(at.0, at.1, Luma([value]));
        image
    }

    #[test]
    fn dilate_grows_dot_to_square() {
        let out = dilate(&dot(9, (4, 4), 200), 3);
        for y in 0..9 {
            for x in 0..9 {
                let expected = if (3..=5).contains(&x) && (3..=5).contains(&y) { 200 } else { 0 };
                assert_eq!(out.get_pixel(x, y).0[0], expected, "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn erode_removes_isolated_dot() {
        let mut image = dot(9, (4, 4), 255);
        erode_mut(&mut image, 3);
        assert!(image.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn border_samples_are_ignored() {
        let mut image = GrayImage::from_pixel(4, 4, Luma([255]));
        erode_mut(&mut image, 3);
        assert!(image.pixels().all(|p| p.0[0] == 255), "erosion must not pull in a dark border");
    }

    #[test]
    fn even_size_rounds_up() {
        assert_eq!(dilate(&dot(9, (4, 4), 9), 2), dilate(&dot(9, (4, 4), 9), 3));
    }

    #[test]
    fn close_fills_one_pixel_gap() {
        let mut image = GrayImage::from_fn(9, 3, |x, _| Luma([if x == 4 { 0 } else { 255 }]));
        close_mut(&mut image, 3, 1);
        assert!(image.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn open_keeps_large_blocks() {
        let mut image = GrayImage::from_fn(12, 12, |x, y| {
            Luma([if (2..9).contains(&x) && (2..9).contains(&y) { 255 } else { 0 }])
        });
        let before = image.clone();
        open_mut(&mut image, 3, 2);
        assert_eq!(image, before);
    }

    #[test]
    fn size_one_is_identity() {
        let image = dot(5, (1, 2), 77);
        assert_eq!(dilate(&image, 1), image);
    }
}
