//! Line vectorization: trace ink pixels into polylines, drop the short
//! ones, simplify them, optionally join near-continuous pieces, and
//! rasterize the result again.

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};
use tiny_skia::{Color, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::types::{Dimensions, Path, Percent, PixelPoint};

/// Pixels darker than this are traced.
pub const TRACE_INK_LEVEL: u8 = 200;

/// Largest direction change (degrees) bridged when merging paths.
pub const MERGE_ANGLE_DEGREES: f64 = 35.0;

/// Vectorizer sliders, each in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizeParams {
    /// Higher keeps shorter strokes.
    pub detail: Percent,
    /// Higher simplifies more aggressively.
    pub smooth: Percent,
    /// Higher joins pieces across larger gaps; `0` disables joining.
    pub merge: Percent,
}

impl VectorizeParams {
    /// Clamp each slider into `0..=100`.
    #[must_use]
    pub fn new(detail: i64, smooth: i64, merge: i64) -> Self {
        Self {
            detail: Percent::new(detail),
            smooth: Percent::new(smooth),
            merge: Percent::new(merge),
        }
    }

    /// Traced chains must be longer than this: `2 + (100 - detail) / 4`.
    #[must_use]
    pub fn min_length(&self) -> f64 {
        f64::from(self.detail.inverse()).mul_add(0.25, 2.0)
    }

    /// Douglas-Peucker tolerance: `0.5 + 0.04 * smooth`.
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        f64::from(self.smooth.get()).mul_add(0.04, 0.5)
    }

    /// Endpoint distance bridged by merging: `1 + 0.08 * merge`.
    #[must_use]
    pub fn merge_distance(&self) -> f64 {
        f64::from(self.merge.get()).mul_add(0.08, 1.0)
    }
}

/// Turns an ink mask into pixel chains.
///
/// Input: a binary image where non-zero pixels are ink.
/// Output: ordered chains of adjacent ink pixels; every ink pixel
/// appears in exactly one chain (possibly a single-pixel one).
pub trait Tracer {
    /// Trace the ink into chains.
    fn trace(&self, ink: &GrayImage) -> Vec<Vec<PixelPoint>>;
}

/// Available tracing strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TracerKind {
    /// Greedy walk to the first unvisited 8-neighbour.
    #[default]
    Greedy,
}

impl Tracer for TracerKind {
    fn trace(&self, ink: &GrayImage) -> Vec<Vec<PixelPoint>> {
        match *self {
            Self::Greedy => trace_greedy(ink),
        }
    }
}

/// Fixed neighbour order: NW, N, NE, W, E, SW, S, SE.
const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Row-major scan; from each unvisited ink pixel, repeatedly step to the
/// first unvisited ink neighbour until there is none.
fn trace_greedy(ink: &GrayImage) -> Vec<Vec<PixelPoint>> {
    let (w, h) = ink.dimensions();
    let (wi, hi) = (i64::from(w), i64::from(h));
    let index = |x: i64, y: i64| -> Option<usize> {
        ((0..wi).contains(&x) && (0..hi).contains(&y))
            .then(|| usize::try_from(y * wi + x).ok())
            .flatten()
    };
    let is_ink: Vec<bool> = ink.pixels().map(|p| p.0[0] != 0).collect();
    let mut visited = vec![false; is_ink.len()];
    let mut chains = Vec::new();

    let point = |x: i64, y: i64| {
        PixelPoint::new(
            i32::try_from(x).unwrap_or(i32::MAX),
            i32::try_from(y).unwrap_or(i32::MAX),
        )
    };

    for y in 0..hi {
        for x in 0..wi {
            let Some(start) = index(x, y) else { continue };
            if !is_ink[start] || visited[start] {
                continue;
            }
            visited[start] = true;
            let mut chain = vec![point(x, y)];
            let (mut cx, mut cy) = (x, y);
            'walk: loop {
                for (dx, dy) in NEIGHBOURS {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if let Some(i) = index(nx, ny)
                        && is_ink[i]
                        && !visited[i]
                    {
                        visited[i] = true;
                        chain.push(point(nx, ny));
                        (cx, cy) = (nx, ny);
                        continue 'walk;
                    }
                }
                break;
            }
            chains.push(chain);
        }
    }
    chains
}

/// Perpendicular distance from `p` to the line through `a` and `b`
/// (the distance to `a` when they coincide).
fn line_distance(p: PixelPoint, a: PixelPoint, b: PixelPoint) -> f64 {
    let (dx, dy) = (f64::from(b.x - a.x), f64::from(b.y - a.y));
    let length = dx.hypot(dy);
    if length == 0.0 {
        return p.distance(a);
    }
    (dy.mul_add(f64::from(p.x - a.x), -dx * f64::from(p.y - a.y))).abs() / length
}

/// Douglas-Peucker simplification of an open polyline, with an explicit
/// stack instead of recursion. Endpoints are always kept.
#[must_use]
pub fn simplify(points: &[PixelPoint], epsilon: f64) -> Vec<PixelPoint> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    let mut stack = vec![(0, points.len() - 1)];
    while let Some((first, last)) = stack.pop() {
        if last <= first + 1 {
            continue;
        }
        let (a, b) = (points[first], points[last]);
        let (farthest, distance) = (first + 1..last)
            .map(|i| (i, line_distance(points[i], a, b)))
            .fold((first, 0.0_f64), |best, candidate| {
                if candidate.1 > best.1 { candidate } else { best }
            });
        if distance > epsilon {
            keep[farthest] = true;
            stack.push((first, farthest));
            stack.push((farthest, last));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Direction of the segment `a -> b` in degrees.
fn heading(a: PixelPoint, b: PixelPoint) -> f64 {
    f64::from(b.y - a.y).atan2(f64::from(b.x - a.x)).to_degrees()
}

/// Smallest absolute difference between two headings, in `[0, 180]`.
fn heading_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// Whether `next` continues `path`: its start is within `distance` of
/// the end of `path` and it leaves in nearly the same direction.
fn continues(path: &Path, next: &Path, distance: f64) -> bool {
    let p = path.points();
    let q = next.points();
    let (a1, a2) = (p[p.len() - 2], p[p.len() - 1]);
    let (b1, b2) = (q[0], q[1]);
    a2.distance(b1) <= distance
        && heading_difference(heading(a1, a2), heading(b1, b2)) < MERGE_ANGLE_DEGREES
}

/// Greedily append paths that continue one another until no pair
/// qualifies. Earlier paths absorb later ones; order is otherwise kept.
#[must_use]
pub fn merge_paths(mut paths: Vec<Path>, distance: f64) -> Vec<Path> {
    'restart: loop {
        for i in 0..paths.len() {
            for j in i + 1..paths.len() {
                if continues(&paths[i], &paths[j], distance) {
                    let tail = paths.remove(j);
                    paths[i].append(tail);
                    continue 'restart;
                }
            }
        }
        return paths;
    }
}

/// Vectorize the ink of `line` with the default tracer.
#[must_use = "returns the traced paths"]
pub fn vectorize(line: &GrayImage, params: VectorizeParams) -> Vec<Path> {
    vectorize_with(line, params, &TracerKind::default())
}

/// Vectorize the ink (`< 200`) of `line` with `tracer`.
///
/// Chains no longer than [`VectorizeParams::min_length`] are dropped,
/// the rest are simplified with [`VectorizeParams::epsilon`] and, when
/// `merge > 0`, joined with [`merge_paths`].
#[must_use = "returns the traced paths"]
pub fn vectorize_with(line: &GrayImage, params: VectorizeParams, tracer: &dyn Tracer) -> Vec<Path> {
    let ink = GrayImage::from_fn(line.width(), line.height(), |x, y| {
        Luma([u8::from(line.get_pixel(x, y).0[0] < TRACE_INK_LEVEL)])
    });
    let min_length = params.min_length();
    let epsilon = params.epsilon();

    let chains = tracer.trace(&ink);
    let traced = chains.len();
    #[allow(clippy::cast_precision_loss)]
    let mut paths: Vec<Path> = chains
        .into_iter()
        .filter(|chain| chain.len() as f64 > min_length)
        .filter_map(|chain| Path::new(simplify(&chain, epsilon)))
        .collect();

    if params.merge.get() > 0 {
        paths = merge_paths(paths, params.merge_distance());
    }
    log::debug!(
        "vectorize: {traced} chains, {} paths (min length {min_length:.2}, epsilon {epsilon:.2})",
        paths.len()
    );
    paths
}

/// Rasterize `paths` as 1 px anti-aliased black lines on white.
#[must_use = "returns the preview raster"]
pub fn draw_preview(dimensions: Dimensions, paths: &[Path]) -> GrayImage {
    let Dimensions { width, height } = dimensions;
    let blank = || GrayImage::from_pixel(width, height, Luma([255]));

    let mut pb = PathBuilder::new();
    #[allow(clippy::cast_precision_loss)]
    let centre = |p: &PixelPoint| (p.x as f32 + 0.5, p.y as f32 + 0.5);
    for path in paths {
        let (x, y) = centre(&path.start());
        pb.move_to(x, y);
        for p in &path.points()[1..] {
            let (x, y) = centre(p);
            pb.line_to(x, y);
        }
    }
    let Some(shape) = pb.finish() else {
        return blank();
    };
    let Some(mut pixmap) = Pixmap::new(width, height) else {
        return blank();
    };
    pixmap.fill(Color::WHITE);

    let mut paint = Paint::default();
    paint.set_color_rgba8(0, 0, 0, 255);
    paint.anti_alias = true;
    let stroke = Stroke {
        width: 1.0,
        ..Stroke::default()
    };
    pixmap.stroke_path(&shape, &paint, &stroke, Transform::identity(), None);

    // Opaque gray, so the red channel is the value.
    let data = pixmap.data();
    GrayImage::from_fn(width, height, |x, y| {
        let offset = (y as usize * width as usize + x as usize) * 4;
        Luma([data[offset]])
    })
}
