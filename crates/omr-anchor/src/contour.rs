//! Connected components and outer-boundary tracing over 0/255 masks.

use nalgebra::Point2;
use omr_core::GrayImageView;

/// Clockwise Moore neighbourhood in image coordinates (y grows downwards),
/// starting east.
const MOORE: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const WEST: usize = 4;

/// One 8-connected foreground blob.
#[derive(Clone, Debug)]
pub struct Contour {
    /// Outer boundary pixels in tracing order (closed polygon).
    pub points: Vec<(i32, i32)>,
    /// Pixel count of the blob.
    pub area: usize,
    /// Pixel centroid of the blob.
    pub centroid: Point2<f32>,
}

impl Contour {
    /// Length of the closed polygon through `points`.
    pub fn perimeter(&self) -> f32 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| {
                let (ax, ay) = self.points[i];
                let (bx, by) = self.points[(i + 1) % n];
                ((ax - bx) as f32).hypot((ay - by) as f32)
            })
            .sum()
    }

    /// `4πA / P²`: 1 for a disc, smaller for elongated shapes.
    pub fn circularity(&self) -> f32 {
        let p = self.perimeter();
        if p <= 0.0 {
            return 0.0;
        }
        4.0 * std::f32::consts::PI * self.area as f32 / (p * p)
    }
}

#[inline]
fn is_fg(mask: &GrayImageView<'_>, x: i32, y: i32) -> bool {
    mask.get(x, y).is_some_and(|v| v > 0)
}

/// Extract every 8-connected foreground component of `mask`.
///
/// Components are discovered in raster order; the flood fill uses an
/// explicit stack so large blobs cannot overflow the call stack.
pub fn find_contours(mask: &GrayImageView<'_>) -> Vec<Contour> {
    let (w, h) = (mask.width, mask.height);
    let mut seen = vec![false; w * h];
    let mut stack: Vec<(i32, i32)> = Vec::new();
    let mut out = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if seen[idx] || mask.data[idx] == 0 {
                continue;
            }

            seen[idx] = true;
            stack.push((x as i32, y as i32));
            let mut area = 0usize;
            let (mut sx, mut sy) = (0.0f64, 0.0f64);

            while let Some((cx, cy)) = stack.pop() {
                area += 1;
                sx += cx as f64;
                sy += cy as f64;
                for (dx, dy) in MOORE {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if !is_fg(mask, nx, ny) {
                        continue;
                    }
                    let nidx = ny as usize * w + nx as usize;
                    if !seen[nidx] {
                        seen[nidx] = true;
                        stack.push((nx, ny));
                    }
                }
            }

            let points = trace_boundary(mask, x as i32, y as i32);
            out.push(Contour {
                points,
                area,
                centroid: Point2::new((sx / area as f64) as f32, (sy / area as f64) as f32),
            });
        }
    }

    out
}

/// Moore-neighbour tracing of the outer boundary.
///
/// `(sx, sy)` must be the first foreground pixel of its component in raster
/// order, so its west neighbour is background. Tracing stops when the walk
/// re-enters the start pixel.
fn trace_boundary(mask: &GrayImageView<'_>, sx: i32, sy: i32) -> Vec<(i32, i32)> {
    let mut points = vec![(sx, sy)];
    let (mut cx, mut cy) = (sx, sy);
    let mut back = WEST;
    let max_steps = 4 * mask.width * mask.height + 8;

    for _ in 0..max_steps {
        let mut next = None;
        for i in 1..=8 {
            let d = (back + i) % 8;
            let (nx, ny) = (cx + MOORE[d].0, cy + MOORE[d].1);
            if is_fg(mask, nx, ny) {
                // the last background neighbour examined becomes the new backtrack
                let prev = (back + i - 1) % 8;
                let (px, py) = (cx + MOORE[prev].0, cy + MOORE[prev].1);
                next = Some((nx, ny, direction(px - nx, py - ny)));
                break;
            }
        }

        let Some((nx, ny, nb)) = next else {
            // isolated pixel
            return points;
        };
        cx = nx;
        cy = ny;
        back = nb;
        if (cx, cy) == (sx, sy) {
            return points;
        }
        points.push((cx, cy));
    }

    points
}

fn direction(dx: i32, dy: i32) -> usize {
    MOORE
        .iter()
        .position(|&d| d == (dx, dy))
        .unwrap_or(WEST)
}
