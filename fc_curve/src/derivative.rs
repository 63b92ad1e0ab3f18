use ndarray::{s, Array1};

use crate::simplify::{dedupe_by_x, resample_uniform};
use crate::Point;

pub const DIFFERENCE_STEP: f64 = 0.02;
pub const BLUR_RADIUS: usize = 3;
/// Largest grid the resampler will build. Real strokes span a few
/// millimetres; a wider span means a corrupt displacement reading.
pub const MAX_GRID_POINTS: usize = 100_000;

/// Estimate `dy/dx` of a curve.
///
/// The curve is deduplicated, resampled to [`DIFFERENCE_STEP`], differenced
/// pairwise (each slope sits at the left sample of its pair) and blurred with
/// radius [`BLUR_RADIUS`]. The result has one point fewer than the grid, and
/// is itself a valid input, so applying this twice yields acceleration.
pub fn derivative(points: &[Point]) -> Vec<Point> {
    let grid = resample_uniform(&dedupe_by_x(points), DIFFERENCE_STEP);
    if grid.len() < 2 {
        return Vec::new();
    }
    let slopes: Array1<f64> = grid
        .windows(2)
        .map(|w| (w[1].y - w[0].y) / (w[1].x - w[0].x))
        .collect();
    let smoothed = blur(&slopes, BLUR_RADIUS);
    grid.iter()
        .zip(smoothed.iter())
        .map(|(p, &slope)| Point::new(p.x, slope))
        .collect()
}

pub fn blur(values: &Array1<f64>, radius: usize) -> Array1<f64> {
    let n = values.len();
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(radius);
            let end = (i + radius + 1).min(n);
            values.slice(s![start..end]).mean().unwrap_or(0.0)
        })
        .collect()
}
