use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

use crate::derivative::MAX_GRID_POINTS;
use crate::Point;

pub const ACCELERATION_EPSILON: f64 = 1.0;
pub const RENDER_EPSILON: f64 = 0.05;

/// Ramer-Douglas-Peucker simplification.
///
/// The first and last samples are always kept, as are the samples holding the
/// smallest and largest `x`, so the displacement range of the input survives.
/// A non-positive tolerance returns the input unchanged.
pub fn simplify(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() <= 2 || !(epsilon > 0.0) {
        return points.to_vec();
    }
    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;
    if let Some((lo, hi)) = x_extent_indices(points) {
        keep[lo] = true;
        keep[hi] = true;
    }

    let mut spans = vec![(0usize, last)];
    while let Some((start, end)) = spans.pop() {
        if end <= start + 1 {
            continue;
        }
        let (a, b) = (points[start], points[end]);
        let mut max_dist = epsilon;
        let mut farthest = None;
        for (idx, point) in points.iter().enumerate().take(end).skip(start + 1) {
            let dist = perpendicular_distance(point, &a, &b);
            if dist > max_dist {
                max_dist = dist;
                farthest = Some(idx);
            }
        }
        if let Some(idx) = farthest {
            keep[idx] = true;
            spans.push((start, idx));
            spans.push((idx, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

pub fn dedupe_by_x(points: &[Point]) -> Vec<Point> {
    let mut groups: BTreeMap<OrderedFloat<f64>, (f64, usize)> = BTreeMap::new();
    for point in points {
        let entry = groups.entry(OrderedFloat(point.x)).or_insert((0.0, 0));
        entry.0 += point.y;
        entry.1 += 1;
    }
    groups
        .into_iter()
        .map(|(x, (sum, count))| Point::new(x.into_inner(), sum / count as f64))
        .collect()
}

/// Linearly interpolate an `x`-sorted, deduplicated curve onto a grid of
/// `step` spacing starting at its first `x`. The last grid point is clamped to
/// the final `x`, so that interval may be shorter than `step`. Returns an empty
/// grid when it would exceed [`MAX_GRID_POINTS`].
pub fn resample_uniform(points: &[Point], step: f64) -> Vec<Point> {
    if points.len() < 2 || !(step > 0.0) || !step.is_finite() {
        return points.to_vec();
    }
    let first = points[0];
    let last = points[points.len() - 1];
    let span = last.x - first.x;
    if !(span > 0.0) {
        return points.to_vec();
    }

    let intervals = (span / step - 1e-9).ceil().max(1.0);
    if !(intervals < MAX_GRID_POINTS as f64) {
        return Vec::new();
    }
    let intervals = intervals as usize;
    let mut out = Vec::with_capacity(intervals + 1);
    let mut seg = 0usize;
    for i in 0..=intervals {
        let x = if i == intervals {
            last.x
        } else {
            first.x + i as f64 * step
        };
        while seg + 2 < points.len() && points[seg + 1].x < x {
            seg += 1;
        }
        out.push(Point::new(x, interpolate(&points[seg], &points[seg + 1], x)));
    }
    out
}

fn interpolate(a: &Point, b: &Point, x: f64) -> f64 {
    let frac = if (b.x - a.x).abs() > f64::EPSILON {
        ((x - a.x) / (b.x - a.x)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    a.y + (b.y - a.y) * frac
}

fn x_extent_indices(points: &[Point]) -> Option<(usize, usize)> {
    let mut lo: Option<usize> = None;
    let mut hi: Option<usize> = None;
    for (idx, p) in points.iter().enumerate() {
        if p.x.is_nan() {
            continue;
        }
        if lo.map_or(true, |i| p.x < points[i].x) {
            lo = Some(idx);
        }
        if hi.map_or(true, |i| p.x > points[i].x) {
            hi = Some(idx);
        }
    }
    lo.zip(hi)
}

fn perpendicular_distance(p: &Point, start: &Point, end: &Point) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq < 1e-12 {
        return ((p.x - start.x).powi(2) + (p.y - start.y).powi(2)).sqrt();
    }
    ((p.x - start.x) * dy - (p.y - start.y) * dx).abs() / len_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x_range(points: &[Point]) -> (f64, f64) {
        points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.x), hi.max(p.x))
        })
    }

    #[test]
    fn test_collinear_points_collapse_to_endpoints() {
        let points: Vec<Point> = (0..10).map(|i| Point::new(i as f64, 2.0 * i as f64)).collect();
        let out = simplify(&points, 0.01);
        assert_eq!(out, vec![points[0], points[9]]);
    }

    #[test]
    fn test_keeps_significant_corner() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 2.45),
            Point::new(2.0, 5.0),
            Point::new(3.0, 0.0),
            Point::new(4.0, 0.05),
        ];
        let out = simplify(&points, 0.5);
        assert!(out.contains(&Point::new(2.0, 5.0)));
        assert!(!out.contains(&Point::new(1.0, 2.45)));
        assert_eq!(out.first(), points.first());
        assert_eq!(out.last(), points.last());
    }

    #[test]
    fn test_simplify_preserves_range_and_never_grows() {
        // Release stroke: x falls, with an overshoot past the final sample.
        let points = vec![
            Point::new(4.0, 80.0),
            Point::new(3.0, 60.0),
            Point::new(2.0, 50.0),
            Point::new(0.5, 30.0),
            Point::new(0.0, 2.0),
            Point::new(0.1, 0.0),
        ];
        for eps in [0.01, 1.0, 100.0] {
            let out = simplify(&points, eps);
            assert!(out.len() <= points.len());
            assert_eq!(x_range(&out), x_range(&points));
        }
    }

    #[test]
    fn test_simplify_short_or_zero_tolerance() {
        let pair = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        assert_eq!(simplify(&pair, 10.0), pair);
        let three = vec![Point::new(0.0, 0.0), Point::new(0.5, 0.5), Point::new(1.0, 1.0)];
        assert_eq!(simplify(&three, 0.0), three);
        assert!(simplify(&[], 1.0).is_empty());
    }

    #[test]
    fn test_simplify_is_stable_on_its_output() {
        let points: Vec<Point> = (0..200)
            .map(|i| {
                let x = i as f64 * 0.02;
                Point::new(x, 40.0 + 10.0 * (x * 3.0).sin())
            })
            .collect();
        let once = simplify(&points, 0.2);
        let twice = simplify(&once, 0.2);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_dedupe_averages_shared_x() {
        let points = vec![
            Point::new(0.0, 1.0),
            Point::new(0.1, 2.0),
            Point::new(0.1, 4.0),
            Point::new(0.2, 5.0),
            Point::new(0.1, 6.0),
        ];
        let out = dedupe_by_x(&points);
        assert_eq!(
            out,
            vec![Point::new(0.0, 1.0), Point::new(0.1, 4.0), Point::new(0.2, 5.0)]
        );
        assert!(out.len() <= points.len());
    }

    #[test]
    fn test_resample_uniform_grid() {
        let points = vec![Point::new(0.0, 0.0), Point::new(1.0, 10.0), Point::new(2.0, 0.0)];
        let out = resample_uniform(&points, 0.5);
        assert_eq!(out.len(), 5);
        let expected = [0.0, 5.0, 10.0, 5.0, 0.0];
        for (p, want) in out.iter().zip(expected) {
            assert!((p.y - want).abs() < 1e-9);
        }
        assert_eq!(out.first().map(|p| p.x), Some(0.0));
        assert_eq!(out.last().map(|p| p.x), Some(2.0));
    }

    #[test]
    fn test_resample_short_last_interval() {
        let points = vec![Point::new(1.0, 0.0), Point::new(2.1, 11.0)];
        let out = resample_uniform(&points, 0.5);
        let xs: Vec<f64> = out.iter().map(|p| p.x).collect();
        assert_eq!(xs.len(), 4);
        assert!((xs[2] - 2.0).abs() < 1e-12);
        assert_eq!(xs[3], 2.1);
        assert!((out[2].y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_resample_refuses_oversized_grid() {
        let points = vec![Point::new(0.0, 0.0), Point::new(1e15, 1.0)];
        assert!(resample_uniform(&points, 0.02).is_empty());
        let wide = vec![Point::new(0.0, 0.0), Point::new(MAX_GRID_POINTS as f64, 1.0)];
        assert!(resample_uniform(&wide, 1.0).is_empty());
        let fits = vec![Point::new(0.0, 0.0), Point::new((MAX_GRID_POINTS - 1) as f64, 1.0)];
        assert_eq!(resample_uniform(&fits, 1.0).len(), MAX_GRID_POINTS);
    }

    #[test]
    fn test_resample_degenerate_inputs() {
        let single = vec![Point::new(1.0, 1.0)];
        assert_eq!(resample_uniform(&single, 0.1), single);
        let pair = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        assert_eq!(resample_uniform(&pair, 0.0), pair);
    }
}
