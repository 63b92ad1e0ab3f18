use std::cmp::Ordering;

use crate::Point;

pub fn find_local_maxima(points: &[Point]) -> Vec<Point> {
    scan_turning_points(points, Ordering::Greater)
}

pub fn find_local_minima(points: &[Point]) -> Vec<Point> {
    scan_turning_points(points, Ordering::Less)
}

fn scan_turning_points(points: &[Point], approach: Ordering) -> Vec<Point> {
    let mut out = Vec::new();
    let mut candidate: Option<usize> = None;
    for i in 1..points.len() {
        match points[i].y.partial_cmp(&points[i - 1].y) {
            Some(Ordering::Equal) | None => {}
            Some(step) if step == approach => candidate = Some(i),
            Some(_) => {
                if let Some(idx) = candidate.take() {
                    out.push(points[idx]);
                }
            }
        }
    }
    out
}
