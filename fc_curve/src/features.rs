use crate::derivative::{derivative, DIFFERENCE_STEP};
use crate::extrema::{find_local_maxima, find_local_minima};
use crate::simplify::{simplify, ACCELERATION_EPSILON};
use crate::{CurveMetadata, Point};

pub const MIN_TACTILE_GAP: f64 = 0.3;
pub const TACTILE_FORCE_RATIO: f64 = 0.2;
pub const TACTILE_FORCE_CAP: f64 = 5.0;

// Two left-indexed difference passes: an acceleration sample at `x` covers
// the curve up to `x + 2 * DIFFERENCE_STEP`.
const ACCELERATION_LEAD: f64 = 2.0 * DIFFERENCE_STEP;

/// Derive the metadata record for one downstroke. Never fails; anything that
/// cannot be detected stays at the origin and the curve reads as linear.
pub fn extract_features(downstroke: &[Point]) -> CurveMetadata {
    let displacement = bottom_out_displacement(downstroke);
    let bottom_out = displacement
        .and_then(|x| sample_at_or_past(downstroke, x))
        .unwrap_or(Point::ORIGIN);
    let pair = find_tactile_pair(downstroke, displacement.unwrap_or(0.0));
    let (tactile_max, tactile_min) = pair.unwrap_or((Point::ORIGIN, Point::ORIGIN));
    let is_tactile = pair.is_some() && is_tactile_gap(tactile_max.y - tactile_min.y, bottom_out.y);
    CurveMetadata {
        bottom_out,
        tactile_max,
        tactile_min,
        is_tactile,
    }
}

pub fn bottom_out_displacement(downstroke: &[Point]) -> Option<f64> {
    let velocity = derivative(downstroke);
    let acceleration = simplify(&derivative(&velocity), ACCELERATION_EPSILON);
    find_local_maxima(&acceleration)
        .last()
        .map(|spike| spike.x + ACCELERATION_LEAD)
}

fn sample_at_or_past(downstroke: &[Point], x: f64) -> Option<Point> {
    downstroke.iter().find(|p| p.x >= x).copied()
}

pub fn find_tactile_pair(downstroke: &[Point], displacement: f64) -> Option<(Point, Point)> {
    let limit = displacement - MIN_TACTILE_GAP;
    let minima = find_local_minima(downstroke);
    let mut best: Option<(Point, Point)> = None;
    for peak in find_local_maxima(downstroke).into_iter().filter(|p| p.x < limit) {
        for trough in minima.iter().filter(|t| t.x > peak.x) {
            let better = best.map_or(true, |(p, t)| peak.y - trough.y > p.y - t.y);
            if better {
                best = Some((peak, *trough));
            }
        }
    }
    best
}

pub fn tactile_threshold(bottom_out_force: f64) -> f64 {
    (bottom_out_force * TACTILE_FORCE_RATIO).min(TACTILE_FORCE_CAP)
}

pub fn is_tactile_gap(gap: f64, bottom_out_force: f64) -> bool {
    gap >= tactile_threshold(bottom_out_force)
}
