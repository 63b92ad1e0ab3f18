use crate::{Curve, Point};

pub fn travel_peak_index(samples: &[Point]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, point) in samples.iter().enumerate() {
        if point.x.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, x)| point.x > x) {
            best = Some((idx, point.x));
        }
    }
    best.map(|(idx, _)| idx)
}

pub fn partition(samples: &[Point]) -> Curve {
    let Some(peak) = travel_peak_index(samples) else {
        return Curve::default();
    };
    let upstroke = if peak + 1 < samples.len() {
        samples[peak..].to_vec()
    } else {
        Vec::new()
    };
    Curve {
        downstroke: samples[..=peak].to_vec(),
        upstroke,
    }
}
