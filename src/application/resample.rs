// Raw range-query samples to dense step-aligned plot points
use crate::domain::point::{DataPoint, PointValue};
use crate::domain::query::ResolvedParams;

const POSITIVE_INFINITY_SAMPLE: &str = "+Inf";
const NEGATIVE_INFINITY_SAMPLE: &str = "-Inf";

/// Parse one raw sample value. The source encodes infinities as sentinel
/// tokens; anything else that fails to parse becomes a gap, not an error.
pub fn parse_sample_value(raw: &str) -> PointValue {
    match raw {
        POSITIVE_INFINITY_SAMPLE => PointValue::Present(f64::INFINITY),
        NEGATIVE_INFINITY_SAMPLE => PointValue::Present(f64::NEG_INFINITY),
        _ => match raw.parse::<f64>() {
            Ok(value) => PointValue::Present(value),
            Err(_) => PointValue::Invalid,
        },
    }
}

/// Expand sparse samples into a dense sequence covering the whole window:
/// one point per step slot, with explicit gaps wherever the source has no
/// sample. Samples outside the window are dropped.
pub fn resample(samples: &[(f64, String)], params: &ResolvedParams) -> Vec<DataPoint> {
    if params.step <= 0 {
        return Vec::new();
    }
    let step_ms = params.step * 1000;
    let start_ms = params.start_time * 1000;
    let end_ms = params.end_time * 1000;

    let mut points = Vec::new();
    let mut base_ts = start_ms;

    for (seconds, raw) in samples {
        let timestamp = (seconds * 1000.0) as i64;
        if timestamp < start_ms || timestamp > end_ms {
            continue;
        }
        while base_ts < timestamp {
            points.push(DataPoint::gap(base_ts));
            base_ts += step_ms;
        }
        points.push(DataPoint::new(timestamp, parse_sample_value(raw)));
        base_ts = timestamp + step_ms;
    }

    while base_ts <= end_ms {
        points.push(DataPoint::gap(base_ts));
        base_ts += step_ms;
    }

    points
}
