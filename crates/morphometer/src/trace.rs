//! Boundary tracer: first foreground → background crossing along a segment.
//!
//! Every landmark that lies "on the outline in direction D" is found by
//! tracing a segment through a binary mask with [`find_boundary_crossing`].

use serde::{Deserialize, Serialize};

use crate::error::{MeasureError, Outcome};
use crate::mask::BinaryMask;
use crate::sampling::{rolling_mean, sample_segment};

/// Parameters of the zero-crossing search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Width of the rolling-mean window that suppresses speckle.
    pub window: usize,
    /// Smoothed foreground value at or below which the boundary is reported.
    pub threshold: f64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            window: 8,
            threshold: 0.05,
        }
    }
}

/// Find where the segment `start → end` leaves the foreground of `mask`.
///
/// The segment is sampled at unit-pixel resolution
/// (`floor(max(|dx|, |dy|))` points, endpoints included) with bilinear
/// interpolation. The reported point is the first sample whose forward
/// window mean drops to `threshold` or below.
pub fn find_boundary_crossing(
    mask: &BinaryMask,
    start: [f64; 2],
    end: [f64; 2],
    config: &TraceConfig,
) -> Outcome<[f64; 2]> {
    if !start.iter().chain(end.iter()).all(|v| v.is_finite()) {
        return Err(MeasureError::DegenerateSegment);
    }
    let span = (end[0] - start[0]).abs().max((end[1] - start[1]).abs());
    if span < 2.0 {
        return Err(MeasureError::DegenerateSegment);
    }
    let n = span.floor() as usize;
    let (positions, values) = sample_segment(mask, start, end, n);

    let window = config.window.max(1);
    rolling_mean(&values, window)
        .iter()
        .position(|&m| m <= config.threshold)
        .map(|j| positions[j])
        .ok_or(MeasureError::NoBoundaryCrossing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::prelude::*;

    fn disc(cx: f64, cy: f64, r: f64) -> BinaryMask {
        BinaryMask::from_fn(200, 200, |x, y| {
            (x as f64 - cx).hypot(y as f64 - cy) <= r
        })
    }

    #[test]
    fn axis_aligned_ray_stops_at_edge() {
        // Foreground occupies columns 0..=119.
        let mask = BinaryMask::from_fn(200, 50, |x, _| x < 120);
        let p = find_boundary_crossing(&mask, [20.0, 25.0], [180.0, 25.0], &TraceConfig::default())
            .unwrap();
        assert!((p[0] - 120.0).abs() <= 1.1, "crossing at {:?}", p);
        assert_relative_eq!(p[1], 25.0);
    }

    #[test]
    fn diagonal_ray_stops_at_circle() {
        let mask = disc(100.0, 100.0, 50.0);
        let d = std::f64::consts::FRAC_1_SQRT_2;
        let end = [100.0 + 95.0 * d, 100.0 + 95.0 * d];
        let p = find_boundary_crossing(&mask, [100.0, 100.0], end, &TraceConfig::default())
            .unwrap();
        let r = (p[0] - 100.0).hypot(p[1] - 100.0);
        // one sample step along a diagonal is √2 px
        assert!((r - 50.0).abs() <= 1.0 + std::f64::consts::SQRT_2, "r = {}", r);
    }

    #[test]
    fn reversed_ray_enters_from_background() {
        let mask = BinaryMask::from_fn(100, 20, |x, _| x >= 60);
        let p = find_boundary_crossing(&mask, [90.0, 10.0], [10.0, 10.0], &TraceConfig::default())
            .unwrap();
        assert!((p[0] - 59.0).abs() <= 1.1, "crossing at {:?}", p);
    }

    #[test]
    fn speckle_inside_foreground_is_ignored() {
        let mut mask = BinaryMask::from_fn(200, 40, |x, _| x < 150);
        let mut rng = StdRng::seed_from_u64(7);
        // isolated background pixels along the ray
        for _ in 0..5 {
            let x = rng.gen_range(20..130);
            mask.set(x, 20, false);
        }
        let p = find_boundary_crossing(&mask, [10.0, 20.0], [190.0, 20.0], &TraceConfig::default())
            .unwrap();
        assert!((p[0] - 150.0).abs() <= 1.1, "crossing at {:?}", p);
    }

    #[test]
    fn no_crossing_inside_solid_foreground() {
        let mask = BinaryMask::from_fn(100, 100, |_, _| true);
        assert_eq!(
            find_boundary_crossing(&mask, [10.0, 10.0], [90.0, 80.0], &TraceConfig::default()),
            Err(MeasureError::NoBoundaryCrossing)
        );
    }

    #[test]
    fn short_segments_are_degenerate() {
        let mask = disc(50.0, 50.0, 10.0);
        assert_eq!(
            find_boundary_crossing(&mask, [50.0, 50.0], [50.5, 51.0], &TraceConfig::default()),
            Err(MeasureError::DegenerateSegment)
        );
        assert_eq!(
            find_boundary_crossing(
                &mask,
                [50.0, 50.0],
                [f64::NAN, 51.0],
                &TraceConfig::default()
            ),
            Err(MeasureError::DegenerateSegment)
        );
    }

    #[test]
    fn segment_shorter_than_window_has_no_crossing() {
        let mask = BinaryMask::from_fn(20, 20, |x, _| x < 2);
        assert_eq!(
            find_boundary_crossing(&mask, [0.0, 5.0], [5.0, 5.0], &TraceConfig::default()),
            Err(MeasureError::NoBoundaryCrossing)
        );
    }
}
