//! Scalar geometry helpers for the simulation.
//!
//! The core works in `f64` world units and radians. Every helper here is a
//! pure function of its inputs, so results are bit-identical across runs on
//! the same platform.

use std::f64::consts::{PI, TAU};

/// Wrap an angle into `[-π, π]`.
#[must_use]
pub fn wrap_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut a = angle % TAU;
    if a > PI {
        a -= TAU;
    } else if a < -PI {
        a += TAU;
    }
    a
}

/// Signed shortest rotation from `from` to `to`, in `[-π, π]`.
#[must_use]
pub fn angle_diff(from: f64, to: f64) -> f64 {
    wrap_angle(to - from)
}

/// Heading from `(x0, y0)` toward `(x1, y1)`.
#[must_use]
pub fn bearing(x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    (y1 - y0).atan2(x1 - x0)
}

/// Squared distance between two points (avoids sqrt for comparisons).
#[must_use]
pub fn distance_squared(x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    let dx = x1 - x0;
    let dy = y1 - y0;
    dx * dx + dy * dy
}

/// Whether two circles overlap (touching counts).
#[must_use]
pub fn circles_overlap(x0: f64, y0: f64, r0: f64, x1: f64, y1: f64, r1: f64) -> bool {
    let r = r0 + r1;
    distance_squared(x0, y0, x1, y1) <= r * r
}

/// Whether the segment `(ax, ay) -> (bx, by)` passes within `r` of `(cx, cy)`.
///
/// Projects the circle center onto the segment, clamps the projection to the
/// segment ends and compares the closest distance against `r`. A degenerate
/// segment reduces to a point-in-circle test.
#[must_use]
pub fn segment_intersects_circle(
    ax: f64,
    ay: f64,
    bx: f64,
    by: f64,
    cx: f64,
    cy: f64,
    r: f64,
) -> bool {
    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return distance_squared(ax, ay, cx, cy) <= r * r;
    }
    let t = (((cx - ax) * dx + (cy - ay) * dy) / len_sq).clamp(0.0, 1.0);
    let px = ax + dx * t;
    let py = ay + dy * t;
    distance_squared(px, py, cx, cy) <= r * r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_angle_range() {
        for i in -40..40 {
            let a = f64::from(i) * 0.7;
            let w = wrap_angle(a);
            assert!((-PI..=PI).contains(&w), "{a} wrapped to {w}");
            assert!(((a - w) / TAU - ((a - w) / TAU).round()).abs() < 1e-9);
        }
        assert_eq!(wrap_angle(f64::NAN), 0.0);
    }

    #[test]
    fn test_angle_diff_shortest_path() {
        let d = angle_diff(PI - 0.1, -PI + 0.1);
        assert!((d - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_distance_squared() {
        // 3² + 4² = 25
        assert_eq!(distance_squared(0.0, 0.0, 3.0, 4.0), 25.0);
    }

    #[test]
    fn test_segment_hits_circle_between_endpoints() {
        // Segment passes straight through a circle whose center lies between
        // the endpoints; neither endpoint is inside the circle.
        assert!(segment_intersects_circle(-50.0, 0.0, 50.0, 0.0, 0.0, 1.0, 2.0));
        assert!(!circles_overlap(-50.0, 0.0, 0.5, 0.0, 1.0, 2.0));
        assert!(!circles_overlap(50.0, 0.0, 0.5, 0.0, 1.0, 2.0));
    }

    #[test]
    fn test_segment_misses_circle() {
        assert!(!segment_intersects_circle(-50.0, 10.0, 50.0, 10.0, 0.0, 0.0, 5.0));
        // Closest point is past the segment end.
        assert!(!segment_intersects_circle(0.0, 0.0, 10.0, 0.0, 20.0, 0.0, 5.0));
    }

    #[test]
    fn test_degenerate_segment() {
        assert!(segment_intersects_circle(1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 2.0));
        assert!(!segment_intersects_circle(5.0, 5.0, 5.0, 5.0, 0.0, 0.0, 2.0));
    }
}
