//! Periodic angle arithmetic.
//!
//! All orientations handed out by the kinematics types live in `[0, 2π)`.
//! Joint limits are built from a parent orientation plus an offset and then
//! wrapped, so a numerically inverted pair (`lower > upper`) is legal: it
//! describes an interval that crosses the 0/2π seam.

use glam::DVec2;
use std::f64::consts::{PI, TAU};

/// Slack applied to limit boundaries so that an angle clamped exactly onto
/// a boundary still tests as inside after wrapping.
pub const LIMIT_EPSILON: f64 = 1e-9;

/// Wraps `angle` into `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round a tiny negative input up to exactly TAU
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Wraps `angle` into `(-π, π]`.
pub fn signed_angle(angle: f64) -> f64 {
    let wrapped = normalize_angle(angle);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Whether `candidate` lies on the arc running counter-clockwise from
/// `lower` to `upper`.
///
/// Inputs need not be normalized. When the wrapped `lower` exceeds the
/// wrapped `upper` the arc crosses the seam and is the union of
/// `[lower, 2π)` and `[0, upper]`. Every candidate in `[0, upper]` is
/// inside, whichever half of the circle it falls in: with limits
/// `-3π/5 ..= π/2` about a parent at 0, a candidate of `1.0` is accepted.
/// Splitting the seam case by half circle instead would reject it.
pub fn in_limit(lower: f64, upper: f64, candidate: f64) -> bool {
    let lower = normalize_angle(lower);
    let upper = normalize_angle(upper);
    let candidate = normalize_angle(candidate);

    if lower <= upper {
        let within = |c: f64| c >= lower - LIMIT_EPSILON && c <= upper + LIMIT_EPSILON;
        // a candidate a hair below 2π still counts against a lower bound of 0
        within(candidate) || within(candidate - TAU) || within(candidate + TAU)
    } else {
        candidate >= lower - LIMIT_EPSILON || candidate <= upper + LIMIT_EPSILON
    }
}

/// Whether `a -> b -> c` turns clockwise (negative signed area, y axis up).
pub fn is_clockwise(a: DVec2, b: DVec2, c: DVec2) -> bool {
    (b - a).perp_dot(c - a) < 0.0
}

pub fn is_finite_point(p: DVec2) -> bool {
    p.x.is_finite() && p.y.is_finite()
}
