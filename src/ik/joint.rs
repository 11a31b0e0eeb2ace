use crate::math::angle::{in_limit, normalize_angle, signed_angle};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Rotational limits of a joint, stored as offsets from the parent's
/// orientation.
///
/// A span of a full turn or more (the `±2π` pair of
/// [`JointLimits::UNCONSTRAINED`]) accepts every orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimits {
    pub lower: f64,
    pub upper: f64,
}

impl Default for JointLimits {
    fn default() -> Self {
        Self::UNCONSTRAINED
    }
}

impl JointLimits {
    pub const UNCONSTRAINED: Self = Self {
        lower: -TAU,
        upper: TAU,
    };

    /// Default range for the joints of a two-segment limb.
    pub const LIMB: Self = Self {
        lower: -3.0 * PI / 5.0,
        upper: FRAC_PI_2,
    };

    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Symmetric limits of `±half_range` radians.
    pub fn symmetric(half_range: f64) -> Self {
        Self {
            lower: -half_range,
            upper: half_range,
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.upper - self.lower >= TAU
    }

    /// Absolute `(lower, upper)` bounds for a parent at `parent_orientation`,
    /// wrapped into `[0, 2π)`.
    pub fn bounds(&self, parent_orientation: f64) -> (f64, f64) {
        (
            normalize_angle(parent_orientation + self.lower),
            normalize_angle(parent_orientation + self.upper),
        )
    }

    pub fn contains(&self, parent_orientation: f64, candidate: f64) -> bool {
        if self.is_unconstrained() {
            return true;
        }
        let (lower, upper) = self.bounds(parent_orientation);
        in_limit(lower, upper, candidate)
    }

    /// Clamps `candidate` to the nearer bound. Returns the orientation in
    /// `[0, 2π)` and whether clamping happened.
    pub fn clamp(&self, parent_orientation: f64, candidate: f64) -> (f64, bool) {
        if self.contains(parent_orientation, candidate) {
            return (normalize_angle(candidate), false);
        }
        let (lower, upper) = self.bounds(parent_orientation);
        let to_lower = signed_angle(candidate - lower).abs();
        let to_upper = signed_angle(candidate - upper).abs();
        if to_lower <= to_upper {
            (lower, true)
        } else {
            (upper, true)
        }
    }
}
