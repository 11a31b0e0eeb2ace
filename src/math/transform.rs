use glam::DVec2;

use super::angle::normalize_angle;

/// A planar rotation by `angle` radians with its cosine and sine computed
/// once, so that FK propagation can hand the same values down every link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub angle: f64,
    pub cos: f64,
    pub sin: f64,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Rotation {
    pub const IDENTITY: Self = Self {
        angle: 0.0,
        cos: 1.0,
        sin: 0.0,
    };

    pub fn new(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self { angle, cos, sin }
    }

    /// Builds a rotation from values the caller already has. The pair is
    /// trusted as-is.
    pub fn from_parts(angle: f64, cos: f64, sin: f64) -> Self {
        Self { angle, cos, sin }
    }

    /// The rotation taking orientation `from` onto orientation `to`.
    pub fn between(from: f64, to: f64) -> Self {
        Self::new(to - from)
    }

    pub fn is_identity(&self) -> bool {
        self.angle == 0.0
    }

    pub fn inverse(&self) -> Self {
        Self {
            angle: -self.angle,
            cos: self.cos,
            sin: -self.sin,
        }
    }

    pub fn rotate_vector(&self, v: DVec2) -> DVec2 {
        DVec2::new(v.x * self.cos - v.y * self.sin, v.x * self.sin + v.y * self.cos)
    }

    /// Rotates `point` rigidly about `pivot`.
    pub fn rotate_about(&self, point: DVec2, pivot: DVec2) -> DVec2 {
        pivot + self.rotate_vector(point - pivot)
    }

    /// Adds this rotation to an orientation, keeping the result in `[0, 2π)`.
    pub fn apply_to_angle(&self, orientation: f64) -> f64 {
        normalize_angle(orientation + self.angle)
    }
}

/// Unit vector pointing along `angle`.
pub fn direction(angle: f64) -> DVec2 {
    let (sin, cos) = angle.sin_cos();
    DVec2::new(cos, sin)
}

/// Orientation of the vector `to - from`, normalized to `[0, 2π)`.
pub fn heading(from: DVec2, to: DVec2) -> f64 {
    let d = to - from;
    normalize_angle(d.y.atan2(d.x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn quarter_turn_about_pivot() {
        let r = Rotation::new(FRAC_PI_2);
        let p = r.rotate_about(DVec2::new(2.0, 1.0), DVec2::new(1.0, 1.0));
        assert_abs_diff_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn inverse_undoes_rotation() {
        let r = Rotation::new(0.7);
        let v = DVec2::new(3.0, -4.0);
        let back = r.inverse().rotate_vector(r.rotate_vector(v));
        assert_abs_diff_eq!(back.x, v.x, epsilon = 1e-12);
        assert_abs_diff_eq!(back.y, v.y, epsilon = 1e-12);
    }

    #[test]
    fn heading_is_normalized() {
        assert_abs_diff_eq!(heading(DVec2::ZERO, DVec2::new(0.0, -1.0)), 1.5 * PI, epsilon = 1e-12);
        assert_abs_diff_eq!(heading(DVec2::ZERO, DVec2::new(-1.0, 0.0)), PI, epsilon = 1e-12);
    }

    #[test]
    fn apply_wraps_past_full_turn() {
        let r = Rotation::new(FRAC_PI_2);
        assert_abs_diff_eq!(r.apply_to_angle(1.75 * PI), 0.25 * PI, epsilon = 1e-12);
    }
}
