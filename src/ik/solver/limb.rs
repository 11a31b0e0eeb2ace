use super::{IkSolver, SolveResult};
use crate::error::{KinematicsError, KinematicsResult};
use crate::ik::joint::JointLimits;
use crate::ik::linkable::ChainId;
use crate::ik::skeleton::Skeleton;
use crate::math::{direction, heading, is_clockwise, normalize_angle, signed_angle, DVec2};

/// Angular distance (radians) from the parent's direction within which the
/// tie-break keeps the raw child angle.
pub const TIE_BREAK_TOLERANCE: f64 = 0.1;

/// Joint limits for the two limb joints, as offsets from each joint's
/// parent. Every field falls back to [`JointLimits::LIMB`] on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimbLimits {
    pub lower0: f64,
    pub upper0: f64,
    pub lower1: f64,
    pub upper1: f64,
}

impl Default for LimbLimits {
    fn default() -> Self {
        Self {
            lower0: JointLimits::LIMB.lower,
            upper0: JointLimits::LIMB.upper,
            lower1: JointLimits::LIMB.lower,
            upper1: JointLimits::LIMB.upper,
        }
    }
}

impl LimbLimits {
    pub fn with_lower0(mut self, lower: f64) -> Self {
        self.lower0 = lower;
        self
    }

    pub fn with_upper0(mut self, upper: f64) -> Self {
        self.upper0 = upper;
        self
    }

    pub fn with_lower1(mut self, lower: f64) -> Self {
        self.lower1 = lower;
        self
    }

    pub fn with_upper1(mut self, upper: f64) -> Self {
        self.upper1 = upper;
        self
    }

    pub fn root(&self) -> JointLimits {
        JointLimits::new(self.lower0, self.upper0)
    }

    pub fn elbow(&self) -> JointLimits {
        JointLimits::new(self.lower1, self.upper1)
    }
}

/// Closed-form solver for chains of exactly two bones.
///
/// The elbow angle comes from the law of cosines and the root angle from
/// the usual two-link composition. When the root joint has to be clamped
/// the closed-form elbow no longer applies, so the elbow is picked with
/// [`preferred_angle`] instead. The pinned flag has no effect: the root
/// joint always stays put.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LimbSolver {
    pub limits: LimbLimits,
}

impl LimbSolver {
    pub fn new(limits: LimbLimits) -> Self {
        Self { limits }
    }

    /// Pose used when the target is out of reach: root bone aimed at the
    /// target, elbow straight unless the root was clamped.
    fn stretch_toward(&self, root: DVec2, l1: f64, target: DVec2, parent: f64) -> (f64, f64) {
        let (shoulder, clamped) = self.limits.root().clamp(parent, heading(root, target));
        let elbow_angle = if clamped {
            let elbow = root + direction(shoulder) * l1;
            let raw = heading(elbow, target);
            preferred_angle(shoulder, raw, self.limits.elbow(), root, elbow, target)
        } else {
            self.limits.elbow().clamp(shoulder, shoulder).0
        };
        (shoulder, elbow_angle)
    }
}

impl IkSolver for LimbSolver {
    fn check_chain(&self, bone_count: usize) -> KinematicsResult<()> {
        if bone_count == 2 {
            Ok(())
        } else {
            Err(KinematicsError::SolverArity {
                expected: 2,
                found: bone_count,
            })
        }
    }

    fn solve(
        &self,
        skeleton: &mut Skeleton,
        chain: ChainId,
        target: DVec2,
        _pinned: bool,
    ) -> KinematicsResult<SolveResult> {
        let bones = skeleton[chain].bones.clone();
        self.check_chain(bones.len())?;
        let (proximal, distal) = (bones[0], bones[1]);

        let root = skeleton[proximal].initial;
        let l1 = skeleton[proximal].length;
        let l2 = skeleton[distal].length;
        let parent = skeleton.parent_orientation(proximal).unwrap_or(0.0);

        let delta = target - root;
        let d_sq = delta.length_squared();
        let reach = l1 + l2;

        let (shoulder, elbow_angle, resolved) = if d_sq > reach * reach {
            let (shoulder, elbow) = self.stretch_toward(root, l1, target, parent);
            (shoulder, elbow, false)
        } else {
            let cos2 = (d_sq - l1 * l1 - l2 * l2) / (2.0 * l1 * l2);
            if !(-1.0..=1.0).contains(&cos2) {
                // reachable on paper, but rounding (or a zero-length bone)
                // left no valid elbow angle
                let (shoulder, elbow) = self.stretch_toward(root, l1, target, parent);
                (shoulder, elbow, false)
            } else {
                let theta2 = cos2.acos();
                let k1 = l1 + l2 * cos2;
                let k2 = l2 * theta2.sin();
                let theta1 = (delta.y * k1 - delta.x * k2).atan2(delta.x * k1 + delta.y * k2);

                let (shoulder, clamped) = self.limits.root().clamp(parent, theta1);
                if clamped {
                    let elbow = root + direction(shoulder) * l1;
                    let raw = heading(elbow, target);
                    let angle =
                        preferred_angle(shoulder, raw, self.limits.elbow(), root, elbow, target);
                    (shoulder, angle, false)
                } else {
                    (shoulder, normalize_angle(theta1 + theta2), true)
                }
            }
        };

        skeleton[proximal].reorient(root, shoulder, false, true);
        let elbow = skeleton[proximal].terminal;
        skeleton[distal].reorient(elbow, elbow_angle, true, true);
        skeleton.invalidate_chain(chain);

        let distance_sq = skeleton[distal].terminal.distance_squared(target);
        Ok(SolveResult {
            resolved,
            cycles: 1,
            distance_sq,
        })
    }
}

/// Elbow orientation once the root joint of a limb has been clamped.
///
/// `parent` is the clamped root orientation and `raw` the unclamped
/// orientation that would aim the elbow bone at the target. A raw angle
/// within [`TIE_BREAK_TOLERANCE`] of the parent, or already inside the
/// limits, is kept, but still clamped to `limits`: the result is always a
/// legal elbow orientation. Otherwise the elbow snaps to a limit boundary,
/// and the side is chosen by which side of the root-to-elbow line the
/// target lies on: clockwise picks the lower boundary, counter-clockwise
/// the upper.
pub fn preferred_angle(
    parent: f64,
    raw: f64,
    limits: JointLimits,
    root: DVec2,
    elbow: DVec2,
    target: DVec2,
) -> f64 {
    if signed_angle(raw - parent).abs() <= TIE_BREAK_TOLERANCE || limits.contains(parent, raw) {
        return limits.clamp(parent, raw).0;
    }
    let (lower, upper) = limits.bounds(parent);
    if is_clockwise(root, elbow, target) {
        lower
    } else {
        upper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ik::Chain;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn limb(skeleton: &mut Skeleton, solver: LimbSolver) -> ChainId {
        Chain::builder(DVec2::ZERO)
            .add_bone(DVec2::new(100.0, 0.0))
            .add_bone(DVec2::new(150.0, 0.0))
            .solver(solver)
            .build(skeleton)
            .unwrap()
    }

    fn end_of(skeleton: &Skeleton, chain: ChainId) -> DVec2 {
        let end = skeleton[chain].terminal().unwrap();
        skeleton[end].terminal()
    }

    #[test]
    fn fully_extended_target() {
        let mut skeleton = Skeleton::new();
        let chain = limb(&mut skeleton, LimbSolver::default());
        let result = LimbSolver::default()
            .solve(&mut skeleton, chain, DVec2::new(150.0, 0.0), false)
            .unwrap();
        assert!(result.resolved);
        let end = end_of(&skeleton, chain);
        assert_abs_diff_eq!(end.x, 150.0, epsilon = 1e-6);
        assert_abs_diff_eq!(end.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn bent_target_is_reached_exactly() {
        let mut skeleton = Skeleton::new();
        let chain = limb(&mut skeleton, LimbSolver::default());
        let target = DVec2::new(80.0, 60.0);
        let result = LimbSolver::default()
            .solve(&mut skeleton, chain, target, false)
            .unwrap();
        assert!(result.resolved);
        let end = end_of(&skeleton, chain);
        assert_abs_diff_eq!(end.x, target.x, epsilon = 1e-6);
        assert_abs_diff_eq!(end.y, target.y, epsilon = 1e-6);

        let bones = skeleton[chain].bones().to_vec();
        assert_abs_diff_eq!(skeleton[bones[0]].length(), 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            skeleton[bones[0]].terminal().distance(skeleton[bones[1]].initial()),
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn unreachable_target_stretches_toward_it() {
        let mut skeleton = Skeleton::new();
        let chain = limb(&mut skeleton, LimbSolver::default());
        let result = LimbSolver::default()
            .solve(&mut skeleton, chain, DVec2::new(400.0, 0.0), false)
            .unwrap();
        assert!(!result.resolved);

        let bones = skeleton[chain].bones().to_vec();
        assert_abs_diff_eq!(skeleton[bones[0]].orientation(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(skeleton[bones[1]].orientation(), 0.0, epsilon = 1e-9);
        let end = end_of(&skeleton, chain);
        assert_abs_diff_eq!(end.x, 150.0, epsilon = 1e-9);
    }

    #[test]
    fn clamped_root_reports_unresolved() {
        let mut skeleton = Skeleton::new();
        let limits = LimbLimits::default().with_lower0(-0.1).with_upper0(0.1);
        let chain = limb(&mut skeleton, LimbSolver::new(limits));
        // straight up needs a root angle far outside ±0.1
        let result = LimbSolver::new(limits)
            .solve(&mut skeleton, chain, DVec2::new(0.0, 120.0), false)
            .unwrap();
        assert!(!result.resolved);

        let bones = skeleton[chain].bones().to_vec();
        assert_abs_diff_eq!(skeleton[bones[0]].orientation(), 0.1, epsilon = 1e-9);
        // target is counter-clockwise of the upper arm, so the elbow takes
        // its upper boundary
        assert_abs_diff_eq!(
            skeleton[bones[1]].orientation(),
            normalize_angle(0.1 + FRAC_PI_2),
            epsilon = 1e-9
        );
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let mut skeleton = Skeleton::new();
        let chain = Chain::builder(DVec2::ZERO)
            .add_bone(DVec2::new(10.0, 0.0))
            .build(&mut skeleton)
            .unwrap();
        let err = LimbSolver::default()
            .solve(&mut skeleton, chain, DVec2::new(5.0, 5.0), false)
            .unwrap_err();
        assert_eq!(
            err,
            KinematicsError::SolverArity {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn partial_limits_fall_back_per_field() {
        let limits = LimbLimits::default().with_lower0(-0.2);
        assert_eq!(limits.lower0, -0.2);
        assert_eq!(limits.upper0, FRAC_PI_2);
        assert_eq!(limits.lower1, -3.0 * PI / 5.0);
        assert_eq!(limits.upper1, FRAC_PI_2);
    }

    #[test]
    fn tie_break_keeps_nearly_straight_elbow() {
        let limits = JointLimits::symmetric(0.05);
        let root = DVec2::ZERO;
        let elbow = DVec2::new(10.0, 0.0);
        let target = DVec2::new(20.0, 0.5);
        // 0.08 rad off the parent: inside the tolerance, clamped to ±0.05
        let angle = preferred_angle(0.0, 0.08, limits, root, elbow, target);
        assert_abs_diff_eq!(angle, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn tie_break_follows_target_side() {
        let limits = JointLimits::symmetric(0.5);
        let root = DVec2::ZERO;
        let elbow = DVec2::new(10.0, 0.0);

        let below = preferred_angle(0.0, -2.5, limits, root, elbow, DVec2::new(5.0, -8.0));
        assert_abs_diff_eq!(below, normalize_angle(-0.5), epsilon = 1e-12);

        let above = preferred_angle(0.0, 2.5, limits, root, elbow, DVec2::new(5.0, 8.0));
        assert_abs_diff_eq!(above, 0.5, epsilon = 1e-12);
    }
}
