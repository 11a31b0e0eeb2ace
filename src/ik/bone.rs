use super::joint::JointLimits;
use super::linkable::{BoneId, ChainId, Linkable, NodeId};
use super::skeleton::Skeleton;
use super::solver::DEFAULT_STOP;
use crate::math::angle::is_finite_point;
use crate::math::{direction, heading, normalize_angle, signed_angle, DVec2, Rotation};

/// Kind of the last forward-kinematics step that reached a bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FkMotion {
    #[default]
    None,
    Move,
    Rotate,
    MoveRotate,
}

/// A rigid segment between an initial and a terminal joint.
///
/// The length only changes through [`set_initial`](Bone::set_initial) and
/// [`set_terminal`](Bone::set_terminal); every move or rotation keeps it.
/// The local mutators on this type never propagate. Propagating edits go
/// through [`Skeleton`].
#[derive(Debug, Clone)]
pub struct Bone {
    pub(crate) initial: DVec2,
    pub(crate) terminal: DVec2,
    pub(crate) length: f64,
    pub(crate) orientation: f64,
    pub(crate) limits: JointLimits,
    pub(crate) motion: FkMotion,
    pub(crate) is_root: bool,
    pub(crate) is_end: bool,
    pub(crate) prev: Option<BoneId>,
    pub(crate) next: Option<BoneId>,
    pub(crate) chain: Option<ChainId>,
    pub(crate) linked_to: Option<NodeId>,
    pub(crate) linked_from: Option<NodeId>,
    pub(crate) label: String,
    pub(crate) retired: bool,
}

impl Bone {
    pub fn new(initial: DVec2, terminal: DVec2) -> Self {
        let mut bone = Self {
            initial,
            terminal,
            length: 0.0,
            orientation: 0.0,
            limits: JointLimits::UNCONSTRAINED,
            motion: FkMotion::None,
            is_root: false,
            is_end: false,
            prev: None,
            next: None,
            chain: None,
            linked_to: None,
            linked_from: None,
            label: String::new(),
            retired: false,
        };
        bone.update_derived();
        bone
    }

    pub fn with_limits(mut self, limits: JointLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Resets the geometry while keeping links and limits.
    pub fn init(&mut self, initial: DVec2, terminal: DVec2) {
        self.initial = initial;
        self.terminal = terminal;
        self.motion = FkMotion::None;
        self.update_derived();
    }

    /// Zeroes the geometry and drops every link. The bone is unusable after
    /// this.
    pub fn destruct(&mut self) {
        self.initial = DVec2::ZERO;
        self.terminal = DVec2::ZERO;
        self.length = 0.0;
        self.orientation = 0.0;
        self.motion = FkMotion::None;
        self.is_root = false;
        self.is_end = false;
        self.prev = None;
        self.next = None;
        self.chain = None;
        self.linked_to = None;
        self.linked_from = None;
        self.retired = true;
    }

    pub fn initial(&self) -> DVec2 {
        self.initial
    }

    pub fn terminal(&self) -> DVec2 {
        self.terminal
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Orientation in `[0, 2π)`.
    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    pub fn limits(&self) -> JointLimits {
        self.limits
    }

    pub fn set_limits(&mut self, limits: JointLimits) {
        self.limits = limits;
    }

    pub fn motion(&self) -> FkMotion {
        self.motion
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn is_end(&self) -> bool {
        self.is_end
    }

    pub fn prev(&self) -> Option<BoneId> {
        self.prev
    }

    pub fn next(&self) -> Option<BoneId> {
        self.next
    }

    pub fn chain(&self) -> Option<ChainId> {
        self.chain
    }

    pub fn linked_to(&self) -> Option<NodeId> {
        self.linked_to
    }

    pub fn linked_from(&self) -> Option<NodeId> {
        self.linked_from
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// Assigns the initial joint. With `update_derived` the length and
    /// orientation are recomputed; without it the terminal joint is left
    /// stale until the next endpoint assignment. Non-finite input is
    /// rejected.
    pub fn set_initial(&mut self, initial: DVec2, update_derived: bool) -> bool {
        if !is_finite_point(initial) {
            return false;
        }
        self.initial = initial;
        if update_derived {
            self.update_derived();
        }
        true
    }

    /// Assigns the terminal joint and recomputes length and orientation.
    /// Non-finite input is rejected.
    pub fn set_terminal(&mut self, terminal: DVec2) -> bool {
        if !is_finite_point(terminal) {
            return false;
        }
        self.terminal = terminal;
        self.update_derived();
        true
    }

    /// Direct pose assignment used by solvers that handle propagation
    /// themselves. `moved` places the initial joint at `at`; `rotated` sets
    /// the orientation to `angle`. The length is kept either way.
    pub fn reorient(&mut self, at: DVec2, angle: f64, moved: bool, rotated: bool) {
        if moved {
            self.initial = at;
        }
        if rotated {
            self.orientation = normalize_angle(angle);
        }
        self.terminal = self.initial + direction(self.orientation) * self.length;
    }

    /// Translates the bone so its initial joint sits at `to`.
    pub(crate) fn translate_to(&mut self, to: DVec2) {
        let delta = to - self.initial;
        self.initial = to;
        self.terminal += delta;
    }

    /// Rotates the terminal joint about the initial one.
    pub(crate) fn apply_rotation(&mut self, rotation: Rotation) {
        self.terminal = rotation.rotate_about(self.terminal, self.initial);
        self.orientation = rotation.apply_to_angle(self.orientation);
    }

    fn update_derived(&mut self) {
        let delta = self.terminal - self.initial;
        self.length = delta.length();
        self.orientation = if self.length > 0.0 {
            heading(self.initial, self.terminal)
        } else {
            0.0
        };
    }
}

impl Linkable for BoneId {
    fn move_to(self, skeleton: &mut Skeleton, to: DVec2) {
        let bone = &mut skeleton[self];
        bone.translate_to(to);
        bone.motion = FkMotion::Move;
        skeleton.render(self.into());
        skeleton.propagate(self, None);
    }

    fn move_and_rotate(self, skeleton: &mut Skeleton, to: DVec2, rotation: Rotation) {
        let bone = &mut skeleton[self];
        bone.translate_to(to);
        bone.apply_rotation(rotation);
        bone.motion = FkMotion::MoveRotate;
        skeleton.render(self.into());
        skeleton.propagate(self, Some(rotation));
    }

    fn offset_orientation(self, skeleton: &mut Skeleton, delta: f64) -> bool {
        let candidate = skeleton[self].orientation + delta;
        skeleton.orient_bone(self, candidate)
    }

    /// Unpinned, the bone turns toward `target` within its limits. Pinned,
    /// it slides so its terminal joint lands on `target`.
    fn move_end_effector(self, skeleton: &mut Skeleton, target: DVec2, pinned: bool) -> bool {
        if pinned {
            let span = skeleton[self].terminal - skeleton[self].initial;
            self.move_to(skeleton, target - span);
            return true;
        }
        let initial = skeleton[self].initial;
        if (target - initial).length_squared() > 0.0 {
            skeleton.orient_bone(self, heading(initial, target));
        }
        skeleton[self].terminal.distance_squared(target) <= DEFAULT_STOP
    }

    fn orientation(self, skeleton: &Skeleton) -> f64 {
        skeleton[self].orientation
    }

    fn end_orientation(self, skeleton: &Skeleton) -> f64 {
        skeleton[self].orientation
    }

    fn end_point(self, skeleton: &Skeleton) -> DVec2 {
        skeleton[self].terminal
    }

    fn set_linked_from(self, skeleton: &mut Skeleton, from: Option<NodeId>) {
        skeleton[self].linked_from = from;
    }
}

impl Skeleton {
    /// Rigid rotation of a bone (and everything after it) about its initial
    /// joint. Not limit-checked.
    pub(crate) fn rotate_bone(&mut self, id: BoneId, rotation: Rotation) {
        let bone = &mut self[id];
        bone.apply_rotation(rotation);
        bone.motion = FkMotion::Rotate;
        self.render(id.into());
        self.propagate(id, Some(rotation));
    }

    /// Limit-checked orientation setter. A candidate outside the bone's
    /// limits is dropped and the bone keeps its pose.
    pub(crate) fn orient_bone(&mut self, id: BoneId, angle: f64) -> bool {
        let parent = self.parent_orientation(id).unwrap_or(0.0);
        let bone = &self[id];
        if !bone.limits.contains(parent, angle) {
            log::trace!(
                "bone {:?}: orientation {:.4} outside limits relative to {:.4}",
                id,
                normalize_angle(angle),
                parent
            );
            return false;
        }
        let delta = signed_angle(angle - bone.orientation);
        if delta != 0.0 {
            self.rotate_bone(id, Rotation::new(delta));
        }
        true
    }

    /// Orientation the bone's limits are measured from: the previous bone in
    /// its chain, else whatever it is linked from.
    pub(crate) fn parent_orientation(&self, id: BoneId) -> Option<f64> {
        let bone = &self[id];
        if let Some(prev) = bone.prev {
            return Some(self[prev].orientation);
        }
        bone.linked_from.map(|node| node.end_orientation(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn derived_values() {
        let bone = Bone::new(DVec2::new(1.0, 1.0), DVec2::new(1.0, -2.0));
        assert_abs_diff_eq!(bone.length(), 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bone.orientation(), 1.5 * PI, epsilon = 1e-12);
    }

    #[test]
    fn zero_length_bone_faces_zero() {
        let bone = Bone::new(DVec2::new(2.0, 2.0), DVec2::new(2.0, 2.0));
        assert_eq!(bone.length(), 0.0);
        assert_eq!(bone.orientation(), 0.0);
    }

    #[test]
    fn non_finite_endpoints_are_rejected() {
        let mut bone = Bone::new(DVec2::ZERO, DVec2::new(10.0, 0.0));
        assert!(!bone.set_terminal(DVec2::new(f64::NAN, 1.0)));
        assert!(!bone.set_initial(DVec2::new(0.0, f64::INFINITY), true));
        assert_eq!(bone.terminal(), DVec2::new(10.0, 0.0));
        assert_eq!(bone.initial(), DVec2::ZERO);
    }

    #[test]
    fn set_terminal_changes_length() {
        let mut bone = Bone::new(DVec2::ZERO, DVec2::new(10.0, 0.0));
        assert!(bone.set_terminal(DVec2::new(0.0, 4.0)));
        assert_abs_diff_eq!(bone.length(), 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bone.orientation(), FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn reorient_keeps_length() {
        let mut bone = Bone::new(DVec2::ZERO, DVec2::new(5.0, 0.0));
        bone.reorient(DVec2::new(1.0, 1.0), FRAC_PI_2, true, true);
        assert_abs_diff_eq!(bone.terminal().x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bone.terminal().y, 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bone.length(), 5.0, epsilon = 1e-12);

        bone.reorient(DVec2::ZERO, 0.0, false, true);
        assert_abs_diff_eq!(bone.terminal().x, 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bone.terminal().y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn destruct_clears_everything() {
        let mut bone = Bone::new(DVec2::ZERO, DVec2::new(5.0, 0.0));
        bone.linked_to = Some(NodeId::Bone(BoneId(3)));
        bone.destruct();
        assert!(bone.is_retired());
        assert_eq!(bone.length(), 0.0);
        assert_eq!(bone.linked_to(), None);
    }
}
