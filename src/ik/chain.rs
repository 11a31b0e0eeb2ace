use super::bone::Bone;
use super::connector::effector_point;
use super::joint::JointLimits;
use super::linkable::{BoneId, ChainId, Linkable, NodeId};
use super::skeleton::Skeleton;
use super::solver::{IkSolver, IterativeSolver, SolveResult};
use crate::error::{KinematicsError, KinematicsResult};
use crate::events::PoseEvent;
use crate::math::angle::is_finite_point;
use crate::math::{normalize_angle, signed_angle, DVec2, Rotation};
use std::sync::Arc;

/// A node attached to a chain's terminal joint, with the orientation it
/// keeps relative to the terminal bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForwardLink {
    pub node: NodeId,
    pub offset: f64,
}

/// An ordered run of bones, root first.
///
/// Consecutive bones share a joint: the terminal of bone `i` is the initial
/// of bone `i + 1`. Bones are only ever appended or popped from the end.
#[derive(Debug, Clone)]
pub struct Chain {
    pub(crate) bones: Vec<BoneId>,
    pub(crate) solver: Arc<dyn IkSolver>,
    pub(crate) linked_to: Option<NodeId>,
    pub(crate) linked_from: Option<NodeId>,
    pub(crate) forward_links: Vec<ForwardLink>,
    pub(crate) redraw_on_solve: bool,
    pub(crate) label: String,
    pub(crate) last_solve: Option<SolveResult>,
}

impl Chain {
    pub(crate) fn new(label: String) -> Self {
        Self {
            bones: Vec::new(),
            solver: Arc::new(IterativeSolver::default()),
            linked_to: None,
            linked_from: None,
            forward_links: Vec::new(),
            redraw_on_solve: false,
            label,
            last_solve: None,
        }
    }

    pub fn builder(start: DVec2) -> ChainBuilder {
        ChainBuilder::new(start)
    }

    pub fn bones(&self) -> &[BoneId] {
        &self.bones
    }

    pub fn size(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn root(&self) -> Option<BoneId> {
        self.bones.first().copied()
    }

    pub fn terminal(&self) -> Option<BoneId> {
        self.bones.last().copied()
    }

    pub fn solver(&self) -> &dyn IkSolver {
        self.solver.as_ref()
    }

    pub fn linked_to(&self) -> Option<NodeId> {
        self.linked_to
    }

    pub fn linked_from(&self) -> Option<NodeId> {
        self.linked_from
    }

    pub fn forward_links(&self) -> &[ForwardLink] {
        &self.forward_links
    }

    pub fn redraw_on_solve(&self) -> bool {
        self.redraw_on_solve
    }

    pub fn set_redraw_on_solve(&mut self, redraw: bool) {
        self.redraw_on_solve = redraw;
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Outcome of the most recent end-effector move.
    pub fn last_solve(&self) -> Option<SolveResult> {
        self.last_solve
    }
}

pub struct ChainBuilder {
    start: DVec2,
    ends: Vec<(DVec2, JointLimits)>,
    solver: Option<Arc<dyn IkSolver>>,
    redraw_on_solve: bool,
    label: String,
}

impl ChainBuilder {
    pub fn new(start: DVec2) -> Self {
        Self {
            start,
            ends: Vec::new(),
            solver: None,
            redraw_on_solve: false,
            label: String::new(),
        }
    }

    /// Adds a bone running from the previous end point to `end`.
    pub fn add_bone(mut self, end: DVec2) -> Self {
        self.ends.push((end, JointLimits::UNCONSTRAINED));
        self
    }

    pub fn add_bone_with_limits(mut self, end: DVec2, limits: JointLimits) -> Self {
        self.ends.push((end, limits));
        self
    }

    pub fn solver<S: IkSolver + 'static>(mut self, solver: S) -> Self {
        self.solver = Some(Arc::new(solver));
        self
    }

    pub fn redraw_on_solve(mut self, redraw: bool) -> Self {
        self.redraw_on_solve = redraw;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn build(self, skeleton: &mut Skeleton) -> KinematicsResult<ChainId> {
        for point in std::iter::once(self.start).chain(self.ends.iter().map(|(p, _)| *p)) {
            if !is_finite_point(point) {
                return Err(KinematicsError::NonFinite {
                    x: point.x,
                    y: point.y,
                });
            }
        }

        let id = skeleton.add_chain(self.label);
        if let Some(solver) = self.solver {
            skeleton[id].solver = solver;
        }
        skeleton[id].redraw_on_solve = self.redraw_on_solve;

        let mut from = self.start;
        for (end, limits) in self.ends {
            let bone = skeleton.insert_bone(Bone::new(from, end).with_limits(limits));
            skeleton.append_bone_unchecked(id, bone);
            from = end;
        }
        Ok(id)
    }
}

impl Linkable for ChainId {
    fn move_to(self, skeleton: &mut Skeleton, to: DVec2) {
        if let Some(root) = skeleton[self].root() {
            root.move_to(skeleton, to);
        }
    }

    fn move_and_rotate(self, skeleton: &mut Skeleton, to: DVec2, rotation: Rotation) {
        if let Some(root) = skeleton[self].root() {
            root.move_and_rotate(skeleton, to, rotation);
        }
    }

    fn offset_orientation(self, skeleton: &mut Skeleton, delta: f64) -> bool {
        match skeleton[self].root() {
            Some(root) => root.offset_orientation(skeleton, delta),
            None => false,
        }
    }

    fn move_end_effector(self, skeleton: &mut Skeleton, target: DVec2, pinned: bool) -> bool {
        skeleton.solve_chain(self, target, pinned)
    }

    fn orientation(self, skeleton: &Skeleton) -> f64 {
        skeleton[self]
            .root()
            .map_or(0.0, |root| skeleton[root].orientation)
    }

    fn end_orientation(self, skeleton: &Skeleton) -> f64 {
        skeleton[self]
            .terminal()
            .map_or(0.0, |end| skeleton[end].orientation)
    }

    fn end_point(self, skeleton: &Skeleton) -> DVec2 {
        skeleton[self]
            .terminal()
            .map_or(DVec2::ZERO, |end| skeleton[end].terminal)
    }

    fn set_linked_from(self, skeleton: &mut Skeleton, from: Option<NodeId>) {
        skeleton[self].linked_from = from;
        if let Some(root) = skeleton[self].root() {
            skeleton[root].linked_from = from;
        }
    }
}

impl Skeleton {
    /// Appends a free bone to the chain, snapping it onto the current
    /// terminal joint and handing the chain's forward link to it. Forward
    /// links are then put back on the new terminal.
    pub(crate) fn append_bone_unchecked(&mut self, chain: ChainId, bone: BoneId) {
        let previous = self[chain].terminal();
        match previous {
            Some(prev) => {
                let joint = self[prev].terminal;
                let handed_over = self[prev].linked_to.take();
                let prev_bone = &mut self[prev];
                prev_bone.next = Some(bone);
                prev_bone.is_end = false;

                let new_bone = &mut self[bone];
                new_bone.translate_to(joint);
                new_bone.prev = Some(prev);
                new_bone.linked_to = handed_over;
            }
            None => {
                // a chain popped down to nothing still owns its links
                let from = self[chain].linked_from;
                let to = self[chain].linked_to;
                let new_bone = &mut self[bone];
                new_bone.is_root = true;
                new_bone.linked_from = from;
                new_bone.linked_to = to;
                if let Some(parent) = from {
                    let joint = parent.end_point(self);
                    self[bone].translate_to(joint);
                }
            }
        }

        let new_bone = &mut self[bone];
        new_bone.is_end = true;
        new_bone.chain = Some(chain);
        self[chain].bones.push(bone);
        self.render(bone.into());
        self.invalidate_chain(chain);
    }

    /// Removes and retires the terminal bone. The new terminal takes over
    /// the chain's forward link.
    pub(crate) fn pop_bone_unchecked(&mut self, chain: ChainId) -> Option<BoneId> {
        let popped = self[chain].bones.pop()?;
        let handed_over = self[popped].linked_to;
        self[popped].destruct();

        if let Some(end) = self[chain].terminal() {
            let bone = &mut self[end];
            bone.next = None;
            bone.is_end = true;
            bone.linked_to = handed_over;
            self.invalidate_chain(chain);
        }
        Some(popped)
    }

    /// Attaches `child` to the chain's terminal joint. With `orient` the
    /// child is also turned to the terminal bone's orientation; otherwise it
    /// keeps whatever relative angle it has now.
    pub(crate) fn link_chain_unchecked(&mut self, chain: ChainId, child: NodeId, orient: bool) {
        let end = chain.end_point(self);
        let end_orientation = chain.end_orientation(self);
        if orient {
            let rotation = Rotation::between(child.orientation(self), end_orientation);
            child.move_and_rotate(self, end, rotation);
        } else {
            child.move_to(self, end);
        }
        let offset = signed_angle(child.orientation(self) - end_orientation);

        let c = &mut self[chain];
        c.linked_to = Some(child);
        c.forward_links.retain(|link| link.node != child);
        c.forward_links.push(ForwardLink {
            node: child,
            offset,
        });
        if let Some(terminal) = c.terminal() {
            self[terminal].linked_to = Some(child);
        }
        child.set_linked_from(self, Some(chain.into()));
    }

    /// Puts every forward-linked node back on the terminal joint at its
    /// recorded relative orientation.
    pub(crate) fn invalidate_chain(&mut self, chain: ChainId) {
        if self[chain].is_empty() {
            return;
        }
        let end = chain.end_point(self);
        let end_orientation = chain.end_orientation(self);
        let links = self[chain].forward_links.clone();
        for link in links {
            let wanted = normalize_angle(end_orientation + link.offset);
            let rotation = Rotation::new(signed_angle(wanted - link.node.orientation(self)));
            link.node.move_and_rotate(self, end, rotation);
        }
    }

    /// End-effector move for a chain.
    ///
    /// A pinned move on a chain with a backward link first asks the parent
    /// to carry this chain toward the target; whatever the parent achieves
    /// becomes the local target. The assigned solver then runs, and the
    /// result is pushed to the forward link.
    pub(crate) fn solve_chain(&mut self, chain: ChainId, target: DVec2, pinned: bool) -> bool {
        let (Some(root), Some(terminal)) = (self[chain].root(), self[chain].terminal()) else {
            log::warn!("end effector move on empty chain {:?}", chain);
            return false;
        };

        let mut target = target;
        if pinned {
            if let Some(parent) = self[chain].linked_from {
                let span = self[terminal].terminal - self[root].initial;
                let hang = self[root].initial - effector_point(parent, self);
                if !parent.move_end_effector(self, target - span - hang, true) {
                    target = self[root].initial + span;
                }
            }
        }

        let solver = Arc::clone(&self[chain].solver);
        let result = match solver.solve(self, chain, target, pinned) {
            Ok(result) => result,
            Err(err) => {
                log::warn!("chain {:?}: {}", chain, err);
                SolveResult::unresolved(0, self[terminal].terminal.distance_squared(target))
            }
        };
        log::debug!(
            "chain {:?} solved: resolved={} cycles={} residual={:.4}",
            chain,
            result.resolved,
            result.cycles,
            result.distance_sq
        );
        self[chain].last_solve = Some(result);

        if self[chain].redraw_on_solve {
            let bones = self[chain].bones.clone();
            for bone in bones {
                self.emit(PoseEvent::Render(bone.into()));
            }
        }
        self.emit(PoseEvent::Solved {
            chain,
            resolved: result.resolved,
        });

        if let Some(next) = self[chain].linked_to {
            let end = self[terminal].terminal;
            next.move_to(self, end);
        }
        result.resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    fn three_bones(skeleton: &mut Skeleton) -> ChainId {
        Chain::builder(DVec2::ZERO)
            .add_bone(DVec2::new(10.0, 0.0))
            .add_bone(DVec2::new(20.0, 0.0))
            .add_bone(DVec2::new(30.0, 0.0))
            .label("arm")
            .build(skeleton)
            .unwrap()
    }

    #[test]
    fn builder_wires_bones() {
        let mut skeleton = Skeleton::new();
        let chain = three_bones(&mut skeleton);
        let c = &skeleton[chain];
        assert_eq!(c.size(), 3);
        assert_eq!(c.label(), "arm");

        let root = c.root().unwrap();
        let end = c.terminal().unwrap();
        assert!(skeleton[root].is_root());
        assert!(!skeleton[root].is_end());
        assert!(skeleton[end].is_end());
        assert_eq!(skeleton[root].next(), Some(c.bones()[1]));
        assert_eq!(skeleton[end].prev(), Some(c.bones()[1]));
        assert_eq!(skeleton[end].chain(), Some(chain));
    }

    #[test]
    fn builder_rejects_non_finite_points() {
        let mut skeleton = Skeleton::new();
        let err = Chain::builder(DVec2::ZERO)
            .add_bone(DVec2::new(f64::NAN, 0.0))
            .build(&mut skeleton)
            .unwrap_err();
        assert!(matches!(err, KinematicsError::NonFinite { .. }));
    }

    #[test]
    fn move_translates_whole_chain() {
        let mut skeleton = Skeleton::new();
        let chain = three_bones(&mut skeleton);
        chain.move_to(&mut skeleton, DVec2::new(5.0, 5.0));
        let end = skeleton[chain].terminal().unwrap();
        assert_abs_diff_eq!(skeleton[end].terminal().x, 35.0, epsilon = 1e-9);
        assert_abs_diff_eq!(skeleton[end].terminal().y, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn rotate_turns_chain_about_root() {
        let mut skeleton = Skeleton::new();
        let chain = three_bones(&mut skeleton);
        skeleton.rotate(chain, FRAC_PI_2).unwrap();
        let end = skeleton[chain].terminal().unwrap();
        assert_abs_diff_eq!(skeleton[end].terminal().x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(skeleton[end].terminal().y, 30.0, epsilon = 1e-9);
        for &bone in skeleton[chain].bones() {
            assert_abs_diff_eq!(skeleton[bone].orientation(), FRAC_PI_2, epsilon = 1e-9);
        }
    }

    #[test]
    fn pop_hands_forward_link_to_new_terminal() {
        let mut skeleton = Skeleton::new();
        let chain = three_bones(&mut skeleton);
        let hand = skeleton
            .add_bone(DVec2::new(100.0, 100.0), DVec2::new(105.0, 100.0))
            .unwrap();
        skeleton.link(chain, hand, false).unwrap();

        let popped = skeleton.pop_bone(chain).unwrap();
        assert!(skeleton[popped].is_retired());

        let end = skeleton[chain].terminal().unwrap();
        assert!(skeleton[end].is_end());
        assert_eq!(skeleton[end].next(), None);
        assert_eq!(skeleton[end].linked_to(), Some(NodeId::Bone(hand)));
        assert_abs_diff_eq!(skeleton[hand].initial().x, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn link_with_orient_aligns_child() {
        let mut skeleton = Skeleton::new();
        let chain = three_bones(&mut skeleton);
        skeleton.rotate(chain, FRAC_PI_2).unwrap();
        let hand = skeleton
            .add_bone(DVec2::new(50.0, 50.0), DVec2::new(55.0, 50.0))
            .unwrap();
        skeleton.link(chain, hand, true).unwrap();

        assert_abs_diff_eq!(skeleton[hand].initial().y, 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(skeleton[hand].orientation(), FRAC_PI_2, epsilon = 1e-9);
        assert_eq!(skeleton[hand].linked_from(), Some(NodeId::Chain(chain)));
    }

    #[test]
    fn invalidate_restores_relative_orientation() {
        let mut skeleton = Skeleton::new();
        let chain = three_bones(&mut skeleton);
        let hand = skeleton
            .add_bone(DVec2::new(0.0, 0.0), DVec2::new(0.0, 5.0))
            .unwrap();
        skeleton.link(chain, hand, false).unwrap();

        // turn the terminal bone behind propagation's back
        let end = skeleton[chain].terminal().unwrap();
        let start = skeleton[end].initial();
        skeleton[end].reorient(start, FRAC_PI_2, false, true);
        skeleton.invalidate(chain).unwrap();

        assert_abs_diff_eq!(skeleton[hand].initial().x, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(skeleton[hand].initial().y, 10.0, epsilon = 1e-9);
        // was a quarter turn ahead of the terminal bone, still is
        assert_abs_diff_eq!(
            signed_angle(skeleton[hand].orientation() - skeleton[end].orientation()),
            FRAC_PI_2,
            epsilon = 1e-9
        );
    }
}
