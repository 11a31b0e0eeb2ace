use super::{IkSolver, SolveResult, DEFAULT_MAX_CYCLES, DEFAULT_STOP};
use crate::error::{KinematicsError, KinematicsResult};
use crate::ik::linkable::{BoneId, ChainId};
use crate::ik::skeleton::Skeleton;
use crate::math::{direction, heading, DVec2};

/// Target-chasing solver for chains of any length.
///
/// Each cycle walks the chain twice. The target phase runs from the
/// terminal bone to the root, dragging a virtual target back along each
/// bone by that bone's length; what is left over at the root is how far the
/// virtual chain sits from the real root joint. The position phase runs
/// root to terminal, laying the bones onto the virtual targets shifted by
/// that offset, and finally points the terminal bone at the real target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterativeSolver {
    /// Squared distance under which the target counts as reached.
    pub stop: f64,
    pub max_cycles: u32,
}

impl Default for IterativeSolver {
    fn default() -> Self {
        Self {
            stop: DEFAULT_STOP,
            max_cycles: DEFAULT_MAX_CYCLES,
        }
    }
}

impl IterativeSolver {
    pub fn new(stop: f64, max_cycles: u32) -> Self {
        Self { stop, max_cycles }
    }

    pub fn with_stop(mut self, stop: f64) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: u32) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    /// Fills `virtual_targets` and returns where the virtual chain's root
    /// ended up.
    fn target_phase(
        skeleton: &Skeleton,
        bones: &[BoneId],
        target: DVec2,
        virtual_targets: &mut [DVec2],
    ) -> DVec2 {
        let mut running = target;
        for (i, &id) in bones.iter().enumerate().rev() {
            virtual_targets[i] = running;
            let bone = &skeleton[id];
            let to_target = running - bone.initial;
            let len = to_target.length();
            let dir = if len > 0.0001 {
                to_target / len
            } else {
                direction(bone.orientation)
            };
            running -= dir * bone.length;
        }
        running
    }

    fn position_phase(
        skeleton: &mut Skeleton,
        bones: &[BoneId],
        target: DVec2,
        virtual_targets: &[DVec2],
        offset: DVec2,
    ) {
        let last = bones.len() - 1;
        for (i, &id) in bones.iter().enumerate() {
            let start = match i {
                0 => skeleton[id].initial,
                _ => skeleton[bones[i - 1]].terminal,
            };
            let aim = if i == last {
                target
            } else {
                virtual_targets[i] - offset
            };
            let bone = &mut skeleton[id];
            let angle = if (aim - start).length_squared() > 0.0001 {
                heading(start, aim)
            } else {
                bone.orientation
            };
            bone.reorient(start, angle, true, true);
        }
    }
}

impl IkSolver for IterativeSolver {
    fn solve(
        &self,
        skeleton: &mut Skeleton,
        chain: ChainId,
        target: DVec2,
        pinned: bool,
    ) -> KinematicsResult<SolveResult> {
        let bones = skeleton[chain].bones.clone();
        let Some(&terminal) = bones.last() else {
            return Err(KinematicsError::EmptyChain(chain));
        };

        let mut distance_sq = skeleton[terminal].terminal.distance_squared(target);
        if pinned {
            // holding the far end while the root chases the target has no
            // implementation yet; report it and leave the pose alone
            log::debug!("pinned iterative solve on {:?} left unresolved", chain);
            return Ok(SolveResult::unresolved(0, distance_sq));
        }
        if distance_sq <= self.stop {
            return Ok(SolveResult::resolved(0, distance_sq));
        }

        let mut virtual_targets = vec![DVec2::ZERO; bones.len()];
        for cycle in 1..=self.max_cycles {
            let virtual_root = Self::target_phase(skeleton, &bones, target, &mut virtual_targets);
            let offset = virtual_root - skeleton[bones[0]].initial;
            Self::position_phase(skeleton, &bones, target, &virtual_targets, offset);

            distance_sq = skeleton[terminal].terminal.distance_squared(target);
            log::trace!("chain {:?} cycle {}: residual {:.4}", chain, cycle, distance_sq);
            if distance_sq <= self.stop {
                return Ok(SolveResult::resolved(cycle, distance_sq));
            }
        }
        Ok(SolveResult::unresolved(self.max_cycles, distance_sq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ik::Chain;
    use approx::assert_abs_diff_eq;

    fn straight_chain(skeleton: &mut Skeleton, count: usize, length: f64) -> ChainId {
        let mut builder = Chain::builder(DVec2::ZERO);
        for i in 1..=count {
            builder = builder.add_bone(DVec2::new(length * i as f64, 0.0));
        }
        builder.build(skeleton).unwrap()
    }

    #[test]
    fn converges_on_reachable_target() {
        let mut skeleton = Skeleton::new();
        let chain = straight_chain(&mut skeleton, 3, 50.0);
        let target = DVec2::new(120.0, 20.0);

        let result = IterativeSolver::default()
            .solve(&mut skeleton, chain, target, false)
            .unwrap();
        assert!(result.resolved);
        assert!(result.cycles <= 3);

        let end = skeleton[chain].terminal().unwrap();
        assert!(skeleton[end].terminal().distance_squared(target) <= DEFAULT_STOP);
    }

    #[test]
    fn root_joint_never_moves() {
        let mut skeleton = Skeleton::new();
        let chain = straight_chain(&mut skeleton, 4, 25.0);
        IterativeSolver::default()
            .solve(&mut skeleton, chain, DVec2::new(-40.0, 60.0), false)
            .unwrap();
        let root = skeleton[chain].root().unwrap();
        assert_eq!(skeleton[root].initial(), DVec2::ZERO);
    }

    #[test]
    fn keeps_lengths_and_continuity_when_out_of_reach() {
        let mut skeleton = Skeleton::new();
        let chain = straight_chain(&mut skeleton, 3, 50.0);
        let result = IterativeSolver::default()
            .solve(&mut skeleton, chain, DVec2::new(0.0, 400.0), false)
            .unwrap();
        assert!(!result.resolved);
        assert_eq!(result.cycles, 3);

        let bones = skeleton[chain].bones().to_vec();
        for &id in &bones {
            let bone = &skeleton[id];
            assert_abs_diff_eq!(bone.initial().distance(bone.terminal()), 50.0, epsilon = 1e-9);
        }
        for pair in bones.windows(2) {
            let gap = skeleton[pair[0]].terminal().distance(skeleton[pair[1]].initial());
            assert!(gap < 1e-9);
        }
    }

    #[test]
    fn target_already_reached_is_a_no_op() {
        let mut skeleton = Skeleton::new();
        let chain = straight_chain(&mut skeleton, 2, 10.0);
        let result = IterativeSolver::default()
            .solve(&mut skeleton, chain, DVec2::new(20.5, 0.5), false)
            .unwrap();
        assert!(result.resolved);
        assert_eq!(result.cycles, 0);
        let end = skeleton[chain].terminal().unwrap();
        assert_eq!(skeleton[end].terminal(), DVec2::new(20.0, 0.0));
    }

    #[test]
    fn pinned_mode_is_unresolved_and_untouched() {
        let mut skeleton = Skeleton::new();
        let chain = straight_chain(&mut skeleton, 3, 50.0);
        let result = IterativeSolver::default()
            .solve(&mut skeleton, chain, DVec2::new(120.0, 20.0), true)
            .unwrap();
        assert!(!result.resolved);
        let end = skeleton[chain].terminal().unwrap();
        assert_eq!(skeleton[end].terminal(), DVec2::new(150.0, 0.0));
    }

    #[test]
    fn empty_chain_is_an_error() {
        let mut skeleton = Skeleton::new();
        let chain = skeleton.add_chain("empty");
        let err = IterativeSolver::default()
            .solve(&mut skeleton, chain, DVec2::ZERO, false)
            .unwrap_err();
        assert_eq!(err, KinematicsError::EmptyChain(chain));
    }

    #[test]
    fn builder_methods() {
        let solver = IterativeSolver::default().with_stop(1.0).with_max_cycles(8);
        assert_eq!(solver, IterativeSolver::new(1.0, 8));
    }
}
