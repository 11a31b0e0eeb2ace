//! IK solver strategies.
//!
//! A solver takes a chain and a target and rewrites the chain's bones in
//! place with [`Bone::reorient`](crate::ik::Bone::reorient) or the endpoint
//! setters. It never propagates; the chain pushes the result forward once
//! the solver returns. Solvers hold configuration only, no history.

mod iterative;
mod limb;

pub use iterative::IterativeSolver;
pub use limb::{preferred_angle, LimbLimits, LimbSolver, TIE_BREAK_TOLERANCE};

use super::linkable::ChainId;
use super::skeleton::Skeleton;
use crate::error::KinematicsResult;
use crate::math::DVec2;
use std::fmt::Debug;

/// Squared distance (px²) under which an end effector counts as on target.
pub const DEFAULT_STOP: f64 = 4.0;

/// Cycle budget of the iterative solver.
pub const DEFAULT_MAX_CYCLES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveResult {
    /// Whether the end effector reached the target.
    pub resolved: bool,
    pub cycles: u32,
    /// Squared distance from the end effector to the target after solving.
    pub distance_sq: f64,
}

impl SolveResult {
    pub fn resolved(cycles: u32, distance_sq: f64) -> Self {
        Self {
            resolved: true,
            cycles,
            distance_sq,
        }
    }

    pub fn unresolved(cycles: u32, distance_sq: f64) -> Self {
        Self {
            resolved: false,
            cycles,
            distance_sq,
        }
    }
}

/// Strategy that poses a chain so its end effector reaches a target.
pub trait IkSolver: Send + Sync + Debug {
    /// Rejects chains the solver cannot handle.
    fn check_chain(&self, _bone_count: usize) -> KinematicsResult<()> {
        Ok(())
    }

    fn solve(
        &self,
        skeleton: &mut Skeleton,
        chain: ChainId,
        target: DVec2,
        pinned: bool,
    ) -> KinematicsResult<SolveResult>;
}
