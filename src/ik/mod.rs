//! Kinematics module
//!
//! Bones, chains and connectors live in a [`Skeleton`] arena and are
//! addressed by handle. Forward kinematics runs through the [`Linkable`]
//! trait; inverse kinematics through the strategies in [`solver`].

pub mod bone;
pub mod chain;
pub mod connector;
pub mod joint;
pub mod linkable;
pub mod skeleton;
pub mod solver;

pub use bone::{Bone, FkMotion};
pub use chain::{Chain, ChainBuilder, ForwardLink};
pub use connector::{
    Connector, ConnectorConfig, ConnectorKind, Terminator, TerminatorLayout, TerminatorSlot,
};
pub use joint::JointLimits;
pub use linkable::{BoneId, ChainId, ConnectorId, Linkable, NodeId};
pub use skeleton::{BoneSegment, Skeleton, SkeletonConfig};
pub use solver::{
    preferred_angle, IkSolver, IterativeSolver, LimbLimits, LimbSolver, SolveResult,
    DEFAULT_MAX_CYCLES, DEFAULT_STOP,
};
