//! # ik-skeleton2d
//!
//! Planar skeleton kinematics: rigid bones, chains of bones and branching
//! connectors, kept consistent by forward propagation and posed by inverse
//! kinematics solvers.
//!
//! ## Features
//! - Arena skeleton with typed handles for bones, chains and connectors
//! - Joint limits relative to the parent orientation, wrap-around safe
//! - Iterative target-chasing solver for chains of any length
//! - Closed-form two-bone limb solver with limit-aware elbow selection
//! - Event queue and observers for redraw and selection hooks
//!
//! ## Example
//! ```rust
//! use ik_skeleton2d::ik::{Chain, Skeleton};
//! use glam::DVec2;
//!
//! let mut skeleton = Skeleton::new();
//! let arm = Chain::builder(DVec2::ZERO)
//!     .add_bone(DVec2::new(50.0, 0.0))
//!     .add_bone(DVec2::new(100.0, 0.0))
//!     .add_bone(DVec2::new(150.0, 0.0))
//!     .build(&mut skeleton)
//!     .unwrap();
//!
//! let reached = skeleton
//!     .move_end_effector(arm, DVec2::new(120.0, 20.0), false)
//!     .unwrap();
//! println!("reached: {reached}, segments: {}", skeleton.segments().len());
//! ```

pub mod error;
pub mod events;
pub mod ik;
pub mod math;

pub use error::{KinematicsError, KinematicsResult};
pub use events::{Interaction, PoseEvent, PoseObserver};
pub use ik::{
    Bone, BoneId, BoneSegment, Chain, ChainBuilder, ChainId, Connector, ConnectorConfig,
    ConnectorId, ConnectorKind, IkSolver, IterativeSolver, JointLimits, LimbLimits, LimbSolver,
    Linkable, NodeId, Skeleton, SkeletonConfig, SolveResult, Terminator,
};
pub use math::Rotation;
