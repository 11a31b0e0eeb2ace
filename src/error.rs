//! Error types for skeleton editing.
//!
//! Geometric infeasibility is not an error: solvers report it through
//! [`SolveResult::resolved`](crate::ik::SolveResult::resolved). These variants
//! cover rejected input and structural misuse only.

use thiserror::Error;

use crate::ik::{BoneId, ChainId, NodeId};

/// Errors returned by the validated entry points on
/// [`Skeleton`](crate::ik::Skeleton).
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum KinematicsError {
    /// A coordinate was NaN or infinite. Nothing was changed.
    #[error("non-finite coordinate ({x}, {y})")]
    NonFinite {
        /// Rejected x component.
        x: f64,
        /// Rejected y component.
        y: f64,
    },

    /// An angle was NaN or infinite. Nothing was changed.
    #[error("non-finite angle {0}")]
    NonFiniteAngle(f64),

    /// The operation needs at least one bone in the chain.
    #[error("chain {0:?} has no bones")]
    EmptyChain(ChainId),

    /// A solver was run on a chain of the wrong size.
    #[error("solver expects a chain of {expected} bones, found {found}")]
    SolverArity {
        /// Bone count the solver supports.
        expected: usize,
        /// Bone count of the chain it was given.
        found: usize,
    },

    /// The bone was popped from its chain and can no longer be edited.
    #[error("bone {0:?} has been retired")]
    RetiredBone(BoneId),

    /// The handle does not belong to this skeleton.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    /// The bone already belongs to a chain.
    #[error("bone {0:?} already belongs to a chain")]
    AlreadyOwned(BoneId),

    /// The bone sits after another bone in its chain, so translating it on
    /// its own would tear the chain apart. Move the chain instead.
    #[error("bone {0:?} is inside a chain and cannot be moved on its own")]
    InteriorBone(BoneId),

    /// A node cannot be linked onto itself.
    #[error("node {0:?} cannot be linked to itself")]
    SelfLink(NodeId),
}

/// Result alias for skeleton operations.
pub type KinematicsResult<T> = Result<T, KinematicsError>;
