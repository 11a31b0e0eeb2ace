//! Handles into a [`Skeleton`] and the capability set every node shares.

use super::skeleton::Skeleton;
use crate::math::{DVec2, Rotation};

/// Handle to a [`Bone`](super::Bone) stored in a [`Skeleton`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoneId(pub(crate) usize);

/// Handle to a [`Chain`](super::Chain) stored in a [`Skeleton`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub(crate) usize);

/// Handle to a [`Connector`](super::Connector) stored in a [`Skeleton`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectorId(pub(crate) usize);

impl BoneId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl ChainId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl ConnectorId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Any node that can take part in FK/IK propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Bone(BoneId),
    Chain(ChainId),
    Connector(ConnectorId),
}

impl From<BoneId> for NodeId {
    fn from(id: BoneId) -> Self {
        NodeId::Bone(id)
    }
}

impl From<ChainId> for NodeId {
    fn from(id: ChainId) -> Self {
        NodeId::Chain(id)
    }
}

impl From<ConnectorId> for NodeId {
    fn from(id: ConnectorId) -> Self {
        NodeId::Connector(id)
    }
}

/// Operations shared by bones, chains and connectors.
///
/// Implementors are handles; the skeleton that owns the node is passed in.
/// None of these methods validate their input, so callers outside the crate
/// go through the checked entry points on [`Skeleton`].
pub trait Linkable: Copy + Into<NodeId> {
    /// Translates the node so its attachment point sits at `to`, then
    /// propagates the translation forward.
    fn move_to(self, skeleton: &mut Skeleton, to: DVec2);

    /// Translates to `to` and rotates by `rotation` about the new attachment
    /// point, propagating both in one step.
    fn move_and_rotate(self, skeleton: &mut Skeleton, to: DVec2, rotation: Rotation);

    /// Rotates in place by `delta` if the result respects the node's joint
    /// limits. Returns `false` and leaves the pose untouched otherwise.
    fn offset_orientation(self, skeleton: &mut Skeleton, delta: f64) -> bool;

    /// Asks the node to bring its end effector to `target`. Returns whether
    /// the target was reached.
    fn move_end_effector(self, skeleton: &mut Skeleton, target: DVec2, pinned: bool) -> bool;

    fn orientation(self, skeleton: &Skeleton) -> f64;

    fn end_orientation(self, skeleton: &Skeleton) -> f64;

    /// Point that forward-linked children attach to.
    fn end_point(self, skeleton: &Skeleton) -> DVec2;

    fn set_linked_from(self, skeleton: &mut Skeleton, from: Option<NodeId>);
}

impl Linkable for NodeId {
    fn move_to(self, skeleton: &mut Skeleton, to: DVec2) {
        match self {
            NodeId::Bone(id) => id.move_to(skeleton, to),
            NodeId::Chain(id) => id.move_to(skeleton, to),
            NodeId::Connector(id) => id.move_to(skeleton, to),
        }
    }

    fn move_and_rotate(self, skeleton: &mut Skeleton, to: DVec2, rotation: Rotation) {
        match self {
            NodeId::Bone(id) => id.move_and_rotate(skeleton, to, rotation),
            NodeId::Chain(id) => id.move_and_rotate(skeleton, to, rotation),
            NodeId::Connector(id) => id.move_and_rotate(skeleton, to, rotation),
        }
    }

    fn offset_orientation(self, skeleton: &mut Skeleton, delta: f64) -> bool {
        match self {
            NodeId::Bone(id) => id.offset_orientation(skeleton, delta),
            NodeId::Chain(id) => id.offset_orientation(skeleton, delta),
            NodeId::Connector(id) => id.offset_orientation(skeleton, delta),
        }
    }

    fn move_end_effector(self, skeleton: &mut Skeleton, target: DVec2, pinned: bool) -> bool {
        match self {
            NodeId::Bone(id) => id.move_end_effector(skeleton, target, pinned),
            NodeId::Chain(id) => id.move_end_effector(skeleton, target, pinned),
            NodeId::Connector(id) => id.move_end_effector(skeleton, target, pinned),
        }
    }

    fn orientation(self, skeleton: &Skeleton) -> f64 {
        match self {
            NodeId::Bone(id) => id.orientation(skeleton),
            NodeId::Chain(id) => id.orientation(skeleton),
            NodeId::Connector(id) => id.orientation(skeleton),
        }
    }

    fn end_orientation(self, skeleton: &Skeleton) -> f64 {
        match self {
            NodeId::Bone(id) => id.end_orientation(skeleton),
            NodeId::Chain(id) => id.end_orientation(skeleton),
            NodeId::Connector(id) => id.end_orientation(skeleton),
        }
    }

    fn end_point(self, skeleton: &Skeleton) -> DVec2 {
        match self {
            NodeId::Bone(id) => id.end_point(skeleton),
            NodeId::Chain(id) => id.end_point(skeleton),
            NodeId::Connector(id) => id.end_point(skeleton),
        }
    }

    fn set_linked_from(self, skeleton: &mut Skeleton, from: Option<NodeId>) {
        match self {
            NodeId::Bone(id) => id.set_linked_from(skeleton, from),
            NodeId::Chain(id) => id.set_linked_from(skeleton, from),
            NodeId::Connector(id) => id.set_linked_from(skeleton, from),
        }
    }
}
