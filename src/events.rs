//! Notifications the skeleton sends to whoever draws or drives it.

use crate::ik::{BoneId, ChainId, NodeId};

/// Selection hooks a front end can raise on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interaction {
    RollOver,
    RollOut,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseEvent {
    /// The node's pose changed and should be redrawn.
    Render(NodeId),
    /// Forward propagation stopped at this bone: nothing follows it.
    PropagationEnd(BoneId),
    /// An end-effector move on the chain finished.
    Solved { chain: ChainId, resolved: bool },
    Interaction { node: NodeId, kind: Interaction },
}

/// Receives every event as it is emitted.
///
/// Any `FnMut(&PoseEvent)` closure is an observer.
pub trait PoseObserver {
    fn notify(&mut self, event: &PoseEvent);
}

impl<F> PoseObserver for F
where
    F: FnMut(&PoseEvent),
{
    fn notify(&mut self, event: &PoseEvent) {
        self(event)
    }
}
