use super::bone::Bone;
use super::chain::Chain;
use super::connector::{Connector, ConnectorConfig, Terminator};
use super::joint::JointLimits;
use super::linkable::{BoneId, ChainId, ConnectorId, Linkable, NodeId};
use super::solver::IkSolver;
use crate::error::{KinematicsError, KinematicsResult};
use crate::events::{Interaction, PoseEvent, PoseObserver};
use crate::math::angle::is_finite_point;
use crate::math::{DVec2, Rotation};
use bytemuck::{Pod, Zeroable};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkeletonConfig {
    /// Emit [`PoseEvent::Render`] for every node FK touches.
    pub render_on_fk: bool,
    /// Keep emitted events in the queue read by [`Skeleton::drain_events`].
    /// Observers are notified either way.
    ///
    /// The queue is unbounded. A caller that records events must drain them
    /// regularly (once per frame of a drag, say); one that only listens
    /// through [`Skeleton::subscribe`] should turn recording off.
    pub record_events: bool,
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        Self {
            render_on_fk: true,
            record_events: true,
        }
    }
}

impl SkeletonConfig {
    pub fn with_render_on_fk(mut self, render: bool) -> Self {
        self.render_on_fk = render;
        self
    }

    pub fn with_record_events(mut self, record: bool) -> Self {
        self.record_events = record;
        self
    }
}

/// GPU-ready line segment for one bone.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BoneSegment {
    pub start: [f32; 2],
    pub end: [f32; 2],
}

impl From<&Bone> for BoneSegment {
    fn from(bone: &Bone) -> Self {
        Self {
            start: bone.initial.as_vec2().to_array(),
            end: bone.terminal.as_vec2().to_array(),
        }
    }
}

/// Arena owning every bone, chain and connector of a pose.
///
/// Nodes refer to each other by handle. The methods here validate their
/// input and then hand off to the [`Linkable`] implementations, which do the
/// actual propagation.
pub struct Skeleton {
    bones: Vec<Bone>,
    chains: Vec<Chain>,
    connectors: Vec<Connector>,
    config: SkeletonConfig,
    events: Vec<PoseEvent>,
    observers: Vec<Box<dyn PoseObserver>>,
}

impl fmt::Debug for Skeleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Skeleton")
            .field("bones", &self.bones)
            .field("chains", &self.chains)
            .field("connectors", &self.connectors)
            .field("config", &self.config)
            .field("events", &self.events.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::new()
    }
}

impl Skeleton {
    pub fn new() -> Self {
        Self::with_config(SkeletonConfig::default())
    }

    pub fn with_config(config: SkeletonConfig) -> Self {
        Self {
            bones: Vec::new(),
            chains: Vec::new(),
            connectors: Vec::new(),
            config,
            events: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn config(&self) -> &SkeletonConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SkeletonConfig) {
        self.config = config;
    }

    // --- lookup ---

    pub fn bone(&self, id: BoneId) -> Option<&Bone> {
        self.bones.get(id.0)
    }

    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id.0)
    }

    pub fn connector(&self, id: ConnectorId) -> Option<&Connector> {
        self.connectors.get(id.0)
    }

    /// Live bones, retired ones skipped.
    pub fn bones(&self) -> impl Iterator<Item = (BoneId, &Bone)> {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, bone)| !bone.retired)
            .map(|(i, bone)| (BoneId(i), bone))
    }

    pub fn chains(&self) -> impl Iterator<Item = (ChainId, &Chain)> {
        self.chains.iter().enumerate().map(|(i, c)| (ChainId(i), c))
    }

    pub fn connectors(&self) -> impl Iterator<Item = (ConnectorId, &Connector)> {
        self.connectors
            .iter()
            .enumerate()
            .map(|(i, c)| (ConnectorId(i), c))
    }

    /// One segment per live bone, in insertion order.
    pub fn segments(&self) -> Vec<BoneSegment> {
        self.bones().map(|(_, bone)| BoneSegment::from(bone)).collect()
    }

    // --- construction ---

    /// Adds a free bone, not part of any chain.
    pub fn add_bone(&mut self, initial: DVec2, terminal: DVec2) -> KinematicsResult<BoneId> {
        check_point(initial)?;
        check_point(terminal)?;
        Ok(self.insert_bone(Bone::new(initial, terminal)))
    }

    /// Adds an empty chain using the default iterative solver.
    pub fn add_chain(&mut self, label: impl Into<String>) -> ChainId {
        self.chains.push(Chain::new(label.into()));
        ChainId(self.chains.len() - 1)
    }

    /// Creates a bone and appends it to `chain`. On a non-empty chain the
    /// bone is moved so it starts at the current terminal joint.
    pub fn create_bone(
        &mut self,
        chain: ChainId,
        initial: DVec2,
        terminal: DVec2,
    ) -> KinematicsResult<BoneId> {
        self.check_node(chain.into())?;
        let bone = self.add_bone(initial, terminal)?;
        self.append_bone_unchecked(chain, bone);
        Ok(bone)
    }

    /// Appends a free bone to `chain`.
    pub fn append_bone(&mut self, chain: ChainId, bone: BoneId) -> KinematicsResult<()> {
        self.check_node(chain.into())?;
        self.check_node(bone.into())?;
        if self[bone].chain.is_some() {
            return Err(KinematicsError::AlreadyOwned(bone));
        }
        self.append_bone_unchecked(chain, bone);
        Ok(())
    }

    /// Removes the terminal bone of `chain` and retires it.
    pub fn pop_bone(&mut self, chain: ChainId) -> KinematicsResult<BoneId> {
        self.check_node(chain.into())?;
        self.pop_bone_unchecked(chain)
            .ok_or(KinematicsError::EmptyChain(chain))
    }

    pub fn add_connector(
        &mut self,
        config: ConnectorConfig,
        pivot: DVec2,
        orientation: f64,
    ) -> KinematicsResult<ConnectorId> {
        check_point(pivot)?;
        check_angle(orientation)?;
        self.connectors
            .push(Connector::new(config, pivot, orientation));
        Ok(ConnectorId(self.connectors.len() - 1))
    }

    // --- forward kinematics ---

    /// Translates a node so its attachment point sits at `to`.
    pub fn move_to(&mut self, node: impl Into<NodeId>, to: DVec2) -> KinematicsResult<()> {
        let node = node.into();
        self.check_node(node)?;
        self.check_detached(node)?;
        check_point(to)?;
        node.move_to(self, to);
        Ok(())
    }

    /// Rigid rotation by `delta` about the node's own attachment point. Joint
    /// limits are not consulted; see [`offset_orientation`](Self::offset_orientation).
    pub fn rotate(&mut self, node: impl Into<NodeId>, delta: f64) -> KinematicsResult<()> {
        let node = node.into();
        self.check_node(node)?;
        check_angle(delta)?;
        let rotation = Rotation::new(delta);
        match node {
            NodeId::Bone(id) => self.rotate_bone(id, rotation),
            NodeId::Chain(id) => {
                let root = self[id].root().ok_or(KinematicsError::EmptyChain(id))?;
                self.rotate_bone(root, rotation);
            }
            NodeId::Connector(id) => {
                let pivot = self[id].pivot;
                id.move_and_rotate(self, pivot, rotation);
            }
        }
        Ok(())
    }

    pub fn move_and_rotate(
        &mut self,
        node: impl Into<NodeId>,
        to: DVec2,
        delta: f64,
    ) -> KinematicsResult<()> {
        let node = node.into();
        self.check_node(node)?;
        self.check_detached(node)?;
        check_point(to)?;
        check_angle(delta)?;
        node.move_and_rotate(self, to, Rotation::new(delta));
        Ok(())
    }

    /// Joint-limited rotation by `delta`. `Ok(false)` means the limits
    /// refused it and nothing moved.
    pub fn offset_orientation(
        &mut self,
        node: impl Into<NodeId>,
        delta: f64,
    ) -> KinematicsResult<bool> {
        let node = node.into();
        self.check_node(node)?;
        check_angle(delta)?;
        Ok(node.offset_orientation(self, delta))
    }

    /// Joint-limited orientation setter for a bone.
    pub fn set_orientation(&mut self, bone: BoneId, angle: f64) -> KinematicsResult<bool> {
        self.check_node(bone.into())?;
        check_angle(angle)?;
        Ok(self.orient_bone(bone, angle))
    }

    /// Reassigns a bone's initial joint. The previous bone in the chain, if
    /// any, has its terminal joint moved along so the chain stays joined.
    pub fn set_initial(
        &mut self,
        bone: BoneId,
        initial: DVec2,
        update_derived: bool,
    ) -> KinematicsResult<()> {
        self.check_node(bone.into())?;
        check_point(initial)?;
        self[bone].set_initial(initial, update_derived);
        self.render(bone.into());
        if let Some(prev) = self[bone].prev {
            self[prev].set_terminal(initial);
            self.render(prev.into());
        }
        Ok(())
    }

    /// Reassigns a bone's terminal joint and carries whatever follows it.
    pub fn set_terminal(&mut self, bone: BoneId, terminal: DVec2) -> KinematicsResult<()> {
        self.check_node(bone.into())?;
        check_point(terminal)?;
        self[bone].set_terminal(terminal);
        self.render(bone.into());
        self.propagate(bone, None);
        Ok(())
    }

    pub fn set_limits(&mut self, bone: BoneId, limits: JointLimits) -> KinematicsResult<()> {
        self.check_node(bone.into())?;
        self[bone].set_limits(limits);
        Ok(())
    }

    // --- inverse kinematics ---

    /// Asks a node to bring its end effector to `target`. `Ok(false)` is a
    /// best-effort pose, not a failure.
    pub fn move_end_effector(
        &mut self,
        node: impl Into<NodeId>,
        target: DVec2,
        pinned: bool,
    ) -> KinematicsResult<bool> {
        let node = node.into();
        self.check_node(node)?;
        check_point(target)?;
        if pinned {
            self.check_detached(node)?;
        }
        if let NodeId::Chain(id) = node {
            let chain = &self[id];
            if chain.is_empty() {
                return Err(KinematicsError::EmptyChain(id));
            }
            chain.solver.check_chain(chain.size())?;
        }
        Ok(node.move_end_effector(self, target, pinned))
    }

    /// Swaps the solver used by `chain`.
    pub fn set_solver<S: IkSolver + 'static>(
        &mut self,
        chain: ChainId,
        solver: S,
    ) -> KinematicsResult<()> {
        self.check_node(chain.into())?;
        self[chain].solver = Arc::new(solver);
        Ok(())
    }

    // --- linking ---

    /// Attaches `child` to the end of `parent`: the terminal joint of a bone
    /// or chain, or the mid terminator of a connector. With `orient` the
    /// child is turned to match the parent's end orientation.
    pub fn link(
        &mut self,
        parent: impl Into<NodeId>,
        child: impl Into<NodeId>,
        orient: bool,
    ) -> KinematicsResult<()> {
        let (parent, child) = (parent.into(), child.into());
        self.check_link(parent, child)?;
        match parent {
            NodeId::Bone(id) => self.link_bone_unchecked(id, child, orient),
            NodeId::Chain(id) => {
                if self[id].is_empty() {
                    return Err(KinematicsError::EmptyChain(id));
                }
                self.link_chain_unchecked(id, child, orient);
            }
            NodeId::Connector(id) => {
                self.link_terminator_unchecked(id, child, Terminator::Mid, orient)
            }
        }
        log::debug!("linked {:?} -> {:?}", parent, child);
        Ok(())
    }

    pub fn link_terminator(
        &mut self,
        connector: ConnectorId,
        child: impl Into<NodeId>,
        terminator: Terminator,
        orient: bool,
    ) -> KinematicsResult<()> {
        let child = child.into();
        self.check_link(connector.into(), child)?;
        self.link_terminator_unchecked(connector, child, terminator, orient);
        log::debug!("linked {:?}/{:?} -> {:?}", connector, terminator, child);
        Ok(())
    }

    /// Re-syncs everything forward-linked from `chain` after its terminal
    /// bone was edited without propagation.
    pub fn invalidate(&mut self, chain: ChainId) -> KinematicsResult<()> {
        self.check_node(chain.into())?;
        self.invalidate_chain(chain);
        Ok(())
    }

    // --- events ---

    /// Raises a selection hook on `node`.
    pub fn interact(&mut self, node: impl Into<NodeId>, kind: Interaction) -> KinematicsResult<()> {
        let node = node.into();
        self.check_node(node)?;
        self.emit(PoseEvent::Interaction { node, kind });
        Ok(())
    }

    pub fn subscribe(&mut self, observer: Box<dyn PoseObserver>) {
        self.observers.push(observer);
    }

    pub fn events(&self) -> &[PoseEvent] {
        &self.events
    }

    /// Takes every recorded event, leaving the queue empty.
    pub fn drain_events(&mut self) -> Vec<PoseEvent> {
        std::mem::take(&mut self.events)
    }

    // --- crate internals ---

    pub(crate) fn insert_bone(&mut self, bone: Bone) -> BoneId {
        self.bones.push(bone);
        BoneId(self.bones.len() - 1)
    }

    pub(crate) fn emit(&mut self, event: PoseEvent) {
        for observer in &mut self.observers {
            observer.notify(&event);
        }
        if self.config.record_events {
            self.events.push(event);
        }
    }

    pub(crate) fn render(&mut self, node: NodeId) {
        if self.config.render_on_fk {
            self.emit(PoseEvent::Render(node));
        }
    }

    /// Hands an FK step on from `from` to the next bone in its chain, else
    /// to its forward link. With neither, the end of propagation is
    /// reported instead.
    pub(crate) fn propagate(&mut self, from: BoneId, rotation: Option<Rotation>) {
        let bone = &self[from];
        let joint = bone.terminal;
        let Some(successor) = bone.next.map(NodeId::from).or(bone.linked_to) else {
            self.emit(PoseEvent::PropagationEnd(from));
            return;
        };
        log::trace!("propagate {:?} -> {:?}", from, successor);
        match rotation.filter(|r| !r.is_identity()) {
            Some(rotation) => successor.move_and_rotate(self, joint, rotation),
            None => successor.move_to(self, joint),
        }
    }

    fn link_bone_unchecked(&mut self, bone: BoneId, child: NodeId, orient: bool) {
        let joint = self[bone].terminal;
        if orient {
            let rotation = Rotation::between(child.orientation(self), self[bone].orientation);
            child.move_and_rotate(self, joint, rotation);
        } else {
            child.move_to(self, joint);
        }
        self[bone].linked_to = Some(child);
        child.set_linked_from(self, Some(bone.into()));
    }

    fn check_node(&self, node: NodeId) -> KinematicsResult<()> {
        let known = match node {
            NodeId::Bone(id) => match self.bones.get(id.0) {
                Some(bone) if bone.retired => {
                    log::warn!("bone {:?} is retired", id);
                    return Err(KinematicsError::RetiredBone(id));
                }
                Some(_) => true,
                None => false,
            },
            NodeId::Chain(id) => id.0 < self.chains.len(),
            NodeId::Connector(id) => id.0 < self.connectors.len(),
        };
        if known {
            Ok(())
        } else {
            log::warn!("unknown node {:?}", node);
            Err(KinematicsError::UnknownNode(node))
        }
    }

    /// Interior chain bones hang off the bone before them and only move
    /// with it.
    fn check_detached(&self, node: NodeId) -> KinematicsResult<()> {
        match node {
            NodeId::Bone(id) if self[id].prev.is_some() => {
                log::warn!("bone {:?} is inside a chain", id);
                Err(KinematicsError::InteriorBone(id))
            }
            _ => Ok(()),
        }
    }

    fn check_link(&self, parent: NodeId, child: NodeId) -> KinematicsResult<()> {
        self.check_node(parent)?;
        self.check_node(child)?;
        self.check_detached(child)?;
        let same_chain = match (parent, child) {
            (NodeId::Chain(chain), NodeId::Bone(bone)) | (NodeId::Bone(bone), NodeId::Chain(chain)) => {
                self[bone].chain == Some(chain)
            }
            _ => false,
        };
        if parent == child || same_chain {
            log::warn!("refusing to link {:?} onto {:?}", child, parent);
            return Err(KinematicsError::SelfLink(child));
        }
        Ok(())
    }
}

fn check_point(p: DVec2) -> KinematicsResult<()> {
    if is_finite_point(p) {
        Ok(())
    } else {
        log::warn!("rejected non-finite point ({}, {})", p.x, p.y);
        Err(KinematicsError::NonFinite { x: p.x, y: p.y })
    }
}

fn check_angle(angle: f64) -> KinematicsResult<()> {
    if angle.is_finite() {
        Ok(())
    } else {
        log::warn!("rejected non-finite angle {}", angle);
        Err(KinematicsError::NonFiniteAngle(angle))
    }
}

impl Index<BoneId> for Skeleton {
    type Output = Bone;

    fn index(&self, id: BoneId) -> &Bone {
        &self.bones[id.0]
    }
}

impl IndexMut<BoneId> for Skeleton {
    fn index_mut(&mut self, id: BoneId) -> &mut Bone {
        &mut self.bones[id.0]
    }
}

impl Index<ChainId> for Skeleton {
    type Output = Chain;

    fn index(&self, id: ChainId) -> &Chain {
        &self.chains[id.0]
    }
}

impl IndexMut<ChainId> for Skeleton {
    fn index_mut(&mut self, id: ChainId) -> &mut Chain {
        &mut self.chains[id.0]
    }
}

impl Index<ConnectorId> for Skeleton {
    type Output = Connector;

    fn index(&self, id: ConnectorId) -> &Connector {
        &self.connectors[id.0]
    }
}

impl IndexMut<ConnectorId> for Skeleton {
    fn index_mut(&mut self, id: ConnectorId) -> &mut Connector {
        &mut self.connectors[id.0]
    }
}
