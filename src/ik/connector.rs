use super::joint::JointLimits;
use super::linkable::{ConnectorId, Linkable, NodeId};
use super::skeleton::Skeleton;
use super::solver::DEFAULT_STOP;
use crate::math::{normalize_angle, DVec2, Rotation};
use std::f64::consts::{FRAC_PI_2, PI};

/// One of the three attachment points of a [`Connector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminator {
    Left,
    Mid,
    Right,
}

impl Terminator {
    pub const ALL: [Terminator; 3] = [Terminator::Left, Terminator::Mid, Terminator::Right];

    pub fn index(self) -> usize {
        match self {
            Terminator::Left => 0,
            Terminator::Mid => 1,
            Terminator::Right => 2,
        }
    }
}

/// Terminator placement in the connector's own frame: pivot at the origin,
/// orientation along +x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminatorLayout {
    /// Corner of the bounding box, used as the render origin.
    pub origin: DVec2,
    /// Left, mid, right positions.
    pub points: [DVec2; 3],
    /// Left, mid, right orientations relative to the connector.
    pub angles: [f64; 3],
}

/// Terminator placement for a connector, as a function of its bounding box.
#[derive(Debug, Clone, Copy)]
pub enum ConnectorKind {
    /// Mid straight ahead, left and right square to the sides.
    Hub,
    /// Mid up the spine, left and right hanging back at the hips.
    Pelvis,
    /// Mid toward the head, left and right angled back for the arms.
    Neck,
    Custom(fn(f64, f64) -> TerminatorLayout),
}

impl ConnectorKind {
    pub fn assign_terminators(self, width: f64, height: f64) -> TerminatorLayout {
        let (hw, hh) = (width / 2.0, height / 2.0);
        let origin = DVec2::new(-hw, -hh);
        match self {
            ConnectorKind::Hub => TerminatorLayout {
                origin,
                points: [DVec2::new(0.0, hh), DVec2::new(hw, 0.0), DVec2::new(0.0, -hh)],
                angles: [FRAC_PI_2, 0.0, -FRAC_PI_2],
            },
            ConnectorKind::Pelvis => TerminatorLayout {
                origin,
                points: [DVec2::new(-hw, hh), DVec2::new(hw, 0.0), DVec2::new(-hw, -hh)],
                angles: [PI, 0.0, PI],
            },
            ConnectorKind::Neck => TerminatorLayout {
                origin,
                points: [DVec2::new(0.0, hh), DVec2::new(hw, 0.0), DVec2::new(0.0, -hh)],
                angles: [0.75 * PI, 0.0, -0.75 * PI],
            },
            ConnectorKind::Custom(layout) => layout(width, height),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConnectorConfig {
    pub kind: ConnectorKind,
    pub width: f64,
    pub height: f64,
    pub limits: JointLimits,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            kind: ConnectorKind::Hub,
            width: 20.0,
            height: 20.0,
            limits: JointLimits::UNCONSTRAINED,
        }
    }
}

impl ConnectorConfig {
    pub fn new(kind: ConnectorKind, width: f64, height: f64) -> Self {
        Self {
            kind,
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_limits(mut self, limits: JointLimits) -> Self {
        self.limits = limits;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminatorSlot {
    pub point: DVec2,
    pub orientation: f64,
    pub child: Option<NodeId>,
}

/// A branching hub: one pivot, three terminators that always sit where a
/// rigid rotation of the layout about the pivot puts them.
#[derive(Debug, Clone)]
pub struct Connector {
    pub(crate) pivot: DVec2,
    pub(crate) origin: DVec2,
    pub(crate) orientation: f64,
    pub(crate) config: ConnectorConfig,
    pub(crate) slots: [TerminatorSlot; 3],
    pub(crate) linked_from: Option<NodeId>,
    pub(crate) label: String,
}

impl Connector {
    pub fn new(config: ConnectorConfig, pivot: DVec2, orientation: f64) -> Self {
        let empty = TerminatorSlot {
            point: pivot,
            orientation: 0.0,
            child: None,
        };
        let mut connector = Self {
            pivot,
            origin: pivot,
            orientation: normalize_angle(orientation),
            config,
            slots: [empty; 3],
            linked_from: None,
            label: String::new(),
        };
        connector.assign_terminators();
        connector
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Recomputes the origin and every terminator from the pivot and the
    /// current orientation.
    pub fn assign_terminators(&mut self) {
        let layout = self
            .config
            .kind
            .assign_terminators(self.config.width, self.config.height);
        let rotation = Rotation::new(self.orientation);
        self.origin = self.pivot + rotation.rotate_vector(layout.origin);
        for (slot, (point, angle)) in self
            .slots
            .iter_mut()
            .zip(layout.points.into_iter().zip(layout.angles))
        {
            slot.point = self.pivot + rotation.rotate_vector(point);
            slot.orientation = normalize_angle(self.orientation + angle);
        }
    }

    pub fn pivot(&self) -> DVec2 {
        self.pivot
    }

    pub fn origin(&self) -> DVec2 {
        self.origin
    }

    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn limits(&self) -> JointLimits {
        self.config.limits
    }

    pub fn slot(&self, terminator: Terminator) -> &TerminatorSlot {
        &self.slots[terminator.index()]
    }

    pub fn terminator(&self, terminator: Terminator) -> DVec2 {
        self.slots[terminator.index()].point
    }

    pub fn child(&self, terminator: Terminator) -> Option<NodeId> {
        self.slots[terminator.index()].child
    }

    pub fn linked_from(&self) -> Option<NodeId> {
        self.linked_from
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn translate_to(&mut self, to: DVec2) {
        let delta = to - self.pivot;
        self.pivot = to;
        self.origin += delta;
        for slot in &mut self.slots {
            slot.point += delta;
        }
    }

    fn apply_rotation(&mut self, rotation: Rotation) {
        self.origin = rotation.rotate_about(self.origin, self.pivot);
        self.orientation = rotation.apply_to_angle(self.orientation);
        for slot in &mut self.slots {
            slot.point = rotation.rotate_about(slot.point, self.pivot);
            slot.orientation = rotation.apply_to_angle(slot.orientation);
        }
    }

    fn children(&self) -> impl Iterator<Item = (NodeId, DVec2)> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.child.map(|child| (child, slot.point)))
    }
}

impl Linkable for ConnectorId {
    fn move_to(self, skeleton: &mut Skeleton, to: DVec2) {
        skeleton[self].translate_to(to);
        skeleton.render(self.into());
        let children: Vec<_> = skeleton[self].children().collect();
        for (child, point) in children {
            child.move_to(skeleton, point);
        }
    }

    fn move_and_rotate(self, skeleton: &mut Skeleton, to: DVec2, rotation: Rotation) {
        let connector = &mut skeleton[self];
        connector.translate_to(to);
        connector.apply_rotation(rotation);
        skeleton.render(self.into());
        let children: Vec<_> = skeleton[self].children().collect();
        for (child, point) in children {
            child.move_and_rotate(skeleton, point, rotation);
        }
    }

    fn offset_orientation(self, skeleton: &mut Skeleton, delta: f64) -> bool {
        let connector = &skeleton[self];
        let parent = connector
            .linked_from
            .map_or(0.0, |node| node.end_orientation(skeleton));
        let candidate = connector.orientation + delta;
        if !connector.config.limits.contains(parent, candidate) {
            log::trace!("connector {:?}: offset {:.4} outside limits", self, delta);
            return false;
        }
        let pivot = connector.pivot;
        self.move_and_rotate(skeleton, pivot, Rotation::new(delta));
        true
    }

    /// Brings the pivot to `target`. A linked connector asks its parent to
    /// carry it there, aiming the parent's effector so that the slot this
    /// connector hangs from lands on the target.
    fn move_end_effector(self, skeleton: &mut Skeleton, target: DVec2, pinned: bool) -> bool {
        let Some(parent) = skeleton[self].linked_from else {
            self.move_to(skeleton, target);
            return true;
        };
        let hang = skeleton[self].pivot - effector_point(parent, skeleton);
        parent.move_end_effector(skeleton, target - hang, pinned);
        skeleton[self].pivot.distance_squared(target) <= DEFAULT_STOP
    }

    fn orientation(self, skeleton: &Skeleton) -> f64 {
        skeleton[self].orientation
    }

    fn end_orientation(self, skeleton: &Skeleton) -> f64 {
        skeleton[self].orientation
    }

    fn end_point(self, skeleton: &Skeleton) -> DVec2 {
        skeleton[self].terminator(Terminator::Mid)
    }

    fn set_linked_from(self, skeleton: &mut Skeleton, from: Option<NodeId>) {
        skeleton[self].linked_from = from;
    }
}

/// Point a node drags toward the target of its own end-effector move.
pub(crate) fn effector_point(node: NodeId, skeleton: &Skeleton) -> DVec2 {
    match node {
        NodeId::Connector(id) => skeleton[id].pivot,
        other => other.end_point(skeleton),
    }
}

impl Skeleton {
    /// Attaches `child` to one terminator, optionally turning it to the
    /// terminator's orientation.
    pub(crate) fn link_terminator_unchecked(
        &mut self,
        connector: ConnectorId,
        child: NodeId,
        terminator: Terminator,
        orient: bool,
    ) {
        let slot = *self[connector].slot(terminator);
        if orient {
            let rotation = Rotation::between(child.orientation(self), slot.orientation);
            child.move_and_rotate(self, slot.point, rotation);
        } else {
            child.move_to(self, slot.point);
        }
        self[connector].slots[terminator.index()].child = Some(child);
        child.set_linked_from(self, Some(connector.into()));
    }
}
