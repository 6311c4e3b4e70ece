//! Tree node aggregate.
//!
//! A [`Node`] can only be obtained through checked constructors. Rows read
//! back from storage pass through [`Node::from_record`], new rows are built as
//! [`NewNode`] from an already-loaded parent, and relocations produce new
//! nodes via [`Node::placed`]. None of these paths ever hands out a node that
//! breaks the tree rules:
//!
//! - a `Root` has an empty path and no parent
//! - a `Child` has a parent and a non-empty path
//! - a child's coordinate is its parent's plus exactly one direction, in the
//!   same `(space_id, group_id)`
//! - only children may be parked, and only within their own tree

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::coord::{Coord, Direction, ParkedCoord, ParkingSlot};
use crate::model::content::ContentId;

/// Storage identity of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a node is the top of its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Child,
}

impl NodeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Child => "child",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = InvariantViolation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(Self::Root),
            "child" => Ok(Self::Child),
            other => Err(InvariantViolation::UnknownKind(other.to_string())),
        }
    }
}

/// Whether a node sits at its address or is held in a parking slot while a
/// swap is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NodeState {
    Stable,
    Relocating {
        slot: ParkingSlot,
        final_coord: Coord,
    },
}

/// A tree rule broken by an entity under construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("root node at {coord} must have an empty path")]
    RootNotAtTop { coord: String },

    #[error("root node at {coord} must not have a parent")]
    RootWithParent { coord: String },

    #[error("child node at {coord} has no parent")]
    ChildWithoutParent { coord: String },

    #[error("child node cannot sit at root depth ({coord})")]
    ChildAtRootDepth { coord: String },

    #[error("{child} is not a direct child position of {parent}")]
    NotDirectChild { child: String, parent: String },

    #[error("child {child} names parent {claimed} but was attached to {actual}")]
    ParentMismatch {
        child: String,
        claimed: String,
        actual: String,
    },

    #[error("cannot attach a child to parked node {parent}")]
    ParentParked { parent: String },

    #[error("root node at {coord} cannot be parked")]
    RootParked { coord: String },

    #[error("parked node at {coord} points outside its tree ({final_coord})")]
    ParkedAcrossSpaces { coord: String, final_coord: String },

    #[error("parking columns of {coord} disagree (slot {slot}, final path present: {has_final})")]
    InconsistentParking {
        coord: String,
        slot: i64,
        has_final: bool,
    },

    #[error("{coord} does not lie under subtree top {top}")]
    OutsideSubtree { coord: String, top: String },

    #[error("content title must not be empty")]
    EmptyTitle,

    #[error("unknown node kind '{0}'")]
    UnknownKind(String),
}

/// Raw, unchecked node row as read from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub kind: NodeKind,
    pub coord: Coord,
    pub parent_id: Option<NodeId>,
    pub origin_id: Option<NodeId>,
    pub content_id: ContentId,
    pub state: NodeState,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// An invariant-checked tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    coord: Coord,
    parent_id: Option<NodeId>,
    origin_id: Option<NodeId>,
    content_id: ContentId,
    #[serde(flatten)]
    state: NodeState,
    created_at_us: i64,
    updated_at_us: i64,
}

impl Node {
    /// Validate a storage row.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] the row breaks.
    pub fn from_record(record: NodeRecord) -> Result<Self, InvariantViolation> {
        check_shape(record.kind, &record.coord, record.parent_id)?;
        check_state(record.kind, &record.coord, &record.state)?;
        Ok(Self {
            id: record.id,
            kind: record.kind,
            coord: record.coord,
            parent_id: record.parent_id,
            origin_id: record.origin_id,
            content_id: record.content_id,
            state: record.state,
            created_at_us: record.created_at_us,
            updated_at_us: record.updated_at_us,
        })
    }

    /// Check that `self` is a direct child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation::ParentMismatch`] or
    /// [`InvariantViolation::NotDirectChild`].
    pub fn check_parent(&self, parent: &Self) -> Result<(), InvariantViolation> {
        if self.parent_id != Some(parent.id) {
            return Err(InvariantViolation::ParentMismatch {
                child: self.coord.to_string(),
                claimed: self
                    .parent_id
                    .map_or_else(|| "none".to_string(), |id| id.to_string()),
                actual: parent.id.to_string(),
            });
        }
        check_direct_child(&self.coord, &parent.coord)
    }

    /// A copy of this node at a new placement, re-checked.
    ///
    /// # Errors
    ///
    /// Returns an [`InvariantViolation`] if the placement breaks a tree rule.
    pub fn placed(
        &self,
        coord: Coord,
        parent_id: Option<NodeId>,
        state: NodeState,
    ) -> Result<Self, InvariantViolation> {
        Self::from_record(NodeRecord {
            id: self.id,
            kind: self.kind,
            coord,
            parent_id,
            origin_id: self.origin_id,
            content_id: self.content_id,
            state,
            created_at_us: self.created_at_us,
            updated_at_us: self.updated_at_us,
        })
    }

    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Physical coordinate. For a parked node this is where it was parked
    /// from; see [`Node::final_coord`] for where it is headed.
    #[must_use]
    pub const fn coord(&self) -> &Coord {
        &self.coord
    }

    #[must_use]
    pub const fn parent_id(&self) -> Option<NodeId> {
        self.parent_id
    }

    #[must_use]
    pub const fn origin_id(&self) -> Option<NodeId> {
        self.origin_id
    }

    #[must_use]
    pub const fn content_id(&self) -> ContentId {
        self.content_id
    }

    #[must_use]
    pub const fn state(&self) -> &NodeState {
        &self.state
    }

    #[must_use]
    pub const fn created_at_us(&self) -> i64 {
        self.created_at_us
    }

    #[must_use]
    pub const fn updated_at_us(&self) -> i64 {
        self.updated_at_us
    }

    #[must_use]
    pub const fn is_root(&self) -> bool {
        matches!(self.kind, NodeKind::Root)
    }

    #[must_use]
    pub const fn is_parked(&self) -> bool {
        matches!(self.state, NodeState::Relocating { .. })
    }

    #[must_use]
    pub const fn parking_slot(&self) -> Option<ParkingSlot> {
        match self.state {
            NodeState::Stable => None,
            NodeState::Relocating { slot, .. } => Some(slot),
        }
    }

    /// Destination of a parked node, or its own coordinate when stable.
    #[must_use]
    pub const fn final_coord(&self) -> &Coord {
        match &self.state {
            NodeState::Stable => &self.coord,
            NodeState::Relocating { final_coord, .. } => final_coord,
        }
    }

    #[must_use]
    pub fn parked_coord(&self) -> Option<ParkedCoord> {
        self.parking_slot().map(|slot| ParkedCoord {
            coord: self.coord.clone(),
            slot,
        })
    }
}

/// A validated node that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    kind: NodeKind,
    coord: Coord,
    parent_id: Option<NodeId>,
    origin_id: Option<NodeId>,
    content_id: ContentId,
}

impl NewNode {
    /// A root for the tree named by `coord`.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation::RootNotAtTop`] if `coord` has a path.
    pub fn root(coord: Coord, content_id: ContentId) -> Result<Self, InvariantViolation> {
        check_shape(NodeKind::Root, &coord, None)?;
        Ok(Self {
            kind: NodeKind::Root,
            coord,
            parent_id: None,
            origin_id: None,
            content_id,
        })
    }

    /// A child of `parent` one step in `direction`.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation::ParentParked`] if `parent` is parked.
    pub fn child(
        parent: &Node,
        direction: Direction,
        content_id: ContentId,
    ) -> Result<Self, InvariantViolation> {
        Self::child_at(parent, parent.coord.child(direction), content_id)
    }

    /// A child of `parent` at an explicit coordinate.
    ///
    /// # Errors
    ///
    /// Returns an [`InvariantViolation`] unless `coord` is a direct child
    /// position of a stable `parent`.
    pub fn child_at(
        parent: &Node,
        coord: Coord,
        content_id: ContentId,
    ) -> Result<Self, InvariantViolation> {
        if parent.is_parked() {
            return Err(InvariantViolation::ParentParked {
                parent: parent.coord.to_string(),
            });
        }
        check_shape(NodeKind::Child, &coord, Some(parent.id))?;
        check_direct_child(&coord, &parent.coord)?;
        Ok(Self {
            kind: NodeKind::Child,
            coord,
            parent_id: Some(parent.id),
            origin_id: None,
            content_id,
        })
    }

    /// Record the node this one was copied from.
    #[must_use]
    pub const fn with_origin(mut self, origin_id: NodeId) -> Self {
        self.origin_id = Some(origin_id);
        self
    }

    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.kind
    }

    #[must_use]
    pub const fn coord(&self) -> &Coord {
        &self.coord
    }

    #[must_use]
    pub const fn parent_id(&self) -> Option<NodeId> {
        self.parent_id
    }

    #[must_use]
    pub const fn origin_id(&self) -> Option<NodeId> {
        self.origin_id
    }

    #[must_use]
    pub const fn content_id(&self) -> ContentId {
        self.content_id
    }
}

/// Coordinate-and-parent rewrite applied by `NodeRepository::update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeUpdate {
    pub coord: Coord,
    pub parent_id: Option<NodeId>,
    pub state: NodeState,
}

impl From<&Node> for NodeUpdate {
    fn from(node: &Node) -> Self {
        Self {
            coord: node.coord.clone(),
            parent_id: node.parent_id,
            state: node.state.clone(),
        }
    }
}

fn check_shape(
    kind: NodeKind,
    coord: &Coord,
    parent_id: Option<NodeId>,
) -> Result<(), InvariantViolation> {
    match kind {
        NodeKind::Root if !coord.is_root() => Err(InvariantViolation::RootNotAtTop {
            coord: coord.to_string(),
        }),
        NodeKind::Root if parent_id.is_some() => Err(InvariantViolation::RootWithParent {
            coord: coord.to_string(),
        }),
        NodeKind::Child if coord.is_root() => Err(InvariantViolation::ChildAtRootDepth {
            coord: coord.to_string(),
        }),
        NodeKind::Child if parent_id.is_none() => Err(InvariantViolation::ChildWithoutParent {
            coord: coord.to_string(),
        }),
        NodeKind::Root | NodeKind::Child => Ok(()),
    }
}

fn check_state(kind: NodeKind, coord: &Coord, state: &NodeState) -> Result<(), InvariantViolation> {
    let NodeState::Relocating { final_coord, .. } = state else {
        return Ok(());
    };
    if kind == NodeKind::Root {
        return Err(InvariantViolation::RootParked {
            coord: coord.to_string(),
        });
    }
    if !coord.same_space(final_coord) || final_coord.is_root() {
        return Err(InvariantViolation::ParkedAcrossSpaces {
            coord: coord.to_string(),
            final_coord: final_coord.to_string(),
        });
    }
    Ok(())
}

fn check_direct_child(child: &Coord, parent: &Coord) -> Result<(), InvariantViolation> {
    if child.parent().as_ref() == Some(parent) {
        Ok(())
    } else {
        Err(InvariantViolation::NotDirectChild {
            child: child.to_string(),
            parent: parent.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Direction::{East, NorthWest, West};

    fn record(id: i64, kind: NodeKind, coord: Coord, parent: Option<i64>) -> NodeRecord {
        NodeRecord {
            id: NodeId(id),
            kind,
            coord,
            parent_id: parent.map(NodeId),
            origin_id: None,
            content_id: ContentId(id),
            state: NodeState::Stable,
            created_at_us: 0,
            updated_at_us: 0,
        }
    }

    fn root() -> Node {
        Node::from_record(record(1, NodeKind::Root, Coord::root(1, 0), None)).expect("root")
    }

    #[test]
    fn root_with_path_is_rejected() {
        let err = Node::from_record(record(1, NodeKind::Root, Coord::new(1, 0, vec![East]), None))
            .expect_err("root must be at depth 0");
        assert!(matches!(err, InvariantViolation::RootNotAtTop { .. }));
    }

    #[test]
    fn root_with_parent_is_rejected() {
        let err = Node::from_record(record(2, NodeKind::Root, Coord::root(1, 0), Some(1)))
            .expect_err("root has no parent");
        assert!(matches!(err, InvariantViolation::RootWithParent { .. }));
    }

    #[test]
    fn child_requires_parent_and_depth() {
        let err = Node::from_record(record(2, NodeKind::Child, Coord::new(1, 0, vec![East]), None))
            .expect_err("orphan child");
        assert!(matches!(err, InvariantViolation::ChildWithoutParent { .. }));

        let err = Node::from_record(record(2, NodeKind::Child, Coord::root(1, 0), Some(1)))
            .expect_err("child at depth 0");
        assert!(matches!(err, InvariantViolation::ChildAtRootDepth { .. }));
    }

    #[test]
    fn new_child_extends_parent_by_one_step() {
        let parent = root();
        let child = NewNode::child(&parent, West, ContentId(9)).expect("valid child");
        assert_eq!(child.coord(), &Coord::new(1, 0, vec![West]));
        assert_eq!(child.parent_id(), Some(NodeId(1)));
        assert_eq!(child.kind(), NodeKind::Child);
    }

    #[test]
    fn child_at_rejects_skipped_levels_and_foreign_space() {
        let parent = root();
        let err = NewNode::child_at(&parent, Coord::new(1, 0, vec![East, East]), ContentId(2))
            .expect_err("two levels down");
        assert!(matches!(err, InvariantViolation::NotDirectChild { .. }));

        let err = NewNode::child_at(&parent, Coord::new(2, 0, vec![East]), ContentId(2))
            .expect_err("other space");
        assert!(matches!(err, InvariantViolation::NotDirectChild { .. }));
    }

    #[test]
    fn check_parent_verifies_id_and_position() {
        let parent = root();
        let child = Node::from_record(record(
            2,
            NodeKind::Child,
            Coord::new(1, 0, vec![NorthWest]),
            Some(1),
        ))
        .expect("child");
        child.check_parent(&parent).expect("consistent");

        let stranger = Node::from_record(record(
            3,
            NodeKind::Child,
            Coord::new(1, 0, vec![NorthWest, East]),
            Some(1),
        ))
        .expect("row shape is fine on its own");
        let err = stranger.check_parent(&parent).expect_err("grandchild position");
        assert!(matches!(err, InvariantViolation::NotDirectChild { .. }));
    }

    #[test]
    fn roots_cannot_be_parked() {
        let err = root()
            .placed(
                Coord::root(1, 0),
                None,
                NodeState::Relocating {
                    slot: ParkingSlot::FIRST,
                    final_coord: Coord::new(1, 0, vec![East]),
                },
            )
            .expect_err("root parked");
        assert!(matches!(err, InvariantViolation::RootParked { .. }));
    }

    #[test]
    fn parked_child_reports_final_coord() {
        let parent = root();
        let child = Node::from_record(record(2, NodeKind::Child, Coord::new(1, 0, vec![East]), Some(1)))
            .expect("child");
        let parked = child
            .placed(
                child.coord().clone(),
                Some(parent.id()),
                NodeState::Relocating {
                    slot: ParkingSlot::FIRST,
                    final_coord: Coord::new(1, 0, vec![West]),
                },
            )
            .expect("parked");
        assert!(parked.is_parked());
        assert_eq!(parked.final_coord(), &Coord::new(1, 0, vec![West]));
        assert_eq!(
            parked.parked_coord().map(|p| p.to_string()).as_deref(),
            Some("1,0:3,7")
        );
        assert_eq!(child.final_coord(), child.coord());
    }

    #[test]
    fn children_cannot_attach_to_parked_nodes() {
        let parent = root();
        let child = Node::from_record(record(2, NodeKind::Child, Coord::new(1, 0, vec![East]), Some(1)))
            .expect("child");
        let parked = child
            .placed(
                child.coord().clone(),
                Some(parent.id()),
                NodeState::Relocating {
                    slot: ParkingSlot::FIRST,
                    final_coord: Coord::new(1, 0, vec![West]),
                },
            )
            .expect("parked");
        let err = NewNode::child(&parked, East, ContentId(5)).expect_err("parked parent");
        assert!(matches!(err, InvariantViolation::ParentParked { .. }));
    }
}
