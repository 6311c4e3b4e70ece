//! Storage-agnostic repository contracts.
//!
//! The relocation engine, query helpers and lifecycle operations are written
//! against [`NodeRepository`] and [`ContentRepository`] only. A repository is
//! always bound to an explicit handle: either a plain connection for reads
//! or the transaction of an active unit of work (see [`crate::tx`]). Nothing
//! in this crate looks a connection up from shared state.

pub mod sqlite;

pub use sqlite::SqliteRepository;

use crate::coord::{Coord, Direction, ParkingSlot};
use crate::error::Result;
use crate::model::{Content, ContentId, NewContent, NewNode, Node, NodeId, NodeUpdate};

/// Filter for [`NodeRepository::get_many`]. Unset fields do not constrain;
/// set fields combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeQuery {
    /// Restrict to these ids.
    pub ids: Option<Vec<NodeId>>,
    pub space_id: Option<i64>,
    pub group_id: Option<i64>,
    pub parent_id: Option<NodeId>,
    /// Only nodes at or above this depth.
    pub max_depth: Option<usize>,
    /// Include parked rows (default: stable rows only).
    pub include_parked: bool,
    pub limit: Option<u32>,
}

impl NodeQuery {
    /// Stable nodes of one tree.
    #[must_use]
    pub fn tree(space_id: i64, group_id: i64) -> Self {
        Self {
            space_id: Some(space_id),
            group_id: Some(group_id),
            ..Self::default()
        }
    }

    /// Nodes with the given ids.
    #[must_use]
    pub fn ids(ids: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            ids: Some(ids.into_iter().collect()),
            ..Self::default()
        }
    }
}

/// Selects every stable node whose path strictly extends `parent_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescendantQuery {
    pub space_id: i64,
    pub group_id: i64,
    pub parent_path: Vec<Direction>,
}

impl DescendantQuery {
    #[must_use]
    pub fn under(coord: &Coord) -> Self {
        Self {
            space_id: coord.space_id,
            group_id: coord.group_id,
            parent_path: coord.path.clone(),
        }
    }
}

/// Persistence contract for tree nodes.
///
/// Lookups by coordinate, descendant scans, and root queries only see
/// stable rows; parked rows are reachable through [`get_one`],
/// [`get_parked`] and [`get_many`] with `include_parked`.
///
/// [`get_one`]: NodeRepository::get_one
/// [`get_parked`]: NodeRepository::get_parked
/// [`get_many`]: NodeRepository::get_many
pub trait NodeRepository {
    /// # Errors
    ///
    /// Returns a storage or invariant error if the row cannot be read.
    fn get_one(&self, id: NodeId) -> Result<Option<Node>>;

    /// Stable node at `coord`.
    ///
    /// # Errors
    ///
    /// Returns a storage or invariant error if the row cannot be read.
    fn get_one_by_coord(&self, coord: &Coord) -> Result<Option<Node>>;

    /// # Errors
    ///
    /// Returns a storage or invariant error if any row cannot be read.
    fn get_many(&self, query: &NodeQuery) -> Result<Vec<Node>>;

    /// # Errors
    ///
    /// Returns a storage or invariant error if the row cannot be read.
    fn get_root(&self, space_id: i64, group_id: i64) -> Result<Option<Node>>;

    /// Roots of every group in `space_id`, ordered by group.
    ///
    /// # Errors
    ///
    /// Returns a storage or invariant error if any row cannot be read.
    fn get_roots_for_space(&self, space_id: i64) -> Result<Vec<Node>>;

    /// Stable descendants ordered by path length, then lexicographically.
    ///
    /// # Errors
    ///
    /// Returns a storage or invariant error if any row cannot be read.
    fn get_descendants_by_parent(&self, query: &DescendantQuery) -> Result<Vec<Node>>;

    /// Stable direct children of `parent_id`, ordered by direction.
    ///
    /// # Errors
    ///
    /// Returns a storage or invariant error if any row cannot be read.
    fn get_children(&self, parent_id: NodeId) -> Result<Vec<Node>>;

    /// Every parked row of a tree, ordered by slot, depth, then path.
    ///
    /// # Errors
    ///
    /// Returns a storage or invariant error if any row cannot be read.
    fn get_parked(&self, space_id: i64, group_id: i64) -> Result<Vec<Node>>;

    /// `(space_id, group_id)` of every tree holding at least one parked row,
    /// in ascending order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    fn get_parked_trees(&self) -> Result<Vec<(i64, i64)>>;

    /// Whether `slot` already holds a row at `coord` or below it.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the probe fails.
    fn is_parking_slot_occupied(&self, coord: &Coord, slot: ParkingSlot) -> Result<bool>;

    /// # Errors
    ///
    /// Returns [`crate::TreeError::ConstraintViolation`] if the address is
    /// taken, or a storage error.
    fn create(&self, node: NewNode) -> Result<Node>;

    /// Rewrite a node's coordinate, parent and parking state.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TreeError::NotFound`] for an unknown id and
    /// [`crate::TreeError::ConstraintViolation`] on an address clash.
    fn update(&self, id: NodeId, update: &NodeUpdate) -> Result<Node>;

    /// # Errors
    ///
    /// Returns [`crate::TreeError::NotFound`] for an unknown id, or a
    /// constraint error if the node still has children.
    fn remove(&self, id: NodeId) -> Result<()>;
}

/// Persistence contract for content payloads.
pub trait ContentRepository {
    /// # Errors
    ///
    /// Returns a storage error if the insert fails.
    fn create_content(&self, content: &NewContent) -> Result<Content>;

    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    fn get_content(&self, id: ContentId) -> Result<Option<Content>>;

    /// # Errors
    ///
    /// Returns [`crate::TreeError::NotFound`] for an unknown id.
    fn update_content(&self, id: ContentId, content: &NewContent) -> Result<Content>;

    /// # Errors
    ///
    /// Returns [`crate::TreeError::NotFound`] for an unknown id, or a
    /// constraint error while a node still references it.
    fn remove_content(&self, id: ContentId) -> Result<()>;

    /// Whether any node row still points at `id`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the probe fails.
    fn is_content_referenced(&self, id: ContentId) -> Result<bool>;
}

/// Everything the tree operations need from one storage handle.
pub trait MapRepository: NodeRepository + ContentRepository {}

impl<T: NodeRepository + ContentRepository + ?Sized> MapRepository for T {}
