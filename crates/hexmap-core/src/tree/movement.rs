//! Subtree rewrite primitives.
//!
//! A [`Subtree`] is a snapshot of a node and its descendants taken before
//! anything is mutated. [`rewrite_subtree`] persists a new placement for every
//! row of that snapshot: the top node first, then descendants shallowest
//! first, so a parent always reaches its new address before its children.
//! Relocation, parking and unparking are all expressed through it.

use std::cmp::Ordering;

use tracing::debug;

use crate::coord::Coord;
use crate::error::Result;
use crate::model::{InvariantViolation, Node, NodeId, NodeState, NodeUpdate};
use crate::repo::{ContentRepository, MapRepository, NodeRepository};
use crate::tree::query::{get_descendants, require_node};

/// A node plus every descendant, shallowest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtree {
    pub top: Node,
    pub descendants: Vec<Node>,
}

impl Subtree {
    /// Build from rows in any order; descendants are re-sorted.
    #[must_use]
    pub fn new(top: Node, mut descendants: Vec<Node>) -> Self {
        descendants.sort_by(|a, b| by_depth_then_path(a.coord(), b.coord()));
        Self { top, descendants }
    }

    /// Number of rows, top included.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.descendants.len() + 1
    }

    /// Rows in persistence order: top, then descendants shallowest first.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        std::iter::once(&self.top).chain(self.descendants.iter())
    }

    #[must_use]
    pub fn ids(&self) -> Vec<NodeId> {
        self.iter().map(Node::id).collect()
    }

    /// Whether `coord` is the top's physical coordinate or lies below it.
    #[must_use]
    pub fn contains_coord(&self, coord: &Coord) -> bool {
        self.top.coord() == coord || self.top.coord().is_ancestor_of(coord)
    }
}

fn by_depth_then_path(a: &Coord, b: &Coord) -> Ordering {
    a.depth()
        .cmp(&b.depth())
        .then_with(|| a.path.cmp(&b.path))
}

/// Snapshot the stable subtree rooted at `coord`.
///
/// # Errors
///
/// Returns [`crate::TreeError::NotFound`] when `coord` is vacant, or a storage
/// error.
pub fn collect_subtree<R: NodeRepository + ?Sized>(repo: &R, coord: &Coord) -> Result<Subtree> {
    let top = require_node(repo, "node", coord)?;
    let descendants = get_descendants(repo, coord)?;
    Ok(Subtree::new(top, descendants))
}

/// Persist a new placement for every row in `subtree`.
///
/// `top_parent` becomes the top node's parent; descendants keep theirs.
/// `place` maps each snapshot row to its new coordinate and state. Returns
/// the rewritten rows in persistence order.
///
/// # Errors
///
/// Returns an invariant error if a placement breaks a tree rule, or a
/// constraint error if an address is taken.
pub fn rewrite_subtree<R, F>(
    repo: &R,
    subtree: &Subtree,
    top_parent: Option<NodeId>,
    mut place: F,
) -> Result<Subtree>
where
    R: NodeRepository + ?Sized,
    F: FnMut(&Node) -> Result<(Coord, NodeState)>,
{
    let (coord, state) = place(&subtree.top)?;
    let top = persist(repo, &subtree.top, coord, top_parent, state)?;

    let mut descendants = Vec::with_capacity(subtree.descendants.len());
    for node in &subtree.descendants {
        let (coord, state) = place(node)?;
        descendants.push(persist(repo, node, coord, node.parent_id(), state)?);
    }

    debug!(
        top = %subtree.top.coord(),
        to = %top.coord(),
        rows = subtree.row_count(),
        "rewrote subtree"
    );
    Ok(Subtree { top, descendants })
}

fn persist<R: NodeRepository + ?Sized>(
    repo: &R,
    node: &Node,
    coord: Coord,
    parent_id: Option<NodeId>,
    state: NodeState,
) -> Result<Node> {
    let placed = node.placed(coord, parent_id, state)?;
    repo.update(node.id(), &NodeUpdate::from(&placed))
}

/// Move a stable subtree so its top lands on `to` under `parent_id`.
/// Descendants keep their suffix below the new top.
///
/// # Errors
///
/// See [`rewrite_subtree`].
pub fn relocate_subtree<R: NodeRepository + ?Sized>(
    repo: &R,
    subtree: &Subtree,
    to: &Coord,
    parent_id: Option<NodeId>,
) -> Result<Subtree> {
    let from = subtree.top.coord();
    rewrite_subtree(repo, subtree, parent_id, |node| {
        let coord = node.coord().rebase(from, to).ok_or_else(|| {
            InvariantViolation::OutsideSubtree {
                coord: node.coord().to_string(),
                top: from.to_string(),
            }
        })?;
        Ok((coord, NodeState::Stable))
    })
}

/// Delete every row of `subtree`, deepest first, then any content row no
/// longer referenced. Returns node ids in deletion order.
///
/// # Errors
///
/// Returns a storage or constraint error if a delete fails.
pub fn delete_subtree<R: MapRepository + ?Sized>(repo: &R, subtree: &Subtree) -> Result<Vec<NodeId>> {
    let mut removed = Vec::with_capacity(subtree.row_count());
    for node in subtree.descendants.iter().rev().chain(std::iter::once(&subtree.top)) {
        repo.remove(node.id())?;
        release_content(repo, node)?;
        removed.push(node.id());
    }
    debug!(top = %subtree.top.coord(), rows = removed.len(), "deleted subtree");
    Ok(removed)
}

pub(crate) fn release_content<R: ContentRepository + ?Sized>(repo: &R, node: &Node) -> Result<()> {
    if !repo.is_content_referenced(node.content_id())? {
        repo.remove_content(node.content_id())?;
    }
    Ok(())
}
