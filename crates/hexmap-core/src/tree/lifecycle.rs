//! Node creation, removal, copy and content edits.
//!
//! Like the relocation engine these run against a transaction-bound
//! repository and never commit on their own.

use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::coord::{Coord, Direction};
use crate::error::{Result, TreeError};
use crate::model::{
    Content, ContentPatch, InvariantViolation, NewContent, NewNode, Node, NodeId,
};
use crate::repo::MapRepository;
use crate::tree::movement::{Subtree, collect_subtree, delete_subtree, release_content};
use crate::tree::query::require_node;
use crate::tree::validate::ValidationError;

/// Create the root of tree `(space_id, group_id)` with fresh content.
///
/// # Errors
///
/// Returns [`ValidationError::RootExists`] if the tree already has a root.
pub fn create_root<R: MapRepository + ?Sized>(
    repo: &R,
    space_id: i64,
    group_id: i64,
    content: &NewContent,
) -> Result<Node> {
    if repo.get_root(space_id, group_id)?.is_some() {
        return Err(ValidationError::RootExists { space_id, group_id }.into());
    }
    let content = repo.create_content(content)?;
    let root = repo.create(NewNode::root(Coord::root(space_id, group_id), content.id)?)?;
    info!(at = %root.coord(), id = %root.id(), "created root");
    Ok(root)
}

/// Create a child of the stable node at `parent` one step in `direction`.
///
/// # Errors
///
/// Returns [`TreeError::NotFound`] for a vacant parent and
/// [`ValidationError::Occupied`] when the child position is taken.
pub fn create_child<R: MapRepository + ?Sized>(
    repo: &R,
    parent: &Coord,
    direction: Direction,
    content: &NewContent,
) -> Result<Node> {
    let parent = require_node(repo, "parent node", parent)?;
    let at = parent.coord().child(direction);
    if repo.get_one_by_coord(&at)?.is_some() {
        return Err(ValidationError::Occupied { at: at.to_string() }.into());
    }
    let content = repo.create_content(content)?;
    let child = repo.create(NewNode::child(&parent, direction, content.id)?)?;
    info!(at = %child.coord(), id = %child.id(), "created child");
    Ok(child)
}

/// Delete the node at `coord` and everything below it, deepest first.
/// Removing a root deletes the whole tree. Returns ids in deletion order.
///
/// Parked rows left behind by an interrupted writer and hanging below the
/// subtree go first, so no parent is deleted while a row still points at it.
///
/// # Errors
///
/// Returns [`TreeError::NotFound`] for a vacant address.
pub fn remove<R: MapRepository + ?Sized>(repo: &R, coord: &Coord) -> Result<Vec<NodeId>> {
    let subtree = collect_subtree(repo, coord)?;
    let parked = parked_below(repo, &subtree)?;

    let mut removed = Vec::with_capacity(parked.len() + subtree.row_count());
    for node in parked.iter().rev() {
        repo.remove(node.id())?;
        release_content(repo, node)?;
        removed.push(node.id());
    }
    removed.extend(delete_subtree(repo, &subtree)?);
    info!(
        at = %coord,
        rows = removed.len(),
        parked = parked.len(),
        "removed subtree"
    );
    Ok(removed)
}

/// Parked rows of the subtree's tree whose parent chain leads into it,
/// parents before children.
///
/// Parked rows keep their physical path, which may no longer sit under the
/// parent after a swap, so membership follows `parent_id` instead.
fn parked_below<R: MapRepository + ?Sized>(repo: &R, subtree: &Subtree) -> Result<Vec<Node>> {
    let top = subtree.top.coord();
    let mut pending = repo.get_parked(top.space_id, top.group_id)?;
    let mut owners: HashSet<NodeId> = subtree.iter().map(Node::id).collect();
    let mut found = Vec::new();

    loop {
        let (attached, rest): (Vec<Node>, Vec<Node>) = pending
            .into_iter()
            .partition(|node| node.parent_id().is_some_and(|id| owners.contains(&id)));
        if attached.is_empty() {
            break;
        }
        owners.extend(attached.iter().map(Node::id));
        found.extend(attached);
        pending = rest;
    }
    Ok(found)
}

/// Deep-copy the subtree at `from` so its top lands on vacant `to`.
///
/// Every copied node gets its own content row and records the node it was
/// copied from as its origin. Returns the new nodes, top first.
///
/// # Errors
///
/// Returns a [`ValidationError`] when `to` is in another tree, at root
/// depth, inside the source subtree, occupied, or has no parent; and
/// [`TreeError::NotFound`] when `from` is vacant.
pub fn copy_subtree<R: MapRepository + ?Sized>(
    repo: &R,
    from: &Coord,
    to: &Coord,
) -> Result<Vec<Node>> {
    let pair = || (from.to_string(), to.to_string());
    if !from.same_space(to) {
        let (from, to) = pair();
        return Err(ValidationError::CrossSpace { from, to }.into());
    }
    if to.is_root() {
        let (from, to) = pair();
        return Err(ValidationError::ChildToRootDepth { from, to }.into());
    }
    if from.is_ancestor_of(to) {
        let (from, to) = pair();
        return Err(ValidationError::IntoOwnSubtree { from, to }.into());
    }

    let source = collect_subtree(repo, from)?;
    if repo.get_one_by_coord(to)?.is_some() {
        return Err(ValidationError::Occupied { at: to.to_string() }.into());
    }
    let destination_parent = to
        .parent()
        .map(|parent| repo.get_one_by_coord(&parent))
        .transpose()?
        .flatten()
        .ok_or_else(|| ValidationError::MissingParent { to: to.to_string() })?;

    // Old node id -> its copy, so descendants can find their new parent.
    let mut copies: HashMap<NodeId, Node> = HashMap::with_capacity(source.row_count());
    let mut created = Vec::with_capacity(source.row_count());

    for node in source.iter() {
        let parent = if node.id() == source.top.id() {
            &destination_parent
        } else {
            node.parent_id()
                .and_then(|id| copies.get(&id))
                .ok_or_else(|| TreeError::not_found("copied parent of", node.coord()))?
        };
        let coord = node.coord().rebase(from, to).ok_or_else(|| {
            InvariantViolation::OutsideSubtree {
                coord: node.coord().to_string(),
                top: from.to_string(),
            }
        })?;
        let original = repo
            .get_content(node.content_id())?
            .ok_or_else(|| TreeError::not_found("content", node.content_id()))?;
        let content = repo.create_content(&NewContent::duplicate_of(&original))?;
        let copy = repo.create(NewNode::child_at(parent, coord, content.id)?.with_origin(node.id()))?;
        copies.insert(node.id(), copy.clone());
        created.push(copy);
    }

    info!(%from, %to, rows = created.len(), "copied subtree");
    Ok(created)
}

/// Apply `patch` to the content of the node at `coord`.
///
/// # Errors
///
/// Returns [`TreeError::NotFound`] for a vacant address and an invariant
/// error if the patch blanks the title.
pub fn update_content<R: MapRepository + ?Sized>(
    repo: &R,
    coord: &Coord,
    patch: &ContentPatch,
) -> Result<Content> {
    let node = require_node(repo, "node", coord)?;
    let current = repo
        .get_content(node.content_id())?
        .ok_or_else(|| TreeError::not_found("content", node.content_id()))?;
    if patch.is_empty() {
        return Ok(current);
    }
    let updated = repo.update_content(current.id, &patch.apply(&current)?)?;
    info!(at = %coord, content = %updated.id, "updated content");
    Ok(updated)
}
