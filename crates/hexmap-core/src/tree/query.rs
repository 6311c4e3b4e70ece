//! Stateless read helpers over [`NodeRepository`].

use crate::coord::{Coord, Direction, adjacent_coord, get_child_coords};
use crate::error::{Result, TreeError};
use crate::model::Node;
use crate::repo::{DescendantQuery, NodeQuery, NodeRepository};

/// Stable node at `coord`, or [`TreeError::NotFound`].
///
/// # Errors
///
/// Returns `NotFound` when the address is vacant, or a storage error.
pub fn require_node<R: NodeRepository + ?Sized>(
    repo: &R,
    what: &'static str,
    coord: &Coord,
) -> Result<Node> {
    repo.get_one_by_coord(coord)?
        .ok_or_else(|| TreeError::not_found(what, coord))
}

/// Parent of `node`, `None` for a root.
///
/// # Errors
///
/// Returns an invariant error if the stored parent is not positioned as the
/// direct parent of `node`, or a storage error.
pub fn get_parent<R: NodeRepository + ?Sized>(repo: &R, node: &Node) -> Result<Option<Node>> {
    let Some(parent_id) = node.parent_id() else {
        return Ok(None);
    };
    let parent = repo
        .get_one(parent_id)?
        .ok_or_else(|| TreeError::not_found("parent node", parent_id))?;
    if !node.is_parked() {
        node.check_parent(&parent)?;
    }
    Ok(Some(parent))
}

/// Every stable node strictly below `coord`, shallowest first.
///
/// # Errors
///
/// Returns a storage error if the scan fails.
pub fn get_descendants<R: NodeRepository + ?Sized>(repo: &R, coord: &Coord) -> Result<Vec<Node>> {
    repo.get_descendants_by_parent(&DescendantQuery::under(coord))
}

/// Stable ancestors of `coord`, root first. Stops at the first missing
/// level, so a gap in storage yields a shorter chain.
///
/// # Errors
///
/// Returns a storage error if a lookup fails.
pub fn get_ancestors<R: NodeRepository + ?Sized>(repo: &R, coord: &Coord) -> Result<Vec<Node>> {
    let mut ancestors = Vec::with_capacity(coord.depth());
    for depth in 0..coord.depth() {
        let at = Coord::new(coord.space_id, coord.group_id, coord.path[..depth].to_vec());
        match repo.get_one_by_coord(&at)? {
            Some(node) => ancestors.push(node),
            None => break,
        }
    }
    Ok(ancestors)
}

/// The six child positions of `coord` in NW, NE, E, SE, SW, W order, with
/// the stable node occupying each one.
///
/// # Errors
///
/// Returns a storage error if a lookup fails.
pub fn get_child_slots<R: NodeRepository + ?Sized>(
    repo: &R,
    coord: &Coord,
) -> Result<Vec<(Direction, Option<Node>)>> {
    let Some(parent) = repo.get_one_by_coord(coord)? else {
        return Ok(Direction::ALL.iter().map(|d| (*d, None)).collect());
    };
    let mut children = repo.get_children(parent.id())?;
    Ok(get_child_coords(coord)
        .into_iter()
        .zip(Direction::ALL)
        .map(|(child_coord, direction)| {
            let found = children
                .iter()
                .position(|c| c.coord() == &child_coord)
                .map(|i| children.swap_remove(i));
            (direction, found)
        })
        .collect())
}

/// The stable sibling facing `coord` across its parent, if any.
///
/// # Errors
///
/// Returns a storage error if the lookup fails.
pub fn get_adjacent<R: NodeRepository + ?Sized>(repo: &R, coord: &Coord) -> Result<Option<Node>> {
    match adjacent_coord(coord) {
        Some(adjacent) => repo.get_one_by_coord(&adjacent),
        None => Ok(None),
    }
}

/// Stable nodes of one tree down to `max_depth`, in depth-then-path order.
///
/// # Errors
///
/// Returns a storage error if the scan fails.
pub fn get_tree<R: NodeRepository + ?Sized>(
    repo: &R,
    space_id: i64,
    group_id: i64,
    max_depth: Option<usize>,
) -> Result<Vec<Node>> {
    repo.get_many(&NodeQuery {
        max_depth,
        ..NodeQuery::tree(space_id, group_id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Direction::{East, NorthWest, SouthEast, West};
    use crate::db;
    use crate::model::{NewContent, NewNode};
    use crate::repo::{ContentRepository, SqliteRepository};
    use rusqlite::Connection;

    fn add(repo: &SqliteRepository<'_>, parent: &Node, direction: Direction) -> Node {
        let content = repo
            .create_content(&NewContent::titled(format!("{direction}")).expect("title"))
            .expect("content");
        repo.create(NewNode::child(parent, direction, content.id).expect("child"))
            .expect("insert")
    }

    fn seed(conn: &Connection) -> (Node, Node, Node) {
        let repo = SqliteRepository::new(conn);
        let content = repo
            .create_content(&NewContent::titled("root").expect("title"))
            .expect("content");
        let root = repo
            .create(NewNode::root(Coord::root(1, 0), content.id).expect("root"))
            .expect("insert");
        let east = add(&repo, &root, East);
        let deep = add(&repo, &east, SouthEast);
        add(&repo, &root, West);
        (root, east, deep)
    }

    #[test]
    fn parent_and_ancestors() {
        let conn = db::open_in_memory().expect("store");
        let (root, east, deep) = seed(&conn);
        let repo = SqliteRepository::new(&conn);

        assert_eq!(get_parent(&repo, &deep).expect("parent"), Some(east.clone()));
        assert_eq!(get_parent(&repo, &root).expect("root parent"), None);
        assert_eq!(
            get_ancestors(&repo, deep.coord()).expect("ancestors"),
            vec![root, east]
        );
    }

    #[test]
    fn child_slots_follow_fixed_direction_order() {
        let conn = db::open_in_memory().expect("store");
        let (root, east, _) = seed(&conn);
        let repo = SqliteRepository::new(&conn);

        let slots = get_child_slots(&repo, root.coord()).expect("slots");
        let directions: Vec<Direction> = slots.iter().map(|(d, _)| *d).collect();
        assert_eq!(directions, Direction::ALL.to_vec());
        assert_eq!(slots[2].1.as_ref(), Some(&east));
        assert!(slots[0].1.is_none());
        assert!(slots[5].1.is_some());
    }

    #[test]
    fn adjacent_faces_across_the_parent() {
        let conn = db::open_in_memory().expect("store");
        let (root, east, _) = seed(&conn);
        let repo = SqliteRepository::new(&conn);

        let west = get_adjacent(&repo, east.coord()).expect("lookup");
        assert_eq!(
            west.map(|n| n.coord().clone()),
            Some(Coord::new(1, 0, vec![West]))
        );
        assert!(get_adjacent(&repo, root.coord()).expect("root").is_none());
        assert!(get_adjacent(&repo, &Coord::new(1, 0, vec![NorthWest]))
            .expect("vacant")
            .is_none());
    }

    #[test]
    fn require_node_reports_vacancy() {
        let conn = db::open_in_memory().expect("store");
        seed(&conn);
        let repo = SqliteRepository::new(&conn);
        let err = require_node(&repo, "source node", &Coord::new(1, 0, vec![NorthWest]))
            .expect_err("vacant");
        assert!(matches!(err, TreeError::NotFound { what: "source node", .. }));
    }

    #[test]
    fn tree_is_depth_limited() {
        let conn = db::open_in_memory().expect("store");
        seed(&conn);
        let repo = SqliteRepository::new(&conn);
        assert_eq!(get_tree(&repo, 1, 0, None).expect("all").len(), 4);
        assert_eq!(get_tree(&repo, 1, 0, Some(1)).expect("shallow").len(), 3);
        assert_eq!(
            get_descendants(&repo, &Coord::root(1, 0)).expect("descendants").len(),
            3
        );
    }
}
