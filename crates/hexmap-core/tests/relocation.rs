//! Relocation scenarios against a real store, including rollback when a
//! write fails partway through a swap.

use std::cell::Cell;
use std::collections::BTreeMap;

use hexmap_core::coord::{Coord, Direction, ParkingSlot, parse_id};
use hexmap_core::model::{Content, ContentId, NewContent, NewNode, Node, NodeId, NodeUpdate};
use hexmap_core::repo::{ContentRepository, DescendantQuery, NodeQuery, NodeRepository};
use hexmap_core::tree::{MoveOrchestrator, ValidationError};
use hexmap_core::tx::{SqliteTransactionManager, UnitOfWork};
use hexmap_core::{MapService, Result, TreeError};

fn c(id: &str) -> Coord {
    parse_id(id).expect("valid coordinate")
}

/// R(1,0), A at [1], A1 at [1,1], B at [2].
fn scenario() -> MapService<SqliteTransactionManager> {
    let mut service = MapService::new(SqliteTransactionManager::in_memory().expect("store"));
    service
        .create_root(1, 0, &NewContent::titled("R").expect("title"))
        .expect("root");
    for (parent, direction, title) in [
        ("1,0", Direction::NorthWest, "A"),
        ("1,0:1", Direction::NorthWest, "A1"),
        ("1,0", Direction::NorthEast, "B"),
    ] {
        service
            .create_child(&c(parent), direction, &NewContent::titled(title).expect("title"))
            .expect("child");
    }
    service
}

/// Address -> title for every stable node of tree (1, 0).
fn layout(service: &MapService<SqliteTransactionManager>) -> BTreeMap<String, String> {
    service
        .tree(1, 0, None)
        .expect("tree")
        .into_iter()
        .map(|node| {
            let content = service
                .content(node.content_id())
                .expect("content")
                .expect("exists");
            (node.coord().to_string(), content.title)
        })
        .collect()
}

fn expected(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(at, title)| ((*at).to_string(), (*title).to_string()))
        .collect()
}

#[test]
fn swap_scenario_rewrites_every_descendant() {
    let mut service = scenario();
    let outcome = service.relocate(&c("1,0:1"), &c("1,0:2")).expect("swap");

    assert_eq!(
        layout(&service),
        expected(&[("1,0", "R"), ("1,0:1", "B"), ("1,0:2", "A"), ("1,0:2,1", "A1")])
    );
    let descendants = service.descendants(&c("1,0")).expect("descendants");
    assert_eq!(descendants.len(), 3);
    assert_eq!(outcome.changed.len(), 3);
    assert!(service.parked(1, 0).expect("parked").is_empty());
}

#[test]
fn move_into_empty_destination_vacates_source() {
    let mut service = scenario();
    service.relocate(&c("1,0:1"), &c("1,0:5")).expect("move");

    assert!(service.get(&c("1,0:1")).expect("get").is_none());
    assert!(service.get(&c("1,0:1,1")).expect("get").is_none());
    assert_eq!(
        layout(&service),
        expected(&[("1,0", "R"), ("1,0:2", "B"), ("1,0:5", "A"), ("1,0:5,1", "A1")])
    );
}

#[test]
fn relocating_back_restores_the_tree_exactly() {
    let mut service = scenario();
    let before = service.tree(1, 0, None).expect("tree");

    service.relocate(&c("1,0:1"), &c("1,0:2")).expect("swap");
    service.relocate(&c("1,0:2"), &c("1,0:1")).expect("swap back");

    let after = service.tree(1, 0, None).expect("tree");
    let strip = |nodes: &[Node]| -> Vec<(NodeId, Coord, Option<NodeId>)> {
        nodes
            .iter()
            .map(|n| (n.id(), n.coord().clone(), n.parent_id()))
            .collect()
    };
    assert_eq!(strip(&after), strip(&before));
}

#[test]
fn root_relocation_is_rejected_and_tree_unchanged() {
    let mut service = scenario();
    let before = layout(&service);
    let err = service
        .relocate(&c("1,0"), &c("1,0:3"))
        .expect_err("root cannot move down");
    assert!(matches!(
        err,
        TreeError::Validation(ValidationError::RootRelocation { .. })
    ));
    assert_eq!(layout(&service), before);
}

#[test]
fn cross_space_relocation_is_rejected() {
    let mut service = scenario();
    service
        .create_root(2, 0, &NewContent::titled("other").expect("title"))
        .expect("second tree");
    let err = service
        .relocate(&c("1,0:1"), &c("2,0:1"))
        .expect_err("cross space");
    assert!(matches!(
        err,
        TreeError::Validation(ValidationError::CrossSpace { .. })
    ));
    assert_eq!(err.code().code(), "E2003");
}

#[test]
fn child_cannot_displace_root() {
    let mut service = scenario();
    let err = service
        .relocate(&c("1,0:1"), &c("1,0"))
        .expect_err("child to root depth");
    assert!(matches!(
        err,
        TreeError::Validation(ValidationError::ChildToRootDepth { .. })
    ));
}

#[test]
fn legacy_adapter_matches_canonical_relocate() {
    let mut legacy = scenario();
    let mut canonical = scenario();
    legacy.move_item("1,0:1,1", "1,0:2,4").expect("legacy move");
    canonical
        .relocate(&c("1,0:1,1"), &c("1,0:2,4"))
        .expect("canonical move");
    assert_eq!(layout(&legacy), layout(&canonical));
}

#[test]
fn outcome_serializes_for_machine_output() {
    let mut service = scenario();
    let outcome = service.relocate(&c("1,0:1"), &c("1,0:2")).expect("swap");
    let json = serde_json::to_value(&outcome).expect("serialize");

    assert_eq!(json["moved_id"], serde_json::json!(outcome.moved_id.0));
    assert_eq!(json["changed"].as_array().map(Vec::len), Some(3));
    let top = &json["changed"][0];
    assert_eq!(top["kind"], "child");
    assert_eq!(top["state"], "stable");
    assert_eq!(top["coord"]["path"], serde_json::json!([2]));
}

// ---------------------------------------------------------------------------
// Failure injection
// ---------------------------------------------------------------------------

/// Delegates to `inner` but fails the `fail_at`-th node update.
struct FailingRepo<'a, R> {
    inner: &'a R,
    fail_at: usize,
    updates: Cell<usize>,
}

impl<'a, R> FailingRepo<'a, R> {
    const fn new(inner: &'a R, fail_at: usize) -> Self {
        Self {
            inner,
            fail_at,
            updates: Cell::new(0),
        }
    }
}

impl<R: NodeRepository> NodeRepository for FailingRepo<'_, R> {
    fn get_one(&self, id: NodeId) -> Result<Option<Node>> {
        self.inner.get_one(id)
    }
    fn get_one_by_coord(&self, coord: &Coord) -> Result<Option<Node>> {
        self.inner.get_one_by_coord(coord)
    }
    fn get_many(&self, query: &NodeQuery) -> Result<Vec<Node>> {
        self.inner.get_many(query)
    }
    fn get_root(&self, space_id: i64, group_id: i64) -> Result<Option<Node>> {
        self.inner.get_root(space_id, group_id)
    }
    fn get_roots_for_space(&self, space_id: i64) -> Result<Vec<Node>> {
        self.inner.get_roots_for_space(space_id)
    }
    fn get_descendants_by_parent(&self, query: &DescendantQuery) -> Result<Vec<Node>> {
        self.inner.get_descendants_by_parent(query)
    }
    fn get_children(&self, parent_id: NodeId) -> Result<Vec<Node>> {
        self.inner.get_children(parent_id)
    }
    fn get_parked(&self, space_id: i64, group_id: i64) -> Result<Vec<Node>> {
        self.inner.get_parked(space_id, group_id)
    }
    fn get_parked_trees(&self) -> Result<Vec<(i64, i64)>> {
        self.inner.get_parked_trees()
    }
    fn is_parking_slot_occupied(&self, coord: &Coord, slot: ParkingSlot) -> Result<bool> {
        self.inner.is_parking_slot_occupied(coord, slot)
    }
    fn create(&self, node: NewNode) -> Result<Node> {
        self.inner.create(node)
    }
    fn update(&self, id: NodeId, update: &NodeUpdate) -> Result<Node> {
        let n = self.updates.get() + 1;
        self.updates.set(n);
        if n == self.fail_at {
            return Err(TreeError::ConstraintViolation(format!(
                "injected failure on update #{n}"
            )));
        }
        self.inner.update(id, update)
    }
    fn remove(&self, id: NodeId) -> Result<()> {
        self.inner.remove(id)
    }
}

impl<R: ContentRepository> ContentRepository for FailingRepo<'_, R> {
    fn create_content(&self, content: &NewContent) -> Result<Content> {
        self.inner.create_content(content)
    }
    fn get_content(&self, id: ContentId) -> Result<Option<Content>> {
        self.inner.get_content(id)
    }
    fn update_content(&self, id: ContentId, content: &NewContent) -> Result<Content> {
        self.inner.update_content(id, content)
    }
    fn remove_content(&self, id: ContentId) -> Result<()> {
        self.inner.remove_content(id)
    }
    fn is_content_referenced(&self, id: ContentId) -> Result<bool> {
        self.inner.is_content_referenced(id)
    }
}

#[test]
fn failure_at_any_step_of_a_swap_rolls_everything_back() {
    // Swapping A (2 rows) with B (1 row) performs 4 updates:
    // park B, move A, move A1, unpark B.
    for fail_at in 1..=4 {
        let service = scenario();
        let before = layout(&service);
        let mut tm = service.into_inner();

        let err = tm
            .run(|repo| {
                let failing = FailingRepo::new(repo, fail_at);
                MoveOrchestrator::new(&failing).relocate(&c("1,0:1"), &c("1,0:2"))
            })
            .expect_err("injected failure");
        assert!(
            matches!(err, TreeError::ConstraintViolation(_)),
            "update #{fail_at}: {err}"
        );

        let service = MapService::new(tm);
        assert_eq!(layout(&service), before, "update #{fail_at} left changes behind");
        assert!(service.parked(1, 0).expect("parked").is_empty());
    }
}

#[test]
fn swap_performs_exactly_four_updates() {
    let mut tm = scenario().into_inner();
    tm.run(|repo| {
        let counting = FailingRepo::new(repo, usize::MAX);
        MoveOrchestrator::new(&counting).relocate(&c("1,0:1"), &c("1,0:2"))?;
        assert_eq!(counting.updates.get(), 4);
        Ok(())
    })
    .expect("swap");
}
