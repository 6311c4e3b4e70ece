//! Orphaned parked rows: slot probing around them and garbage collection.

use hexmap_core::coord::{Coord, Direction, ParkingSlot, parse_id};
use hexmap_core::model::NewContent;
use hexmap_core::repo::NodeRepository;
use hexmap_core::tree::movement::collect_subtree;
use hexmap_core::tree::parking::park_subtree;
use hexmap_core::tree::{RelocationPolicy, query};
use hexmap_core::tx::{SqliteTransactionManager, UnitOfWork};
use hexmap_core::{MapService, TreeError};

fn c(id: &str) -> Coord {
    parse_id(id).expect("valid coordinate")
}

/// R, A at [1], B at [2], B1 at [2,1]; then B1 is parked in slot 1 toward
/// [2,3] and committed, as if a writer had died mid-swap.
fn store_with_orphan() -> SqliteTransactionManager {
    let mut service = MapService::new(SqliteTransactionManager::in_memory().expect("store"));
    service
        .create_root(1, 0, &NewContent::titled("R").expect("title"))
        .expect("root");
    for (parent, direction, title) in [
        ("1,0", Direction::NorthWest, "A"),
        ("1,0", Direction::NorthEast, "B"),
        ("1,0:2", Direction::NorthWest, "B1"),
    ] {
        service
            .create_child(&c(parent), direction, &NewContent::titled(title).expect("title"))
            .expect("child");
    }

    let mut tm = service.into_inner();
    tm.run(|repo| {
        let orphan = collect_subtree(repo, &c("1,0:2,1"))?;
        park_subtree(repo, &orphan, &c("1,0:2,3"), ParkingSlot::FIRST)?;
        Ok(())
    })
    .expect("park orphan");
    tm
}

fn assert_parent_links_hold(service: &MapService<SqliteTransactionManager>) {
    service
        .unit_of_work()
        .read(|repo| {
            for node in query::get_tree(repo, 1, 0, None)? {
                if let Some(parent) = query::get_parent(repo, &node)? {
                    node.check_parent(&parent)?;
                }
            }
            Ok(())
        })
        .expect("every child sits directly under its parent");
}

#[test]
fn swap_probes_past_an_occupied_slot() {
    let mut service = MapService::new(store_with_orphan());
    let outcome = service.relocate(&c("1,0:1"), &c("1,0:2")).expect("swap");
    assert!(outcome.swapped());

    let parked = service.parked(1, 0).expect("parked");
    assert_eq!(parked.len(), 1, "only the orphan is still parked");
    assert_eq!(parked[0].parking_slot(), Some(ParkingSlot::FIRST));
    assert!(service.get(&c("1,0:1")).expect("get").is_some());
    assert!(service.get(&c("1,0:2")).expect("get").is_some());
}

#[test]
fn single_slot_policy_exhausts_and_rolls_back() {
    let mut service = MapService::new(store_with_orphan()).with_policy(RelocationPolicy {
        max_parking_slots: 1,
    });
    let before = service.tree(1, 0, None).expect("tree");
    let err = service
        .relocate(&c("1,0:1"), &c("1,0:2"))
        .expect_err("slot 1 is taken");
    assert!(matches!(err, TreeError::ParkingExhausted { probed: 1, .. }));
    assert_eq!(err.code().code(), "E3003");
    assert_eq!(service.tree(1, 0, None).expect("tree"), before);
}

#[test]
fn sweep_restores_orphan_under_current_parent() {
    let mut service = MapService::new(store_with_orphan());
    let report = service.sweep(1, 0).expect("sweep");
    assert_eq!(report.restored.len(), 1);
    assert!(report.discarded.is_empty());

    let restored = service.get(&c("1,0:2,3")).expect("get").expect("B1 restored");
    let b = service.get(&c("1,0:2")).expect("get").expect("B");
    assert_eq!(restored.parent_id(), Some(b.id()));
    assert!(service.parked(1, 0).expect("parked").is_empty());
    assert_parent_links_hold(&service);
}

#[test]
fn sweep_after_swap_follows_the_new_occupant() {
    let mut service = MapService::new(store_with_orphan());
    service.relocate(&c("1,0:1"), &c("1,0:2")).expect("swap");
    let report = service.sweep_all().expect("sweep");
    assert_eq!(report.restored.len(), 1);

    let a = service.get(&c("1,0:2")).expect("get").expect("A now at [2]");
    let restored = service.get(&c("1,0:2,3")).expect("get").expect("orphan restored");
    assert_eq!(restored.parent_id(), Some(a.id()));
    assert_parent_links_hold(&service);
}

#[test]
fn sweep_discards_when_final_address_is_taken() {
    let mut service = MapService::new(store_with_orphan());
    service
        .create_child(
            &c("1,0:2"),
            Direction::East,
            &NewContent::titled("squatter").expect("title"),
        )
        .expect("occupy [2,3]");

    let report = service.sweep(1, 0).expect("sweep");
    assert!(report.restored.is_empty());
    assert_eq!(report.discarded.len(), 1);
    assert!(service.parked(1, 0).expect("parked").is_empty());

    let leftover: i64 = service
        .unit_of_work()
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM contents WHERE title = 'B1'",
            [],
            |row| row.get(0),
        )
        .expect("count");
    assert_eq!(leftover, 0, "content of a discarded row is released");
}

#[test]
fn orphan_is_invisible_to_stable_lookups() {
    let tm = store_with_orphan();
    let hidden = tm
        .read(|repo| repo.get_one_by_coord(&c("1,0:2,1")))
        .expect("lookup");
    assert!(hidden.is_none());
    let rendered = tm
        .read(|repo| repo.get_parked(1, 0))
        .expect("parked")
        .into_iter()
        .filter_map(|node| node.parked_coord())
        .map(|parked| parked.to_string())
        .collect::<Vec<_>>();
    assert_eq!(rendered, vec!["1,0:2,1,7"]);
}

fn content_rows(service: &MapService<SqliteTransactionManager>) -> i64 {
    service
        .unit_of_work()
        .connection()
        .query_row("SELECT COUNT(*) FROM contents", [], |row| row.get(0))
        .expect("count")
}

#[test]
fn removing_root_also_clears_orphans() {
    let mut service = MapService::new(store_with_orphan());
    let removed = service.remove(&c("1,0")).expect("remove whole tree");
    assert_eq!(removed.len(), 4, "R, A, B and the parked B1");

    assert!(service.tree(1, 0, None).expect("tree").is_empty());
    assert!(service.parked(1, 0).expect("parked").is_empty());
    assert_eq!(content_rows(&service), 0);
}

#[test]
fn removing_parent_takes_its_orphan() {
    let mut service = MapService::new(store_with_orphan());
    let b = service.get(&c("1,0:2")).expect("get").expect("B");
    let orphan = service.parked(1, 0).expect("parked").remove(0);

    let removed = service.remove(&c("1,0:2")).expect("remove B");
    assert_eq!(removed, vec![orphan.id(), b.id()]);
    assert!(service.parked(1, 0).expect("parked").is_empty());
    assert!(service.get(&c("1,0:1")).expect("get").is_some(), "A survives");
}

#[test]
fn removing_after_swap_follows_parent_links() {
    let mut service = MapService::new(store_with_orphan());
    service.relocate(&c("1,0:1"), &c("1,0:2")).expect("swap");

    // B now sits at [1], while its parked child still has physical path [2,1].
    service.remove(&c("1,0:2")).expect("remove A");
    assert_eq!(service.parked(1, 0).expect("parked").len(), 1);

    service.remove(&c("1,0:1")).expect("remove B");
    assert!(service.parked(1, 0).expect("parked").is_empty());
    assert_eq!(service.tree(1, 0, None).expect("tree").len(), 1);
}

#[test]
fn sweep_all_visits_only_trees_with_parked_rows() {
    let mut service = MapService::new(store_with_orphan());
    service
        .create_root(2, 0, &NewContent::titled("S").expect("title"))
        .expect("root");
    for (parent, title) in [("2,0", "X"), ("2,0:3", "X1")] {
        service
            .create_child(&c(parent), Direction::East, &NewContent::titled(title).expect("title"))
            .expect("child");
    }
    service
        .create_root(3, 0, &NewContent::titled("clean").expect("title"))
        .expect("root");

    let mut tm = service.into_inner();
    tm.run(|repo| {
        let orphan = collect_subtree(repo, &c("2,0:3,3"))?;
        park_subtree(repo, &orphan, &c("2,0:3,5"), ParkingSlot::FIRST)?;
        Ok(())
    })
    .expect("park second orphan");
    let trees = tm.read(|repo| repo.get_parked_trees()).expect("parked trees");
    assert_eq!(trees, vec![(1, 0), (2, 0)]);

    let mut service = MapService::new(tm);
    let report = service.sweep_all().expect("sweep");
    assert_eq!(report.restored.len(), 2);
    assert!(service.get(&c("1,0:2,3")).expect("get").is_some());
    assert!(service.get(&c("2,0:3,5")).expect("get").is_some());
    assert!(no_parked_trees(&service));
}

fn no_parked_trees(service: &MapService<SqliteTransactionManager>) -> bool {
    service
        .unit_of_work()
        .read(|repo| repo.get_parked_trees())
        .expect("parked trees")
        .is_empty()
}
