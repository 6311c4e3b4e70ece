//! Facade over a [`UnitOfWork`].
//!
//! [`MapService`] wraps every mutating operation in exactly one unit of
//! work, so callers never see a partially applied relocation, copy or
//! removal. Reads go straight to the latest committed state.

use crate::coord::{Coord, Direction, parse_id};
use crate::error::{Result, TreeError};
use crate::model::{Content, ContentId, ContentPatch, NewContent, Node, NodeId};
use crate::repo::{ContentRepository, NodeRepository};
use crate::tree::lifecycle;
use crate::tree::parking::{SweepReport, sweep_parked};
use crate::tree::query;
use crate::tree::relocate::{MoveOrchestrator, RelocationOutcome, RelocationPolicy};
use crate::tx::UnitOfWork;

/// Tree operations bound to one storage handle.
#[derive(Debug)]
pub struct MapService<U> {
    uow: U,
    policy: RelocationPolicy,
}

impl<U: UnitOfWork> MapService<U> {
    #[must_use]
    pub fn new(uow: U) -> Self {
        Self {
            uow,
            policy: RelocationPolicy::default(),
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: RelocationPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn unit_of_work(&self) -> &U {
        &self.uow
    }

    /// Give back the unit of work, e.g. to run custom work against it.
    #[must_use]
    pub fn into_inner(self) -> U {
        self.uow
    }

    // -----------------------------------------------------------------------
    // Relocation
    // -----------------------------------------------------------------------

    /// Move or swap the subtree at `from` to `to` atomically.
    ///
    /// # Errors
    ///
    /// See [`MoveOrchestrator::relocate`]. On error nothing is changed.
    pub fn relocate(&mut self, from: &Coord, to: &Coord) -> Result<RelocationOutcome> {
        let policy = self.policy;
        self.uow.run(|repo| {
            MoveOrchestrator::new(repo)
                .with_policy(policy)
                .relocate(from, to)
        })
    }

    /// String-addressed form of [`MapService::relocate`].
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidAddress`] when either id does not parse,
    /// otherwise as [`MapService::relocate`].
    pub fn move_item(&mut self, old_id: &str, new_id: &str) -> Result<RelocationOutcome> {
        let from = parse_id(old_id)?;
        let to = parse_id(new_id)?;
        self.relocate(&from, &to)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// See [`lifecycle::create_root`].
    pub fn create_root(
        &mut self,
        space_id: i64,
        group_id: i64,
        content: &NewContent,
    ) -> Result<Node> {
        self.uow
            .run(|repo| lifecycle::create_root(repo, space_id, group_id, content))
    }

    /// # Errors
    ///
    /// See [`lifecycle::create_child`].
    pub fn create_child(
        &mut self,
        parent: &Coord,
        direction: Direction,
        content: &NewContent,
    ) -> Result<Node> {
        self.uow
            .run(|repo| lifecycle::create_child(repo, parent, direction, content))
    }

    /// # Errors
    ///
    /// See [`lifecycle::remove`].
    pub fn remove(&mut self, coord: &Coord) -> Result<Vec<NodeId>> {
        self.uow.run(|repo| lifecycle::remove(repo, coord))
    }

    /// # Errors
    ///
    /// See [`lifecycle::copy_subtree`].
    pub fn copy(&mut self, from: &Coord, to: &Coord) -> Result<Vec<Node>> {
        self.uow.run(|repo| lifecycle::copy_subtree(repo, from, to))
    }

    /// # Errors
    ///
    /// See [`lifecycle::update_content`].
    pub fn update_content(&mut self, coord: &Coord, patch: &ContentPatch) -> Result<Content> {
        self.uow
            .run(|repo| lifecycle::update_content(repo, coord, patch))
    }

    // -----------------------------------------------------------------------
    // Parking
    // -----------------------------------------------------------------------

    /// Collect parked rows of one tree.
    ///
    /// # Errors
    ///
    /// See [`sweep_parked`].
    pub fn sweep(&mut self, space_id: i64, group_id: i64) -> Result<SweepReport> {
        self.uow
            .run(|repo| sweep_parked(repo, space_id, group_id))
    }

    /// Collect parked rows of every tree that has any.
    ///
    /// # Errors
    ///
    /// See [`sweep_parked`].
    pub fn sweep_all(&mut self) -> Result<SweepReport> {
        self.uow.run(|repo| {
            let mut report = SweepReport::default();
            for (space_id, group_id) in repo.get_parked_trees()? {
                let tree = sweep_parked(repo, space_id, group_id)?;
                report.restored.extend(tree.restored);
                report.discarded.extend(tree.discarded);
            }
            Ok(report)
        })
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    pub fn get(&self, coord: &Coord) -> Result<Option<Node>> {
        self.uow.read(|repo| repo.get_one_by_coord(coord))
    }

    /// Node at `coord` with its content.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] when the address or its content is
    /// missing.
    pub fn get_with_content(&self, coord: &Coord) -> Result<(Node, Content)> {
        self.uow.read(|repo| {
            let node = query::require_node(repo, "node", coord)?;
            let content = repo
                .get_content(node.content_id())?
                .ok_or_else(|| TreeError::not_found("content", node.content_id()))?;
            Ok((node, content))
        })
    }

    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    pub fn content(&self, id: ContentId) -> Result<Option<Content>> {
        self.uow.read(|repo| repo.get_content(id))
    }

    /// # Errors
    ///
    /// Returns a storage error if the scan fails.
    pub fn tree(&self, space_id: i64, group_id: i64, max_depth: Option<usize>) -> Result<Vec<Node>> {
        self.uow
            .read(|repo| query::get_tree(repo, space_id, group_id, max_depth))
    }

    /// # Errors
    ///
    /// Returns a storage error if the scan fails.
    pub fn roots(&self, space_id: i64) -> Result<Vec<Node>> {
        self.uow.read(|repo| repo.get_roots_for_space(space_id))
    }

    /// # Errors
    ///
    /// Returns a storage error if the scan fails.
    pub fn descendants(&self, coord: &Coord) -> Result<Vec<Node>> {
        self.uow.read(|repo| query::get_descendants(repo, coord))
    }

    /// # Errors
    ///
    /// Returns a storage error if a lookup fails.
    pub fn ancestors(&self, coord: &Coord) -> Result<Vec<Node>> {
        self.uow.read(|repo| query::get_ancestors(repo, coord))
    }

    /// # Errors
    ///
    /// Returns a storage error if a lookup fails.
    pub fn child_slots(&self, coord: &Coord) -> Result<Vec<(Direction, Option<Node>)>> {
        self.uow.read(|repo| query::get_child_slots(repo, coord))
    }

    /// # Errors
    ///
    /// Returns a storage error if the lookup fails.
    pub fn adjacent(&self, coord: &Coord) -> Result<Option<Node>> {
        self.uow.read(|repo| query::get_adjacent(repo, coord))
    }

    /// # Errors
    ///
    /// Returns a storage error if the scan fails.
    pub fn parked(&self, space_id: i64, group_id: i64) -> Result<Vec<Node>> {
        self.uow.read(|repo| repo.get_parked(space_id, group_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Direction::{NorthEast, NorthWest};
    use crate::tx::SqliteTransactionManager;

    fn service() -> MapService<SqliteTransactionManager> {
        let mut service = MapService::new(SqliteTransactionManager::in_memory().expect("store"));
        let root = service
            .create_root(1, 0, &NewContent::titled("R").expect("title"))
            .expect("root");
        let a = service
            .create_child(root.coord(), NorthWest, &NewContent::titled("A").expect("title"))
            .expect("A");
        service
            .create_child(a.coord(), NorthWest, &NewContent::titled("A1").expect("title"))
            .expect("A1");
        service
            .create_child(root.coord(), NorthEast, &NewContent::titled("B").expect("title"))
            .expect("B");
        service
    }

    #[test]
    fn move_item_parses_wire_ids() {
        let mut service = service();
        let outcome = service.move_item("1,0:1", "1,0:2").expect("swap");
        assert!(outcome.swapped());
        let (_, content) = service
            .get_with_content(&"1,0:2,1".parse().expect("coord"))
            .expect("A1 moved");
        assert_eq!(content.title, "A1");
    }

    #[test]
    fn move_item_rejects_bad_ids() {
        let mut service = service();
        let err = service.move_item("1,0:9", "1,0:2").expect_err("bad id");
        assert!(matches!(err, TreeError::InvalidAddress(_)));
        let err = service.move_item("1,0:1", "x").expect_err("bad id");
        assert!(matches!(err, TreeError::InvalidAddress(_)));
    }

    #[test]
    fn failed_relocation_leaves_tree_unchanged() {
        let mut service = service();
        let before = service.tree(1, 0, None).expect("tree");
        let err = service
            .relocate(&Coord::root(1, 0), &"1,0:3".parse().expect("coord"))
            .expect_err("root move");
        assert!(matches!(err, TreeError::Validation(_)));
        assert_eq!(service.tree(1, 0, None).expect("tree"), before);
    }

    #[test]
    fn sweep_all_on_clean_store_is_clean() {
        let mut service = service();
        assert!(service.sweep_all().expect("sweep").is_clean());
    }
}
