//! Relocation preconditions.
//!
//! Checks are pure: they look only at coordinates and nodes the caller has
//! already resolved, never at storage. The orchestrator runs them in three
//! phases:
//!
//! 1. [`ValidationStrategy::check_addresses`] before anything is read
//! 2. [`ValidationStrategy::check_destination_parent`] once the source exists
//! 3. [`ValidationStrategy::check_displacement`] when the destination is
//!    occupied, before the occupant is parked
//!
//! Lifecycle operations (create, copy) reuse the same error type for their
//! own placement checks.

use crate::coord::Coord;
use crate::model::Node;

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// A precondition that failed before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("root {from} cannot be relocated to non-root position {to}")]
    RootRelocation { from: String, to: String },

    #[error("cannot relocate {from} to {to}: different space or group")]
    CrossSpace { from: String, to: String },

    #[error("cannot relocate {from} into its own subtree at {to}")]
    IntoOwnSubtree { from: String, to: String },

    #[error("cannot swap {from} with its ancestor {to}")]
    AncestorSwap { from: String, to: String },

    #[error("child {from} cannot take root position {to}")]
    ChildToRootDepth { from: String, to: String },

    /// The parent of the destination is not a stable node.
    #[error("destination {to} has no parent node")]
    MissingParent { to: String },

    #[error("root {target} cannot be displaced")]
    RootDisplacement { target: String },

    #[error("tree {space_id},{group_id} already has a root")]
    RootExists { space_id: i64, group_id: i64 },

    #[error("address {at} is already occupied")]
    Occupied { at: String },
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Pluggable precondition checks for a relocation.
pub trait ValidationStrategy {
    /// Address-only checks, run before the source is resolved.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] the move would violate.
    fn check_addresses(&self, from: &Coord, to: &Coord) -> Result<(), ValidationError>;

    /// `parent` is the stable node at `to`'s parent coordinate, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingParent`] when a non-root
    /// destination has no parent.
    fn check_destination_parent(
        &self,
        to: &Coord,
        parent: Option<&Node>,
    ) -> Result<(), ValidationError>;

    /// Guard for the node currently occupying the destination.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RootDisplacement`] if `target` is a root.
    fn check_displacement(&self, target: &Node) -> Result<(), ValidationError>;
}

/// The stock rule set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StandardValidation;

impl ValidationStrategy for StandardValidation {
    fn check_addresses(&self, from: &Coord, to: &Coord) -> Result<(), ValidationError> {
        let pair = || (from.to_string(), to.to_string());

        if !from.same_space(to) {
            let (from, to) = pair();
            return Err(ValidationError::CrossSpace { from, to });
        }
        if from.is_root() && !to.is_root() {
            let (from, to) = pair();
            return Err(ValidationError::RootRelocation { from, to });
        }
        if !from.is_root() && to.is_root() {
            let (from, to) = pair();
            return Err(ValidationError::ChildToRootDepth { from, to });
        }
        if from.is_ancestor_of(to) {
            let (from, to) = pair();
            return Err(ValidationError::IntoOwnSubtree { from, to });
        }
        if to.is_ancestor_of(from) {
            let (from, to) = pair();
            return Err(ValidationError::AncestorSwap { from, to });
        }
        Ok(())
    }

    fn check_destination_parent(
        &self,
        to: &Coord,
        parent: Option<&Node>,
    ) -> Result<(), ValidationError> {
        match (to.parent(), parent) {
            (None, _) => Ok(()),
            (Some(expected), Some(node)) if node.coord() == &expected && !node.is_parked() => {
                Ok(())
            }
            (Some(_), _) => Err(ValidationError::MissingParent { to: to.to_string() }),
        }
    }

    fn check_displacement(&self, target: &Node) -> Result<(), ValidationError> {
        if target.is_root() {
            return Err(ValidationError::RootDisplacement {
                target: target.coord().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Direction::{East, NorthEast, NorthWest};
    use crate::model::{ContentId, NodeId, NodeKind, NodeRecord, NodeState};

    fn coord(path: &[crate::coord::Direction]) -> Coord {
        Coord::new(1, 0, path.to_vec())
    }

    fn node(id: i64, kind: NodeKind, at: Coord, parent: Option<i64>) -> Node {
        Node::from_record(NodeRecord {
            id: NodeId(id),
            kind,
            coord: at,
            parent_id: parent.map(NodeId),
            origin_id: None,
            content_id: ContentId(id),
            state: NodeState::Stable,
            created_at_us: 0,
            updated_at_us: 0,
        })
        .expect("valid node")
    }

    #[test]
    fn sibling_move_passes() {
        StandardValidation
            .check_addresses(&coord(&[NorthWest]), &coord(&[NorthEast]))
            .expect("siblings");
    }

    #[test]
    fn identical_addresses_pass() {
        StandardValidation
            .check_addresses(&coord(&[East]), &coord(&[East]))
            .expect("no-op move is allowed");
        StandardValidation
            .check_addresses(&Coord::root(1, 0), &Coord::root(1, 0))
            .expect("root onto itself");
    }

    #[test]
    fn root_cannot_go_below_root_depth() {
        let err = StandardValidation
            .check_addresses(&Coord::root(1, 0), &coord(&[East]))
            .expect_err("root move");
        assert!(matches!(err, ValidationError::RootRelocation { .. }));
    }

    #[test]
    fn cross_space_is_rejected() {
        let err = StandardValidation
            .check_addresses(&coord(&[East]), &Coord::new(2, 0, vec![East]))
            .expect_err("other space");
        assert!(matches!(err, ValidationError::CrossSpace { .. }));

        let err = StandardValidation
            .check_addresses(&coord(&[East]), &Coord::new(1, 3, vec![East]))
            .expect_err("other group");
        assert!(matches!(err, ValidationError::CrossSpace { .. }));
    }

    #[test]
    fn child_cannot_become_root() {
        let err = StandardValidation
            .check_addresses(&coord(&[East]), &Coord::root(1, 0))
            .expect_err("child to depth 0");
        assert!(matches!(err, ValidationError::ChildToRootDepth { .. }));
    }

    #[test]
    fn subtree_cannot_enter_itself_or_swap_with_ancestor() {
        let err = StandardValidation
            .check_addresses(&coord(&[East]), &coord(&[East, NorthWest]))
            .expect_err("into own subtree");
        assert!(matches!(err, ValidationError::IntoOwnSubtree { .. }));

        let err = StandardValidation
            .check_addresses(&coord(&[East, NorthWest]), &coord(&[East]))
            .expect_err("with ancestor");
        assert!(matches!(err, ValidationError::AncestorSwap { .. }));
    }

    #[test]
    fn destination_parent_must_match() {
        let root = node(1, NodeKind::Root, Coord::root(1, 0), None);
        StandardValidation
            .check_destination_parent(&coord(&[East]), Some(&root))
            .expect("root parents depth-1 slot");
        StandardValidation
            .check_destination_parent(&Coord::root(1, 0), None)
            .expect("root depth needs no parent");

        let err = StandardValidation
            .check_destination_parent(&coord(&[East, East]), None)
            .expect_err("no parent");
        assert!(matches!(err, ValidationError::MissingParent { .. }));

        let err = StandardValidation
            .check_destination_parent(&coord(&[East, East]), Some(&root))
            .expect_err("wrong node");
        assert!(matches!(err, ValidationError::MissingParent { .. }));
    }

    #[test]
    fn roots_are_never_displaced() {
        let root = node(1, NodeKind::Root, Coord::root(1, 0), None);
        let child = node(2, NodeKind::Child, coord(&[East]), Some(1));
        assert!(matches!(
            StandardValidation.check_displacement(&root),
            Err(ValidationError::RootDisplacement { .. })
        ));
        StandardValidation
            .check_displacement(&child)
            .expect("children can be displaced");
    }
}
