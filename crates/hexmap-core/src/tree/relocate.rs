//! The relocation engine.
//!
//! [`MoveOrchestrator::relocate`] moves the subtree at one coordinate to
//! another inside a single tree. When the destination is occupied the two
//! subtrees swap places: the occupant is parked, the source moves in, and
//! the occupant is restored under the source's old position.
//!
//! The orchestrator never opens a transaction. It must be handed a
//! repository bound to an active unit of work (see [`crate::tx`]) so a
//! failure at any step leaves the tree untouched.

use serde::Serialize;
use tracing::info;

use crate::coord::Coord;
use crate::error::Result;
use crate::model::{Node, NodeId};
use crate::repo::NodeRepository;
use crate::tree::movement::{collect_subtree, relocate_subtree};
use crate::tree::parking::{
    DEFAULT_MAX_PARKING_SLOTS, find_free_slot, park_subtree, unpark_subtree,
};
use crate::tree::query::require_node;
use crate::tree::validate::{StandardValidation, ValidationStrategy};

/// Tunables for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationPolicy {
    /// Slots probed for a displaced subtree before failing.
    pub max_parking_slots: u8,
}

impl Default for RelocationPolicy {
    fn default() -> Self {
        Self {
            max_parking_slots: DEFAULT_MAX_PARKING_SLOTS,
        }
    }
}

/// Result of a relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocationOutcome {
    /// The node that was at the source coordinate.
    pub moved_id: NodeId,
    /// The node that was at the destination, when the move was a swap.
    pub displaced_id: Option<NodeId>,
    /// Every node whose address was rewritten: the moved subtree first, then
    /// the displaced one.
    pub changed: Vec<Node>,
}

impl RelocationOutcome {
    #[must_use]
    pub const fn swapped(&self) -> bool {
        self.displaced_id.is_some()
    }

    /// Nodes of the displaced subtree at their new addresses.
    pub fn displaced(&self) -> impl Iterator<Item = &Node> {
        let displaced_id = self.displaced_id;
        self.changed
            .iter()
            .skip_while(move |node| Some(node.id()) != displaced_id)
    }
}

/// Moves and swaps subtrees over a transaction-bound repository.
pub struct MoveOrchestrator<'r, R: ?Sized, V = StandardValidation> {
    repo: &'r R,
    validation: V,
    policy: RelocationPolicy,
}

impl<'r, R: NodeRepository + ?Sized> MoveOrchestrator<'r, R> {
    #[must_use]
    pub fn new(repo: &'r R) -> Self {
        Self {
            repo,
            validation: StandardValidation,
            policy: RelocationPolicy::default(),
        }
    }
}

impl<'r, R: NodeRepository + ?Sized, V: ValidationStrategy> MoveOrchestrator<'r, R, V> {
    /// Swap in a different precondition strategy.
    #[must_use]
    pub fn with_validation<W: ValidationStrategy>(self, validation: W) -> MoveOrchestrator<'r, R, W> {
        MoveOrchestrator {
            repo: self.repo,
            validation,
            policy: self.policy,
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: RelocationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Move the subtree at `from` to `to`, swapping with any subtree already
    /// at `to`.
    ///
    /// # Errors
    ///
    /// - [`crate::TreeError::Validation`] for a rejected move
    /// - [`crate::TreeError::NotFound`] when `from` is vacant
    /// - [`crate::TreeError::ParkingExhausted`] when no slot is free for
    ///   the displaced subtree
    /// - constraint, invariant or storage errors from the rewrite
    pub fn relocate(&self, from: &Coord, to: &Coord) -> Result<RelocationOutcome> {
        self.validation.check_addresses(from, to)?;

        let source = require_node(self.repo, "source node", from)?;
        let destination_parent = match to.parent() {
            Some(parent) => self.repo.get_one_by_coord(&parent)?,
            None => None,
        };
        self.validation
            .check_destination_parent(to, destination_parent.as_ref())?;
        let destination_parent_id = destination_parent.as_ref().map(Node::id);

        let source_tree = collect_subtree(self.repo, from)?;

        if from == to {
            let rewritten = relocate_subtree(self.repo, &source_tree, to, source.parent_id())?;
            info!(%from, rows = rewritten.row_count(), "relocated subtree onto itself");
            return Ok(RelocationOutcome {
                moved_id: source.id(),
                displaced_id: None,
                changed: rewritten.iter().cloned().collect(),
            });
        }

        let parked = match self.repo.get_one_by_coord(to)? {
            Some(target) => {
                self.validation.check_displacement(&target)?;
                let slot = find_free_slot(self.repo, to, self.policy.max_parking_slots)?;
                let target_tree = collect_subtree(self.repo, to)?;
                Some(park_subtree(self.repo, &target_tree, from, slot)?)
            }
            None => None,
        };

        let moved = relocate_subtree(self.repo, &source_tree, to, destination_parent_id)?;
        let mut changed: Vec<Node> = moved.iter().cloned().collect();

        let displaced_id = parked.as_ref().map(|tree| tree.top.id());
        if let Some(parked) = parked {
            let restored = unpark_subtree(self.repo, &parked, source.parent_id())?;
            info!(
                %from,
                %to,
                moved = moved.row_count(),
                displaced = restored.row_count(),
                "swapped subtrees"
            );
            changed.extend(restored.iter().cloned());
        } else {
            info!(%from, %to, moved = moved.row_count(), "relocated subtree");
        }

        Ok(RelocationOutcome {
            moved_id: source.id(),
            displaced_id,
            changed,
        })
    }
}
