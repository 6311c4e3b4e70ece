//! Transient parking slots.
//!
//! While a swap is in flight the displaced subtree is parked: every row keeps
//! its physical path but moves to a non-zero `parking_slot`, which takes it
//! out of the stable address space, and records the `final_coord` it will be
//! restored to. The engine always unparks before committing, so parked rows
//! only outlive a unit of work when something outside the engine wrote them
//! (manual edits, an older binary, an interrupted import). [`sweep_parked`]
//! collects those.

use serde::Serialize;
use tracing::{info, warn};

use crate::coord::{Coord, ParkingSlot};
use crate::error::{Result, TreeError};
use crate::model::{InvariantViolation, Node, NodeId, NodeState};
use crate::repo::{MapRepository, NodeRepository};
use crate::tree::movement::{Subtree, delete_subtree, rewrite_subtree};

/// Default upper bound on slots probed before giving up.
pub const DEFAULT_MAX_PARKING_SLOTS: u8 = 32;

/// First slot with no row at or below `coord`, probing at most `max` slots.
///
/// # Errors
///
/// Returns [`TreeError::ParkingExhausted`] when every probed slot is
/// occupied, or a storage error.
pub fn find_free_slot<R: NodeRepository + ?Sized>(
    repo: &R,
    coord: &Coord,
    max: u8,
) -> Result<ParkingSlot> {
    let mut slot = Some(ParkingSlot::FIRST);
    for _ in 0..max {
        let Some(candidate) = slot else { break };
        if !repo.is_parking_slot_occupied(coord, candidate)? {
            return Ok(candidate);
        }
        warn!(%coord, slot = %candidate, "parking slot occupied, probing next");
        slot = candidate.next();
    }
    Err(TreeError::ParkingExhausted {
        coord: coord.to_string(),
        probed: max,
    })
}

/// Park `subtree` in `slot`. Each row keeps its physical coordinate and
/// records where it will land once its top is restored at `final_top`.
///
/// # Errors
///
/// Returns an invariant error for a root or a cross-tree `final_top`, or a
/// constraint error if the slot is taken.
pub fn park_subtree<R: NodeRepository + ?Sized>(
    repo: &R,
    subtree: &Subtree,
    final_top: &Coord,
    slot: ParkingSlot,
) -> Result<Subtree> {
    let top = subtree.top.coord();
    rewrite_subtree(repo, subtree, subtree.top.parent_id(), |node| {
        let final_coord = node.coord().rebase(top, final_top).ok_or_else(|| {
            InvariantViolation::OutsideSubtree {
                coord: node.coord().to_string(),
                top: top.to_string(),
            }
        })?;
        Ok((
            node.coord().clone(),
            NodeState::Relocating { slot, final_coord },
        ))
    })
}

/// Restore a parked subtree to its recorded final coordinates, attaching
/// the top to `parent_id`.
///
/// # Errors
///
/// Returns a constraint error if a final coordinate is occupied.
pub fn unpark_subtree<R: NodeRepository + ?Sized>(
    repo: &R,
    parked: &Subtree,
    parent_id: Option<NodeId>,
) -> Result<Subtree> {
    rewrite_subtree(repo, parked, parent_id, |node| {
        Ok((node.final_coord().clone(), NodeState::Stable))
    })
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

/// What [`sweep_parked`] did with each parked subtree it found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Rows moved back to their final coordinates.
    pub restored: Vec<NodeId>,
    /// Rows deleted because their destination was taken or orphaned.
    pub discarded: Vec<NodeId>,
}

impl SweepReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.restored.is_empty() && self.discarded.is_empty()
    }
}

/// Group parked rows into subtrees: one per `(slot, top)`.
fn group_parked(rows: Vec<Node>) -> Vec<Subtree> {
    let mut groups: Vec<(ParkingSlot, Node, Vec<Node>)> = Vec::new();
    for row in rows {
        let Some(slot) = row.parking_slot() else {
            continue;
        };
        let owner = groups
            .iter_mut()
            .find(|(s, top, _)| *s == slot && top.coord().is_ancestor_of(row.coord()));
        match owner {
            Some((_, _, members)) => members.push(row),
            None => groups.push((slot, row, Vec::new())),
        }
    }
    groups
        .into_iter()
        .map(|(_, top, members)| Subtree::new(top, members))
        .collect()
}

/// Restore or discard every parked row in one tree.
///
/// A parked subtree is restored when the parent of its final top coordinate
/// is a stable node and every final coordinate is vacant; otherwise it is
/// deleted deepest first along with content nothing else references.
///
/// # Errors
///
/// Returns a storage or constraint error if a rewrite or delete fails.
pub fn sweep_parked<R: MapRepository + ?Sized>(
    repo: &R,
    space_id: i64,
    group_id: i64,
) -> Result<SweepReport> {
    let mut report = SweepReport::default();

    for parked in group_parked(repo.get_parked(space_id, group_id)?) {
        let final_top = parked.top.final_coord().clone();
        let parent = match final_top.parent() {
            Some(parent_coord) => repo.get_one_by_coord(&parent_coord)?,
            None => None,
        };

        let mut vacant = true;
        for node in parked.iter() {
            if repo.get_one_by_coord(node.final_coord())?.is_some() {
                vacant = false;
                break;
            }
        }

        match parent {
            Some(parent) if vacant => {
                let restored = unpark_subtree(repo, &parked, Some(parent.id()))?;
                info!(at = %final_top, rows = restored.row_count(), "restored parked subtree");
                report.restored.extend(restored.ids());
            }
            _ => {
                let removed = delete_subtree(repo, &parked)?;
                warn!(
                    at = %final_top,
                    rows = removed.len(),
                    "discarded parked subtree with no place to return to"
                );
                report.discarded.extend(removed);
            }
        }
    }

    Ok(report)
}
