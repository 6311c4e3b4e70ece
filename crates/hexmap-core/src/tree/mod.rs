//! Tree operations written against the repository contracts.
//!
//! - [`query`]: parent, descendant, ancestor and neighbour lookups
//! - [`movement`]: subtree snapshots and the rewrite primitive
//! - [`validate`]: relocation preconditions
//! - [`parking`]: transient slots for displaced subtrees
//! - [`relocate`]: the move/swap engine
//! - [`lifecycle`]: create, remove, copy and content edits

pub mod lifecycle;
pub mod movement;
pub mod parking;
pub mod query;
pub mod relocate;
pub mod validate;

pub use movement::Subtree;
pub use parking::SweepReport;
pub use relocate::{MoveOrchestrator, RelocationOutcome, RelocationPolicy};
pub use validate::{StandardValidation, ValidationError, ValidationStrategy};
