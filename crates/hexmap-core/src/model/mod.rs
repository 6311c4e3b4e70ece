//! Invariant-checked entities: tree nodes and their content payloads.

pub mod content;
pub mod node;

pub use content::{Content, ContentId, ContentPatch, NewContent};
pub use node::{InvariantViolation, NewNode, Node, NodeId, NodeKind, NodeRecord, NodeState, NodeUpdate};

/// Current wall-clock time in microseconds since the Unix epoch.
#[must_use]
pub fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}
