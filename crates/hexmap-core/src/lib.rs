//! hexmap-core library.
//!
//! A hexagonal, materialized-path tree: every node is addressed by a
//! [`Coord`] and the relocation engine can move or swap whole subtrees in one
//! all-or-nothing unit of work.
//!
//! # Conventions
//!
//! - **Errors**: library operations return [`TreeError`]; config and store
//!   opening use `anyhow::Result` with context.
//! - **Logging**: `tracing` macros only. The binary decides where they go.
//! - **Transactions**: nothing in [`tree`] commits. Mutations run through
//!   [`tx::UnitOfWork::run`], usually via [`MapService`].

pub mod config;
pub mod coord;
pub mod db;
pub mod error;
pub mod model;
pub mod repo;
pub mod service;
pub mod tree;
pub mod tx;

pub use coord::{Coord, Direction, create_id, parse_id};
pub use error::{ErrorCode, Result, TreeError};
pub use model::{Content, ContentId, ContentPatch, NewContent, Node, NodeId, NodeKind, NodeState};
pub use service::MapService;
pub use tx::{SqliteTransactionManager, UnitOfWork};
