//! Unit-of-work boundary.
//!
//! Every mutating operation runs inside [`UnitOfWork::run`]: the work closure
//! receives a repository bound to a freshly opened transaction, and the
//! transaction commits when the closure returns `Ok` and rolls back on `Err`.
//! A panic inside the closure drops the transaction, which also rolls back.
//!
//! Read-only callers use [`UnitOfWork::read`], which hands out a repository
//! over the plain connection and opens no transaction.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, TransactionBehavior};
use tracing::warn;

use crate::db;
use crate::error::{Result, TreeError};
use crate::repo::{MapRepository, SqliteRepository};

/// Executes work against one storage handle with all-or-nothing semantics.
pub trait UnitOfWork {
    /// Repository type bound to a transaction or to the plain handle.
    type Repo<'tx>: MapRepository
    where
        Self: 'tx;

    /// Run `work` inside a transaction.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work` unchanged (after rolling back),
    /// or [`TreeError::Transaction`] if the transaction cannot begin or
    /// commit.
    fn run<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&Self::Repo<'_>) -> Result<T>;

    /// Run read-only `work` against the latest committed state.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `work`.
    fn read<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Self::Repo<'_>) -> Result<T>;
}

/// [`UnitOfWork`] over a single owned SQLite connection.
///
/// Transactions are opened with `BEGIN IMMEDIATE` so the write lock is taken
/// up front and a competing writer waits for the busy timeout instead of
/// failing halfway through a relocation.
#[derive(Debug)]
pub struct SqliteTransactionManager {
    conn: Connection,
}

impl SqliteTransactionManager {
    /// Wrap a connection that already has the store schema applied.
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or migrated.
    pub fn open(path: &Path, busy_timeout: Duration) -> anyhow::Result<Self> {
        db::open_store(path, busy_timeout).map(Self::new)
    }

    /// Fresh in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn in_memory() -> anyhow::Result<Self> {
        db::open_in_memory().map(Self::new)
    }

    /// Underlying connection, for diagnostics and tests.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl UnitOfWork for SqliteTransactionManager {
    type Repo<'tx> = SqliteRepository<'tx>;

    fn run<T, F>(&mut self, work: F) -> Result<T>
    where
        F: FnOnce(&Self::Repo<'_>) -> Result<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|source| TreeError::Transaction {
                stage: "begin",
                source,
            })?;

        let outcome = work(&SqliteRepository::new(&tx));

        match outcome {
            Ok(value) => {
                tx.commit().map_err(|source| TreeError::Transaction {
                    stage: "commit",
                    source,
                })?;
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, code = %err.code(), "unit of work failed, rolling back");
                if let Err(rollback) = tx.rollback() {
                    warn!(error = %rollback, "rollback failed; transaction dropped");
                }
                Err(err)
            }
        }
    }

    fn read<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Self::Repo<'_>) -> Result<T>,
    {
        work(&SqliteRepository::new(&self.conn))
    }
}
