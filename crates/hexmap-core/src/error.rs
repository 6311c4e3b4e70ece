use std::fmt;

use crate::coord::AddressError;
use crate::model::node::InvariantViolation;
use crate::tree::validate::ValidationError;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    InvalidAddress,
    NodeNotFound,
    ValidationFailed,
    InvariantViolation,
    ConstraintViolation,
    TransactionFailed,
    ParkingExhausted,
    StorageFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::InvalidAddress => "E2001",
            Self::NodeNotFound => "E2002",
            Self::ValidationFailed => "E2003",
            Self::InvariantViolation => "E2004",
            Self::ConstraintViolation => "E3001",
            Self::TransactionFailed => "E3002",
            Self::ParkingExhausted => "E3003",
            Self::StorageFailure => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Map store not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidAddress => "Invalid coordinate address",
            Self::NodeNotFound => "Node not found",
            Self::ValidationFailed => "Relocation precondition violated",
            Self::InvariantViolation => "Tree invariant violated",
            Self::ConstraintViolation => "Storage constraint violated",
            Self::TransactionFailed => "Transaction failed",
            Self::ParkingExhausted => "No free parking slot",
            Self::StorageFailure => "Storage failure",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `hx init` to create the map store."),
            Self::ConfigParseError => Some("Fix syntax in .hexmap/config.toml and retry."),
            Self::InvalidAddress => {
                Some("Use '{space},{group}' optionally followed by ':{d1,d2,...}' with directions 1-6.")
            }
            Self::NodeNotFound | Self::InvariantViolation => None,
            Self::ValidationFailed => {
                Some("Roots stay roots, moves stay inside one space, and the destination parent must exist.")
            }
            Self::ConstraintViolation => Some(
                "An address or parent link conflicts with stored rows. Re-read the map, run `hx gc` if parked rows remain, then retry.",
            ),
            Self::TransactionFailed => Some("Retry once. The map was left unchanged."),
            Self::ParkingExhausted => Some("Run `hx gc` to collect parked rows, then retry."),
            Self::StorageFailure => Some("Check disk space and write permissions."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by repositories, the relocation engine and lifecycle
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// A precondition failed before any mutation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A node expected at an address or id does not exist.
    #[error("{what} not found at {at}")]
    NotFound { what: &'static str, at: String },

    #[error(transparent)]
    InvalidAddress(#[from] AddressError),

    /// An entity failed its construction-time checks.
    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    /// The store rejected a write on a uniqueness, foreign-key or check
    /// constraint.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Beginning or committing a unit of work failed.
    #[error("transaction failed during {stage}: {source}")]
    Transaction {
        stage: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Every parking slot up to the configured limit is occupied.
    #[error("no free parking slot for {coord} after {probed} probes")]
    ParkingExhausted { coord: String, probed: u8 },

    #[error("storage error: {0}")]
    Storage(#[source] rusqlite::Error),
}

impl TreeError {
    pub(crate) fn not_found(what: &'static str, at: impl fmt::Display) -> Self {
        Self::NotFound {
            what,
            at: at.to_string(),
        }
    }

    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::NotFound { .. } => ErrorCode::NodeNotFound,
            Self::InvalidAddress(_) => ErrorCode::InvalidAddress,
            Self::Invariant(_) => ErrorCode::InvariantViolation,
            Self::ConstraintViolation(_) => ErrorCode::ConstraintViolation,
            Self::Transaction { .. } => ErrorCode::TransactionFailed,
            Self::ParkingExhausted { .. } => ErrorCode::ParkingExhausted,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

impl From<rusqlite::Error> for TreeError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::ConstraintViolation(
                    message.unwrap_or_else(|| failure.to_string()),
                )
            }
            other => Self::Storage(other),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T, E = TreeError> = std::result::Result<T, E>;
