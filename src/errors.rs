//! Unified error type for the inventory system.
//!
//! Every fallible operation returns [`Result<T>`]. Variants are grouped into the
//! buckets described by [`ErrorKind`] so callers can decide how to surface them
//! (re-prompt, refresh local state, retry, or report a transport failure).

use thiserror::Error;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input caught before anything is written
    Validation,
    /// The referenced record no longer exists
    NotFound,
    /// The record exists but is in the wrong state for the operation
    InvalidState,
    /// A concurrent writer won the race and the retry budget is spent
    Conflict,
    /// Storage, network, timeout or framework failure
    Transport,
}

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Generic input validation failure (empty team name, empty item list, ...)
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// A SKU that is not present in the part catalog
    #[error("Unknown SKU '{sku}'")]
    UnknownSku {
        /// The offending SKU
        sku: String,
    },

    /// A zero or negative line-item quantity
    #[error("Invalid quantity {quantity}: must be greater than zero")]
    InvalidQuantity {
        /// The rejected quantity
        quantity: i64,
    },

    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Claim lookup failed
    #[error("Claim '{id}' not found")]
    ClaimNotFound {
        /// Claim id
        id: String,
    },

    /// Deposit lookup failed
    #[error("Deposit '{id}' not found")]
    DepositNotFound {
        /// Deposit id
        id: String,
    },

    /// Shopping list lookup failed
    #[error("Shopping list '{id}' not found")]
    ShoppingListNotFound {
        /// Shopping list id
        id: String,
    },

    /// SKU is not tracked in the warehouse
    #[error("SKU '{sku}' is not tracked in the warehouse")]
    WarehouseItemNotFound {
        /// The SKU
        sku: String,
    },

    /// Organization lookup failed
    #[error("Organization '{id}' not found")]
    OrganizationNotFound {
        /// Organization id
        id: String,
    },

    /// Approval attempted on a record that is no longer pending
    #[error("'{id}' has already been approved")]
    AlreadyApproved {
        /// Claim or deposit id
        id: String,
    },

    /// Operation is not legal in the record's current state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the rejected transition
        message: String,
    },

    /// A SKU cannot be removed while it still carries a balance
    #[error("Cannot remove SKU '{sku}': on-hand quantity is {on_hand}, must be 0")]
    PreconditionFailed {
        /// The SKU
        sku: String,
        /// Its current on-hand quantity
        on_hand: i64,
    },

    /// Attempted to add a SKU that is already tracked
    #[error("SKU '{sku}' is already tracked in the warehouse")]
    AlreadyTracked {
        /// The SKU
        sku: String,
    },

    /// Optimistic concurrency check kept failing
    #[error("Warehouse was modified concurrently; gave up after {attempts} attempts")]
    Conflict {
        /// Number of attempts made
        attempts: u32,
    },

    /// Operation exceeded its deadline
    #[error("Operation timed out after {seconds}s")]
    Timeout {
        /// Configured timeout
        seconds: u64,
    },

    /// Database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reading or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// A background task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Serenity/Poise framework error
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// Returns the taxonomy bucket this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. }
            | Self::UnknownSku { .. }
            | Self::InvalidQuantity { .. }
            | Self::Config { .. } => ErrorKind::Validation,
            Self::ClaimNotFound { .. }
            | Self::DepositNotFound { .. }
            | Self::ShoppingListNotFound { .. }
            | Self::WarehouseItemNotFound { .. }
            | Self::OrganizationNotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyApproved { .. }
            | Self::InvalidState { .. }
            | Self::PreconditionFailed { .. }
            | Self::AlreadyTracked { .. } => ErrorKind::InvalidState,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Timeout { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Csv(_)
            | Self::EnvVar(_)
            | Self::Task(_)
            | Self::Framework(_) => ErrorKind::Transport,
        }
    }

    /// Whether the caller may reasonably offer a retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Conflict | ErrorKind::Transport)
    }

    /// Whether this is lost write contention: a failed version check, or
    /// `SQLite` refusing a write because another connection holds the lock.
    /// Re-running the whole unit of work may succeed.
    #[must_use]
    pub fn is_write_contention(&self) -> bool {
        use sea_orm::{DbErr, RuntimeErr, sqlx};

        match self {
            Self::Conflict { .. } => true,
            Self::Database(
                DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
                | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(e))),
            ) => e
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                // SQLITE_BUSY and SQLITE_LOCKED, with any extended code
                .is_some_and(|code| matches!(code & 0xff, 5 | 6)),
            _ => false,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
