//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Organization archive commands
pub mod archive;

/// Part catalog commands
pub mod catalog;

/// Claim commands
pub mod claim;

/// Deposit commands
pub mod deposit;

/// General utility commands
pub mod general;

/// Shopping list commands
pub mod shopping;

/// Parsing and rendering helpers shared by the commands
pub mod utils;

/// Warehouse ledger commands
pub mod warehouse;

// Export commands
pub use archive::*;
pub use catalog::*;
pub use claim::*;
pub use deposit::*;
pub use general::*;
pub use shopping::*;
pub use warehouse::*;
