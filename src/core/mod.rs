//! Core business logic - framework-agnostic inventory operations.
//!
//! Everything here works against a `DatabaseConnection` (or a transaction) and a
//! [`catalog::PartCatalog`]; nothing depends on Discord. The bot layer talks to
//! [`inventory::Inventory`], which adds timeouts and change notifications.

pub mod archive;
pub mod catalog;
pub mod claim;
pub mod dashboard;
pub mod deposit;
pub mod events;
pub mod import;
pub mod inventory;
pub mod organization;
pub mod reconcile;
pub mod shopping;
pub mod warehouse;
