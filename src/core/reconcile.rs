//! Reconciliation - the rules shared by the claim and deposit workflows.
//!
//! Validation of drafts, the `can_fulfill` snapshot, and the all-or-nothing
//! application of a request's line items to the warehouse live here. Approval
//! runs inside a database transaction; if any entry's version check fails the
//! transaction is dropped (rolled back) and the whole approval is retried up to
//! the configured number of attempts.

use crate::{
    core::{
        catalog::PartCatalog,
        warehouse::{self, StockChange, StockLevels},
    },
    entities::LineItem,
    errors::{Error, Result},
};
use sea_orm::ConnectionTrait;
use serde::Serialize;
use std::{future::Future, time::Duration};
use tracing::warn;

/// Which way an approved request moves stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Claims take stock out
    Remove,
    /// Deposits put stock back
    Add,
}

impl Direction {
    /// Signed delta for `quantity` in this direction.
    #[must_use]
    pub const fn delta(self, quantity: i64) -> i64 {
        match self {
            Self::Remove => -quantity,
            Self::Add => quantity,
        }
    }
}

/// User input for creating or editing a claim or deposit.
///
/// Operations borrow the draft so the caller still holds it if the write fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDraft {
    /// Team making the request
    pub team_name: String,
    /// Requested items; names may be left empty to take the catalog name
    pub items: Vec<LineItem>,
    /// Display name; defaults to the team name
    pub name: Option<String>,
    /// Submitting user
    pub created_by: String,
}

impl RequestDraft {
    /// Draft for `team_name` with `items`.
    #[must_use]
    pub fn new(team_name: impl Into<String>, items: Vec<LineItem>) -> Self {
        Self {
            team_name: team_name.into(),
            items,
            name: None,
            created_by: String::new(),
        }
    }

    /// Sets the submitting user.
    #[must_use]
    pub fn created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = user.into();
        self
    }

    /// Sets an explicit display name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The record name to store.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.team_name.trim())
            .to_string()
    }
}

/// A validated draft, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRequest {
    /// Trimmed team name
    pub team_name: String,
    /// Record name
    pub name: String,
    /// Items with catalog names filled in
    pub items: Vec<LineItem>,
}

/// Validates a draft against the catalog.
///
/// # Errors
/// - [`Error::Validation`] for an empty team name or item list
/// - [`Error::InvalidQuantity`] for a quantity below 1
/// - [`Error::UnknownSku`] for a SKU missing from the catalog
pub fn validate_draft(draft: &RequestDraft, catalog: &PartCatalog) -> Result<ValidRequest> {
    let team_name = draft.team_name.trim();
    if team_name.is_empty() {
        return Err(Error::validation("Team name cannot be empty"));
    }
    Ok(ValidRequest {
        team_name: team_name.to_string(),
        name: draft.display_name(),
        items: validate_items(&draft.items, catalog)?,
    })
}

/// Validates line items and fills blank names from the catalog.
pub fn validate_items(items: &[LineItem], catalog: &PartCatalog) -> Result<Vec<LineItem>> {
    if items.is_empty() {
        return Err(Error::validation("At least one item is required"));
    }
    items
        .iter()
        .map(|item| {
            if item.quantity < 1 {
                return Err(Error::InvalidQuantity {
                    quantity: item.quantity,
                });
            }
            let part = catalog.get(&item.sku).ok_or_else(|| Error::UnknownSku {
                sku: item.sku.clone(),
            })?;
            let name = if item.name.trim().is_empty() {
                part.name.clone()
            } else {
                item.name.clone()
            };
            Ok(LineItem::new(item.sku.clone(), name, item.quantity))
        })
        .collect()
}

/// `true` iff current stock covers every item on its own.
#[must_use]
pub fn can_fulfill(items: &[LineItem], levels: &StockLevels) -> bool {
    items
        .iter()
        .all(|item| levels.get(&item.sku).copied().unwrap_or(0) >= item.quantity)
}

/// What approving a request would do to one SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection {
    /// SKU
    pub sku: String,
    /// Item name
    pub name: String,
    /// Requested quantity
    pub quantity: i64,
    /// Current on-hand quantity
    pub current: i64,
    /// On-hand quantity after approval
    pub after: i64,
}

/// Per-item before/after preview of an approval.
#[must_use]
pub fn project(items: &[LineItem], levels: &StockLevels, direction: Direction) -> Vec<Projection> {
    items
        .iter()
        .map(|item| {
            let current = levels.get(&item.sku).copied().unwrap_or(0);
            Projection {
                sku: item.sku.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
                current,
                after: current + direction.delta(item.quantity),
            }
        })
        .collect()
}

/// Applies every item's delta in order. Must be called inside a transaction:
/// an error part-way leaves earlier deltas written until the caller rolls back.
pub async fn apply_items<C>(
    db: &C,
    org_id: &str,
    items: &[LineItem],
    direction: Direction,
    catalog: &PartCatalog,
) -> Result<Vec<StockChange>>
where
    C: ConnectionTrait,
{
    let mut changes = Vec::with_capacity(items.len());
    for item in items {
        let change = warehouse::apply_delta(
            db,
            org_id,
            catalog,
            &item.sku,
            &item.name,
            direction.delta(item.quantity),
        )
        .await?;
        changes.push(change);
    }
    Ok(changes)
}

const RETRY_BACKOFF: Duration = Duration::from_millis(5);

/// Runs `attempt` until it succeeds, fails with something other than write
/// contention (see [`Error::is_write_contention`]), or `max_attempts`
/// contended attempts have occurred. Waits a little longer after each one.
pub async fn with_retry<T, F, Fut>(max_attempts: u32, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    for n in 1..=max_attempts {
        match attempt().await {
            Err(e) if e.is_write_contention() && n < max_attempts => {
                warn!(
                    "Concurrent warehouse update detected ({}), retrying ({}/{})",
                    e, n, max_attempts
                );
                tokio::time::sleep(RETRY_BACKOFF * n).await;
            }
            Err(e) if e.is_write_contention() => {
                return Err(Error::Conflict {
                    attempts: max_attempts,
                });
            }
            other => return other,
        }
    }
    Err(Error::Conflict {
        attempts: max_attempts,
    })
}

/// Result of approving a claim or deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval<M> {
    /// The record, now approved
    pub record: M,
    /// Ledger changes, one per line item
    pub changes: Vec<StockChange>,
}

impl<M> Approval<M> {
    /// SKUs touched by the approval, deduplicated.
    #[must_use]
    pub fn changed_skus(&self) -> Vec<String> {
        let mut skus: Vec<String> = self.changes.iter().map(|c| c.sku.clone()).collect();
        skus.sort();
        skus.dedup();
        skus
    }
}
