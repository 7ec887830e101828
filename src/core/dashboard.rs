//! Dashboard summary and display helpers.
//!
//! This module provides the organization overview shown by `/dashboard` and a
//! few formatting helpers shared by the bot layer. All functions are
//! framework-agnostic and return structured data or plain strings.

use crate::{
    core::{claim, deposit, warehouse},
    entities::RequestStatus,
    errors::Result,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Serialize;

/// How many shortfalls the dashboard lists.
pub const SHORTFALL_PREVIEW: usize = 3;
/// How many recent claims/deposits the dashboard lists by default.
pub const RECENT_ACTIVITY: usize = 5;

/// One SKU with a negative balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortfall {
    /// SKU
    pub sku: String,
    /// Part name
    pub name: String,
    /// Negative on-hand quantity
    pub on_hand: i64,
}

/// Claim or deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// A claim
    Claim,
    /// A deposit
    Deposit,
}

impl ActivityKind {
    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Claim => "Claim",
            Self::Deposit => "Deposit",
        }
    }
}

/// A recent claim or deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    /// Record kind
    pub kind: ActivityKind,
    /// Record id
    pub id: String,
    /// Record name
    pub name: String,
    /// When it was created
    pub created_at: DateTime<Utc>,
    /// Approval state
    pub status: RequestStatus,
}

/// Organization overview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    /// Number of SKUs with a negative balance
    pub required_parts: usize,
    /// Pending claims
    pub pending_claims: usize,
    /// Pending deposits
    pub pending_deposits: usize,
    /// The first few shortfalls, in SKU order
    pub shortfalls: Vec<Shortfall>,
    /// Newest claims and deposits, newest first
    pub recent_activity: Vec<ActivityEntry>,
}

/// Builds the dashboard for an organization.
///
/// # Arguments
/// * `db` - Database connection
/// * `org_id` - Organization
/// * `activity_limit` - How many recent records to include (default [`RECENT_ACTIVITY`])
pub async fn generate_dashboard(
    db: &DatabaseConnection,
    org_id: &str,
    activity_limit: Option<usize>,
) -> Result<DashboardSummary> {
    let entries = warehouse::load_warehouse(db, org_id).await?;
    let negative: Vec<Shortfall> = entries
        .into_values()
        .filter(|entry| entry.on_hand < 0)
        .map(|entry| Shortfall {
            sku: entry.sku,
            name: entry.name,
            on_hand: entry.on_hand,
        })
        .collect();

    let claims = claim::list_claims(db, org_id).await?;
    let deposits = deposit::list_deposits(db, org_id).await?;

    let pending_claims = claims
        .iter()
        .filter(|c| c.status == RequestStatus::Pending)
        .count();
    let pending_deposits = deposits
        .iter()
        .filter(|d| d.status == RequestStatus::Pending)
        .count();

    let mut recent_activity: Vec<ActivityEntry> = claims
        .into_iter()
        .map(|c| ActivityEntry {
            kind: ActivityKind::Claim,
            id: c.id,
            name: c.name,
            created_at: c.created_at,
            status: c.status,
        })
        .chain(deposits.into_iter().map(|d| ActivityEntry {
            kind: ActivityKind::Deposit,
            id: d.id,
            name: d.name,
            created_at: d.created_at,
            status: d.status,
        }))
        .collect();
    recent_activity.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent_activity.truncate(activity_limit.unwrap_or(RECENT_ACTIVITY));

    Ok(DashboardSummary {
        required_parts: negative.len(),
        pending_claims,
        pending_deposits,
        shortfalls: negative.into_iter().take(SHORTFALL_PREVIEW).collect(),
        recent_activity,
    })
}

/// Formats a ledger change like `4 → -6`.
#[must_use]
pub fn format_stock_change(before: i64, after: i64) -> String {
    format!("{before} → {after}")
}

/// Formats an on-hand quantity, flagging shortfalls.
#[must_use]
pub fn format_on_hand(on_hand: i64) -> String {
    if on_hand < 0 {
        format!("{on_hand} (short {})", on_hand.abs())
    } else {
        on_hand.to_string()
    }
}

/// Formats a cost as dollars with two decimals.
#[must_use]
pub fn format_cost(cost: Decimal) -> String {
    format!("${:.2}", cost.round_dp(2))
}

/// One-line summary of a recent record.
#[must_use]
pub fn format_activity(entry: &ActivityEntry) -> String {
    format!(
        "{} | {} | {} | {}",
        entry.kind.label(),
        entry.name,
        entry.status.as_str(),
        entry.created_at.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        claim::{approve_claim, create_claim},
        deposit::create_deposit,
        reconcile::RequestDraft,
        warehouse::{add_item, apply_delta},
    };
    use crate::entities::LineItem;
    use crate::test_utils::*;

    fn draft(team: &str, sku: &str, quantity: i64) -> RequestDraft {
        RequestDraft::new(team, vec![LineItem::new(sku, "", quantity)])
    }

    #[test]
    fn test_format_on_hand() {
        assert_eq!(format_on_hand(5), "5");
        assert_eq!(format_on_hand(0), "0");
        assert_eq!(format_on_hand(-6), "-6 (short 6)");
    }

    #[test]
    fn test_format_cost() {
        assert_eq!(format_cost(Decimal::new(5, 0)), "$5.00");
        assert_eq!(format_cost(Decimal::new(129_999, 2)), "$1299.99");
    }

    #[test]
    fn test_format_stock_change() {
        assert_eq!(format_stock_change(4, -6), "4 → -6");
    }

    #[tokio::test]
    async fn test_empty_dashboard() -> Result<()> {
        let db = setup_test_db().await?;
        let summary = generate_dashboard(&db, TEST_ORG, None).await?;

        assert_eq!(summary.required_parts, 0);
        assert_eq!(summary.pending_claims, 0);
        assert!(summary.shortfalls.is_empty());
        assert!(summary.recent_activity.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_counts() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();
        add_item(&db, TEST_ORG, &catalog, "A", 1).await?;
        for sku in ["B", "C", "X", "Y"] {
            apply_delta(&db, TEST_ORG, &catalog, sku, "", -1).await?;
        }

        let approved = create_claim(&db, TEST_ORG, &catalog, &draft("T1", "A", 1)).await?;
        approve_claim(&db, TEST_ORG, &catalog, &approved.id, 3).await?;
        create_claim(&db, TEST_ORG, &catalog, &draft("T1", "A", 1)).await?;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let latest = create_deposit(&db, TEST_ORG, &catalog, &draft("T2", "A", 1)).await?;

        let summary = generate_dashboard(&db, TEST_ORG, None).await?;
        assert_eq!(summary.required_parts, 4);
        assert_eq!(summary.shortfalls.len(), SHORTFALL_PREVIEW);
        assert_eq!(summary.shortfalls[0].sku, "B");
        assert_eq!(summary.pending_claims, 1);
        assert_eq!(summary.pending_deposits, 1);
        assert_eq!(summary.recent_activity.len(), 3);
        assert_eq!(summary.recent_activity[0].id, latest.id);
        assert_eq!(summary.recent_activity[0].kind, ActivityKind::Deposit);
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_activity_limit() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();
        for i in 0..7 {
            create_claim(&db, TEST_ORG, &catalog, &draft(&format!("T{i}"), "A", 1)).await?;
        }

        assert_eq!(
            generate_dashboard(&db, TEST_ORG, None)
                .await?
                .recent_activity
                .len(),
            RECENT_ACTIVITY
        );
        assert_eq!(
            generate_dashboard(&db, TEST_ORG, Some(2))
                .await?
                .recent_activity
                .len(),
            2
        );
        Ok(())
    }
}
