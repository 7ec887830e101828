//! Deposit workflow - parts returned to or bought into the warehouse.
//!
//! Same lifecycle as a claim. There is no fulfilment check: adding stock always
//! succeeds.

use crate::{
    core::{
        catalog::PartCatalog,
        reconcile::{self, Approval, Direction, Projection, RequestDraft},
        warehouse::StockLevels,
    },
    entities::{Deposit, LineItems, RequestStatus, deposit},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info};
use uuid::Uuid;

/// Creates a pending deposit.
pub async fn create_deposit(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    draft: &RequestDraft,
) -> Result<deposit::Model> {
    let valid = reconcile::validate_draft(draft, catalog)?;
    let now = Utc::now();

    let deposit = deposit::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        org_id: Set(org_id.to_string()),
        name: Set(valid.name),
        team_name: Set(valid.team_name),
        submitted_date: Set(now.date_naive()),
        status: Set(RequestStatus::Pending),
        items: Set(LineItems(valid.items)),
        created_at: Set(now),
        created_by: Set(draft.created_by.clone()),
    }
    .insert(db)
    .await?;

    info!(
        "Created deposit {} for {} ({} items)",
        deposit.id,
        deposit.team_name,
        deposit.items.0.len()
    );
    Ok(deposit)
}

/// Gets a deposit by id.
pub async fn get_deposit<C>(db: &C, org_id: &str, deposit_id: &str) -> Result<deposit::Model>
where
    C: ConnectionTrait,
{
    Deposit::find_by_id(deposit_id)
        .filter(deposit::Column::OrgId.eq(org_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::DepositNotFound {
            id: deposit_id.to_string(),
        })
}

/// Error for a conditional write that matched no rows: `not_pending` if the
/// deposit still exists, otherwise [`Error::DepositNotFound`].
async fn unmatched_write_error<C>(
    db: &C,
    org_id: &str,
    deposit_id: &str,
    not_pending: Error,
) -> Error
where
    C: ConnectionTrait,
{
    match get_deposit(db, org_id, deposit_id).await {
        Ok(_) => not_pending,
        Err(e) => e,
    }
}

/// All deposits of an organization, newest first.
pub async fn list_deposits(db: &DatabaseConnection, org_id: &str) -> Result<Vec<deposit::Model>> {
    Deposit::find()
        .filter(deposit::Column::OrgId.eq(org_id))
        .order_by_desc(deposit::Column::CreatedAt)
        .order_by_asc(deposit::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Pending deposits only, newest first.
pub async fn list_pending_deposits(
    db: &DatabaseConnection,
    org_id: &str,
) -> Result<Vec<deposit::Model>> {
    Deposit::find()
        .filter(deposit::Column::OrgId.eq(org_id))
        .filter(deposit::Column::Status.eq(RequestStatus::Pending))
        .order_by_desc(deposit::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Replaces a pending deposit's team, name and items.
///
/// # Errors
/// - [`Error::DepositNotFound`] if the deposit does not exist
/// - [`Error::InvalidState`] if it is already approved
pub async fn modify_deposit(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    deposit_id: &str,
    draft: &RequestDraft,
) -> Result<deposit::Model> {
    let existing = get_deposit(db, org_id, deposit_id).await?;
    existing.status.ensure_pending(deposit_id, "modify")?;
    let valid = reconcile::validate_draft(draft, catalog)?;

    let result = Deposit::update_many()
        .col_expr(deposit::Column::Name, Expr::value(valid.name))
        .col_expr(deposit::Column::TeamName, Expr::value(valid.team_name))
        .col_expr(deposit::Column::Items, Expr::value(LineItems(valid.items)))
        .filter(deposit::Column::Id.eq(deposit_id))
        .filter(deposit::Column::OrgId.eq(org_id))
        .filter(deposit::Column::Status.eq(RequestStatus::Pending))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        let stale = Error::InvalidState {
            message: format!("cannot modify '{deposit_id}': already approved"),
        };
        return Err(unmatched_write_error(db, org_id, deposit_id, stale).await);
    }

    info!("Modified deposit {}", deposit_id);
    get_deposit(db, org_id, deposit_id).await
}

/// Approves a deposit, adding every item to the warehouse.
///
/// # Errors
/// - [`Error::DepositNotFound`] if the deposit does not exist
/// - [`Error::AlreadyApproved`] if it was approved before
/// - [`Error::Conflict`] once `max_attempts` version conflicts have occurred
pub async fn approve_deposit(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    deposit_id: &str,
    max_attempts: u32,
) -> Result<Approval<deposit::Model>> {
    let approval = reconcile::with_retry(max_attempts, || {
        approve_deposit_once(db, org_id, catalog, deposit_id)
    })
    .await?;
    info!(
        "Approved deposit {} ({} ledger changes)",
        deposit_id,
        approval.changes.len()
    );
    Ok(approval)
}

async fn approve_deposit_once(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    deposit_id: &str,
) -> Result<Approval<deposit::Model>> {
    let txn = db.begin().await?;

    let mut deposit = get_deposit(&txn, org_id, deposit_id).await?;
    let approved = deposit.status.approve(deposit_id)?;

    let changes =
        reconcile::apply_items(&txn, org_id, &deposit.items.0, Direction::Add, catalog).await?;

    let result = Deposit::update_many()
        .col_expr(deposit::Column::Status, Expr::value(approved))
        .filter(deposit::Column::Id.eq(deposit_id))
        .filter(deposit::Column::OrgId.eq(org_id))
        .filter(deposit::Column::Status.eq(RequestStatus::Pending))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        // Dropping the transaction rolls back the deltas above.
        let stale = Error::AlreadyApproved {
            id: deposit_id.to_string(),
        };
        return Err(unmatched_write_error(&txn, org_id, deposit_id, stale).await);
    }

    txn.commit().await?;
    debug!("Committed approval of deposit {}", deposit_id);

    deposit.status = approved;
    Ok(Approval {
        record: deposit,
        changes,
    })
}

/// Deletes (rejects) a pending deposit.
pub async fn delete_deposit(db: &DatabaseConnection, org_id: &str, deposit_id: &str) -> Result<()> {
    let deposit = get_deposit(db, org_id, deposit_id).await?;
    deposit.status.ensure_pending(deposit_id, "delete")?;

    let result = Deposit::delete_many()
        .filter(deposit::Column::Id.eq(deposit_id))
        .filter(deposit::Column::OrgId.eq(org_id))
        .filter(deposit::Column::Status.eq(RequestStatus::Pending))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        let stale = Error::InvalidState {
            message: format!("cannot delete '{deposit_id}': already approved"),
        };
        return Err(unmatched_write_error(db, org_id, deposit_id, stale).await);
    }

    info!("Deleted deposit {}", deposit_id);
    Ok(())
}

/// What approving `deposit` would do to the ledger right now.
#[must_use]
pub fn projected_after_approval(deposit: &deposit::Model, levels: &StockLevels) -> Vec<Projection> {
    reconcile::project(&deposit.items.0, levels, Direction::Add)
}
