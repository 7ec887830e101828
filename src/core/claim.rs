//! Claim workflow - requests to take parts out of the warehouse.
//!
//! A claim is created pending, may be edited or deleted while pending, and is
//! approved at most once. Approval deducts every line item from the ledger in a
//! single transaction; approving a claim the stock cannot cover is allowed and
//! leaves the affected SKUs negative.

use crate::{
    core::{
        catalog::PartCatalog,
        reconcile::{self, Approval, Direction, Projection, RequestDraft},
        warehouse::{self, StockLevels},
    },
    entities::{Claim, LineItems, RequestStatus, claim},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info};
use uuid::Uuid;

/// Creates a pending claim, recording whether current stock covers it.
///
/// # Errors
/// Validation errors from [`reconcile::validate_draft`]; nothing is written.
pub async fn create_claim(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    draft: &RequestDraft,
) -> Result<claim::Model> {
    let valid = reconcile::validate_draft(draft, catalog)?;
    let levels = warehouse::stock_levels(db, org_id).await?;
    let can_fulfill = reconcile::can_fulfill(&valid.items, &levels);
    let now = Utc::now();

    let claim = claim::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        org_id: Set(org_id.to_string()),
        name: Set(valid.name),
        team_name: Set(valid.team_name),
        submitted_date: Set(now.date_naive()),
        status: Set(RequestStatus::Pending),
        items: Set(LineItems(valid.items)),
        can_fulfill: Set(can_fulfill),
        created_at: Set(now),
        created_by: Set(draft.created_by.clone()),
    }
    .insert(db)
    .await?;

    info!(
        "Created claim {} for {} ({} items, can_fulfill={})",
        claim.id,
        claim.team_name,
        claim.items.0.len(),
        can_fulfill
    );
    Ok(claim)
}

/// Gets a claim by id.
pub async fn get_claim<C>(db: &C, org_id: &str, claim_id: &str) -> Result<claim::Model>
where
    C: ConnectionTrait,
{
    Claim::find_by_id(claim_id)
        .filter(claim::Column::OrgId.eq(org_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::ClaimNotFound {
            id: claim_id.to_string(),
        })
}

/// Error for a conditional write that matched no rows: `not_pending` if the
/// claim still exists, otherwise [`Error::ClaimNotFound`].
async fn unmatched_write_error<C>(
    db: &C,
    org_id: &str,
    claim_id: &str,
    not_pending: Error,
) -> Error
where
    C: ConnectionTrait,
{
    match get_claim(db, org_id, claim_id).await {
        Ok(_) => not_pending,
        Err(e) => e,
    }
}

/// All claims of an organization, newest first.
pub async fn list_claims(db: &DatabaseConnection, org_id: &str) -> Result<Vec<claim::Model>> {
    Claim::find()
        .filter(claim::Column::OrgId.eq(org_id))
        .order_by_desc(claim::Column::CreatedAt)
        .order_by_asc(claim::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Pending claims only, newest first.
pub async fn list_pending_claims(
    db: &DatabaseConnection,
    org_id: &str,
) -> Result<Vec<claim::Model>> {
    Claim::find()
        .filter(claim::Column::OrgId.eq(org_id))
        .filter(claim::Column::Status.eq(RequestStatus::Pending))
        .order_by_desc(claim::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Replaces a pending claim's team, name and items, and recomputes
/// `can_fulfill`.
///
/// # Errors
/// - [`Error::ClaimNotFound`] if the claim does not exist
/// - [`Error::InvalidState`] if it is already approved
/// - validation errors as for [`create_claim`]
pub async fn modify_claim(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    claim_id: &str,
    draft: &RequestDraft,
) -> Result<claim::Model> {
    let existing = get_claim(db, org_id, claim_id).await?;
    existing.status.ensure_pending(claim_id, "modify")?;

    let valid = reconcile::validate_draft(draft, catalog)?;
    let levels = warehouse::stock_levels(db, org_id).await?;
    let can_fulfill = reconcile::can_fulfill(&valid.items, &levels);

    // Only write while still pending; an approval may have landed in between.
    let result = Claim::update_many()
        .col_expr(claim::Column::Name, Expr::value(valid.name))
        .col_expr(claim::Column::TeamName, Expr::value(valid.team_name))
        .col_expr(claim::Column::Items, Expr::value(LineItems(valid.items)))
        .col_expr(claim::Column::CanFulfill, Expr::value(can_fulfill))
        .filter(claim::Column::Id.eq(claim_id))
        .filter(claim::Column::OrgId.eq(org_id))
        .filter(claim::Column::Status.eq(RequestStatus::Pending))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        let stale = Error::InvalidState {
            message: format!("cannot modify '{claim_id}': already approved"),
        };
        return Err(unmatched_write_error(db, org_id, claim_id, stale).await);
    }

    info!("Modified claim {}", claim_id);
    get_claim(db, org_id, claim_id).await
}

/// Approves a claim, deducting every item from the warehouse.
///
/// Version conflicts on the ledger roll back the attempt and retry, up to
/// `max_attempts` times.
///
/// # Errors
/// - [`Error::ClaimNotFound`] if the claim does not exist
/// - [`Error::AlreadyApproved`] if it was approved before (the ledger is untouched)
/// - [`Error::Conflict`] once the retry budget is spent
pub async fn approve_claim(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    claim_id: &str,
    max_attempts: u32,
) -> Result<Approval<claim::Model>> {
    let approval = reconcile::with_retry(max_attempts, || {
        approve_claim_once(db, org_id, catalog, claim_id)
    })
    .await?;
    info!(
        "Approved claim {} ({} ledger changes)",
        claim_id,
        approval.changes.len()
    );
    Ok(approval)
}

async fn approve_claim_once(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    claim_id: &str,
) -> Result<Approval<claim::Model>> {
    let txn = db.begin().await?;

    let mut claim = get_claim(&txn, org_id, claim_id).await?;
    let approved = claim.status.approve(claim_id)?;

    let changes =
        reconcile::apply_items(&txn, org_id, &claim.items.0, Direction::Remove, catalog).await?;

    let result = Claim::update_many()
        .col_expr(claim::Column::Status, Expr::value(approved))
        .filter(claim::Column::Id.eq(claim_id))
        .filter(claim::Column::OrgId.eq(org_id))
        .filter(claim::Column::Status.eq(RequestStatus::Pending))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        // Dropping the transaction rolls back the deltas above.
        let stale = Error::AlreadyApproved {
            id: claim_id.to_string(),
        };
        return Err(unmatched_write_error(&txn, org_id, claim_id, stale).await);
    }

    txn.commit().await?;
    debug!("Committed approval of claim {}", claim_id);

    claim.status = approved;
    Ok(Approval {
        record: claim,
        changes,
    })
}

/// Deletes a pending claim. Used for both rejection and withdrawal; there is
/// no ledger effect.
///
/// # Errors
/// - [`Error::ClaimNotFound`] if the claim does not exist
/// - [`Error::InvalidState`] if it is already approved
pub async fn delete_claim(db: &DatabaseConnection, org_id: &str, claim_id: &str) -> Result<()> {
    let claim = get_claim(db, org_id, claim_id).await?;
    claim.status.ensure_pending(claim_id, "delete")?;

    let result = Claim::delete_many()
        .filter(claim::Column::Id.eq(claim_id))
        .filter(claim::Column::OrgId.eq(org_id))
        .filter(claim::Column::Status.eq(RequestStatus::Pending))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        let stale = Error::InvalidState {
            message: format!("cannot delete '{claim_id}': already approved"),
        };
        return Err(unmatched_write_error(db, org_id, claim_id, stale).await);
    }

    info!("Deleted claim {}", claim_id);
    Ok(())
}

/// What approving `claim` would do to the ledger right now.
#[must_use]
pub fn projected_after_approval(claim: &claim::Model, levels: &StockLevels) -> Vec<Projection> {
    reconcile::project(&claim.items.0, levels, Direction::Remove)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::warehouse::{add_item, get_on_hand};
    use crate::entities::LineItem;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn draft(team: &str, items: &[(&str, i64)]) -> RequestDraft {
        RequestDraft::new(
            team,
            items
                .iter()
                .map(|(sku, qty)| LineItem::new(*sku, "", *qty))
                .collect(),
        )
        .created_by("tester")
    }

    #[tokio::test]
    async fn test_create_claim_validation_writes_nothing() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let catalog = test_catalog();

        let result = create_claim(&db, TEST_ORG, &catalog, &draft("", &[("A", 1)])).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_claim(&db, TEST_ORG, &catalog, &draft("T1", &[])).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_claim(&db, TEST_ORG, &catalog, &draft("T1", &[("A", 0)])).await;
        assert!(matches!(result, Err(Error::InvalidQuantity { .. })));

        let result = create_claim(&db, TEST_ORG, &catalog, &draft("T1", &[("NOPE", 1)])).await;
        assert!(matches!(result, Err(Error::UnknownSku { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_claim_snapshots_can_fulfill() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();
        add_item(&db, TEST_ORG, &catalog, "A", 5).await?;

        let short = create_claim(&db, TEST_ORG, &catalog, &draft("T1", &[("A", 6)])).await?;
        assert!(!short.can_fulfill);
        assert_eq!(short.status, RequestStatus::Pending);
        assert_eq!(short.name, "T1");
        assert_eq!(short.items.0[0].name, "Part A");
        assert_eq!(short.created_by, "tester");

        let exact = create_claim(&db, TEST_ORG, &catalog, &draft("T1", &[("A", 5)])).await?;
        assert!(exact.can_fulfill);
        Ok(())
    }

    #[tokio::test]
    async fn test_modify_claim_recomputes_can_fulfill() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();
        add_item(&db, TEST_ORG, &catalog, "A", 3).await?;

        let claim = create_claim(&db, TEST_ORG, &catalog, &draft("T1", &[("A", 5)])).await?;
        assert!(!claim.can_fulfill);

        let modified =
            modify_claim(&db, TEST_ORG, &catalog, &claim.id, &draft("T2", &[("A", 2)])).await?;
        assert!(modified.can_fulfill);
        assert_eq!(modified.team_name, "T2");
        assert_eq!(modified.items.0.len(), 1);
        assert_eq!(modified.items.0[0].quantity, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_claim_deducts_stock() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();
        add_item(&db, TEST_ORG, &catalog, "A", 10).await?;

        let claim =
            create_claim(&db, TEST_ORG, &catalog, &draft("T1", &[("A", 4), ("B", 2)])).await?;
        let approval = approve_claim(&db, TEST_ORG, &catalog, &claim.id, 3).await?;

        assert_eq!(approval.record.status, RequestStatus::Approved);
        assert_eq!(approval.changes.len(), 2);
        assert_eq!(get_on_hand(&db, TEST_ORG, "A").await?, 6);
        assert_eq!(get_on_hand(&db, TEST_ORG, "B").await?, -2);
        assert_eq!(
            get_claim(&db, TEST_ORG, &claim.id).await?.status,
            RequestStatus::Approved
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_claim_twice_changes_ledger_once() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();
        add_item(&db, TEST_ORG, &catalog, "A", 10).await?;

        let claim = create_claim(&db, TEST_ORG, &catalog, &draft("T1", &[("A", 4)])).await?;
        approve_claim(&db, TEST_ORG, &catalog, &claim.id, 3).await?;
        let second = approve_claim(&db, TEST_ORG, &catalog, &claim.id, 3).await;

        assert!(matches!(second, Err(Error::AlreadyApproved { .. })));
        assert_eq!(get_on_hand(&db, TEST_ORG, "A").await?, 6);
        Ok(())
    }

    #[tokio::test]
    async fn test_dropped_transaction_leaves_ledger_untouched() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();
        add_item(&db, TEST_ORG, &catalog, "A", 10).await?;

        let txn = db.begin().await?;
        let items = [LineItem::new("A", "Part A", 3), LineItem::new("B", "Part B", 2)];
        let changes =
            reconcile::apply_items(&txn, TEST_ORG, &items, Direction::Remove, &catalog).await?;
        assert_eq!(changes.len(), 2);
        assert_eq!(warehouse::get_on_hand(&txn, TEST_ORG, "A").await?, 7);
        drop(txn);

        assert_eq!(get_on_hand(&db, TEST_ORG, "A").await?, 10);
        assert!(warehouse::get_entry(&db, TEST_ORG, "B").await?.is_none());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_approvals_all_apply() -> Result<()> {
        let (db, path) = setup_file_test_db().await?;
        let catalog = test_catalog();
        add_item(&db, TEST_ORG, &catalog, "A", 100).await?;

        let mut ids = Vec::new();
        for n in 0..8 {
            let claim =
                create_claim(&db, TEST_ORG, &catalog, &draft(&format!("T{n}"), &[("A", 1)]))
                    .await?;
            ids.push(claim.id);
        }

        let db = std::sync::Arc::new(db);
        let handles: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let db = std::sync::Arc::clone(&db);
                let catalog = catalog.clone();
                tokio::spawn(async move { approve_claim(&db, TEST_ORG, &catalog, &id, 20).await })
            })
            .collect();
        for handle in handles {
            let approval = handle.await.unwrap()?;
            assert_eq!(approval.record.status, RequestStatus::Approved);
        }

        assert_eq!(get_on_hand(&*db, TEST_ORG, "A").await?, 92);
        assert!(list_pending_claims(&db, TEST_ORG).await?.is_empty());
        let db = std::sync::Arc::try_unwrap(db).expect("approval tasks finished");
        db.close().await?;
        std::fs::remove_file(&path)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_unmatched_write_reports_deleted_claim() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();

        let kept = create_claim(&db, TEST_ORG, &catalog, &draft("T1", &[("A", 1)])).await?;
        let gone = create_claim(&db, TEST_ORG, &catalog, &draft("T2", &[("A", 1)])).await?;
        delete_claim(&db, TEST_ORG, &gone.id).await?;

        let stale = || Error::AlreadyApproved {
            id: "stale".to_string(),
        };
        assert!(matches!(
            unmatched_write_error(&db, TEST_ORG, &gone.id, stale()).await,
            Error::ClaimNotFound { .. }
        ));
        assert!(matches!(
            unmatched_write_error(&db, TEST_ORG, &kept.id, stale()).await,
            Error::AlreadyApproved { .. }
        ));
        assert!(matches!(
            unmatched_write_error(&db, "other-org", &kept.id, stale()).await,
            Error::ClaimNotFound { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_approved_claim_is_frozen() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();

        let claim = create_claim(&db, TEST_ORG, &catalog, &draft("T1", &[("A", 1)])).await?;
        approve_claim(&db, TEST_ORG, &catalog, &claim.id, 3).await?;

        let modify = modify_claim(&db, TEST_ORG, &catalog, &claim.id, &draft("T1", &[("A", 2)])).await;
        assert!(matches!(modify, Err(Error::InvalidState { .. })));

        let delete = delete_claim(&db, TEST_ORG, &claim.id).await;
        assert!(matches!(delete, Err(Error::InvalidState { .. })));
        assert_eq!(get_on_hand(&db, TEST_ORG, "A").await?, -1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_pending_claim_has_no_ledger_effect() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();
        add_item(&db, TEST_ORG, &catalog, "A", 2).await?;

        let claim = create_claim(&db, TEST_ORG, &catalog, &draft("T1", &[("A", 2)])).await?;
        delete_claim(&db, TEST_ORG, &claim.id).await?;

        assert!(matches!(
            get_claim(&db, TEST_ORG, &claim.id).await,
            Err(Error::ClaimNotFound { .. })
        ));
        assert!(matches!(
            approve_claim(&db, TEST_ORG, &catalog, &claim.id, 3).await,
            Err(Error::ClaimNotFound { .. })
        ));
        assert_eq!(get_on_hand(&db, TEST_ORG, "A").await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_claims_are_scoped_by_organization() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();
        create_test_organization(&db, "other-org").await?;

        let claim = create_claim(&db, TEST_ORG, &catalog, &draft("T1", &[("A", 1)])).await?;
        assert!(matches!(
            get_claim(&db, "other-org", &claim.id).await,
            Err(Error::ClaimNotFound { .. })
        ));
        assert!(list_claims(&db, "other-org").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_claims_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();

        let first = create_claim(&db, TEST_ORG, &catalog, &draft("T1", &[("A", 1)])).await?;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = create_claim(&db, TEST_ORG, &catalog, &draft("T2", &[("B", 1)])).await?;
        approve_claim(&db, TEST_ORG, &catalog, &first.id, 3).await?;

        let claims = list_claims(&db, TEST_ORG).await?;
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].id, second.id);
        assert_eq!(claims[1].id, first.id);

        let pending = list_pending_claims(&db, TEST_ORG).await?;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_projected_after_approval() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();
        add_item(&db, TEST_ORG, &catalog, "X", 4).await?;

        let claim = create_claim(&db, TEST_ORG, &catalog, &draft("T1", &[("X", 10)])).await?;
        let levels = warehouse::stock_levels(&db, TEST_ORG).await?;
        let projection = projected_after_approval(&claim, &levels);

        assert_eq!(projection.len(), 1);
        assert_eq!(projection[0].current, 4);
        assert_eq!(projection[0].after, -6);
        Ok(())
    }
}
