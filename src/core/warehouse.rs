//! Warehouse ledger - the per-organization SKU → on-hand quantity mapping.
//!
//! On-hand quantities are signed: a negative balance is a shortfall left behind
//! by approving a claim the stock could not cover, and feeds the auto-generated
//! shopping list. Quantity changes go through [`apply_delta`], which writes
//! conditionally on the entry's `version` so a concurrent writer is detected
//! instead of silently overwritten.

use crate::{
    core::catalog::{PartCatalog, PartRecord},
    entities::{WarehouseItem, warehouse_item},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, SqlErr, prelude::*, sea_query::Expr};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// SKU → on-hand quantity snapshot.
pub type StockLevels = BTreeMap<String, i64>;

/// One quantity change applied to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockChange {
    /// SKU that changed
    pub sku: String,
    /// On-hand quantity before the change (0 if the SKU was untracked)
    pub before: i64,
    /// On-hand quantity after the change
    pub after: i64,
}

/// Loads every entry of an organization's warehouse, keyed by SKU.
pub async fn load_warehouse<C>(
    db: &C,
    org_id: &str,
) -> Result<BTreeMap<String, warehouse_item::Model>>
where
    C: ConnectionTrait,
{
    let entries = WarehouseItem::find()
        .filter(warehouse_item::Column::OrgId.eq(org_id))
        .order_by_asc(warehouse_item::Column::Sku)
        .all(db)
        .await?;
    Ok(entries
        .into_iter()
        .map(|entry| (entry.sku.clone(), entry))
        .collect())
}

/// On-hand quantity for every tracked SKU.
pub async fn stock_levels<C>(db: &C, org_id: &str) -> Result<StockLevels>
where
    C: ConnectionTrait,
{
    Ok(load_warehouse(db, org_id)
        .await?
        .into_iter()
        .map(|(sku, entry)| (sku, entry.on_hand))
        .collect())
}

/// Finds a single warehouse entry.
pub async fn get_entry<C>(db: &C, org_id: &str, sku: &str) -> Result<Option<warehouse_item::Model>>
where
    C: ConnectionTrait,
{
    WarehouseItem::find_by_id((org_id.to_string(), sku.to_string()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// On-hand quantity of a SKU, or 0 if the SKU is not tracked.
pub async fn get_on_hand<C>(db: &C, org_id: &str, sku: &str) -> Result<i64>
where
    C: ConnectionTrait,
{
    Ok(get_entry(db, org_id, sku)
        .await?
        .map_or(0, |entry| entry.on_hand))
}

/// Starts tracking a SKU with an initial stock count.
///
/// Adding a SKU that is already tracked is rejected rather than merged, so an
/// existing count is never clobbered.
///
/// # Errors
/// - [`Error::InvalidQuantity`] if `quantity < 1`
/// - [`Error::UnknownSku`] if the SKU is not in the catalog
/// - [`Error::AlreadyTracked`] if the SKU is already in the warehouse
pub async fn add_item(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    sku: &str,
    quantity: i64,
) -> Result<warehouse_item::Model> {
    if quantity < 1 {
        return Err(Error::InvalidQuantity { quantity });
    }
    let part = catalog.get(sku).ok_or_else(|| Error::UnknownSku {
        sku: sku.to_string(),
    })?;

    if get_entry(db, org_id, sku).await?.is_some() {
        return Err(Error::AlreadyTracked {
            sku: sku.to_string(),
        });
    }

    let entry = new_entry(org_id, sku, &part.name, Some(part), quantity)
        .insert(db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => Error::AlreadyTracked {
                sku: sku.to_string(),
            },
            _ => Error::Database(e),
        })?;
    info!("Now tracking {} in {} with {} on hand", sku, org_id, quantity);
    Ok(entry)
}

/// Stops tracking a SKU. Only legal when its on-hand quantity is exactly zero.
///
/// # Errors
/// - [`Error::WarehouseItemNotFound`] if the SKU is not tracked
/// - [`Error::PreconditionFailed`] if the balance is positive or negative
/// - [`Error::Conflict`] if the balance changed while removing
pub async fn remove_item(db: &DatabaseConnection, org_id: &str, sku: &str) -> Result<()> {
    let entry = get_entry(db, org_id, sku)
        .await?
        .ok_or_else(|| Error::WarehouseItemNotFound {
            sku: sku.to_string(),
        })?;

    if entry.on_hand != 0 {
        return Err(Error::PreconditionFailed {
            sku: sku.to_string(),
            on_hand: entry.on_hand,
        });
    }

    let result = WarehouseItem::delete_many()
        .filter(warehouse_item::Column::OrgId.eq(org_id))
        .filter(warehouse_item::Column::Sku.eq(sku))
        .filter(warehouse_item::Column::Version.eq(entry.version))
        .filter(warehouse_item::Column::OnHand.eq(0))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::Conflict { attempts: 1 });
    }
    info!("Stopped tracking {} in {}", sku, org_id);
    Ok(())
}

/// Adds `delta` to a SKU's on-hand quantity, creating the entry first if the
/// SKU is untracked (treated as 0).
///
/// New entries take their descriptive columns from the catalog when the SKU is
/// listed there, otherwise from `fallback_name` with blank purchasing data.
///
/// The update is conditional on the entry's version; if another writer got
/// there first this returns [`Error::Conflict`] and the caller is expected to
/// roll back and retry the whole unit of work.
pub async fn apply_delta<C>(
    db: &C,
    org_id: &str,
    catalog: &PartCatalog,
    sku: &str,
    fallback_name: &str,
    delta: i64,
) -> Result<StockChange>
where
    C: ConnectionTrait,
{
    let Some(entry) = get_entry(db, org_id, sku).await? else {
        new_entry(org_id, sku, fallback_name, catalog.get(sku), delta)
            .insert(db)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => Error::Conflict { attempts: 1 },
                _ => Error::Database(e),
            })?;
        debug!("Created {} in {} at {}", sku, org_id, delta);
        return Ok(StockChange {
            sku: sku.to_string(),
            before: 0,
            after: delta,
        });
    };

    let after = entry
        .on_hand
        .checked_add(delta)
        .ok_or(Error::InvalidQuantity { quantity: delta })?;

    let result = WarehouseItem::update_many()
        .col_expr(
            warehouse_item::Column::OnHand,
            Expr::col(warehouse_item::Column::OnHand).add(delta),
        )
        .col_expr(
            warehouse_item::Column::Version,
            Expr::col(warehouse_item::Column::Version).add(1),
        )
        .filter(warehouse_item::Column::OrgId.eq(org_id))
        .filter(warehouse_item::Column::Sku.eq(sku))
        .filter(warehouse_item::Column::Version.eq(entry.version))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        debug!("Version check failed for {} in {}", sku, org_id);
        return Err(Error::Conflict { attempts: 1 });
    }

    Ok(StockChange {
        sku: sku.to_string(),
        before: entry.on_hand,
        after,
    })
}

fn new_entry(
    org_id: &str,
    sku: &str,
    fallback_name: &str,
    part: Option<&PartRecord>,
    on_hand: i64,
) -> warehouse_item::ActiveModel {
    let (name, unit_price, purchase_url, externally_in_stock, thumbnail_url, category) =
        part.map_or_else(
            || {
                (
                    fallback_name.to_string(),
                    String::new(),
                    String::new(),
                    false,
                    String::new(),
                    String::new(),
                )
            },
            |p| {
                (
                    p.name.clone(),
                    p.unit_price.clone(),
                    p.purchase_url.clone(),
                    p.externally_in_stock,
                    p.thumbnail_url.clone(),
                    p.category.clone(),
                )
            },
        );

    warehouse_item::ActiveModel {
        org_id: Set(org_id.to_string()),
        sku: Set(sku.to_string()),
        name: Set(name),
        unit_price: Set(unit_price),
        purchase_url: Set(purchase_url),
        externally_in_stock: Set(externally_in_stock),
        thumbnail_url: Set(thumbnail_url),
        category: Set(category),
        on_hand: Set(on_hand),
        version: Set(0),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_add_item_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let catalog = test_catalog();

        let result = add_item(&db, TEST_ORG, &catalog, "A", 0).await;
        assert!(matches!(result, Err(Error::InvalidQuantity { quantity: 0 })));

        let result = add_item(&db, TEST_ORG, &catalog, "NOPE", 3).await;
        assert!(matches!(result, Err(Error::UnknownSku { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_item_and_get() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();

        let entry = add_item(&db, TEST_ORG, &catalog, "A", 7).await?;
        assert_eq!(entry.on_hand, 7);
        assert_eq!(entry.name, "Part A");
        assert_eq!(entry.unit_price, "$2.50");
        assert_eq!(get_on_hand(&db, TEST_ORG, "A").await?, 7);
        assert_eq!(get_on_hand(&db, TEST_ORG, "B").await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_add_item_rejects_tracked_sku() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();

        add_item(&db, TEST_ORG, &catalog, "A", 3).await?;
        let result = add_item(&db, TEST_ORG, &catalog, "A", 10).await;
        assert!(matches!(result, Err(Error::AlreadyTracked { .. })));
        assert_eq!(get_on_hand(&db, TEST_ORG, "A").await?, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_item_requires_zero_balance() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();

        add_item(&db, TEST_ORG, &catalog, "A", 3).await?;
        let result = remove_item(&db, TEST_ORG, "A").await;
        assert!(matches!(
            result,
            Err(Error::PreconditionFailed { on_hand: 3, .. })
        ));

        apply_delta(&db, TEST_ORG, &catalog, "A", "Part A", -3).await?;
        remove_item(&db, TEST_ORG, "A").await?;
        assert!(get_entry(&db, TEST_ORG, "A").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_item_rejects_negative_balance() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();

        apply_delta(&db, TEST_ORG, &catalog, "B", "Part B", -2).await?;
        let result = remove_item(&db, TEST_ORG, "B").await;
        assert!(matches!(
            result,
            Err(Error::PreconditionFailed { on_hand: -2, .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_remove_untracked_item() -> Result<()> {
        let db = setup_test_db().await?;
        let result = remove_item(&db, TEST_ORG, "A").await;
        assert!(matches!(result, Err(Error::WarehouseItemNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_delta_creates_absent_entry() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();

        let change = apply_delta(&db, TEST_ORG, &catalog, "C", "Part C", -4).await?;
        assert_eq!(change.before, 0);
        assert_eq!(change.after, -4);

        let entry = get_entry(&db, TEST_ORG, "C").await?.unwrap();
        assert_eq!(entry.on_hand, -4);
        assert_eq!(entry.name, "Part C");
        assert_eq!(entry.version, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_delta_uncatalogued_sku_uses_fallback_name() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();

        apply_delta(&db, TEST_ORG, &catalog, "RETIRED-1", "Old Gear", 2).await?;
        let entry = get_entry(&db, TEST_ORG, "RETIRED-1").await?.unwrap();
        assert_eq!(entry.name, "Old Gear");
        assert_eq!(entry.unit_price, "");
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_delta_bumps_version() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();

        add_item(&db, TEST_ORG, &catalog, "A", 5).await?;
        apply_delta(&db, TEST_ORG, &catalog, "A", "Part A", -2).await?;
        let change = apply_delta(&db, TEST_ORG, &catalog, "A", "Part A", 10).await?;
        assert_eq!(change.before, 3);
        assert_eq!(change.after, 13);

        let entry = get_entry(&db, TEST_ORG, "A").await?.unwrap();
        assert_eq!(entry.on_hand, 13);
        assert_eq!(entry.version, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_delta_rejects_overflow() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();

        add_item(&db, TEST_ORG, &catalog, "A", 5).await?;
        let result = apply_delta(&db, TEST_ORG, &catalog, "A", "Part A", i64::MAX).await;
        assert!(matches!(result, Err(Error::InvalidQuantity { .. })));
        assert_eq!(get_on_hand(&db, TEST_ORG, "A").await?, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_delta_stale_version_conflicts() -> Result<()> {
        let read = warehouse_item::Model {
            org_id: TEST_ORG.to_string(),
            sku: "A".to_string(),
            name: "Part A".to_string(),
            unit_price: "$2.50".to_string(),
            purchase_url: String::new(),
            externally_in_stock: true,
            thumbnail_url: String::new(),
            category: String::new(),
            on_hand: 10,
            version: 4,
        };
        // Another writer bumps the version between the read and the update.
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([vec![read]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let result = apply_delta(&db, TEST_ORG, &test_catalog(), "A", "Part A", -3).await;
        assert!(matches!(result, Err(Error::Conflict { attempts: 1 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_stock_levels_scoped_by_organization() -> Result<()> {
        let db = setup_test_db().await?;
        let catalog = test_catalog();
        create_test_organization(&db, "other-org").await?;

        add_item(&db, TEST_ORG, &catalog, "A", 5).await?;
        add_item(&db, "other-org", &catalog, "A", 9).await?;
        add_item(&db, TEST_ORG, &catalog, "B", 1).await?;

        let levels = stock_levels(&db, TEST_ORG).await?;
        assert_eq!(levels.len(), 2);
        assert_eq!(levels["A"], 5);
        assert_eq!(levels["B"], 1);
        Ok(())
    }
}
