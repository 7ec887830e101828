//! Shopping lists - the derived required-parts list and user-authored lists.
//!
//! The required-parts list is rebuilt from the warehouse on every read: one item
//! per SKU with a negative balance, priced from the catalog. It has no stored
//! identity and cannot be edited or deleted. User lists are stored with the
//! purchasing data captured when they were built; totals are always computed
//! from the items.

use crate::{
    core::{
        catalog::{PartCatalog, PartRecord},
        deposit,
        reconcile::{self, RequestDraft},
        warehouse,
    },
    entities::{
        LineItem, ShoppingItems, ShoppingList, ShoppingListItem, deposit as deposit_entity,
        shopping_list, warehouse_item,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

/// Id of the auto-generated required-parts list.
pub const AUTO_LIST_ID: &str = "default";
const AUTO_LIST_NAME: &str = "Required Parts (Auto-generated)";
const AUTO_LIST_DESCRIPTION: &str = "Parts with negative stock that need to be ordered";
const UNKNOWN_PART: &str = "Unknown Part";
const ZERO_PRICE: &str = "$0.00";
/// Team name given to deposits created from a shopping list.
pub const PURCHASE_ORDER_TEAM: &str = "Purchase Order";

/// A shopping list as presented to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListView {
    /// List id ([`AUTO_LIST_ID`] for the required-parts list)
    pub id: String,
    /// List name
    pub name: String,
    /// Description
    pub description: String,
    /// Whether this is the auto-generated required-parts list
    pub is_default: bool,
    /// Items to buy
    pub items: Vec<ShoppingListItem>,
    /// Σ unit price × quantity
    pub total_cost: Decimal,
}

impl ShoppingListView {
    fn from_model(model: shopping_list::Model) -> Self {
        let items = model.items.0;
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            is_default: false,
            total_cost: total_cost(&items),
            items,
        }
    }
}

/// User input for a shopping list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingListDraft {
    /// List name
    pub name: String,
    /// Description
    pub description: String,
    /// Items; names are filled from the catalog when blank
    pub items: Vec<LineItem>,
    /// Author
    pub created_by: String,
}

/// Parses a catalog price string such as `"$1,299.99"`.
///
/// Currency symbols, thousands separators and whitespace are ignored and the
/// leading numeric part is used. Anything unparseable is zero.
#[must_use]
pub fn parse_price(price: &str) -> Decimal {
    let cleaned: String = price
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | ',' | '€' | '£' | '¥'))
        .collect();

    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in cleaned.char_indices() {
        match c {
            '0'..='9' => {}
            '-' | '+' if i == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }

    cleaned[..end].parse().unwrap_or(Decimal::ZERO)
}

/// Σ parsed unit price × quantity. Saturates at `Decimal::MAX` on overflow.
#[must_use]
pub fn total_cost(items: &[ShoppingListItem]) -> Decimal {
    let mut total = Decimal::ZERO;
    for item in items {
        let sum = parse_price(&item.unit_price)
            .checked_mul(Decimal::from(item.quantity))
            .and_then(|line| total.checked_add(line));
        match sum {
            Some(sum) => total = sum,
            None => {
                warn!("Total cost overflowed at {} x{}", item.sku, item.quantity);
                return Decimal::MAX;
            }
        }
    }
    total
}

fn shopping_item(sku: &str, name: &str, quantity: i64, part: &PartRecord) -> ShoppingListItem {
    ShoppingListItem {
        sku: sku.to_string(),
        name: if name.trim().is_empty() {
            part.name.clone()
        } else {
            name.to_string()
        },
        quantity,
        unit_price: part.unit_price.clone(),
        purchase_url: part.purchase_url.clone(),
        externally_in_stock: part.externally_in_stock,
    }
}

/// Builds the required-parts list, or `None` when nothing is short.
#[must_use]
pub fn derive_auto_list(
    warehouse: &BTreeMap<String, warehouse_item::Model>,
    catalog: &PartCatalog,
) -> Option<ShoppingListView> {
    let items: Vec<ShoppingListItem> = warehouse
        .values()
        .filter(|entry| entry.on_hand < 0)
        .map(|entry| {
            let quantity = entry.on_hand.abs();
            catalog.get(&entry.sku).map_or_else(
                || ShoppingListItem {
                    sku: entry.sku.clone(),
                    name: non_empty_or(&entry.name, UNKNOWN_PART),
                    quantity,
                    unit_price: non_empty_or(&entry.unit_price, ZERO_PRICE),
                    purchase_url: entry.purchase_url.clone(),
                    externally_in_stock: entry.externally_in_stock,
                },
                |part| shopping_item(&entry.sku, "", quantity, part),
            )
        })
        .collect();

    if items.is_empty() {
        return None;
    }

    Some(ShoppingListView {
        id: AUTO_LIST_ID.to_string(),
        name: AUTO_LIST_NAME.to_string(),
        description: AUTO_LIST_DESCRIPTION.to_string(),
        is_default: true,
        total_cost: total_cost(&items),
        items,
    })
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// Every list of an organization; the required-parts list first if present,
/// then user lists oldest first.
pub async fn list_shopping_lists(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
) -> Result<Vec<ShoppingListView>> {
    let warehouse = warehouse::load_warehouse(db, org_id).await?;
    let mut lists: Vec<ShoppingListView> = derive_auto_list(&warehouse, catalog).into_iter().collect();

    let stored = ShoppingList::find()
        .filter(shopping_list::Column::OrgId.eq(org_id))
        .order_by_asc(shopping_list::Column::CreatedAt)
        .all(db)
        .await?;
    lists.extend(stored.into_iter().map(ShoppingListView::from_model));
    Ok(lists)
}

/// A single list, including the required-parts list by [`AUTO_LIST_ID`].
pub async fn get_shopping_list(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    list_id: &str,
) -> Result<ShoppingListView> {
    if list_id == AUTO_LIST_ID {
        let warehouse = warehouse::load_warehouse(db, org_id).await?;
        return derive_auto_list(&warehouse, catalog).ok_or_else(|| Error::ShoppingListNotFound {
            id: list_id.to_string(),
        });
    }
    find_stored(db, org_id, list_id)
        .await
        .map(ShoppingListView::from_model)
}

async fn find_stored(
    db: &DatabaseConnection,
    org_id: &str,
    list_id: &str,
) -> Result<shopping_list::Model> {
    ShoppingList::find_by_id(list_id)
        .filter(shopping_list::Column::OrgId.eq(org_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::ShoppingListNotFound {
            id: list_id.to_string(),
        })
}

fn validate_list(draft: &ShoppingListDraft, catalog: &PartCatalog) -> Result<Vec<ShoppingListItem>> {
    if draft.name.trim().is_empty() {
        return Err(Error::validation("Shopping list name cannot be empty"));
    }
    let items = reconcile::validate_items(&draft.items, catalog)?;
    items
        .iter()
        .map(|item| {
            let part = catalog.get(&item.sku).ok_or_else(|| Error::UnknownSku {
                sku: item.sku.clone(),
            })?;
            Ok(shopping_item(&item.sku, &item.name, item.quantity, part))
        })
        .collect()
}

fn reject_auto_list(list_id: &str, action: &str) -> Result<()> {
    if list_id == AUTO_LIST_ID {
        return Err(Error::InvalidState {
            message: format!("cannot {action} the auto-generated required-parts list"),
        });
    }
    Ok(())
}

/// Creates a user list, capturing catalog prices for its items.
pub async fn create_shopping_list(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    draft: &ShoppingListDraft,
) -> Result<ShoppingListView> {
    let items = validate_list(draft, catalog)?;

    let model = shopping_list::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        org_id: Set(org_id.to_string()),
        name: Set(draft.name.trim().to_string()),
        description: Set(draft.description.trim().to_string()),
        items: Set(ShoppingItems(items)),
        created_at: Set(Utc::now()),
        created_by: Set(draft.created_by.clone()),
    }
    .insert(db)
    .await?;

    info!("Created shopping list {} ({})", model.id, model.name);
    Ok(ShoppingListView::from_model(model))
}

/// Replaces a user list's name, description and items.
pub async fn modify_shopping_list(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    list_id: &str,
    draft: &ShoppingListDraft,
) -> Result<ShoppingListView> {
    reject_auto_list(list_id, "modify")?;
    let existing = find_stored(db, org_id, list_id).await?;
    let items = validate_list(draft, catalog)?;

    let mut active: shopping_list::ActiveModel = existing.into();
    active.name = Set(draft.name.trim().to_string());
    active.description = Set(draft.description.trim().to_string());
    active.items = Set(ShoppingItems(items));
    let model = active.update(db).await?;

    info!("Modified shopping list {}", list_id);
    Ok(ShoppingListView::from_model(model))
}

/// Deletes a user list.
pub async fn delete_shopping_list(db: &DatabaseConnection, org_id: &str, list_id: &str) -> Result<()> {
    reject_auto_list(list_id, "delete")?;
    let result = ShoppingList::delete_many()
        .filter(shopping_list::Column::Id.eq(list_id))
        .filter(shopping_list::Column::OrgId.eq(org_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::ShoppingListNotFound {
            id: list_id.to_string(),
        });
    }
    info!("Deleted shopping list {}", list_id);
    Ok(())
}

/// Renders a list as `SKU,QTY` CSV.
pub fn export_csv(list: &ShoppingListView) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["SKU", "QTY"])?;
    for item in &list.items {
        writer.write_record([item.sku.as_str(), item.quantity.to_string().as_str()])?;
    }
    let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| Error::validation(e.to_string()))
}

/// File name for an exported list: whitespace runs become `_`.
#[must_use]
pub fn export_file_name(list_name: &str) -> String {
    format!("{}.csv", list_name.split_whitespace().collect::<Vec<_>>().join("_"))
}

/// Turns a list into a pending purchase-order deposit. The ledger is not
/// touched until that deposit is approved.
pub async fn create_deposit_from_list(
    db: &DatabaseConnection,
    org_id: &str,
    catalog: &PartCatalog,
    list_id: &str,
    created_by: &str,
) -> Result<deposit_entity::Model> {
    let list = get_shopping_list(db, org_id, catalog, list_id).await?;
    let draft = RequestDraft::new(
        PURCHASE_ORDER_TEAM,
        list.items.iter().map(ShoppingListItem::to_line_item).collect(),
    )
    .named(format!("{PURCHASE_ORDER_TEAM}: {}", list.name))
    .created_by(created_by);

    let deposit = deposit::create_deposit(db, org_id, catalog, &draft).await?;
    info!("Created deposit {} from shopping list {}", deposit.id, list_id);
    Ok(deposit)
}
