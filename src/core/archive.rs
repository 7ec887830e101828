//! Whole-organization archive as a single JSON document.
//!
//! An archive captures the warehouse, every claim and deposit, and the user
//! shopping lists. Importing one is only done when creating an organization;
//! records get fresh ids and approved records are restored as approved without
//! touching the ledger again, since the archived warehouse already reflects them.

use crate::{
    entities::{
        Claim, Deposit, LineItem, LineItems, RequestStatus, ShoppingItems, ShoppingList,
        ShoppingListItem, WarehouseItem, claim, deposit, shopping_list, warehouse_item,
    },
    errors::Result,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

/// Current archive format.
pub const ARCHIVE_VERSION: u32 = 1;

/// A warehouse entry without its organization key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedEntry {
    /// Part name
    pub name: String,
    /// Unit price string
    #[serde(default)]
    pub unit_price: String,
    /// Vendor purchase URL
    #[serde(default)]
    pub purchase_url: String,
    /// Vendor stock flag
    #[serde(default)]
    pub externally_in_stock: bool,
    /// Thumbnail image URL
    #[serde(default)]
    pub thumbnail_url: String,
    /// Category
    #[serde(default)]
    pub category: String,
    /// Signed on-hand quantity
    pub on_hand: i64,
}

/// A claim or deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedRequest {
    /// Display name
    pub name: String,
    /// Team
    pub team_name: String,
    /// Submission date
    pub submitted_date: NaiveDate,
    /// Approval state
    pub status: RequestStatus,
    /// Line items
    pub items: Vec<LineItem>,
    /// Claims only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_fulfill: Option<bool>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Submitting user
    #[serde(default)]
    pub created_by: String,
}

/// A user shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedList {
    /// List name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Items with captured purchasing data
    pub items: Vec<ShoppingListItem>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Author
    #[serde(default)]
    pub created_by: String,
}

/// Everything an organization owns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// SKU → entry
    #[serde(default)]
    pub warehouse: BTreeMap<String, ArchivedEntry>,
    /// Claims, oldest first
    #[serde(default)]
    pub claims: Vec<ArchivedRequest>,
    /// Deposits, oldest first
    #[serde(default)]
    pub deposits: Vec<ArchivedRequest>,
    /// User shopping lists
    #[serde(default)]
    pub shopping_lists: Vec<ArchivedList>,
}

const fn default_version() -> u32 {
    ARCHIVE_VERSION
}

impl Archive {
    /// Number of records of every kind.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.warehouse.len() + self.claims.len() + self.deposits.len() + self.shopping_lists.len()
    }
}

/// Snapshots an organization.
pub async fn export_archive(db: &DatabaseConnection, org_id: &str) -> Result<Archive> {
    let warehouse = WarehouseItem::find()
        .filter(warehouse_item::Column::OrgId.eq(org_id))
        .all(db)
        .await?
        .into_iter()
        .map(|e| {
            (
                e.sku,
                ArchivedEntry {
                    name: e.name,
                    unit_price: e.unit_price,
                    purchase_url: e.purchase_url,
                    externally_in_stock: e.externally_in_stock,
                    thumbnail_url: e.thumbnail_url,
                    category: e.category,
                    on_hand: e.on_hand,
                },
            )
        })
        .collect();

    let claims = Claim::find()
        .filter(claim::Column::OrgId.eq(org_id))
        .order_by_asc(claim::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(|c| ArchivedRequest {
            name: c.name,
            team_name: c.team_name,
            submitted_date: c.submitted_date,
            status: c.status,
            items: c.items.0,
            can_fulfill: Some(c.can_fulfill),
            created_at: c.created_at,
            created_by: c.created_by,
        })
        .collect();

    let deposits = Deposit::find()
        .filter(deposit::Column::OrgId.eq(org_id))
        .order_by_asc(deposit::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(|d| ArchivedRequest {
            name: d.name,
            team_name: d.team_name,
            submitted_date: d.submitted_date,
            status: d.status,
            items: d.items.0,
            can_fulfill: None,
            created_at: d.created_at,
            created_by: d.created_by,
        })
        .collect();

    let shopping_lists = ShoppingList::find()
        .filter(shopping_list::Column::OrgId.eq(org_id))
        .order_by_asc(shopping_list::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(|l| ArchivedList {
            name: l.name,
            description: l.description,
            items: l.items.0,
            created_at: l.created_at,
            created_by: l.created_by,
        })
        .collect();

    Ok(Archive {
        version: ARCHIVE_VERSION,
        warehouse,
        claims,
        deposits,
        shopping_lists,
    })
}

/// Pretty-printed JSON.
pub fn to_json(archive: &Archive) -> Result<String> {
    Ok(serde_json::to_string_pretty(archive)?)
}

/// Parses an archive document.
pub fn parse_archive(json: &str) -> Result<Archive> {
    Ok(serde_json::from_str(json)?)
}

/// Writes an archive's records under `org_id`. Call inside the transaction that
/// creates the organization.
pub async fn apply_archive<C>(db: &C, org_id: &str, archive: &Archive) -> Result<()>
where
    C: ConnectionTrait,
{
    for (sku, entry) in &archive.warehouse {
        warehouse_item::ActiveModel {
            org_id: Set(org_id.to_string()),
            sku: Set(sku.clone()),
            name: Set(entry.name.clone()),
            unit_price: Set(entry.unit_price.clone()),
            purchase_url: Set(entry.purchase_url.clone()),
            externally_in_stock: Set(entry.externally_in_stock),
            thumbnail_url: Set(entry.thumbnail_url.clone()),
            category: Set(entry.category.clone()),
            on_hand: Set(entry.on_hand),
            version: Set(0),
        }
        .insert(db)
        .await?;
    }

    for c in &archive.claims {
        claim::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            org_id: Set(org_id.to_string()),
            name: Set(c.name.clone()),
            team_name: Set(c.team_name.clone()),
            submitted_date: Set(c.submitted_date),
            status: Set(c.status),
            items: Set(LineItems(c.items.clone())),
            can_fulfill: Set(c.can_fulfill.unwrap_or(false)),
            created_at: Set(c.created_at),
            created_by: Set(c.created_by.clone()),
        }
        .insert(db)
        .await?;
    }

    for d in &archive.deposits {
        deposit::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            org_id: Set(org_id.to_string()),
            name: Set(d.name.clone()),
            team_name: Set(d.team_name.clone()),
            submitted_date: Set(d.submitted_date),
            status: Set(d.status),
            items: Set(LineItems(d.items.clone())),
            created_at: Set(d.created_at),
            created_by: Set(d.created_by.clone()),
        }
        .insert(db)
        .await?;
    }

    for l in &archive.shopping_lists {
        shopping_list::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            org_id: Set(org_id.to_string()),
            name: Set(l.name.clone()),
            description: Set(l.description.clone()),
            items: Set(ShoppingItems(l.items.clone())),
            created_at: Set(l.created_at),
            created_by: Set(l.created_by.clone()),
        }
        .insert(db)
        .await?;
    }

    info!(
        "Applied archive to {}: {} records",
        org_id,
        archive.record_count()
    );
    Ok(())
}
