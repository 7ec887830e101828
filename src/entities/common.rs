//! Column types shared by several entities.
//!
//! Line items are stored as JSON arrays on the owning row. The `name`, price and
//! URL fields are copies taken from the part catalog when the item was entered;
//! they are not re-joined against the live catalog afterwards.

use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A requested or deposited quantity of one SKU.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Part SKU
    pub sku: String,
    /// Part name at the time the item was entered
    pub name: String,
    /// Strictly positive quantity
    pub quantity: i64,
}

impl LineItem {
    /// Builds a line item.
    #[must_use]
    pub fn new(sku: impl Into<String>, name: impl Into<String>, quantity: i64) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            quantity,
        }
    }
}

/// JSON column holding the line items of a claim or deposit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct LineItems(pub Vec<LineItem>);

/// A shopping list entry: a line item joined with catalog purchasing data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    /// Part SKU
    pub sku: String,
    /// Part name
    pub name: String,
    /// Quantity to buy
    pub quantity: i64,
    /// Unit price as published by the catalog (e.g. `"$1,299.99"`)
    pub unit_price: String,
    /// Where to buy it
    pub purchase_url: String,
    /// Whether the vendor reports it in stock
    pub externally_in_stock: bool,
}

impl ShoppingListItem {
    /// Drops the purchasing columns.
    #[must_use]
    pub fn to_line_item(&self) -> LineItem {
        LineItem::new(self.sku.clone(), self.name.clone(), self.quantity)
    }
}

/// JSON column holding the items of a user-authored shopping list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ShoppingItems(pub Vec<ShoppingListItem>);

/// Approval state of a claim or deposit.
///
/// Rejection is not a stored state: a rejected request is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Awaiting approval; may be edited or deleted
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Applied to the warehouse; terminal
    #[sea_orm(string_value = "approved")]
    Approved,
}

impl RequestStatus {
    /// `pending -> approved`. Any other transition is rejected.
    pub fn approve(self, id: &str) -> crate::errors::Result<Self> {
        match self {
            Self::Pending => Ok(Self::Approved),
            Self::Approved => Err(crate::errors::Error::AlreadyApproved { id: id.to_string() }),
        }
    }

    /// Edits and deletions are only legal while pending.
    pub fn ensure_pending(self, id: &str, action: &str) -> crate::errors::Result<()> {
        match self {
            Self::Pending => Ok(()),
            Self::Approved => Err(crate::errors::Error::InvalidState {
                message: format!("cannot {action} '{id}': already approved"),
            }),
        }
    }

    /// Display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }
}
