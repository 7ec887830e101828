//! Warehouse entry entity - one tracked SKU and its on-hand quantity.
//!
//! The catalog columns are copied from the part catalog when the SKU is first
//! tracked. `on_hand` may be negative (a shortfall). `version` is bumped on
//! every quantity change and is the optimistic-concurrency token.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Warehouse entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "warehouse_items")]
pub struct Model {
    /// Owning organization
    #[sea_orm(primary_key, auto_increment = false)]
    pub org_id: String,
    /// Part SKU
    #[sea_orm(primary_key, auto_increment = false)]
    pub sku: String,
    /// Part name
    pub name: String,
    /// Unit price string as published by the catalog
    pub unit_price: String,
    /// Vendor purchase URL
    pub purchase_url: String,
    /// Vendor stock flag
    pub externally_in_stock: bool,
    /// Thumbnail image URL
    pub thumbnail_url: String,
    /// Catalog category
    pub category: String,
    /// Current on-hand quantity; negative means shortfall
    pub on_hand: i64,
    /// Optimistic-concurrency token
    pub version: i64,
}

/// Defines relationships between a warehouse entry and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one organization
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrgId",
        to = "super::organization::Column::Id"
    )]
    Organization,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
