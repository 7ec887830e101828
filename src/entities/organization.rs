//! Organization entity - the tenant that owns a warehouse and its requests.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Organization database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    /// Organization id (slug or uuid)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name
    pub name: String,
    /// When the organization was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Organization and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One organization tracks many warehouse entries
    #[sea_orm(has_many = "super::warehouse_item::Entity")]
    WarehouseItems,
    /// One organization has many claims
    #[sea_orm(has_many = "super::claim::Entity")]
    Claims,
    /// One organization has many deposits
    #[sea_orm(has_many = "super::deposit::Entity")]
    Deposits,
    /// One organization has many shopping lists
    #[sea_orm(has_many = "super::shopping_list::Entity")]
    ShoppingLists,
}

impl Related<super::warehouse_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WarehouseItems.def()
    }
}

impl Related<super::claim::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Claims.def()
    }
}

impl Related<super::deposit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deposits.def()
    }
}

impl Related<super::shopping_list::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShoppingLists.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
