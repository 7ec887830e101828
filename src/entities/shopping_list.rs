//! Shopping list entity - user-authored purchasing lists.
//!
//! The auto-generated required-parts list is never stored here; it is derived
//! from the warehouse on every read. Total cost is likewise computed on read.

use super::common::ShoppingItems;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shopping list database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shopping_lists")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owning organization
    pub org_id: String,
    /// List name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Items with the purchasing data captured at build time
    pub items: ShoppingItems,
    /// Creation timestamp
    pub created_at: DateTimeUtc,
    /// Author
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each list belongs to one organization
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
