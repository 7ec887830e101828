//! Deposit entity - parts being returned or added to the warehouse.

use super::common::{LineItems, RequestStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Deposit database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deposits")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owning organization
    pub org_id: String,
    /// Display name of the record
    pub name: String,
    /// Depositing team
    pub team_name: String,
    /// Date the deposit was submitted
    pub submitted_date: Date,
    /// Approval state
    pub status: RequestStatus,
    /// Deposited items
    pub items: LineItems,
    /// Creation timestamp
    pub created_at: DateTimeUtc,
    /// Who submitted it
    pub created_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each deposit belongs to one organization
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
