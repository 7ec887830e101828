//! Claim entity - a team's request to take parts out of the warehouse.
//!
//! `can_fulfill` is a snapshot taken when the claim was created or last edited.
//! It is informational and does not gate approval.

use super::common::{LineItems, RequestStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Claim database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "claims")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Owning organization
    pub org_id: String,
    /// Display name of the record
    pub name: String,
    /// Requesting team
    pub team_name: String,
    /// Date the claim was submitted
    pub submitted_date: Date,
    /// Approval state
    pub status: RequestStatus,
    /// Requested items
    pub items: LineItems,
    /// Whether current stock covered every item at the last edit
    pub can_fulfill: bool,
    /// Creation timestamp, used for newest-first ordering
    pub created_at: DateTimeUtc,
    /// Who submitted it
    pub created_by: String,
}

/// Defines relationships between Claim and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each claim belongs to one organization
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
