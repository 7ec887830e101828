//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod claim;
pub mod common;
pub mod deposit;
pub mod organization;
pub mod shopping_list;
pub mod warehouse_item;

// Re-export specific types to avoid conflicts
pub use claim::{Column as ClaimColumn, Entity as Claim, Model as ClaimModel};
pub use common::{LineItem, LineItems, RequestStatus, ShoppingItems, ShoppingListItem};
pub use deposit::{Column as DepositColumn, Entity as Deposit, Model as DepositModel};
pub use organization::{
    Column as OrganizationColumn, Entity as Organization, Model as OrganizationModel,
};
pub use shopping_list::{
    Column as ShoppingListColumn, Entity as ShoppingList, Model as ShoppingListModel,
};
pub use warehouse_item::{
    Column as WarehouseItemColumn, Entity as WarehouseItem, Model as WarehouseItemModel,
};
