//! Shared test utilities for Stockroom.
//!
//! This module provides common helper functions for setting up test databases
//! and a small part catalog with sensible defaults.

use crate::{
    core::catalog::{PartCatalog, PartRecord},
    entities::organization,
    errors::Result,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::path::PathBuf;
use uuid::Uuid;

/// Organization created by [`setup_test_db`].
pub const TEST_ORG: &str = "test-org";

/// Creates an in-memory `SQLite` database with all tables initialized and the
/// [`TEST_ORG`] organization inserted.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    create_test_organization(&db, TEST_ORG).await?;
    Ok(db)
}

/// Like [`setup_test_db`], but backed by a fresh file in the temp directory so
/// several pooled connections see the same data. The caller removes the file.
pub async fn setup_file_test_db() -> Result<(DatabaseConnection, PathBuf)> {
    let path = std::env::temp_dir().join(format!("stockroom-test-{}.db", Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let db = sea_orm::Database::connect(url).await?;
    crate::config::database::create_tables(&db).await?;
    create_test_organization(&db, TEST_ORG).await?;
    Ok((db, path))
}

/// Inserts an organization row directly.
pub async fn create_test_organization(
    db: &DatabaseConnection,
    id: &str,
) -> Result<organization::Model> {
    organization::ActiveModel {
        id: Set(id.to_string()),
        name: Set(format!("Organization {id}")),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// A part with the given name and price and otherwise blank attributes.
#[must_use]
pub fn part(name: &str, price: &str) -> PartRecord {
    PartRecord {
        name: name.to_string(),
        unit_price: price.to_string(),
        purchase_url: format!("https://parts.example/{}", name.replace(' ', "-")),
        externally_in_stock: true,
        thumbnail_url: String::new(),
        category: "Structure".to_string(),
    }
}

/// Catalog used across tests.
///
/// | SKU | Name   | Price  |
/// |-----|--------|--------|
/// | A   | Part A | $2.50  |
/// | B   | Part B | $10.00 |
/// | C   | Part C | $1.00  |
/// | X   | Part X | $4.00  |
#[must_use]
pub fn test_catalog() -> PartCatalog {
    [
        ("A", part("Part A", "$2.50")),
        ("B", part("Part B", "$10.00")),
        ("C", part("Part C", "$1.00")),
        ("X", part("Part X", "$4.00")),
    ]
    .into_iter()
    .map(|(sku, part)| (sku.to_string(), part))
    .collect()
}
