//! Organization management.

use crate::{
    core::archive::{self, Archive},
    entities::{Organization, organization},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

/// Creates an organization with a generated id, optionally pre-populated
/// from an archive. Both happen in one transaction.
pub async fn create_organization(
    db: &DatabaseConnection,
    name: &str,
    preset: Option<&Archive>,
) -> Result<organization::Model> {
    create_organization_with_id(db, &Uuid::new_v4().to_string(), name, preset).await
}

/// Like [`create_organization`] with a caller-chosen id.
pub async fn create_organization_with_id(
    db: &DatabaseConnection,
    id: &str,
    name: &str,
    preset: Option<&Archive>,
) -> Result<organization::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Organization name cannot be empty"));
    }
    if id.trim().is_empty() {
        return Err(Error::validation("Organization id cannot be empty"));
    }

    let txn = db.begin().await?;
    let org = organization::ActiveModel {
        id: Set(id.to_string()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(&txn)
    .await?;

    if let Some(preset) = preset {
        archive::apply_archive(&txn, id, preset).await?;
    }
    txn.commit().await?;

    info!(
        "Created organization {} ({}){}",
        org.name,
        org.id,
        if preset.is_some() { " from archive" } else { "" }
    );
    Ok(org)
}

/// Whether an organization with this id exists.
pub async fn organization_exists(db: &DatabaseConnection, id: &str) -> Result<bool> {
    Ok(Organization::find_by_id(id).one(db).await?.is_some())
}

/// Gets an organization by id.
pub async fn get_organization(db: &DatabaseConnection, id: &str) -> Result<organization::Model> {
    Organization::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::OrganizationNotFound { id: id.to_string() })
}

/// Returns the organization, creating it first if it does not exist yet.
pub async fn ensure_organization(
    db: &DatabaseConnection,
    id: &str,
    name: &str,
) -> Result<(organization::Model, bool)> {
    if let Some(org) = Organization::find_by_id(id).one(db).await? {
        return Ok((org, false));
    }
    let org = create_organization_with_id(db, id, name, None).await?;
    Ok((org, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::archive::parse_archive;
    use crate::core::warehouse::get_on_hand;
    use crate::test_utils::setup_test_db;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_requires_name() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = create_organization(&db, "   ", None).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn test_create_and_lookup() -> Result<()> {
        let db = setup_test_db().await?;
        let org = create_organization(&db, " Robotics Club ", None).await?;

        assert_eq!(org.name, "Robotics Club");
        assert!(organization_exists(&db, &org.id).await?);
        assert!(!organization_exists(&db, "missing").await?);
        assert!(matches!(
            get_organization(&db, "missing").await,
            Err(Error::OrganizationNotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_from_preset() -> Result<()> {
        let db = setup_test_db().await?;
        let preset = parse_archive(
            r#"{"warehouse": {"A": {"name": "Part A", "on_hand": 4}, "B": {"name": "Part B", "on_hand": -1}}}"#,
        )?;

        let org = create_organization(&db, "Team 2", Some(&preset)).await?;
        assert_eq!(get_on_hand(&db, &org.id, "A").await?, 4);
        assert_eq!(get_on_hand(&db, &org.id, "B").await?, -1);
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_organization_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, created) = ensure_organization(&db, "club", "Club").await?;
        assert!(created);
        let (org, created) = ensure_organization(&db, "club", "Renamed").await?;
        assert!(!created);
        assert_eq!(org.name, "Club");
        Ok(())
    }
}
