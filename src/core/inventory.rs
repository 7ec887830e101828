//! Inventory service - the composition root for the core.
//!
//! [`Inventory`] owns the database handle, the catalog cache, the settings and
//! the warehouse-changed channel, and exposes every core operation with the
//! same error policy:
//! - every call is bounded by `request_timeout_secs` and fails with
//!   [`Error::Timeout`] rather than hanging; approvals keep running past the
//!   deadline so a committed change is never reported without its event;
//! - mutations fail loudly;
//! - list reads degrade to an empty result (logged) so callers stay usable.

use crate::{
    config::Settings,
    core::{
        archive,
        catalog::{CatalogCache, CatalogSource, JsonFileSource, PartCatalog, PartRecord},
        claim, dashboard,
        dashboard::DashboardSummary,
        deposit,
        events::{WarehouseChanged, WarehouseEvents},
        import::{self, CsvShape},
        organization,
        reconcile::{Approval, Projection, RequestDraft},
        shopping::{self, ShoppingListDraft, ShoppingListView},
        warehouse,
    },
    entities::{claim as claim_entity, deposit as deposit_entity, organization as org_entity, warehouse_item},
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

/// The inventory service used by the bot.
pub type AppInventory = Inventory<JsonFileSource>;

/// Core operations behind one handle.
pub struct Inventory<S> {
    db: Arc<DatabaseConnection>,
    catalog: CatalogCache<S>,
    settings: Arc<Settings>,
    events: WarehouseEvents,
}

impl<S: CatalogSource> Inventory<S> {
    /// Builds the service. Nothing is fetched until first use.
    pub fn new(db: DatabaseConnection, source: S, settings: Arc<Settings>) -> Self {
        Self {
            db: Arc::new(db),
            catalog: CatalogCache::new(source),
            settings,
            events: WarehouseEvents::new(),
        }
    }

    /// The configured organization id.
    #[must_use]
    pub fn default_org(&self) -> &str {
        &self.settings.organization.id
    }

    /// Settings in use.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Receives a [`WarehouseChanged`] for every ledger mutation.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WarehouseChanged> {
        self.events.subscribe()
    }

    async fn timed<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.settings.request_timeout(), operation)
            .await
            .map_err(|_| Error::Timeout {
                seconds: self.settings.request_timeout_secs,
            })?
    }

    /// Runs an approval on its own task so the request timeout never cancels it
    /// between commit and return. On timeout the caller gets [`Error::Timeout`]
    /// while the approval runs on; once it commits the change is still
    /// published.
    async fn approve_detached<M, F, Fut>(&self, org_id: &str, approve: F) -> Result<Approval<M>>
    where
        M: Send + 'static,
        F: FnOnce(Arc<DatabaseConnection>, Arc<PartCatalog>, u32) -> Fut,
        Fut: Future<Output = Result<Approval<M>>> + Send + 'static,
    {
        let catalog = self.catalog_for_write().await?;
        let approval = approve(Arc::clone(&self.db), catalog, self.settings.approval_retries);
        let events = self.events.clone();
        let org_id = org_id.to_string();

        let task = tokio::spawn(async move {
            let approval = approval.await?;
            events.publish(&org_id, approval.changed_skus());
            Ok(approval)
        });
        self.timed(async { task.await? }).await
    }

    async fn read_or_default<T, F>(&self, what: &str, operation: F) -> T
    where
        T: Default,
        F: Future<Output = Result<T>>,
    {
        match self.timed(operation).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to load {}: {}", what, e);
                T::default()
            }
        }
    }

    /// Creates the configured organization if needed and, only when it was
    /// just created, applies the `[[seed]]` entries.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> Result<()> {
        let org = &self.settings.organization;
        let (_, created) = self
            .timed(organization::ensure_organization(&*self.db, &org.id, &org.name))
            .await?;
        if !created || self.settings.seed.is_empty() {
            return Ok(());
        }

        let catalog = self.catalog_for_write().await?;
        for entry in &self.settings.seed {
            if let Err(e) = self
                .timed(warehouse::add_item(&*self.db, &org.id, &catalog, &entry.sku, entry.quantity))
                .await
            {
                warn!("Skipping seed entry {}: {}", entry.sku, e);
            }
        }
        info!("Seeded {} warehouse entries", self.settings.seed.len());
        Ok(())
    }

    // --- Catalog ---

    /// The part catalog, or an empty one if it cannot be loaded.
    pub async fn catalog(&self) -> Arc<PartCatalog> {
        self.read_or_default("part catalog", self.catalog.get_or_fetch())
            .await
    }

    async fn catalog_for_write(&self) -> Result<Arc<PartCatalog>> {
        self.timed(self.catalog.get_or_fetch()).await
    }

    /// Drops the cached catalog and fetches it again. Returns the part count.
    #[instrument(skip(self))]
    pub async fn refresh_catalog(&self) -> Result<usize> {
        self.catalog.invalidate().await;
        Ok(self.catalog_for_write().await?.len())
    }

    /// Parts whose SKU or name contains `term`.
    pub async fn search_parts(&self, term: &str, limit: usize) -> Vec<(String, PartRecord)> {
        self.catalog()
            .await
            .search(term, limit)
            .into_iter()
            .map(|(sku, part)| (sku.to_string(), part.clone()))
            .collect()
    }

    // --- Warehouse ---

    /// Every warehouse entry keyed by SKU.
    pub async fn warehouse(&self, org_id: &str) -> BTreeMap<String, warehouse_item::Model> {
        self.read_or_default("warehouse", warehouse::load_warehouse(&*self.db, org_id))
            .await
    }

    /// Starts tracking a SKU.
    #[instrument(skip(self))]
    pub async fn add_warehouse_item(
        &self,
        org_id: &str,
        sku: &str,
        quantity: i64,
    ) -> Result<warehouse_item::Model> {
        let catalog = self.catalog_for_write().await?;
        let entry = self
            .timed(warehouse::add_item(&*self.db, org_id, &catalog, sku, quantity))
            .await?;
        self.events.publish(org_id, vec![sku.to_string()]);
        Ok(entry)
    }

    /// Stops tracking a SKU with a zero balance.
    #[instrument(skip(self))]
    pub async fn remove_warehouse_item(&self, org_id: &str, sku: &str) -> Result<()> {
        self.timed(warehouse::remove_item(&*self.db, org_id, sku))
            .await?;
        self.events.publish(org_id, vec![sku.to_string()]);
        Ok(())
    }

    // --- Claims ---

    /// Claims, newest first.
    pub async fn claims(&self, org_id: &str) -> Vec<claim_entity::Model> {
        self.read_or_default("claims", claim::list_claims(&*self.db, org_id))
            .await
    }

    /// Pending claims, newest first.
    pub async fn pending_claims(&self, org_id: &str) -> Vec<claim_entity::Model> {
        self.read_or_default("pending claims", claim::list_pending_claims(&*self.db, org_id))
            .await
    }

    /// One claim.
    pub async fn get_claim(&self, org_id: &str, claim_id: &str) -> Result<claim_entity::Model> {
        self.timed(claim::get_claim(&*self.db, org_id, claim_id))
            .await
    }

    /// Creates a pending claim.
    #[instrument(skip(self, draft))]
    pub async fn create_claim(&self, org_id: &str, draft: &RequestDraft) -> Result<claim_entity::Model> {
        let catalog = self.catalog_for_write().await?;
        self.timed(claim::create_claim(&*self.db, org_id, &catalog, draft))
            .await
    }

    /// Edits a pending claim.
    #[instrument(skip(self, draft))]
    pub async fn modify_claim(
        &self,
        org_id: &str,
        claim_id: &str,
        draft: &RequestDraft,
    ) -> Result<claim_entity::Model> {
        let catalog = self.catalog_for_write().await?;
        self.timed(claim::modify_claim(&*self.db, org_id, &catalog, claim_id, draft))
            .await
    }

    /// Approves a claim and announces the ledger change. A timeout does not
    /// abort the approval; it finishes and publishes in the background.
    #[instrument(skip(self))]
    pub async fn approve_claim(
        &self,
        org_id: &str,
        claim_id: &str,
    ) -> Result<Approval<claim_entity::Model>> {
        let (org, id) = (org_id.to_string(), claim_id.to_string());
        self.approve_detached(org_id, move |db, catalog, retries| async move {
            claim::approve_claim(&db, &org, &catalog, &id, retries).await
        })
        .await
    }

    /// Rejects (deletes) a pending claim.
    #[instrument(skip(self))]
    pub async fn delete_claim(&self, org_id: &str, claim_id: &str) -> Result<()> {
        self.timed(claim::delete_claim(&*self.db, org_id, claim_id))
            .await
    }

    /// Per-item effect of approving a claim now.
    pub async fn claim_projection(&self, org_id: &str, claim_id: &str) -> Result<Vec<Projection>> {
        let claim = self.get_claim(org_id, claim_id).await?;
        let levels = self
            .timed(warehouse::stock_levels(&*self.db, org_id))
            .await?;
        Ok(claim::projected_after_approval(&claim, &levels))
    }

    // --- Deposits ---

    /// Deposits, newest first.
    pub async fn deposits(&self, org_id: &str) -> Vec<deposit_entity::Model> {
        self.read_or_default("deposits", deposit::list_deposits(&*self.db, org_id))
            .await
    }

    /// Pending deposits, newest first.
    pub async fn pending_deposits(&self, org_id: &str) -> Vec<deposit_entity::Model> {
        self.read_or_default(
            "pending deposits",
            deposit::list_pending_deposits(&*self.db, org_id),
        )
        .await
    }

    /// One deposit.
    pub async fn get_deposit(
        &self,
        org_id: &str,
        deposit_id: &str,
    ) -> Result<deposit_entity::Model> {
        self.timed(deposit::get_deposit(&*self.db, org_id, deposit_id))
            .await
    }

    /// Creates a pending deposit.
    #[instrument(skip(self, draft))]
    pub async fn create_deposit(
        &self,
        org_id: &str,
        draft: &RequestDraft,
    ) -> Result<deposit_entity::Model> {
        let catalog = self.catalog_for_write().await?;
        self.timed(deposit::create_deposit(&*self.db, org_id, &catalog, draft))
            .await
    }

    /// Edits a pending deposit.
    #[instrument(skip(self, draft))]
    pub async fn modify_deposit(
        &self,
        org_id: &str,
        deposit_id: &str,
        draft: &RequestDraft,
    ) -> Result<deposit_entity::Model> {
        let catalog = self.catalog_for_write().await?;
        self.timed(deposit::modify_deposit(&*self.db, org_id, &catalog, deposit_id, draft))
            .await
    }

    /// Approves a deposit and announces the ledger change. A timeout does not
    /// abort the approval; it finishes and publishes in the background.
    #[instrument(skip(self))]
    pub async fn approve_deposit(
        &self,
        org_id: &str,
        deposit_id: &str,
    ) -> Result<Approval<deposit_entity::Model>> {
        let (org, id) = (org_id.to_string(), deposit_id.to_string());
        self.approve_detached(org_id, move |db, catalog, retries| async move {
            deposit::approve_deposit(&db, &org, &catalog, &id, retries).await
        })
        .await
    }

    /// Rejects (deletes) a pending deposit.
    #[instrument(skip(self))]
    pub async fn delete_deposit(&self, org_id: &str, deposit_id: &str) -> Result<()> {
        self.timed(deposit::delete_deposit(&*self.db, org_id, deposit_id))
            .await
    }

    /// Per-item effect of approving a deposit now.
    pub async fn deposit_projection(
        &self,
        org_id: &str,
        deposit_id: &str,
    ) -> Result<Vec<Projection>> {
        let deposit = self.get_deposit(org_id, deposit_id).await?;
        let levels = self
            .timed(warehouse::stock_levels(&*self.db, org_id))
            .await?;
        Ok(deposit::projected_after_approval(&deposit, &levels))
    }

    // --- Shopping lists ---

    /// Every shopping list; the required-parts list first when present.
    pub async fn shopping_lists(&self, org_id: &str) -> Vec<ShoppingListView> {
        let catalog = self.catalog().await;
        self.read_or_default(
            "shopping lists",
            shopping::list_shopping_lists(&*self.db, org_id, &catalog),
        )
        .await
    }

    /// One shopping list.
    pub async fn get_shopping_list(&self, org_id: &str, list_id: &str) -> Result<ShoppingListView> {
        let catalog = self.catalog().await;
        self.timed(shopping::get_shopping_list(&*self.db, org_id, &catalog, list_id))
            .await
    }

    /// Creates a user list.
    #[instrument(skip(self, draft))]
    pub async fn create_shopping_list(
        &self,
        org_id: &str,
        draft: &ShoppingListDraft,
    ) -> Result<ShoppingListView> {
        let catalog = self.catalog_for_write().await?;
        self.timed(shopping::create_shopping_list(&*self.db, org_id, &catalog, draft))
            .await
    }

    /// Edits a user list.
    #[instrument(skip(self, draft))]
    pub async fn modify_shopping_list(
        &self,
        org_id: &str,
        list_id: &str,
        draft: &ShoppingListDraft,
    ) -> Result<ShoppingListView> {
        let catalog = self.catalog_for_write().await?;
        self.timed(shopping::modify_shopping_list(
            &*self.db, org_id, &catalog, list_id, draft,
        ))
        .await
    }

    /// Deletes a user list.
    #[instrument(skip(self))]
    pub async fn delete_shopping_list(&self, org_id: &str, list_id: &str) -> Result<()> {
        self.timed(shopping::delete_shopping_list(&*self.db, org_id, list_id))
            .await
    }

    /// `(file name, CSV text)` for a list.
    pub async fn export_shopping_list(&self, org_id: &str, list_id: &str) -> Result<(String, String)> {
        let list = self.get_shopping_list(org_id, list_id).await?;
        Ok((shopping::export_file_name(&list.name), shopping::export_csv(&list)?))
    }

    /// Turns a list into a pending purchase-order deposit.
    #[instrument(skip(self))]
    pub async fn deposit_from_shopping_list(
        &self,
        org_id: &str,
        list_id: &str,
        created_by: &str,
    ) -> Result<deposit_entity::Model> {
        let catalog = self.catalog_for_write().await?;
        self.timed(shopping::create_deposit_from_list(
            &*self.db, org_id, &catalog, list_id, created_by,
        ))
        .await
    }

    // --- Imports ---

    /// Imports a claim from CSV.
    #[instrument(skip(self, csv))]
    pub async fn import_claim(
        &self,
        org_id: &str,
        csv: &str,
        shape: CsvShape,
        created_by: &str,
    ) -> Result<Option<claim_entity::Model>> {
        let catalog = self.catalog_for_write().await?;
        self.timed(import::import_claim(&*self.db, org_id, &catalog, csv, shape, created_by))
            .await
    }

    /// Imports a deposit from CSV.
    #[instrument(skip(self, csv))]
    pub async fn import_deposit(
        &self,
        org_id: &str,
        csv: &str,
        shape: CsvShape,
        created_by: &str,
    ) -> Result<Option<deposit_entity::Model>> {
        let catalog = self.catalog_for_write().await?;
        self.timed(import::import_deposit(&*self.db, org_id, &catalog, csv, shape, created_by))
            .await
    }

    /// Imports a shopping list from CSV.
    #[instrument(skip(self, csv))]
    pub async fn import_shopping_list(
        &self,
        org_id: &str,
        csv: &str,
        shape: CsvShape,
        created_by: &str,
    ) -> Result<Option<ShoppingListView>> {
        let catalog = self.catalog_for_write().await?;
        self.timed(import::import_shopping_list(
            &*self.db, org_id, &catalog, csv, shape, created_by,
        ))
        .await
    }

    // --- Organizations and archives ---

    /// Whole-organization archive as pretty JSON.
    #[instrument(skip(self))]
    pub async fn export_archive(&self, org_id: &str) -> Result<String> {
        let archive = self
            .timed(archive::export_archive(&*self.db, org_id))
            .await?;
        archive::to_json(&archive)
    }

    /// Creates an organization, optionally from an archive document.
    #[instrument(skip(self, preset_json))]
    pub async fn create_organization(
        &self,
        name: &str,
        preset_json: Option<&str>,
    ) -> Result<org_entity::Model> {
        let preset = preset_json.map(archive::parse_archive).transpose()?;
        self.timed(organization::create_organization(&*self.db, name, preset.as_ref()))
            .await
    }

    /// Whether an organization exists.
    pub async fn organization_exists(&self, org_id: &str) -> Result<bool> {
        self.timed(organization::organization_exists(&*self.db, org_id))
            .await
    }

    /// Dashboard summary, or an empty one if it cannot be loaded.
    pub async fn dashboard(&self, org_id: &str) -> DashboardSummary {
        self.read_or_default(
            "dashboard",
            dashboard::generate_dashboard(&*self.db, org_id, None),
        )
        .await
    }
}
