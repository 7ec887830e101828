//! Part catalog - read-only reference data keyed by SKU.
//!
//! The catalog is fetched from a [`CatalogSource`] and held by a [`CatalogCache`]
//! owned by whoever composes the system. Concurrent callers of
//! [`CatalogCache::get_or_fetch`] share a single fetch; a failed fetch is not
//! cached, so the next call tries again.

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Descriptive attributes of one part, as published by the catalog feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRecord {
    /// Part name
    pub name: String,
    /// Unit price string, e.g. `"$12.99"`
    #[serde(rename = "price", default)]
    pub unit_price: String,
    /// Vendor purchase URL
    #[serde(rename = "url", default)]
    pub purchase_url: String,
    /// Vendor stock flag
    #[serde(rename = "stock", default)]
    pub externally_in_stock: bool,
    /// Thumbnail image URL
    #[serde(rename = "thumbnail", default)]
    pub thumbnail_url: String,
    /// Category
    #[serde(rename = "type", default)]
    pub category: String,
}

/// SKU → [`PartRecord`] mapping.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartCatalog {
    parts: BTreeMap<String, PartRecord>,
}

impl PartCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a part.
    pub fn insert(&mut self, sku: impl Into<String>, part: PartRecord) {
        self.parts.insert(sku.into(), part);
    }

    /// Looks up a SKU.
    #[must_use]
    pub fn get(&self, sku: &str) -> Option<&PartRecord> {
        self.parts.get(sku)
    }

    /// Whether the SKU exists in the catalog.
    #[must_use]
    pub fn contains(&self, sku: &str) -> bool {
        self.parts.contains_key(sku)
    }

    /// Number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the catalog has no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Iterates parts in SKU order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PartRecord)> {
        self.parts.iter()
    }

    /// Case-insensitive substring search over SKU and name, capped at `limit`.
    /// An empty term matches nothing.
    #[must_use]
    pub fn search(&self, term: &str, limit: usize) -> Vec<(&str, &PartRecord)> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }
        self.parts
            .iter()
            .filter(|(sku, part)| {
                sku.to_lowercase().contains(&term) || part.name.to_lowercase().contains(&term)
            })
            .map(|(sku, part)| (sku.as_str(), part))
            .take(limit)
            .collect()
    }
}

impl FromIterator<(String, PartRecord)> for PartCatalog {
    fn from_iter<I: IntoIterator<Item = (String, PartRecord)>>(iter: I) -> Self {
        Self {
            parts: iter.into_iter().collect(),
        }
    }
}

/// Somewhere a catalog can be fetched from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetches the full catalog.
    async fn fetch(&self) -> Result<PartCatalog>;
}

/// Reads a `{ "<sku>": { "name": ..., "price": ..., ... } }` JSON document from disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Source backed by the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for JsonFileSource {
    async fn fetch(&self) -> Result<PartCatalog> {
        debug!("Reading part catalog from {:?}", self.path);
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let catalog: PartCatalog = serde_json::from_str(&contents)?;
        info!("Loaded {} parts from {:?}", catalog.len(), self.path);
        Ok(catalog)
    }
}

/// A catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    catalog: PartCatalog,
}

impl StaticSource {
    /// Source that always returns `catalog`.
    #[must_use]
    pub const fn new(catalog: PartCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl CatalogSource for StaticSource {
    async fn fetch(&self) -> Result<PartCatalog> {
        Ok(self.catalog.clone())
    }
}

/// Get-or-fetch cache in front of a [`CatalogSource`].
pub struct CatalogCache<S> {
    source: S,
    cached: Mutex<Option<Arc<PartCatalog>>>,
}

impl<S: CatalogSource> CatalogCache<S> {
    /// Empty cache over `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
        }
    }

    /// Returns the cached catalog, fetching it first if needed.
    ///
    /// The lock is held across the fetch so concurrent callers wait for the
    /// in-flight fetch instead of starting their own.
    pub async fn get_or_fetch(&self) -> Result<Arc<PartCatalog>> {
        let mut cached = self.cached.lock().await;
        if let Some(catalog) = cached.as_ref() {
            return Ok(Arc::clone(catalog));
        }
        let catalog = Arc::new(self.source.fetch().await?);
        *cached = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Drops the cached catalog; the next read fetches again.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
        info!("Part catalog cache invalidated");
    }

    /// Whether a catalog is currently cached.
    pub async fn is_cached(&self) -> bool {
        self.cached.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::Error;
    use crate::test_utils::{part, test_catalog};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl CatalogSource for CountingSource {
        async fn fetch(&self) -> Result<PartCatalog> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail {
                return Err(Error::validation("feed unavailable"));
            }
            Ok(test_catalog())
        }
    }

    #[test]
    fn test_deserialize_feed_shape() {
        let json = r#"{
            "276-1234": {
                "name": "C-Channel 1x2x1x35",
                "price": "$12.99",
                "url": "https://example.com/c-channel",
                "stock": true,
                "thumbnail": "https://example.com/c.png",
                "type": "Structure"
            },
            "228-2500": { "name": "Motor" }
        }"#;
        let catalog: PartCatalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.len(), 2);
        let channel = catalog.get("276-1234").unwrap();
        assert_eq!(channel.unit_price, "$12.99");
        assert!(channel.externally_in_stock);
        assert_eq!(channel.category, "Structure");
        assert_eq!(catalog.get("228-2500").unwrap().unit_price, "");
    }

    #[test]
    fn test_search_matches_sku_and_name() {
        let mut catalog = PartCatalog::new();
        catalog.insert("276-1234", part("C-Channel", "$1.00"));
        catalog.insert("228-2500", part("Smart Motor", "$40.00"));
        catalog.insert("228-2501", part("Motor Cap", "$2.00"));

        assert_eq!(catalog.search("motor", 10).len(), 2);
        assert_eq!(catalog.search("1234", 10)[0].0, "276-1234");
        assert_eq!(catalog.search("228", 1).len(), 1);
        assert!(catalog.search("  ", 10).is_empty());
    }

    #[tokio::test]
    async fn test_cache_fetches_once() -> Result<()> {
        let cache = Arc::new(CatalogCache::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail: false,
        }));

        let (a, b) = tokio::join!(cache.get_or_fetch(), cache.get_or_fetch());
        assert_eq!(a?.len(), b?.len());
        cache.get_or_fetch().await?;
        assert_eq!(cache.source.calls.load(Ordering::SeqCst), 1);

        cache.invalidate().await;
        assert!(!cache.is_cached().await);
        cache.get_or_fetch().await?;
        assert_eq!(cache.source.calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let cache = CatalogCache::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        assert!(cache.get_or_fetch().await.is_err());
        assert!(!cache.is_cached().await);
        assert!(cache.get_or_fetch().await.is_err());
        assert_eq!(cache.source.calls.load(Ordering::SeqCst), 2);
    }
}
