//! Product fetching and handle resolution.
//!
//! The handle map is built deterministically from the full product listing;
//! see [`crate::domain::handle`] for the tie-break rules. A lookup miss
//! triggers one observable self-heal: drop the cached map, rebuild from
//! live data, retry. A second miss means the product really is gone.

use std::sync::Arc;

use metrics::counter;
use tracing::warn;

use crate::application::error::AppError;
use crate::application::repos::DataStore;
use crate::cache::{CacheKind, CacheManager, CachedValue, keys};
use crate::domain::entities::{ProductPage, ProductRecord};
use crate::domain::handle::{HandleMap, build_handle_map, compute_handle, normalize_handle};

pub struct ProductFetcher {
    data: Arc<dyn DataStore>,
    cache: Arc<CacheManager>,
}

impl ProductFetcher {
    pub fn new(data: Arc<dyn DataStore>, cache: Arc<CacheManager>) -> Self {
        Self { data, cache }
    }

    pub async fn list(
        &self,
        store_id: &str,
        limit: u32,
        next_token: Option<&str>,
    ) -> Result<Arc<ProductPage>, AppError> {
        let key = keys::products_key(store_id, limit, next_token);
        if let Some(page) = self.cache.get(&key).and_then(|value| value.as_products()) {
            return Ok(page);
        }
        let page = Arc::new(self.data.products(store_id, limit, next_token).await?);
        self.cache.set(
            key,
            CachedValue::Products(Arc::clone(&page)),
            self.cache.ttl_for(CacheKind::Product),
        );
        Ok(page)
    }

    pub async fn featured(
        &self,
        store_id: &str,
        limit: u32,
    ) -> Result<Arc<ProductPage>, AppError> {
        let key = keys::featured_products_key(store_id, limit);
        if let Some(page) = self.cache.get(&key).and_then(|value| value.as_products()) {
            return Ok(page);
        }
        let products = self.data.featured_products(store_id, limit).await?;
        let page = Arc::new(ProductPage {
            products,
            next_token: None,
        });
        self.cache.set(
            key,
            CachedValue::Products(Arc::clone(&page)),
            self.cache.ttl_for(CacheKind::Product),
        );
        Ok(page)
    }

    pub async fn by_id(
        &self,
        store_id: &str,
        product_id: &str,
    ) -> Result<Option<Arc<ProductRecord>>, AppError> {
        let key = keys::product_key(store_id, product_id);
        if let Some(product) = self.cache.get(&key).and_then(|value| value.as_product()) {
            return Ok(Some(product));
        }
        let Some(product) = self.data.product_by_id(store_id, product_id).await? else {
            return Ok(None);
        };
        let product = Arc::new(product);
        self.cache.set(
            key,
            CachedValue::Product(Arc::clone(&product)),
            self.cache.ttl_for(CacheKind::Product),
        );
        Ok(Some(product))
    }

    /// Resolves a URL handle to its product.
    ///
    /// A map hit is validated against the fetched record: the product must
    /// still belong to the store and still compute to the requested handle.
    /// A stale entry or an outright miss heals once: drop the cached map,
    /// rebuild from live data, retry. A second miss means the product really
    /// is gone.
    pub async fn by_handle(
        &self,
        store_id: &str,
        handle: &str,
    ) -> Result<Option<Arc<ProductRecord>>, AppError> {
        let map = self.handle_map(store_id).await?;
        if let Some(id) = map.get(handle) {
            // Validation must see the live record; a cached copy predating a
            // rename would vouch for its own stale handle.
            if let Some(product) = self.data.product_by_id(store_id, id).await?
                && product.store_id == store_id
                && normalize_handle(&compute_handle(&product)) == handle
            {
                let product = Arc::new(product);
                self.cache.set(
                    keys::product_key(store_id, id),
                    CachedValue::Product(Arc::clone(&product)),
                    self.cache.ttl_for(CacheKind::Product),
                );
                return Ok(Some(product));
            }
            // Record deleted or renamed since the map was built.
            self.cache.remove(&keys::product_key(store_id, id));
        }

        warn!(store_id, handle, "handle map stale, rebuilding");
        counter!("vetrina_handle_map_heal_total").increment(1);
        self.cache.remove(&keys::handle_map_key(store_id));
        let rebuilt = self.handle_map(store_id).await?;
        match rebuilt.get(handle) {
            Some(id) => self.by_id(store_id, &id.to_string()).await,
            None => Ok(None),
        }
    }

    pub async fn handle_map(&self, store_id: &str) -> Result<Arc<HandleMap>, AppError> {
        let key = keys::handle_map_key(store_id);
        if let Some(map) = self.cache.get(&key).and_then(|value| value.as_handle_map()) {
            return Ok(map);
        }
        let products = self.data.all_products(store_id).await?;
        let map = Arc::new(build_handle_map(&products));
        self.cache.set(
            key,
            CachedValue::HandleMap(Arc::clone(&map)),
            self.cache.ttl_for(CacheKind::Product),
        );
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::infra::memory::MemoryDataStore;

    fn product(id: &str, slug: &str) -> ProductRecord {
        ProductRecord {
            id: id.to_string(),
            store_id: "store1".to_string(),
            name: format!("Product {id}"),
            slug: Some(slug.to_string()),
            active: true,
            featured: false,
            price: 1000,
            images: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    fn fetcher(data: Arc<MemoryDataStore>) -> ProductFetcher {
        ProductFetcher::new(data, Arc::new(CacheManager::in_memory(CacheConfig::default())))
    }

    #[tokio::test]
    async fn handle_lookup_self_heals_after_product_appears() {
        let data = Arc::new(MemoryDataStore::new());
        data.insert_product(product("p1", "red-shoe"));
        let fetcher = fetcher(Arc::clone(&data));

        // Warm the map before the second product exists.
        assert!(
            fetcher
                .by_handle("store1", "blue-shoe")
                .await
                .expect("lookup")
                .is_none()
        );

        data.insert_product(product("p2", "blue-shoe"));
        let resolved = fetcher
            .by_handle("store1", "blue-shoe")
            .await
            .expect("lookup")
            .expect("product after self-heal");
        assert_eq!(resolved.id, "p2");
    }

    #[tokio::test]
    async fn stale_hit_after_rename_heals_instead_of_serving_old_handle() {
        let data = Arc::new(MemoryDataStore::new());
        data.insert_product(product("p5", "old-handle"));
        let fetcher = fetcher(Arc::clone(&data));

        // Prime the map with the pre-rename slug.
        assert!(
            fetcher
                .by_handle("store1", "old-handle")
                .await
                .expect("lookup")
                .is_some()
        );

        data.insert_product(product("p5", "new-handle"));

        // The cached map still points old-handle at p5, but p5 no longer
        // computes to it; the lookup must heal and come back empty.
        assert!(
            fetcher
                .by_handle("store1", "old-handle")
                .await
                .expect("lookup")
                .is_none()
        );
        let renamed = fetcher
            .by_handle("store1", "new-handle")
            .await
            .expect("lookup")
            .expect("product under its new handle");
        assert_eq!(renamed.id, "p5");
    }

    #[tokio::test]
    async fn unknown_handle_stays_absent_after_one_rebuild() {
        let data = Arc::new(MemoryDataStore::new());
        data.insert_product(product("p1", "red-shoe"));
        let fetcher = fetcher(data);
        assert!(
            fetcher
                .by_handle("store1", "ghost")
                .await
                .expect("lookup")
                .is_none()
        );
    }
}
