//! Tenant resolution.

use std::sync::Arc;

use crate::application::error::AppError;
use crate::application::repos::DataStore;
use crate::cache::{CacheKind, CacheManager, CachedValue, keys};
use crate::domain::entities::StoreRecord;

pub struct StoreFetcher {
    data: Arc<dyn DataStore>,
    cache: Arc<CacheManager>,
}

impl StoreFetcher {
    pub fn new(data: Arc<dyn DataStore>, cache: Arc<CacheManager>) -> Self {
        Self { data, cache }
    }

    /// Resolves the tenant serving `domain`. Absence is a 404, not a data
    /// error: unknown hosts are routine traffic.
    pub async fn by_domain(&self, domain: &str) -> Result<Arc<StoreRecord>, AppError> {
        let key = keys::domain_key(domain);
        if let Some(store) = self.cache.get(&key).and_then(|value| value.as_store()) {
            return Ok(store);
        }
        let store = self
            .data
            .store_by_domain(domain)
            .await?
            .ok_or_else(|| AppError::not_found(format!("no store bound to domain `{domain}`")))?;
        let store = Arc::new(store);
        self.cache.set(
            key,
            CachedValue::Store(Arc::clone(&store)),
            self.cache.ttl_for(CacheKind::Domain),
        );
        self.cache.set(
            keys::store_key(&store.id),
            CachedValue::Store(Arc::clone(&store)),
            self.cache.ttl_for(CacheKind::Store),
        );
        Ok(store)
    }

    pub async fn by_id(&self, store_id: &str) -> Result<Arc<StoreRecord>, AppError> {
        let key = keys::store_key(store_id);
        if let Some(store) = self.cache.get(&key).and_then(|value| value.as_store()) {
            return Ok(store);
        }
        let store = self
            .data
            .store_by_id(store_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("store `{store_id}` does not exist")))?;
        let store = Arc::new(store);
        self.cache.set(
            key,
            CachedValue::Store(Arc::clone(&store)),
            self.cache.ttl_for(CacheKind::Store),
        );
        Ok(store)
    }
}
