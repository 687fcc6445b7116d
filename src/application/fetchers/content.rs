//! Collection and page fetching.

use std::sync::Arc;

use slug::slugify;

use crate::application::error::AppError;
use crate::application::repos::DataStore;
use crate::cache::{CacheKind, CacheManager, CachedValue, keys};
use crate::domain::entities::{CollectionRecord, PageRecord};

pub struct ContentFetcher {
    data: Arc<dyn DataStore>,
    cache: Arc<CacheManager>,
}

impl ContentFetcher {
    pub fn new(data: Arc<dyn DataStore>, cache: Arc<CacheManager>) -> Self {
        Self { data, cache }
    }

    pub async fn collections(&self, store_id: &str) -> Result<Arc<Vec<CollectionRecord>>, AppError> {
        let key = keys::collections_key(store_id);
        if let Some(collections) = self.cache.get(&key).and_then(|value| value.as_collections()) {
            return Ok(collections);
        }
        let collections = Arc::new(self.data.collections(store_id).await?);
        self.cache.set(
            key,
            CachedValue::Collections(Arc::clone(&collections)),
            self.cache.ttl_for(CacheKind::Collection),
        );
        Ok(collections)
    }

    pub async fn collection_by_handle(
        &self,
        store_id: &str,
        handle: &str,
    ) -> Result<Option<CollectionRecord>, AppError> {
        let collections = self.collections(store_id).await?;
        Ok(collections
            .iter()
            .find(|collection| {
                collection.active
                    && collection
                        .slug
                        .as_deref()
                        .map_or_else(|| slugify(&collection.title) == handle, |slug| slug == handle)
            })
            .cloned())
    }

    pub async fn pages(&self, store_id: &str) -> Result<Arc<Vec<PageRecord>>, AppError> {
        let key = keys::pages_key(store_id);
        if let Some(pages) = self.cache.get(&key).and_then(|value| value.as_pages()) {
            return Ok(pages);
        }
        let pages = Arc::new(self.data.pages(store_id).await?);
        self.cache.set(
            key,
            CachedValue::Pages(Arc::clone(&pages)),
            self.cache.ttl_for(CacheKind::Page),
        );
        Ok(pages)
    }

    pub async fn page_by_handle(
        &self,
        store_id: &str,
        handle: &str,
    ) -> Result<Option<PageRecord>, AppError> {
        let pages = self.pages(store_id).await?;
        Ok(pages
            .iter()
            .find(|page| page.visible && page.slug == handle)
            .cloned())
    }
}
