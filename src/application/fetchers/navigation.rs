//! Navigation fetching.
//!
//! Menus come back pre-processed (visible items only, sorted, URLs derived)
//! and cached in that form. One broken menu degrades to empty items; it
//! never takes the page down with it.

use std::sync::Arc;

use crate::application::error::AppError;
use crate::application::repos::DataStore;
use crate::cache::{CacheKind, CacheManager, CachedValue, keys};
use crate::domain::navigation::{ProcessedMenu, process_menu};

pub struct NavigationFetcher {
    data: Arc<dyn DataStore>,
    cache: Arc<CacheManager>,
}

impl NavigationFetcher {
    pub fn new(data: Arc<dyn DataStore>, cache: Arc<CacheManager>) -> Self {
        Self { data, cache }
    }

    pub async fn menus(&self, store_id: &str) -> Result<Arc<Vec<ProcessedMenu>>, AppError> {
        let key = keys::navigation_key(store_id);
        if let Some(menus) = self
            .cache
            .get(&key)
            .and_then(|value| value.as_processed_menus())
        {
            return Ok(menus);
        }
        let records = self.data.navigation_menus(store_id).await?;
        let menus: Vec<ProcessedMenu> = records
            .iter()
            .filter(|record| record.is_active)
            .map(process_menu)
            .collect();
        let menus = Arc::new(menus);
        self.cache.set(
            key,
            CachedValue::ProcessedMenus(Arc::clone(&menus)),
            self.cache.ttl_for(CacheKind::Navigation),
        );
        Ok(menus)
    }
}
