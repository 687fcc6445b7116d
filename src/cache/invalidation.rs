//! Maps change events onto scoped key invalidation.
//!
//! Entity-scoped events clear the entity itself plus everything derived from
//! it (list pages, the handle map, rendered HTML). `store_settings_updated`
//! clears the whole tenant.

use std::sync::Arc;

use tracing::info;

use super::events::{ChangeEvent, ChangeType};
use super::keys;
use super::store::CacheManager;

pub struct Invalidator {
    cache: Arc<CacheManager>,
}

impl Invalidator {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }

    /// Apply one inbound event. Never fails; cache trouble degrades to a
    /// cold read on the next request.
    pub fn apply(&self, event: &ChangeEvent) {
        let store_id = event.store_id.as_str();
        info!(
            event_id = %event.id,
            change_type = ?event.change_type,
            store_id,
            "Applying cache invalidation event"
        );

        match event.change_type {
            ChangeType::StoreSettingsUpdated => {
                self.cache.invalidate_store(store_id);
            }
            ChangeType::ProductCreated | ChangeType::ProductUpdated | ChangeType::ProductDeleted => {
                for id in event.entity_ids() {
                    self.cache.remove(&keys::product_key(store_id, id));
                }
                self.cache.invalidate_prefix(&format!("products_{store_id}_"));
                self.cache
                    .invalidate_prefix(&format!("featured_products_{store_id}_"));
                self.cache.remove(&keys::handle_map_key(store_id));
                self.invalidate_rendered_pages(store_id);
            }
            ChangeType::CollectionCreated | ChangeType::CollectionUpdated => {
                self.cache.remove(&keys::collections_key(store_id));
                self.invalidate_rendered_pages(store_id);
            }
            ChangeType::PageCreated | ChangeType::PageUpdated => {
                self.cache.remove(&keys::pages_key(store_id));
                // Navigation caches page URLs.
                self.cache.remove(&keys::navigation_key(store_id));
                self.invalidate_rendered_pages(store_id);
            }
            ChangeType::NavigationUpdated => {
                self.cache.remove(&keys::navigation_key(store_id));
                self.invalidate_rendered_pages(store_id);
            }
            ChangeType::TemplateUpdated => {
                match event.path.as_deref() {
                    Some(path) => self.cache.remove(&keys::template_key(store_id, path)),
                    None => {
                        self.cache.invalidate_prefix(&format!("template_{store_id}_"));
                    }
                }
                self.invalidate_rendered_pages(store_id);
            }
        }
    }

    fn invalidate_rendered_pages(&self, store_id: &str) {
        self.cache.invalidate_prefix(&format!("page_{store_id}_"));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::cache::config::CacheConfig;
    use crate::cache::store::{CachedPage, CachedValue};
    use crate::domain::handle::HandleMap;

    fn setup() -> (Arc<CacheManager>, Invalidator) {
        let cache = Arc::new(CacheManager::in_memory(CacheConfig::default()));
        (Arc::clone(&cache), Invalidator::new(cache))
    }

    fn cached_page() -> CachedValue {
        CachedValue::Page(Arc::new(CachedPage {
            html: "<html></html>".to_string(),
            etag: "abc".to_string(),
        }))
    }

    #[test]
    fn product_update_clears_handle_map_and_pages() {
        let (cache, invalidator) = setup();
        let ttl = Duration::from_secs(60);
        cache.set(
            keys::handle_map_key("store1"),
            CachedValue::HandleMap(Arc::new(HandleMap::default())),
            ttl,
        );
        cache.set(keys::page_key("store1", "/", 0), cached_page(), ttl);
        cache.set(keys::page_key("store2", "/", 0), cached_page(), ttl);

        invalidator.apply(
            &ChangeEvent::new(ChangeType::ProductUpdated, "store1").with_entity("p1"),
        );

        assert!(cache.get(&keys::handle_map_key("store1")).is_none());
        assert!(cache.get(&keys::page_key("store1", "/", 0)).is_none());
        assert!(cache.get(&keys::page_key("store2", "/", 0)).is_some());
    }

    #[test]
    fn store_settings_update_clears_whole_tenant() {
        let (cache, invalidator) = setup();
        let ttl = Duration::from_secs(60);
        cache.set(keys::navigation_key("store1"), cached_page(), ttl);
        cache.set(keys::page_key("store1", "/", 0), cached_page(), ttl);
        cache.set(keys::navigation_key("store2"), cached_page(), ttl);

        invalidator.apply(&ChangeEvent::new(ChangeType::StoreSettingsUpdated, "store1"));

        assert!(cache.get(&keys::navigation_key("store1")).is_none());
        assert!(cache.get(&keys::page_key("store1", "/", 0)).is_none());
        assert!(cache.get(&keys::navigation_key("store2")).is_some());
    }

    #[test]
    fn scoped_template_update_leaves_other_templates() {
        let (cache, invalidator) = setup();
        let ttl = Duration::from_secs(60);
        cache.set(
            keys::template_key("store1", "layout.liquid"),
            cached_page(),
            ttl,
        );
        cache.set(
            keys::template_key("store1", "product.liquid"),
            cached_page(),
            ttl,
        );

        invalidator.apply(
            &ChangeEvent::new(ChangeType::TemplateUpdated, "store1").with_path("layout.liquid"),
        );

        assert!(
            cache
                .get(&keys::template_key("store1", "layout.liquid"))
                .is_none()
        );
        assert!(
            cache
                .get(&keys::template_key("store1", "product.liquid"))
                .is_some()
        );
    }
}
