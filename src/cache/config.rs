//! Cache configuration.
//!
//! Per-entity-type TTL defaults with a development mode that flattens the
//! template TTL to near-zero for live editing.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_PRODUCT_TTL_MS: u64 = 15 * 60 * 1000;
const DEFAULT_COLLECTION_TTL_MS: u64 = 30 * 60 * 1000;
const DEFAULT_STORE_TTL_MS: u64 = 30 * 60 * 1000;
const DEFAULT_DOMAIN_TTL_MS: u64 = 30 * 60 * 1000;
const DEFAULT_NAVIGATION_TTL_MS: u64 = 30 * 60 * 1000;
const DEFAULT_TEMPLATE_TTL_MS: u64 = 60 * 60 * 1000;
const DEFAULT_PAGE_TTL_MS: u64 = 30 * 60 * 1000;
const DEFAULT_DEV_TEMPLATE_TTL_MS: u64 = 1_000;

/// Entity categories with distinct cache lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    Store,
    Domain,
    Product,
    Collection,
    Navigation,
    Template,
    Page,
}

/// Cache behavior from `vetrina.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch; disabled means every read is a miss and writes drop.
    pub enabled: bool,
    /// Development mode: template entries expire almost immediately.
    pub development: bool,
    pub product_ttl_ms: u64,
    pub collection_ttl_ms: u64,
    pub store_ttl_ms: u64,
    pub domain_ttl_ms: u64,
    pub navigation_ttl_ms: u64,
    pub template_ttl_ms: u64,
    pub page_ttl_ms: u64,
    pub dev_template_ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            development: false,
            product_ttl_ms: DEFAULT_PRODUCT_TTL_MS,
            collection_ttl_ms: DEFAULT_COLLECTION_TTL_MS,
            store_ttl_ms: DEFAULT_STORE_TTL_MS,
            domain_ttl_ms: DEFAULT_DOMAIN_TTL_MS,
            navigation_ttl_ms: DEFAULT_NAVIGATION_TTL_MS,
            template_ttl_ms: DEFAULT_TEMPLATE_TTL_MS,
            page_ttl_ms: DEFAULT_PAGE_TTL_MS,
            dev_template_ttl_ms: DEFAULT_DEV_TEMPLATE_TTL_MS,
        }
    }
}

impl CacheConfig {
    /// Default lifetime for a cache entry of the given kind.
    pub fn ttl_for(&self, kind: CacheKind) -> Duration {
        let ms = match kind {
            CacheKind::Store => self.store_ttl_ms,
            CacheKind::Domain => self.domain_ttl_ms,
            CacheKind::Product => self.product_ttl_ms,
            CacheKind::Collection => self.collection_ttl_ms,
            CacheKind::Navigation => self.navigation_ttl_ms,
            CacheKind::Template if self.development => self.dev_template_ttl_ms,
            CacheKind::Template => self.template_ttl_ms,
            CacheKind::Page => self.page_ttl_ms,
        };
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttls_follow_entity_type() {
        let config = CacheConfig::default();
        assert_eq!(
            config.ttl_for(CacheKind::Product),
            Duration::from_secs(15 * 60)
        );
        assert_eq!(
            config.ttl_for(CacheKind::Collection),
            Duration::from_secs(30 * 60)
        );
        assert_eq!(
            config.ttl_for(CacheKind::Template),
            Duration::from_secs(60 * 60)
        );
    }

    #[test]
    fn development_shortens_template_ttl_only() {
        let config = CacheConfig {
            development: true,
            ..Default::default()
        };
        assert_eq!(config.ttl_for(CacheKind::Template), Duration::from_secs(1));
        assert_eq!(
            config.ttl_for(CacheKind::Product),
            Duration::from_secs(15 * 60)
        );
    }
}
