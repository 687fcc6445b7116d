//! TTL cache storage.
//!
//! A typed entry store behind the [`CacheBackend`] trait so single-instance
//! deployments run on the in-memory backend while multi-instance setups can
//! swap in a shared key-value store. Expiry is checked lazily on read; an
//! explicit sweep exists for memory hygiene.
//!
//! Cache faults never surface to callers: a failed read is a miss and a
//! failed write is dropped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::counter;

use crate::domain::entities::{
    CollectionRecord, PageRecord, ProductPage, ProductRecord, StoreRecord,
};
use crate::domain::handle::HandleMap;
use crate::domain::navigation::ProcessedMenu;
use crate::template::CompiledTemplate;

use super::config::{CacheConfig, CacheKind};
use super::keys::store_pattern;

/// Final rendered document held in the page cache.
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub html: String,
    pub etag: String,
}

/// Typed cache payloads. Arc-wrapped so reads hand out cheap clones.
#[derive(Clone)]
pub enum CachedValue {
    Store(Arc<StoreRecord>),
    Product(Arc<ProductRecord>),
    Products(Arc<ProductPage>),
    HandleMap(Arc<HandleMap>),
    Collections(Arc<Vec<CollectionRecord>>),
    Pages(Arc<Vec<PageRecord>>),
    ProcessedMenus(Arc<Vec<ProcessedMenu>>),
    Template(Arc<CompiledTemplate>),
    Page(Arc<CachedPage>),
}

macro_rules! cached_value_accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&self) -> Option<Arc<$ty>> {
            match self {
                CachedValue::$variant(value) => Some(Arc::clone(value)),
                _ => None,
            }
        }
    };
}

impl CachedValue {
    cached_value_accessor!(as_store, Store, StoreRecord);
    cached_value_accessor!(as_product, Product, ProductRecord);
    cached_value_accessor!(as_products, Products, ProductPage);
    cached_value_accessor!(as_handle_map, HandleMap, HandleMap);
    cached_value_accessor!(as_collections, Collections, Vec<CollectionRecord>);
    cached_value_accessor!(as_pages, Pages, Vec<PageRecord>);
    cached_value_accessor!(as_processed_menus, ProcessedMenus, Vec<ProcessedMenu>);
    cached_value_accessor!(as_template, Template, CompiledTemplate);
    cached_value_accessor!(as_page, Page, CachedPage);
}

/// One stored entry. Visible only while `now <= written_at + ttl`.
#[derive(Clone)]
pub struct CacheEntry {
    pub value: CachedValue,
    pub written_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn expired_at(&self, now: Instant) -> bool {
        now > self.written_at + self.ttl
    }
}

/// Storage contract for cache entries.
///
/// Implementations must be safe under interleaved access from concurrent
/// requests; none of the operations may fail loudly.
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheEntry>;
    fn set(&self, key: String, entry: CacheEntry);
    fn remove(&self, key: &str);
    fn keys(&self) -> Vec<String>;
    fn clear(&self);
    fn len(&self) -> usize;
}

/// Process-local backend for single-instance deployments.
#[derive(Default)]
pub struct MemoryBackend {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    fn set(&self, key: String, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Snapshot of cache occupancy for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total: usize,
    pub expired: usize,
    pub active: usize,
}

/// TTL cache facade shared by all fetchers and the render pipeline.
pub struct CacheManager {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
}

impl CacheManager {
    pub fn new(config: CacheConfig, backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend, config }
    }

    pub fn in_memory(config: CacheConfig) -> Self {
        Self::new(config, Arc::new(MemoryBackend::new()))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Default lifetime for entries of the given kind.
    pub fn ttl_for(&self, kind: CacheKind) -> Duration {
        self.config.ttl_for(kind)
    }

    /// Fetch an entry, treating anything past its lifetime as a miss and
    /// evicting it on the spot.
    pub fn get(&self, key: &str) -> Option<CachedValue> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<CachedValue> {
        if !self.config.enabled {
            return None;
        }
        match self.backend.get(key) {
            Some(entry) if entry.expired_at(now) => {
                self.backend.remove(key);
                counter!("vetrina_cache_miss_total").increment(1);
                None
            }
            Some(entry) => {
                counter!("vetrina_cache_hit_total").increment(1);
                Some(entry.value)
            }
            None => {
                counter!("vetrina_cache_miss_total").increment(1);
                None
            }
        }
    }

    /// Store a value. Zero TTL entries are not cached at all.
    pub fn set(&self, key: impl Into<String>, value: CachedValue, ttl: Duration) {
        self.set_at(key, value, ttl, Instant::now());
    }

    pub(crate) fn set_at(
        &self,
        key: impl Into<String>,
        value: CachedValue,
        ttl: Duration,
        written_at: Instant,
    ) {
        if !self.config.enabled || ttl.is_zero() {
            return;
        }
        self.backend.set(
            key.into(),
            CacheEntry {
                value,
                written_at,
                ttl,
            },
        );
    }

    pub fn remove(&self, key: &str) {
        self.backend.remove(key);
    }

    /// Remove every entry scoped to the tenant. Entries of other tenants are
    /// untouched regardless of interleaving.
    pub fn invalidate_store(&self, store_id: &str) {
        let pattern = store_pattern(store_id);
        let mut removed = 0usize;
        for key in self.backend.keys() {
            if key.contains(&pattern) {
                self.backend.remove(&key);
                removed += 1;
            }
        }
        counter!("vetrina_cache_invalidated_total").increment(removed as u64);
    }

    /// Remove every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut removed = 0usize;
        for key in self.backend.keys() {
            if key.starts_with(prefix) {
                self.backend.remove(&key);
                removed += 1;
            }
        }
        removed
    }

    pub fn clear(&self) {
        self.backend.clear();
    }

    /// Sweep out expired entries. Reads already evict lazily; this exists for
    /// memory hygiene on low-traffic key spaces.
    pub fn clean_expired(&self) {
        let now = Instant::now();
        for key in self.backend.keys() {
            if let Some(entry) = self.backend.get(&key)
                && entry.expired_at(now)
            {
                self.backend.remove(&key);
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut expired = 0usize;
        let keys = self.backend.keys();
        for key in &keys {
            if let Some(entry) = self.backend.get(key)
                && entry.expired_at(now)
            {
                expired += 1;
            }
        }
        let total = keys.len();
        CacheStats {
            total,
            expired,
            active: total.saturating_sub(expired),
        }
    }
}
