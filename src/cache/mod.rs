//! Vetrina cache system.
//!
//! A single TTL-keyed store serves every cached entity class (domain
//! resolution, records, handle maps, compiled templates, rendered pages).
//! Keys embed the tenant so invalidation stays hard-scoped per store.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! development = false
//! template_ttl_ms = 3600000
//! # ... see config.rs for all options
//! ```

mod config;
mod events;
mod invalidation;
pub mod keys;
mod store;

pub use config::{CacheConfig, CacheKind};
pub use events::{ChangeEvent, ChangeType};
pub use invalidation::Invalidator;
pub use store::{
    CacheBackend, CacheEntry, CacheManager, CacheStats, CachedPage, CachedValue, MemoryBackend,
};
