//! Storage ports.
//!
//! The persistence layer and the template object store are external
//! collaborators; fetchers talk to them through these traits so tests and
//! single-binary deployments can run on in-memory adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    CollectionRecord, NavigationMenuRecord, PageRecord, ProductPage, ProductRecord, StoreRecord,
};

#[derive(Debug, Error)]
#[error("storage error: {message}")]
pub struct StorageError {
    pub message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Read access to tenant records.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn store_by_domain(&self, domain: &str) -> Result<Option<StoreRecord>, StorageError>;

    async fn store_by_id(&self, store_id: &str) -> Result<Option<StoreRecord>, StorageError>;

    async fn products(
        &self,
        store_id: &str,
        limit: u32,
        next_token: Option<&str>,
    ) -> Result<ProductPage, StorageError>;

    /// Full product listing, used to build the handle map.
    async fn all_products(&self, store_id: &str) -> Result<Vec<ProductRecord>, StorageError>;

    async fn featured_products(
        &self,
        store_id: &str,
        limit: u32,
    ) -> Result<Vec<ProductRecord>, StorageError>;

    async fn product_by_id(
        &self,
        store_id: &str,
        product_id: &str,
    ) -> Result<Option<ProductRecord>, StorageError>;

    async fn collections(&self, store_id: &str) -> Result<Vec<CollectionRecord>, StorageError>;

    async fn pages(&self, store_id: &str) -> Result<Vec<PageRecord>, StorageError>;

    async fn navigation_menus(
        &self,
        store_id: &str,
    ) -> Result<Vec<NavigationMenuRecord>, StorageError>;
}

/// Read access to template source files.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Loads one source file by theme-relative path, e.g. `layout/theme.liquid`.
    async fn load(&self, store_id: &str, path: &str) -> Result<Option<String>, StorageError>;

    /// All section and snippet sources by bare name, for compile-time
    /// inlining of inclusion tags.
    async fn partials(&self, store_id: &str) -> Result<HashMap<String, String>, StorageError>;
}

impl From<StorageError> for crate::application::error::AppError {
    fn from(error: StorageError) -> Self {
        crate::application::error::AppError::Data(error.to_string())
    }
}
