//! In-memory storage adapters.
//!
//! Back the storage ports for single-binary development setups and tests.
//! Data is seeded through the `insert_*` methods; reads behave like the
//! external stores they stand in for, including cursor paging.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::application::repos::{DataStore, StorageError, TemplateStore};
use crate::domain::entities::{
    CollectionRecord, NavigationMenuRecord, PageRecord, ProductPage, ProductRecord, StoreRecord,
};

#[derive(Default)]
pub struct MemoryDataStore {
    stores: DashMap<String, StoreRecord>,
    products: DashMap<String, Vec<ProductRecord>>,
    collections: DashMap<String, Vec<CollectionRecord>>,
    pages: DashMap<String, Vec<PageRecord>>,
    menus: DashMap<String, Vec<NavigationMenuRecord>>,
}

impl MemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_store(&self, store: StoreRecord) {
        self.stores.insert(store.id.clone(), store);
    }

    /// Upsert by product id, so tests and dev seeds can model renames.
    pub fn insert_product(&self, product: ProductRecord) {
        let mut products = self.products.entry(product.store_id.clone()).or_default();
        match products.iter_mut().find(|existing| existing.id == product.id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
    }

    pub fn insert_collection(&self, collection: CollectionRecord) {
        self.collections
            .entry(collection.store_id.clone())
            .or_default()
            .push(collection);
    }

    pub fn insert_page(&self, page: PageRecord) {
        self.pages.entry(page.store_id.clone()).or_default().push(page);
    }

    pub fn insert_menu(&self, menu: NavigationMenuRecord) {
        self.menus.entry(menu.store_id.clone()).or_default().push(menu);
    }

    fn store_products(&self, store_id: &str) -> Vec<ProductRecord> {
        self.products
            .get(store_id)
            .map(|products| products.value().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DataStore for MemoryDataStore {
    async fn store_by_domain(&self, domain: &str) -> Result<Option<StoreRecord>, StorageError> {
        Ok(self
            .stores
            .iter()
            .find(|store| store.domain == domain)
            .map(|store| store.value().clone()))
    }

    async fn store_by_id(&self, store_id: &str) -> Result<Option<StoreRecord>, StorageError> {
        Ok(self.stores.get(store_id).map(|store| store.value().clone()))
    }

    async fn products(
        &self,
        store_id: &str,
        limit: u32,
        next_token: Option<&str>,
    ) -> Result<ProductPage, StorageError> {
        let all = self.store_products(store_id);
        let start = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StorageError::new(format!("bad pagination token `{token}`")))?,
            None => 0,
        };
        let end = (start + limit as usize).min(all.len());
        let next_token = (end < all.len()).then(|| end.to_string());
        Ok(ProductPage {
            products: all.get(start..end).unwrap_or_default().to_vec(),
            next_token,
        })
    }

    async fn all_products(&self, store_id: &str) -> Result<Vec<ProductRecord>, StorageError> {
        Ok(self.store_products(store_id))
    }

    async fn featured_products(
        &self,
        store_id: &str,
        limit: u32,
    ) -> Result<Vec<ProductRecord>, StorageError> {
        Ok(self
            .store_products(store_id)
            .into_iter()
            .filter(|product| product.featured && product.active)
            .take(limit as usize)
            .collect())
    }

    async fn product_by_id(
        &self,
        store_id: &str,
        product_id: &str,
    ) -> Result<Option<ProductRecord>, StorageError> {
        Ok(self
            .store_products(store_id)
            .into_iter()
            .find(|product| product.id == product_id))
    }

    async fn collections(&self, store_id: &str) -> Result<Vec<CollectionRecord>, StorageError> {
        Ok(self
            .collections
            .get(store_id)
            .map(|collections| collections.value().clone())
            .unwrap_or_default())
    }

    async fn pages(&self, store_id: &str) -> Result<Vec<PageRecord>, StorageError> {
        Ok(self
            .pages
            .get(store_id)
            .map(|pages| pages.value().clone())
            .unwrap_or_default())
    }

    async fn navigation_menus(
        &self,
        store_id: &str,
    ) -> Result<Vec<NavigationMenuRecord>, StorageError> {
        Ok(self
            .menus
            .get(store_id)
            .map(|menus| menus.value().clone())
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MemoryTemplateStore {
    files: DashMap<String, HashMap<String, String>>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, store_id: &str, path: &str, source: impl Into<String>) {
        self.files
            .entry(store_id.to_string())
            .or_default()
            .insert(path.to_string(), source.into());
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn load(&self, store_id: &str, path: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .files
            .get(store_id)
            .and_then(|files| files.get(path).cloned()))
    }

    async fn partials(&self, store_id: &str) -> Result<HashMap<String, String>, StorageError> {
        let Some(files) = self.files.get(store_id) else {
            return Ok(HashMap::new());
        };
        let mut partials = HashMap::new();
        for (path, source) in files.iter() {
            let Some(name) = partial_name(path) else {
                continue;
            };
            partials.insert(name, source.clone());
        }
        Ok(partials)
    }
}

/// Bare partial name for sources under `sections/` or `snippets/`.
fn partial_name(path: &str) -> Option<String> {
    let rest = path
        .strip_prefix("sections/")
        .or_else(|| path.strip_prefix("snippets/"))?;
    Some(rest.strip_suffix(".liquid").unwrap_or(rest).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str) -> ProductRecord {
        ProductRecord {
            id: id.to_string(),
            store_id: "store1".to_string(),
            name: format!("P{id}"),
            slug: None,
            active: true,
            featured: false,
            price: 100,
            images: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn product_paging_walks_the_cursor() {
        let data = MemoryDataStore::new();
        for id in ["1", "2", "3", "4", "5"] {
            data.insert_product(product(id));
        }
        let first = data.products("store1", 2, None).await.expect("page");
        assert_eq!(first.products.len(), 2);
        let token = first.next_token.expect("token");
        let second = data
            .products("store1", 2, Some(&token))
            .await
            .expect("page");
        assert_eq!(second.products[0].id, "3");
        let last = data
            .products("store1", 2, second.next_token.as_deref())
            .await
            .expect("page");
        assert_eq!(last.products.len(), 1);
        assert!(last.next_token.is_none());
    }

    #[tokio::test]
    async fn partials_index_sections_and_snippets_by_name() {
        let templates = MemoryTemplateStore::new();
        templates.insert("store1", "sections/hero.liquid", "<h1>hero</h1>");
        templates.insert("store1", "snippets/card.liquid", "<div>card</div>");
        templates.insert("store1", "layout/theme.liquid", "{{ content_for_layout }}");
        let partials = templates.partials("store1").await.expect("partials");
        assert_eq!(partials.len(), 2);
        assert!(partials.contains_key("hero"));
        assert!(partials.contains_key("card"));
    }
}
