//! Render context assembly.
//!
//! Turns raw records into the JSON tree templates see. Currency settings
//! come from the store record with explicit defaults; they are never
//! inferred from product data.

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::domain::entities::{CollectionRecord, ProductRecord, StoreRecord};
use crate::domain::handle::compute_handle;
use crate::domain::navigation::ProcessedMenu;
use crate::template::JsonMap;

/// Identity of the page being rendered.
#[derive(Debug, Clone, Default)]
pub struct PageInfo {
    pub title: String,
    pub handle: String,
    /// Bare template name, e.g. `index` or `product`.
    pub template: String,
    pub path: String,
}

/// Inputs for one context build.
#[derive(Default)]
pub struct ContextParams<'a> {
    pub products: &'a [ProductRecord],
    pub featured: &'a [ProductRecord],
    pub collections: &'a [CollectionRecord],
    pub menus: &'a [ProcessedMenu],
    /// Parsed page-template JSON (section settings, static linklists).
    pub template_config: Option<Value>,
    pub cart: Option<Value>,
    /// The record a detail page is about (product, collection, page).
    pub resource: Option<(&'static str, Value)>,
    pub current_page: u64,
}

pub struct ContextBuilder;

impl ContextBuilder {
    pub fn build(store: &StoreRecord, page: &PageInfo, params: ContextParams<'_>) -> JsonMap {
        let mut root = Map::new();
        root.insert("shop".to_string(), shop_view(store));
        root.insert(
            "page".to_string(),
            json!({
                "title": page.title,
                "handle": page.handle,
                "template": page.template,
            }),
        );
        root.insert("page_title".to_string(), Value::from(page.title.clone()));
        root.insert("template".to_string(), Value::from(page.template.clone()));
        root.insert(
            "request".to_string(),
            json!({ "path": page.path, "host": store.domain }),
        );
        root.insert(
            "current_page".to_string(),
            Value::from(params.current_page.max(1)),
        );

        root.insert(
            "products".to_string(),
            Value::Array(params.products.iter().map(product_view).collect()),
        );
        root.insert(
            "featured_products".to_string(),
            Value::Array(params.featured.iter().map(product_view).collect()),
        );
        root.insert(
            "collections".to_string(),
            Value::Array(params.collections.iter().map(collection_view).collect()),
        );
        root.insert(
            "linklists".to_string(),
            linklists(params.menus, params.template_config.as_ref()),
        );
        root.insert(
            "cart".to_string(),
            params.cart.unwrap_or_else(empty_cart),
        );
        if let Some((name, value)) = params.resource {
            root.insert(name.to_string(), value);
        }
        if let Some(config) = params.template_config {
            root.insert("template_config".to_string(), config);
        }
        root
    }
}

fn shop_view(store: &StoreRecord) -> Value {
    json!({
        "name": store.name,
        "domain": store.domain,
        "url": format!("https://{}", store.domain),
        "currency": store.currency.as_deref().unwrap_or("USD"),
        "money_format": store.money_format.as_deref().unwrap_or("${{amount}}"),
        "locale": store.locale.as_deref().unwrap_or("en"),
        "decimal_places": store.decimal_places.unwrap_or(2),
        "email": store.contact_email,
        "phone": store.contact_phone,
        "theme": store.theme.as_deref().unwrap_or("default"),
    })
}

pub fn product_view(product: &ProductRecord) -> Value {
    let handle = compute_handle(product);
    json!({
        "id": product.id,
        "name": product.name,
        "title": product.name,
        "handle": handle,
        "url": format!("/products/{handle}"),
        "price": product.price,
        "images": product.images,
        "image": product.images.first(),
        "featured": product.featured,
        "available": product.active,
    })
}

pub fn collection_view(collection: &CollectionRecord) -> Value {
    let handle = collection
        .slug
        .clone()
        .unwrap_or_else(|| slug::slugify(&collection.title));
    json!({
        "id": collection.id,
        "title": collection.title,
        "handle": handle,
        "url": format!("/collections/{handle}"),
        "products_count": collection.product_ids.len(),
    })
}

fn empty_cart() -> Value {
    json!({ "item_count": 0, "items": [], "total_price": 0 })
}

/// Navigation lists with the fallback chain: live menus, then any static
/// `linklists` declared in the template config, then nothing.
fn linklists(menus: &[ProcessedMenu], template_config: Option<&Value>) -> Value {
    if !menus.is_empty() {
        let mut lists = Map::new();
        for menu in menus {
            lists.insert(menu.handle.clone(), menu_view(menu));
            if menu.is_main && !lists.contains_key("main-menu") {
                lists.insert("main-menu".to_string(), menu_view(menu));
            }
        }
        return Value::Object(lists);
    }
    if let Some(fallback) = template_config
        .and_then(|config| config.get("linklists"))
        .filter(|lists| lists.is_object())
    {
        debug!("using template-declared linklists fallback");
        return fallback.clone();
    }
    Value::Object(Map::new())
}

fn menu_view(menu: &ProcessedMenu) -> Value {
    json!({
        "title": menu.name,
        "handle": menu.handle,
        "links": menu
            .items
            .iter()
            .map(|item| json!({ "title": item.title, "url": item.url, "active": item.active }))
            .collect::<Vec<_>>(),
    })
}
