//! Navigation menu processing.
//!
//! Raw menus carry an untyped `menu_data` payload (a JSON array, sometimes
//! double-serialized as a string). Navigation is optional storefront content:
//! anything malformed degrades to an empty item list instead of failing the
//! render.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::entities::NavigationMenuRecord;

/// Typed item as declared in `menu_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: MenuItemKind,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub page_handle: Option<String>,
    #[serde(default)]
    pub collection_handle: Option<String>,
    #[serde(default)]
    pub product_handle: Option<String>,
    /// Items must opt in to visibility; an absent flag hides the item.
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuItemKind {
    #[default]
    Internal,
    External,
    Page,
    Collection,
    Product,
}

/// Renderable menu entry with its URL already resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedMenuItem {
    pub title: String,
    pub url: String,
    pub active: bool,
    #[serde(rename = "type")]
    pub kind: MenuItemKind,
    pub target: Option<String>,
}

/// Menu with identity fields preserved and items filtered, ordered, and
/// URL-resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedMenu {
    pub id: String,
    pub store_id: String,
    pub domain: String,
    pub name: String,
    pub handle: String,
    pub is_main: bool,
    pub is_active: bool,
    pub items: Vec<ProcessedMenuItem>,
}

/// Resolve the storefront URL for a single item.
pub fn item_url(item: &MenuItem) -> String {
    match item.kind {
        MenuItemKind::Internal => item.url.clone().unwrap_or_else(|| "/".to_string()),
        MenuItemKind::External => item.url.clone().unwrap_or_else(|| "#".to_string()),
        MenuItemKind::Page => match item.page_handle.as_deref() {
            Some(handle) => format!("/pages/{handle}"),
            None => "/".to_string(),
        },
        MenuItemKind::Collection => match item.collection_handle.as_deref() {
            Some(handle) => format!("/collections/{handle}"),
            None => "/collections".to_string(),
        },
        MenuItemKind::Product => match item.product_handle.as_deref() {
            Some(handle) => format!("/products/{handle}"),
            None => "/products".to_string(),
        },
    }
}

fn parse_menu_items(menu_data: &serde_json::Value) -> Option<Vec<MenuItem>> {
    match menu_data {
        serde_json::Value::Array(_) => serde_json::from_value(menu_data.clone()).ok(),
        serde_json::Value::String(raw) => serde_json::from_str(raw).ok(),
        serde_json::Value::Null => Some(Vec::new()),
        _ => None,
    }
}

/// Transform a raw menu into its renderable form.
///
/// Only visible items survive, ordered by ascending `sort_order`. A menu
/// whose payload cannot be parsed keeps its identity fields and yields an
/// empty item list.
pub fn process_menu(raw: &NavigationMenuRecord) -> ProcessedMenu {
    let items = match parse_menu_items(&raw.menu_data) {
        Some(items) => items,
        None => {
            warn!(
                menu = %raw.handle,
                store_id = %raw.store_id,
                "Navigation menu data unparsable; serving empty menu"
            );
            Vec::new()
        }
    };

    let mut visible: Vec<MenuItem> = items.into_iter().filter(|item| item.is_visible).collect();
    visible.sort_by_key(|item| item.sort_order);

    ProcessedMenu {
        id: raw.id.clone(),
        store_id: raw.store_id.clone(),
        domain: raw.domain.clone(),
        name: raw.name.clone(),
        handle: raw.handle.clone(),
        is_main: raw.is_main,
        is_active: raw.is_active,
        items: visible
            .iter()
            .map(|item| ProcessedMenuItem {
                title: item.label.clone(),
                url: item_url(item),
                active: item.is_visible,
                kind: item.kind,
                target: item.target.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw_menu(menu_data: serde_json::Value) -> NavigationMenuRecord {
        NavigationMenuRecord {
            id: "menu1".to_string(),
            store_id: "store1".to_string(),
            domain: "shop.example.com".to_string(),
            name: "Main Menu".to_string(),
            handle: "main-menu".to_string(),
            is_main: true,
            is_active: true,
            menu_data,
        }
    }

    #[test]
    fn filters_hidden_and_sorts_by_order() {
        let menu = process_menu(&raw_menu(json!([
            { "label": "Last", "type": "internal", "url": "/last", "isVisible": true, "sortOrder": 9 },
            { "label": "Hidden", "type": "internal", "isVisible": false },
            { "label": "First", "type": "internal", "url": "/first", "isVisible": true, "sortOrder": -1 },
            { "label": "Middle", "type": "internal", "url": "/middle", "isVisible": true }
        ])));

        let titles: Vec<&str> = menu.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Middle", "Last"]);
    }

    #[test]
    fn items_without_visibility_flag_are_dropped() {
        let menu = process_menu(&raw_menu(json!([
            { "label": "Implicit", "type": "internal", "url": "/implicit" },
            { "label": "Explicit", "type": "internal", "url": "/explicit", "isVisible": true }
        ])));
        let titles: Vec<&str> = menu.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Explicit"]);
    }

    #[test]
    fn url_generation_per_kind() {
        let cases = json!([
            { "label": "Home", "type": "internal", "isVisible": true },
            { "label": "Blog", "type": "external", "isVisible": true },
            { "label": "About", "type": "page", "pageHandle": "about-us", "isVisible": true },
            { "label": "Sale", "type": "collection", "collectionHandle": "summer-sale", "isVisible": true },
            { "label": "All", "type": "collection", "isVisible": true },
            { "label": "Shoe", "type": "product", "productHandle": "red-shoe", "isVisible": true },
            { "label": "Shop", "type": "product", "isVisible": true }
        ]);
        let menu = process_menu(&raw_menu(cases));
        let urls: Vec<&str> = menu.items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "/",
                "#",
                "/pages/about-us",
                "/collections/summer-sale",
                "/collections",
                "/products/red-shoe",
                "/products",
            ]
        );
    }

    #[test]
    fn string_serialized_menu_data_is_parsed() {
        let payload = r#"[{ "label": "Home", "type": "internal", "url": "/home", "isVisible": true }]"#;
        let menu = process_menu(&raw_menu(json!(payload)));
        assert_eq!(menu.items.len(), 1);
        assert_eq!(menu.items[0].url, "/home");
    }

    #[test]
    fn unparsable_menu_data_degrades_to_empty() {
        let menu = process_menu(&raw_menu(json!("{not json at all")));
        assert!(menu.items.is_empty());
        assert_eq!(menu.handle, "main-menu");

        let wrong_shape = process_menu(&raw_menu(json!({"items": 3})));
        assert!(wrong_shape.items.is_empty());
    }
}
