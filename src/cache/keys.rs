//! Cache key construction.
//!
//! Every tenant-scoped key embeds `_{store_id}_` so pattern invalidation can
//! clear one tenant without touching any other (store ids never contain
//! underscores; the surrounding delimiters keep prefix-related ids apart).

/// Substring matched by tenant-scoped invalidation.
pub fn store_pattern(store_id: &str) -> String {
    format!("_{store_id}_")
}

pub fn domain_key(domain: &str) -> String {
    format!("domain_{domain}")
}

pub fn store_key(store_id: &str) -> String {
    format!("store_{store_id}_record")
}

pub fn product_key(store_id: &str, product_id: &str) -> String {
    format!("product_{store_id}_{product_id}")
}

pub fn products_key(store_id: &str, limit: u32, next_token: Option<&str>) -> String {
    format!(
        "products_{store_id}_{limit}_{}",
        next_token.unwrap_or("start")
    )
}

pub fn featured_products_key(store_id: &str, limit: u32) -> String {
    format!("featured_products_{store_id}_{limit}")
}

pub fn handle_map_key(store_id: &str) -> String {
    format!("handle_map_{store_id}_products")
}

pub fn collections_key(store_id: &str) -> String {
    format!("collections_{store_id}_all")
}

pub fn pages_key(store_id: &str) -> String {
    format!("pages_{store_id}_all")
}

pub fn navigation_key(store_id: &str) -> String {
    format!("navigation_{store_id}_menus")
}

pub fn template_key(store_id: &str, path: &str) -> String {
    format!("template_{store_id}_{path}")
}

pub fn page_key(store_id: &str, path: &str, query_hash: u64) -> String {
    format!("page_{store_id}_{path}_{query_hash:x}")
}
