//! Deterministic product handle derivation and collision resolution.
//!
//! A handle is the URL-safe identifier a storefront path uses to address a
//! record (`/products/{handle}`). Handles come from an explicit slug when one
//! is set and fall back to slugifying the product name (`slug` crate:
//! lowercase, diacritics stripped, non-alphanumerics collapsed to `-`).
//!
//! Several records can collide on the same normalized handle. The map must be
//! identical for a fixed record set regardless of enumeration order, so the
//! builder sorts candidates by id before folding and applies a total
//! preference order on collision.

use std::collections::HashMap;

use slug::slugify;

use super::entities::ProductRecord;

/// Mapping from normalized handle to the owning product id, scoped to one
/// store. Rebuilt whole on cache miss or detected mismatch, never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleMap {
    entries: HashMap<String, String>,
}

impl HandleMap {
    pub fn get(&self, handle: &str) -> Option<&str> {
        self.entries.get(handle).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute the handle a product publishes under: explicit slug first, derived
/// from the name otherwise. Empty when neither yields anything usable.
pub fn compute_handle(product: &ProductRecord) -> String {
    match product.slug.as_deref() {
        Some(slug) if !slug.trim().is_empty() => slug.trim().to_string(),
        _ => slugify(&product.name),
    }
}

/// Normalize a handle the way storefront paths are matched.
pub fn normalize_handle(handle: &str) -> String {
    slugify(handle)
}

fn effective_timestamp(product: &ProductRecord) -> i64 {
    product
        .updated_at
        .or(product.created_at)
        .map(|ts| ts.unix_timestamp())
        .unwrap_or(0)
}

/// Choose between two records colliding on `target_handle`.
///
/// Tiers, applied left to right until one disagrees:
/// 1. computed handle equal to `target_handle` verbatim beats a handle that
///    only matches after normalization collapse,
/// 2. active beats inactive,
/// 3. more recently updated wins; exact timestamp ties keep `b`, the
///    later-encountered candidate in the (sorted) fold.
pub fn pick_preferred<'a>(
    a: &'a ProductRecord,
    b: &'a ProductRecord,
    target_handle: &str,
) -> &'a ProductRecord {
    let exact_a = compute_handle(a) == target_handle;
    let exact_b = compute_handle(b) == target_handle;
    if exact_a != exact_b {
        return if exact_a { a } else { b };
    }

    if a.active != b.active {
        return if a.active { a } else { b };
    }

    if effective_timestamp(a) > effective_timestamp(b) {
        a
    } else {
        b
    }
}

/// Build the full handle map for a store's product set.
///
/// Candidates are sorted by id so the later-encountered tie-break stays
/// order-independent.
pub fn build_handle_map(products: &[ProductRecord]) -> HandleMap {
    let mut sorted: Vec<&ProductRecord> = products.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut winners: HashMap<String, &ProductRecord> = HashMap::new();
    for product in sorted {
        let computed = compute_handle(product);
        if computed.is_empty() {
            continue;
        }
        let key = normalize_handle(&computed);
        match winners.remove(&key) {
            Some(current) => {
                winners.insert(key.clone(), pick_preferred(current, product, &key));
            }
            None => {
                winners.insert(key, product);
            }
        }
    }

    HandleMap {
        entries: winners
            .into_iter()
            .map(|(handle, product)| (handle, product.id.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn product(id: &str, slug: Option<&str>, active: bool, updated_at: i64) -> ProductRecord {
        ProductRecord {
            id: id.to_string(),
            store_id: "store1".to_string(),
            name: format!("Product {id}"),
            slug: slug.map(str::to_string),
            active,
            featured: false,
            price: 1000,
            images: Vec::new(),
            created_at: None,
            updated_at: Some(
                OffsetDateTime::from_unix_timestamp(updated_at).expect("valid timestamp"),
            ),
        }
    }

    #[test]
    fn handle_prefers_explicit_slug() {
        let p = product("1", Some("red-shoe"), true, 0);
        assert_eq!(compute_handle(&p), "red-shoe");

        let mut unnamed = product("2", None, true, 0);
        unnamed.name = "Crème Brûlée Candle".to_string();
        assert_eq!(compute_handle(&unnamed), "creme-brulee-candle");
    }

    #[test]
    fn active_beats_recency() {
        let a = product("1", Some("red-shoe"), true, 100);
        let b = product("2", Some("red-shoe"), false, 200);

        let map = build_handle_map(&[a.clone(), b.clone()]);
        assert_eq!(map.get("red-shoe"), Some("1"));

        // Same set in reverse order resolves identically.
        let reversed = build_handle_map(&[b, a]);
        assert_eq!(reversed.get("red-shoe"), Some("1"));
    }

    #[test]
    fn exact_match_beats_activity_and_recency() {
        let exact = product("9", Some("red-shoe"), false, 1);
        let collapsed = product("2", Some("Red-Shoe"), true, 999);

        let map = build_handle_map(&[collapsed.clone(), exact.clone()]);
        assert_eq!(map.get("red-shoe"), Some("9"));

        let reversed = build_handle_map(&[exact, collapsed]);
        assert_eq!(reversed.get("red-shoe"), Some("9"));
    }

    #[test]
    fn recency_breaks_active_tie() {
        let older = product("1", Some("red-shoe"), true, 100);
        let newer = product("2", Some("red-shoe"), true, 200);

        let map = build_handle_map(&[older.clone(), newer.clone()]);
        assert_eq!(map.get("red-shoe"), Some("2"));
        let reversed = build_handle_map(&[newer, older]);
        assert_eq!(reversed.get("red-shoe"), Some("2"));
    }

    #[test]
    fn full_timestamp_tie_is_order_independent() {
        let a = product("a", Some("red-shoe"), true, 100);
        let b = product("b", Some("red-shoe"), true, 100);

        // Sorted fold keeps the later id on an exact tie, from either input order.
        let map = build_handle_map(&[a.clone(), b.clone()]);
        let reversed = build_handle_map(&[b, a]);
        assert_eq!(map, reversed);
        assert_eq!(map.get("red-shoe"), Some("b"));
    }

    #[test]
    fn empty_handles_are_skipped() {
        let mut blank = product("1", None, true, 0);
        blank.name = "  ".to_string();
        let map = build_handle_map(&[blank]);
        assert!(map.is_empty());
    }
}
