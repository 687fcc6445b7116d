//! Raw persistence records consumed by the rendering core.
//!
//! These mirror what the opaque data store returns for each tenant. The
//! renderer never mutates them; derived views live in the application layer.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A tenant (store) record, resolved from an inbound domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRecord {
    pub id: String,
    pub name: String,
    pub domain: String,
    /// ISO currency code, e.g. `USD`.
    pub currency: Option<String>,
    /// Display format string, e.g. `${{amount}}`.
    pub money_format: Option<String>,
    pub locale: Option<String>,
    pub decimal_places: Option<u8>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    /// Active theme name; also the template directory prefix.
    pub theme: Option<String>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: String,
    pub store_id: String,
    pub name: String,
    /// Explicit slug; when absent the handle is derived from `name`.
    pub slug: Option<String>,
    pub active: bool,
    pub featured: bool,
    /// Unit price in minor currency units.
    pub price: i64,
    pub images: Vec<String>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub created_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub updated_at: Option<OffsetDateTime>,
}

/// One page of a cursor-driven product listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<ProductRecord>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionRecord {
    pub id: String,
    pub store_id: String,
    pub title: String,
    pub slug: Option<String>,
    pub active: bool,
    pub product_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub id: String,
    pub store_id: String,
    pub title: String,
    pub slug: String,
    pub visible: bool,
    /// Template path override; defaults to the generic page template.
    pub template: Option<String>,
}

/// Raw navigation menu as stored. `menu_data` may arrive as a JSON array or
/// as a serialized string; the navigation processor tolerates both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationMenuRecord {
    pub id: String,
    pub store_id: String,
    pub domain: String,
    pub name: String,
    pub handle: String,
    pub is_main: bool,
    pub is_active: bool,
    #[serde(default)]
    pub menu_data: serde_json::Value,
}
