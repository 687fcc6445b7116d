//! Inbound cache-change events.
//!
//! Write paths elsewhere in the platform (admin dashboard, sync jobs) notify
//! the renderer through these events; the invalidator maps them onto key
//! deletions. Events carry a UUID for idempotent handling downstream.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    ProductCreated,
    ProductUpdated,
    ProductDeleted,
    CollectionCreated,
    CollectionUpdated,
    PageCreated,
    PageUpdated,
    NavigationUpdated,
    TemplateUpdated,
    StoreSettingsUpdated,
}

impl ChangeType {
    /// True when the change can affect rendered template output paths.
    pub fn affects_templates(&self) -> bool {
        matches!(
            self,
            ChangeType::TemplateUpdated | ChangeType::StoreSettingsUpdated
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub change_type: ChangeType,
    pub store_id: String,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub entity_ids: Option<Vec<String>>,
    /// Template path for `template_updated` events.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(with = "time::serde::rfc3339", default = "OffsetDateTime::now_utc")]
    pub timestamp: OffsetDateTime,
}

impl ChangeEvent {
    pub fn new(change_type: ChangeType, store_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            change_type,
            store_id: store_id.into(),
            entity_id: None,
            entity_ids: None,
            path: None,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn with_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// All entity ids named by the event, whichever field carried them.
    pub fn entity_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        if let Some(id) = self.entity_id.as_deref() {
            ids.push(id);
        }
        if let Some(more) = &self.entity_ids {
            ids.extend(more.iter().map(String::as_str));
        }
        ids
    }
}
