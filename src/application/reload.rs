//! Development live reload.
//!
//! Template or data changes fan out to connected browsers over SSE. Bursts
//! from bulk uploads are debounced per tenant so one sync does not trigger a
//! reload storm.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 64;
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadEventKind {
    Reload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadEvent {
    #[serde(rename = "type")]
    pub kind: ReloadEventKind,
    pub store_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl ReloadEvent {
    fn now(store_id: &str) -> Self {
        Self {
            kind: ReloadEventKind::Reload,
            store_id: store_id.to_string(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

pub struct ReloadHub {
    sender: broadcast::Sender<ReloadEvent>,
    last_trigger: DashMap<String, Instant>,
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            last_trigger: DashMap::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.sender.subscribe()
    }

    /// Notifies subscribers for the tenant unless a notification already went
    /// out inside the debounce window. Returns whether one was sent.
    pub fn trigger(&self, store_id: &str) -> bool {
        self.trigger_at(store_id, Instant::now())
    }

    fn trigger_at(&self, store_id: &str, now: Instant) -> bool {
        if let Some(last) = self.last_trigger.get(store_id)
            && now.duration_since(*last) < DEBOUNCE_WINDOW
        {
            debug!(store_id, "reload debounced");
            return false;
        }
        self.last_trigger.insert(store_id.to_string(), now);
        // No receivers connected is fine; send only fails then.
        let _ = self.sender.send(ReloadEvent::now(store_id));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_triggers_collapse_within_the_window() {
        let hub = ReloadHub::new();
        let mut receiver = hub.subscribe();
        let base = Instant::now();

        assert!(hub.trigger_at("store1", base));
        assert!(!hub.trigger_at("store1", base + Duration::from_millis(100)));
        assert!(hub.trigger_at("store1", base + Duration::from_millis(300)));

        assert_eq!(receiver.recv().await.expect("event").store_id, "store1");
        assert_eq!(receiver.recv().await.expect("event").store_id, "store1");
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn event_wire_shape_names_type_and_timestamp() {
        let wire = serde_json::to_value(ReloadEvent::now("store1")).expect("serialize");
        assert_eq!(wire["type"], serde_json::json!("reload"));
        assert_eq!(wire["storeId"], serde_json::json!("store1"));
        let timestamp = wire["timestamp"].as_str().expect("timestamp string");
        assert!(timestamp.contains('T'), "rfc3339 timestamp, got `{timestamp}`");
    }

    #[tokio::test]
    async fn tenants_debounce_independently() {
        let hub = ReloadHub::new();
        let base = Instant::now();
        assert!(hub.trigger_at("store1", base));
        assert!(hub.trigger_at("store2", base + Duration::from_millis(10)));
    }
}
