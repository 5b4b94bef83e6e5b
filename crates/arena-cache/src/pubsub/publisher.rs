//! Event publisher.
//!
//! Serializes events and publishes them on the shared store's pub/sub side
//! for distribution to every server instance.

use crate::pubsub::BusChannel;
use crate::store::{RedisStore, StoreResult};
use serde::{Deserialize, Serialize};

/// Event wrapper for pub/sub messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    /// Event type name (e.g., "USER_ONLINE", "USER_TYPING")
    pub event_type: String,
    /// Event payload
    pub data: serde_json::Value,
    /// Optional routing information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<EventTarget>,
}

/// Routing information for an event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventTarget {
    /// User IDs to exclude from receiving this event (e.g. the sender of a
    /// typing indicator)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub exclude_users: Vec<String>,
}

impl BusEvent {
    /// Create a new event
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            target: None,
        }
    }

    /// Exclude a user from delivery
    #[must_use]
    pub fn excluding(mut self, user_id: impl Into<String>) -> Self {
        self.target
            .get_or_insert_with(EventTarget::default)
            .exclude_users
            .push(user_id.into());
        self
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Pub/sub publisher over the Redis store
#[derive(Clone)]
pub struct Publisher {
    store: RedisStore,
}

impl Publisher {
    /// Create a new publisher
    #[must_use]
    pub fn new(store: RedisStore) -> Self {
        Self { store }
    }

    /// Publish an event to a channel; returns the subscriber count reached
    pub async fn publish(&self, channel: &BusChannel, event: &BusEvent) -> StoreResult<u32> {
        let channel_name = channel.name();
        let payload = event.to_json()?;

        let receivers = self.store.publish(&channel_name, &payload).await?;

        tracing::debug!(
            channel = %channel_name,
            event_type = %event.event_type,
            receivers = receivers,
            "Published event"
        );

        Ok(receivers)
    }
}
