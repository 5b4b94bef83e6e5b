//! The event-bus seam.
//!
//! Everything above this module publishes and receives through [`EventBus`];
//! whether events cross process boundaries (Redis) or stay in-process
//! (tests, single-node development) is an implementation detail.

use crate::pubsub::{
    BusChannel, BusEvent, BusMessage, Publisher, Subscriber, SubscriberConfig, SubscriberError,
};
use crate::store::{RedisStore, StoreError};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Error type for bus operations
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Subscriber(#[from] SubscriberError),
}

/// Result type for bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Cross-instance event bus
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event; returns the number of subscribers reached
    async fn publish(&self, channel: &BusChannel, event: &BusEvent) -> BusResult<u32>;

    /// Start receiving events published on the given channels
    async fn subscribe(&self, channels: &[BusChannel]) -> BusResult<()>;

    /// Stop receiving events from the given channels
    async fn unsubscribe(&self, channels: &[BusChannel]) -> BusResult<()>;

    /// Get a receiver for incoming messages
    fn receiver(&self) -> broadcast::Receiver<BusMessage>;
}

/// Redis-backed bus: publishes through the store pool, receives on a
/// dedicated reconnecting pub/sub connection.
pub struct RedisEventBus {
    publisher: Publisher,
    subscriber: Subscriber,
}

impl RedisEventBus {
    /// Create a bus over the given store, subscribing from `config.redis_url`
    #[must_use]
    pub fn new(store: RedisStore, config: SubscriberConfig) -> Self {
        Self {
            publisher: Publisher::new(store),
            subscriber: Subscriber::new(config),
        }
    }

    /// Shut down the subscriber task
    pub async fn shutdown(&self) -> BusResult<()> {
        self.subscriber.shutdown().await?;
        Ok(())
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    async fn publish(&self, channel: &BusChannel, event: &BusEvent) -> BusResult<u32> {
        Ok(self.publisher.publish(channel, event).await?)
    }

    async fn subscribe(&self, channels: &[BusChannel]) -> BusResult<()> {
        Ok(self.subscriber.subscribe(channels).await?)
    }

    async fn unsubscribe(&self, channels: &[BusChannel]) -> BusResult<()> {
        Ok(self.subscriber.unsubscribe(channels).await?)
    }

    fn receiver(&self) -> broadcast::Receiver<BusMessage> {
        self.subscriber.receiver()
    }
}

/// In-process bus. Delivers every published event to every receiver;
/// subscribe/unsubscribe are no-ops since nothing crosses a process
/// boundary.
pub struct MemoryBus {
    tx: broadcast::Sender<BusMessage>,
}

impl MemoryBus {
    /// Create a bus with the given buffer size
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer);
        Self { tx }
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl EventBus for MemoryBus {
    async fn publish(&self, channel: &BusChannel, event: &BusEvent) -> BusResult<u32> {
        let payload = event.to_json().map_err(StoreError::from)?;
        let message = BusMessage {
            channel: channel.clone(),
            event: Some(event.clone()),
            payload,
        };
        // Send errors just mean no receivers are listening
        Ok(self.tx.send(message).map(|n| n as u32).unwrap_or(0))
    }

    async fn subscribe(&self, _channels: &[BusChannel]) -> BusResult<()> {
        Ok(())
    }

    async fn unsubscribe(&self, _channels: &[BusChannel]) -> BusResult<()> {
        Ok(())
    }

    fn receiver(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }
}
