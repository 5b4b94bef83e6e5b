//! Pub/sub subscriber.
//!
//! Maintains a dedicated Redis pub/sub connection on a background task,
//! reconnecting with a delay on failure and re-subscribing to every channel
//! it was following.

use crate::pubsub::{BusChannel, BusEvent};
use futures_util::StreamExt;
use redis::Client;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};

/// Error type for subscriber operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for subscriber operations
pub type SubscriberResult<T> = Result<T, SubscriberError>;

/// Message received from pub/sub
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// Channel the message was received on
    pub channel: BusChannel,
    /// Parsed event (if the payload was a valid event envelope)
    pub event: Option<BusEvent>,
    /// Raw payload
    pub payload: String,
}

impl BusMessage {
    /// Create from a raw wire message
    #[must_use]
    pub fn from_wire(channel_name: &str, payload: String) -> Self {
        let channel = BusChannel::parse(channel_name);
        let event = serde_json::from_str(&payload).ok();

        Self {
            channel,
            event,
            payload,
        }
    }
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Redis connection URL
    pub redis_url: String,
    /// Buffer size of the fan-out broadcast channel
    pub broadcast_buffer: usize,
    /// Reconnection delay in milliseconds
    pub reconnect_delay_ms: u64,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            broadcast_buffer: 1024,
            reconnect_delay_ms: 1000,
        }
    }
}

/// Commands for subscription management
#[derive(Debug)]
enum SubscriberCommand {
    Subscribe(Vec<String>),
    Unsubscribe(Vec<String>),
    Shutdown,
}

/// Redis pub/sub subscriber
pub struct Subscriber {
    /// Currently subscribed channels
    subscribed: Arc<RwLock<HashSet<String>>>,
    /// Broadcast sender for received messages
    broadcast_tx: broadcast::Sender<BusMessage>,
    /// Control channel for subscription management
    control_tx: mpsc::Sender<SubscriberCommand>,
}

impl Subscriber {
    /// Create a new subscriber and start the background listener
    #[must_use]
    pub fn new(config: SubscriberConfig) -> Self {
        let (broadcast_tx, _) = broadcast::channel(config.broadcast_buffer);
        let (control_tx, control_rx) = mpsc::channel(32);
        let subscribed = Arc::new(RwLock::new(HashSet::new()));

        tokio::spawn(Self::listener_loop(
            config,
            subscribed.clone(),
            broadcast_tx.clone(),
            control_rx,
        ));

        Self {
            subscribed,
            broadcast_tx,
            control_tx,
        }
    }

    /// Background listener loop with reconnection
    async fn listener_loop(
        config: SubscriberConfig,
        subscribed: Arc<RwLock<HashSet<String>>>,
        broadcast_tx: broadcast::Sender<BusMessage>,
        mut control_rx: mpsc::Receiver<SubscriberCommand>,
    ) {
        loop {
            match Self::run_listener(&config, &subscribed, &broadcast_tx, &mut control_rx).await {
                Ok(true) => {
                    tracing::info!("Subscriber shutting down");
                    break;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Subscriber error, reconnecting...");
                    tokio::time::sleep(tokio::time::Duration::from_millis(
                        config.reconnect_delay_ms,
                    ))
                    .await;
                }
            }
        }
    }

    /// Run the listener until error or shutdown; Ok(true) means stop for good
    async fn run_listener(
        config: &SubscriberConfig,
        subscribed: &Arc<RwLock<HashSet<String>>>,
        broadcast_tx: &broadcast::Sender<BusMessage>,
        control_rx: &mut mpsc::Receiver<SubscriberCommand>,
    ) -> SubscriberResult<bool> {
        let client = Client::open(config.redis_url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;

        // Re-subscribe to channels carried over a reconnect
        {
            let channels = subscribed.read().await;
            for channel in channels.iter() {
                pubsub.subscribe(channel).await?;
            }
        }

        tracing::info!("Subscriber connected");

        let mut stream = pubsub.on_message();

        loop {
            tokio::select! {
                msg = stream.next() => {
                    match msg {
                        Some(msg) => {
                            let channel_name = msg.get_channel_name().to_string();
                            let payload: String = msg.get_payload().unwrap_or_default();

                            // Ignore send errors - just means no receivers
                            let _ = broadcast_tx.send(BusMessage::from_wire(&channel_name, payload));
                        }
                        None => {
                            tracing::warn!("Pub/sub stream ended");
                            return Ok(false);
                        }
                    }
                }

                cmd = control_rx.recv() => {
                    match cmd {
                        Some(SubscriberCommand::Subscribe(channels)) => {
                            // The stream borrows pubsub; drop it to mutate subscriptions
                            drop(stream);
                            for channel in &channels {
                                if let Err(e) = pubsub.subscribe(channel).await {
                                    tracing::error!(channel = %channel, error = %e, "Failed to subscribe");
                                } else {
                                    subscribed.write().await.insert(channel.clone());
                                    tracing::debug!(channel = %channel, "Subscribed to channel");
                                }
                            }
                            stream = pubsub.on_message();
                        }
                        Some(SubscriberCommand::Unsubscribe(channels)) => {
                            drop(stream);
                            for channel in &channels {
                                if let Err(e) = pubsub.unsubscribe(channel).await {
                                    tracing::error!(channel = %channel, error = %e, "Failed to unsubscribe");
                                } else {
                                    subscribed.write().await.remove(channel);
                                    tracing::debug!(channel = %channel, "Unsubscribed from channel");
                                }
                            }
                            stream = pubsub.on_message();
                        }
                        Some(SubscriberCommand::Shutdown) | None => {
                            return Ok(true);
                        }
                    }
                }
            }
        }
    }

    /// Subscribe to channels
    pub async fn subscribe(&self, channels: &[BusChannel]) -> SubscriberResult<()> {
        let names: Vec<String> = channels.iter().map(BusChannel::name).collect();

        self.control_tx
            .send(SubscriberCommand::Subscribe(names))
            .await
            .map_err(|_| SubscriberError::ChannelClosed)
    }

    /// Unsubscribe from channels
    pub async fn unsubscribe(&self, channels: &[BusChannel]) -> SubscriberResult<()> {
        let names: Vec<String> = channels.iter().map(BusChannel::name).collect();

        self.control_tx
            .send(SubscriberCommand::Unsubscribe(names))
            .await
            .map_err(|_| SubscriberError::ChannelClosed)
    }

    /// Get a receiver for incoming messages
    #[must_use]
    pub fn receiver(&self) -> broadcast::Receiver<BusMessage> {
        self.broadcast_tx.subscribe()
    }

    /// Channels currently subscribed
    pub async fn subscribed_channels(&self) -> Vec<String> {
        self.subscribed.read().await.iter().cloned().collect()
    }

    /// Shutdown the subscriber
    pub async fn shutdown(&self) -> SubscriberResult<()> {
        self.control_tx
            .send(SubscriberCommand::Shutdown)
            .await
            .map_err(|_| SubscriberError::ChannelClosed)
    }
}
