//! Event dispatcher
//!
//! Receives events from the bus and delivers them to this instance's
//! connections. Events published locally arrive here too — every instance,
//! publisher included, delivers through the same path.

use crate::connection::ConnectionManager;
use crate::protocol::GatewayMessage;
use arena_cache::{BusChannel, BusMessage, EventBus};
use arena_core::UserId;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Routes bus messages to WebSocket connections
pub struct EventDispatcher {
    connection_manager: Arc<ConnectionManager>,
    bus: Arc<dyn EventBus>,
    running: Arc<AtomicBool>,
    sequence: Arc<AtomicU64>,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    pub fn new(bus: Arc<dyn EventBus>, connection_manager: Arc<ConnectionManager>) -> Self {
        Self {
            connection_manager,
            bus,
            running: Arc::new(AtomicBool::new(false)),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Start the dispatcher loop on a background task
    pub fn start(self: Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Event dispatcher is already running");
            return;
        }

        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.run().await;
        });

        tracing::info!("Event dispatcher started");
    }

    /// Stop the dispatcher
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the dispatcher is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn run(&self) {
        let mut receiver = self.bus.receiver();

        while self.running.load(Ordering::SeqCst) {
            match receiver.recv().await {
                Ok(msg) => {
                    self.handle_message(msg).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "Event dispatcher lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::warn!("Event dispatcher channel closed");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Event dispatcher loop ended");
    }

    /// Deliver one bus message to the connections it targets
    pub async fn handle_message(&self, msg: BusMessage) {
        let Some(event) = &msg.event else {
            tracing::debug!(
                channel = ?msg.channel,
                "Received non-event message, ignoring"
            );
            return;
        };

        let exclude: Vec<UserId> = event
            .target
            .as_ref()
            .map(|t| {
                t.exclude_users
                    .iter()
                    .filter_map(|u| u.parse().ok())
                    .collect()
            })
            .unwrap_or_default();

        let seq = self.next_sequence();
        let gateway_msg = GatewayMessage::dispatch(&event.event_type, seq, event.data.clone());

        match &msg.channel {
            BusChannel::Channel(channel_id) => {
                let sent = self
                    .connection_manager
                    .send_to_channel(*channel_id, gateway_msg, &exclude)
                    .await;

                tracing::trace!(
                    channel_id = %channel_id,
                    event_type = %event.event_type,
                    sent = sent,
                    "Event dispatched to channel"
                );
            }
            BusChannel::User(user_id) => {
                let sent = self
                    .connection_manager
                    .send_to_user(*user_id, gateway_msg)
                    .await;

                tracing::trace!(
                    user_id = %user_id,
                    event_type = %event.event_type,
                    sent = sent,
                    "Event dispatched to user"
                );
            }
            BusChannel::Broadcast => {
                let sent = self
                    .connection_manager
                    .broadcast(gateway_msg, &exclude)
                    .await;

                tracing::trace!(
                    event_type = %event.event_type,
                    sent = sent,
                    "Event broadcast to all"
                );
            }
            BusChannel::Custom(name) => {
                tracing::debug!(
                    channel = %name,
                    event_type = %event.event_type,
                    "Received event on custom channel, ignoring"
                );
            }
        }
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("running", &self.is_running())
            .finish()
    }
}
