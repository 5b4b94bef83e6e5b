//! Individual WebSocket connection
//!
//! One live socket and its lifecycle state. The state machine is explicit
//! and transport-free: handlers request transitions, invalid ones are
//! rejected, and tests drive it without a socket.

use crate::protocol::GatewayMessage;
use arena_core::{ChannelId, SessionId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Socket accepted, waiting for Identify
    Connecting,
    /// Token verified, session registered
    Authenticated,
    /// Subscribed to channel feeds
    Joined,
    /// Connection is closed
    Disconnected,
}

impl ConnectionState {
    /// Check whether a transition to `next` is legal.
    ///
    /// Disconnection is reachable from anywhere (the transport can drop at
    /// any moment); everything else moves strictly forward. Re-entering
    /// `Joined` is allowed so a repeated join request stays idempotent.
    #[must_use]
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::{Authenticated, Connecting, Disconnected, Joined};
        match (self, next) {
            (_, Disconnected) => self != Disconnected,
            (Connecting, Authenticated) => true,
            (Authenticated | Joined, Joined) => true,
            _ => false,
        }
    }
}

/// A single WebSocket connection
pub struct Connection {
    /// Unique session ID
    session_id: SessionId,

    /// Authenticated user ID (None until Identify)
    user_id: RwLock<Option<UserId>>,

    /// Current lifecycle state
    state: RwLock<ConnectionState>,

    /// Channel to send messages to the WebSocket
    sender: mpsc::Sender<GatewayMessage>,

    /// Last sequence number sent
    sequence: AtomicU64,

    /// Last heartbeat received
    last_heartbeat: RwLock<Instant>,

    /// Channels this connection is subscribed to
    channels: RwLock<HashSet<ChannelId>>,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new connection in the `Connecting` state
    pub fn new(session_id: SessionId, sender: mpsc::Sender<GatewayMessage>) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            user_id: RwLock::new(None),
            state: RwLock::new(ConnectionState::Connecting),
            sender,
            sequence: AtomicU64::new(0),
            last_heartbeat: RwLock::new(Instant::now()),
            channels: RwLock::new(HashSet::new()),
            created_at: Instant::now(),
        })
    }

    /// Get the session ID
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Get the user ID (if authenticated)
    pub async fn user_id(&self) -> Option<UserId> {
        *self.user_id.read().await
    }

    /// Set the user ID (on successful authentication)
    pub async fn set_user_id(&self, user_id: UserId) {
        *self.user_id.write().await = Some(user_id);
    }

    /// Get the current state
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Attempt a state transition; returns false and leaves the state
    /// untouched if the edge is not in the transition table.
    pub async fn transition(&self, next: ConnectionState) -> bool {
        let mut state = self.state.write().await;
        if !state.can_transition_to(next) {
            tracing::debug!(
                session_id = %self.session_id,
                from = ?*state,
                to = ?next,
                "Rejected connection state transition"
            );
            return false;
        }

        tracing::trace!(
            session_id = %self.session_id,
            from = ?*state,
            to = ?next,
            "Connection state transition"
        );
        *state = next;
        true
    }

    /// Check if the connection is authenticated
    pub async fn is_authenticated(&self) -> bool {
        self.user_id.read().await.is_some()
    }

    /// Get the next sequence number
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record a heartbeat received
    pub async fn record_heartbeat(&self) {
        *self.last_heartbeat.write().await = Instant::now();
    }

    /// Get time since last heartbeat
    pub async fn time_since_heartbeat(&self) -> std::time::Duration {
        self.last_heartbeat.read().await.elapsed()
    }

    /// Add a channel subscription
    pub async fn subscribe_channel(&self, channel_id: ChannelId) {
        self.channels.write().await.insert(channel_id);
    }

    /// Get all subscribed channels
    pub async fn channels(&self) -> Vec<ChannelId> {
        self.channels.read().await.iter().copied().collect()
    }

    /// Check if subscribed to a channel
    pub async fn is_subscribed_to(&self, channel_id: ChannelId) -> bool {
        self.channels.read().await.contains(&channel_id)
    }

    /// Get connection age
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Send a message to this connection
    pub async fn send(
        &self,
        message: GatewayMessage,
    ) -> Result<(), mpsc::error::SendError<GatewayMessage>> {
        self.sender.send(message).await
    }

    /// Check if the sender channel is closed
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("sequence", &self.sequence.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> Arc<Connection> {
        let (tx, _rx) = mpsc::channel(10);
        Connection::new(SessionId::generate(), tx)
    }

    #[tokio::test]
    async fn test_connection_starts_connecting() {
        let conn = connection();
        assert_eq!(conn.state().await, ConnectionState::Connecting);
        assert!(!conn.is_authenticated().await);
        assert!(conn.user_id().await.is_none());
    }

    #[tokio::test]
    async fn test_full_lifecycle_transitions() {
        let conn = connection();

        assert!(conn.transition(ConnectionState::Authenticated).await);
        assert!(conn.transition(ConnectionState::Joined).await);
        // Join again is idempotent
        assert!(conn.transition(ConnectionState::Joined).await);
        assert!(conn.transition(ConnectionState::Disconnected).await);
        assert_eq!(conn.state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_invalid_transitions_rejected() {
        let conn = connection();

        // Cannot join before authenticating
        assert!(!conn.transition(ConnectionState::Joined).await);
        assert_eq!(conn.state().await, ConnectionState::Connecting);

        assert!(conn.transition(ConnectionState::Disconnected).await);
        // Nothing leaves Disconnected
        assert!(!conn.transition(ConnectionState::Authenticated).await);
        assert!(!conn.transition(ConnectionState::Disconnected).await);
    }

    #[tokio::test]
    async fn test_disconnect_reachable_from_any_live_state() {
        for setup in [ConnectionState::Authenticated, ConnectionState::Joined] {
            let conn = connection();
            conn.transition(ConnectionState::Authenticated).await;
            if setup == ConnectionState::Joined {
                conn.transition(ConnectionState::Joined).await;
            }
            assert!(conn.transition(ConnectionState::Disconnected).await);
        }
    }

    #[tokio::test]
    async fn test_sequence_numbers() {
        let conn = connection();
        assert_eq!(conn.next_sequence(), 1);
        assert_eq!(conn.next_sequence(), 2);
    }

    #[tokio::test]
    async fn test_channel_subscriptions() {
        let conn = connection();
        let channel = ChannelId::random();

        conn.subscribe_channel(channel).await;
        assert!(conn.is_subscribed_to(channel).await);
        assert_eq!(conn.channels().await.len(), 1);

        // Re-subscribing does not duplicate
        conn.subscribe_channel(channel).await;
        assert_eq!(conn.channels().await.len(), 1);
    }
}
