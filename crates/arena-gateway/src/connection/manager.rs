//! Connection manager
//!
//! Tracks this instance's live connections with concurrent maps. Only local
//! bookkeeping lives here; cross-instance state belongs to the shared store.

use super::{Connection, ConnectionState};
use crate::protocol::GatewayMessage;
use arena_core::{ChannelId, SessionId, UserId};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Manages all active WebSocket connections on this instance
pub struct ConnectionManager {
    /// Active connections by session ID
    connections: DashMap<SessionId, Arc<Connection>>,

    /// User ID to session IDs mapping
    user_connections: DashMap<UserId, HashSet<SessionId>>,

    /// Channel ID to session IDs mapping
    channel_connections: DashMap<ChannelId, HashSet<SessionId>>,
}

impl ConnectionManager {
    /// Create a new connection manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_connections: DashMap::new(),
            channel_connections: DashMap::new(),
        }
    }

    /// Create a new connection manager wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection
    pub fn add_connection(
        &self,
        session_id: SessionId,
        sender: mpsc::Sender<GatewayMessage>,
    ) -> Arc<Connection> {
        let connection = Connection::new(session_id.clone(), sender);
        self.connections.insert(session_id.clone(), connection.clone());

        tracing::debug!(session_id = %session_id, "Connection added");

        connection
    }

    /// Remove a connection and its index entries.
    ///
    /// Uses `alter`/`retain` for atomic modify-and-cleanup to avoid TOCTOU
    /// races between concurrent disconnects.
    pub async fn remove_connection(&self, session_id: &SessionId) {
        if let Some((_, connection)) = self.connections.remove(session_id) {
            if let Some(user_id) = connection.user_id().await {
                self.user_connections.alter(&user_id, |_, mut sessions| {
                    sessions.remove(session_id);
                    sessions
                });
                self.user_connections.retain(|_, sessions| !sessions.is_empty());
            }

            for channel_id in connection.channels().await {
                self.channel_connections.alter(&channel_id, |_, mut sessions| {
                    sessions.remove(session_id);
                    sessions
                });
            }
            self.channel_connections
                .retain(|_, sessions| !sessions.is_empty());

            tracing::debug!(session_id = %session_id, "Connection removed");
        }
    }

    /// Get a connection by session ID
    pub fn get_connection(&self, session_id: &SessionId) -> Option<Arc<Connection>> {
        self.connections.get(session_id).map(|r| r.clone())
    }

    /// Link a connection to a user after Identify
    pub async fn authenticate_connection(&self, session_id: &SessionId, user_id: UserId) -> bool {
        if let Some(connection) = self.connections.get(session_id) {
            connection.set_user_id(user_id).await;
            connection.transition(ConnectionState::Authenticated).await;

            self.user_connections
                .entry(user_id)
                .or_default()
                .insert(session_id.clone());

            tracing::debug!(
                session_id = %session_id,
                user_id = %user_id,
                "Connection authenticated"
            );

            true
        } else {
            false
        }
    }

    /// Subscribe a connection to a channel's live feed
    pub async fn subscribe_to_channel(
        &self,
        session_id: &SessionId,
        channel_id: ChannelId,
    ) -> bool {
        if let Some(connection) = self.connections.get(session_id) {
            connection.subscribe_channel(channel_id).await;

            self.channel_connections
                .entry(channel_id)
                .or_default()
                .insert(session_id.clone());

            tracing::trace!(
                session_id = %session_id,
                channel_id = %channel_id,
                "Connection subscribed to channel"
            );

            true
        } else {
            false
        }
    }

    /// Get all connections for a user
    pub fn get_user_connections(&self, user_id: UserId) -> Vec<Arc<Connection>> {
        self.user_connections
            .get(&user_id)
            .map(|sessions| {
                sessions
                    .iter()
                    .filter_map(|sid| self.connections.get(sid).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get all connections subscribed to a channel
    pub fn get_channel_connections(&self, channel_id: ChannelId) -> Vec<Arc<Connection>> {
        self.channel_connections
            .get(&channel_id)
            .map(|sessions| {
                sessions
                    .iter()
                    .filter_map(|sid| self.connections.get(sid).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Send a message to all connections of a user
    pub async fn send_to_user(&self, user_id: UserId, message: GatewayMessage) -> usize {
        let mut sent = 0;
        for conn in self.get_user_connections(user_id) {
            if conn.send(message.clone()).await.is_ok() {
                sent += 1;
            }
        }
        sent
    }

    /// Send a message to a channel's subscribers, minus any excluded users
    pub async fn send_to_channel(
        &self,
        channel_id: ChannelId,
        message: GatewayMessage,
        exclude_users: &[UserId],
    ) -> usize {
        let mut sent = 0;
        for conn in self.get_channel_connections(channel_id) {
            if let Some(user_id) = conn.user_id().await {
                if exclude_users.contains(&user_id) {
                    continue;
                }
            }
            if conn.send(message.clone()).await.is_ok() {
                sent += 1;
            }
        }
        sent
    }

    /// Broadcast a message to every connection, minus any excluded users
    pub async fn broadcast(&self, message: GatewayMessage, exclude_users: &[UserId]) -> usize {
        let connections: Vec<Arc<Connection>> =
            self.connections.iter().map(|r| r.clone()).collect();

        let mut sent = 0;
        for conn in connections {
            if let Some(user_id) = conn.user_id().await {
                if exclude_users.contains(&user_id) {
                    continue;
                }
            }
            if conn.send(message.clone()).await.is_ok() {
                sent += 1;
            }
        }
        sent
    }

    /// Total number of active connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of unique authenticated users on this instance
    pub fn user_count(&self) -> usize {
        self.user_connections.len()
    }

    /// Clean up connections whose send channel has closed
    pub async fn cleanup_closed_connections(&self) -> usize {
        let closed: Vec<SessionId> = self
            .connections
            .iter()
            .filter(|r| r.is_closed())
            .map(|r| r.key().clone())
            .collect();

        let count = closed.len();
        for session_id in closed {
            self.remove_connection(&session_id).await;
        }

        if count > 0 {
            tracing::info!(count = count, "Cleaned up closed connections");
        }

        count
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("users", &self.user_connections.len())
            .field("channels", &self.channel_connections.len())
            .finish()
    }
}
