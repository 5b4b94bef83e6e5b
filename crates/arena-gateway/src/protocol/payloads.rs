//! Client payload definitions

use arena_core::{ChannelId, PresenceStatus};
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds. Kept under half the server-side
    /// heartbeat TTL so a single missed beat never reads as a drop.
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    /// Default heartbeat interval (45 seconds)
    pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 45_000;

    /// Create a Hello payload with the default interval
    #[must_use]
    pub fn new() -> Self {
        Self {
            heartbeat_interval: Self::DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    /// Create a Hello payload with a custom interval
    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

impl Default for HelloPayload {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload for op 2 (Identify)
///
/// Sent by the client to authenticate the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Access token issued by the platform's auth service
    pub token: String,
}

/// Payload for op 3 (Presence Update)
///
/// Sent by the client to change their status manually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceUpdatePayload {
    /// New status (online, away, offline)
    pub status: String,
}

impl PresenceUpdatePayload {
    /// Parse the requested status, if valid
    #[must_use]
    pub fn status(&self) -> Option<PresenceStatus> {
        self.status.parse().ok()
    }
}

/// Payload for ops 5/6 (Typing Start / Typing Stop)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingPayload {
    /// Channel the indicator applies to
    pub channel_id: ChannelId,
}

/// Payload for op 7 (Online Users)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnlineUsersPayload {
    /// Restrict to one channel; omit for the global list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
}
