//! Pub/sub channel naming.
//!
//! Channel names are their own namespace, distinct from store keys, but
//! equally part of the cross-instance contract.

use arena_core::{ChannelId, UserId};

/// Prefix for chat-channel-scoped events
pub const CHANNEL_PREFIX: &str = "channel:";
/// Prefix for user-scoped events (all of a user's sessions)
pub const USER_PREFIX: &str = "user:";
/// Channel for events every connected client should see
pub const BROADCAST_CHANNEL: &str = "broadcast";

/// Pub/sub channel types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BusChannel {
    /// Events for a specific chat channel
    Channel(ChannelId),
    /// Events for a specific user (all their sessions)
    User(UserId),
    /// Broadcast to all connected clients
    Broadcast,
    /// Custom channel name
    Custom(String),
}

impl BusChannel {
    /// Create a chat-channel channel
    #[must_use]
    pub fn channel(channel_id: ChannelId) -> Self {
        Self::Channel(channel_id)
    }

    /// Create a user channel
    #[must_use]
    pub fn user(user_id: UserId) -> Self {
        Self::User(user_id)
    }

    /// Create the broadcast channel
    #[must_use]
    pub fn broadcast() -> Self {
        Self::Broadcast
    }

    /// Get the wire channel name
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Channel(id) => format!("{CHANNEL_PREFIX}{id}"),
            Self::User(id) => format!("{USER_PREFIX}{id}"),
            Self::Broadcast => BROADCAST_CHANNEL.to_string(),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Parse a wire channel name back to a `BusChannel`
    #[must_use]
    pub fn parse(name: &str) -> Self {
        if name == BROADCAST_CHANNEL {
            return Self::Broadcast;
        }

        if let Some(id_str) = name.strip_prefix(CHANNEL_PREFIX) {
            if let Ok(id) = id_str.parse::<ChannelId>() {
                return Self::Channel(id);
            }
        }

        if let Some(id_str) = name.strip_prefix(USER_PREFIX) {
            if let Ok(id) = id_str.parse::<UserId>() {
                return Self::User(id);
            }
        }

        Self::Custom(name.to_string())
    }
}

impl std::fmt::Display for BusChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        let channel_id = ChannelId::random();
        let user_id = UserId::random();

        assert_eq!(
            BusChannel::channel(channel_id).name(),
            format!("channel:{channel_id}")
        );
        assert_eq!(BusChannel::user(user_id).name(), format!("user:{user_id}"));
        assert_eq!(BusChannel::broadcast().name(), "broadcast");
    }

    #[test]
    fn test_channel_parse_roundtrip() {
        let channel_id = ChannelId::random();
        let user_id = UserId::random();

        assert_eq!(
            BusChannel::parse(&format!("channel:{channel_id}")),
            BusChannel::Channel(channel_id)
        );
        assert_eq!(
            BusChannel::parse(&format!("user:{user_id}")),
            BusChannel::User(user_id)
        );
        assert_eq!(BusChannel::parse("broadcast"), BusChannel::Broadcast);
    }

    #[test]
    fn test_unparseable_names_become_custom() {
        assert_eq!(
            BusChannel::parse("channel:not-a-uuid"),
            BusChannel::Custom("channel:not-a-uuid".to_string())
        );
        assert_eq!(
            BusChannel::parse("something-else"),
            BusChannel::Custom("something-else".to_string())
        );
    }
}
