//! Gateway event types
//!
//! Event names carried in the `t` field of dispatch messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gateway event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayEventType {
    /// Sent after successful Identify
    Ready,
    /// A user came online
    UserOnline,
    /// A user went offline
    UserOffline,
    /// A user changed status manually
    UserPresenceUpdated,
    /// A user started or stopped typing
    UserTyping,
    /// A user joined a channel's live feed
    UserJoinedChannel,
    /// Reply to an online-users request
    OnlineUsers,
}

impl GatewayEventType {
    /// Get the string representation of the event type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::UserOnline => "USER_ONLINE",
            Self::UserOffline => "USER_OFFLINE",
            Self::UserPresenceUpdated => "USER_PRESENCE_UPDATED",
            Self::UserTyping => "USER_TYPING",
            Self::UserJoinedChannel => "USER_JOINED_CHANNEL",
            Self::OnlineUsers => "ONLINE_USERS",
        }
    }

    /// Parse from the wire name
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "READY" => Some(Self::Ready),
            "USER_ONLINE" => Some(Self::UserOnline),
            "USER_OFFLINE" => Some(Self::UserOffline),
            "USER_PRESENCE_UPDATED" => Some(Self::UserPresenceUpdated),
            "USER_TYPING" => Some(Self::UserTyping),
            "USER_JOINED_CHANNEL" => Some(Self::UserJoinedChannel),
            "ONLINE_USERS" => Some(Self::OnlineUsers),
            _ => None,
        }
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_roundtrip() {
        for event in [
            GatewayEventType::Ready,
            GatewayEventType::UserOnline,
            GatewayEventType::UserOffline,
            GatewayEventType::UserPresenceUpdated,
            GatewayEventType::UserTyping,
            GatewayEventType::UserJoinedChannel,
            GatewayEventType::OnlineUsers,
        ] {
            assert_eq!(GatewayEventType::parse(event.as_str()), Some(event));
        }
        assert_eq!(GatewayEventType::parse("MESSAGE_CREATE"), None);
    }

    #[test]
    fn test_serde_names_match_as_str() {
        let json = serde_json::to_string(&GatewayEventType::UserPresenceUpdated).unwrap();
        assert_eq!(json, "\"USER_PRESENCE_UPDATED\"");
    }
}
