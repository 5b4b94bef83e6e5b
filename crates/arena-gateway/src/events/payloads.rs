//! Event payload definitions

use arena_core::{ChannelId, PresenceStatus, SessionId, UserId};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// READY event payload, sent after successful Identify.
///
/// Carries the online snapshot so a fresh client renders presence without a
/// follow-up request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyEvent {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub online_count: usize,
    pub online_user_ids: Vec<UserId>,
    pub timestamp: i64,
}

/// USER_ONLINE / USER_PRESENCE_UPDATED payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub user_id: UserId,
    pub status: PresenceStatus,
    pub timestamp: i64,
    pub instance_id: String,
}

impl PresenceEvent {
    /// Stamp a presence event now
    #[must_use]
    pub fn now(user_id: UserId, status: PresenceStatus, instance_id: impl Into<String>) -> Self {
        Self {
            user_id,
            status,
            timestamp: Utc::now().timestamp(),
            instance_id: instance_id.into(),
        }
    }
}

/// USER_OFFLINE payload; `last_seen` lets clients show "last seen" copy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineEvent {
    pub user_id: UserId,
    pub status: PresenceStatus,
    pub last_seen: i64,
    pub timestamp: i64,
    pub instance_id: String,
}

impl OfflineEvent {
    /// Stamp an offline event now
    #[must_use]
    pub fn now(user_id: UserId, instance_id: impl Into<String>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            user_id,
            status: PresenceStatus::Offline,
            last_seen: now,
            timestamp: now,
            instance_id: instance_id.into(),
        }
    }
}

/// USER_TYPING payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingEvent {
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub is_typing: bool,
    pub timestamp: i64,
}

impl TypingEvent {
    /// Stamp a typing event now
    #[must_use]
    pub fn now(user_id: UserId, channel_id: ChannelId, is_typing: bool) -> Self {
        Self {
            user_id,
            channel_id,
            is_typing,
            timestamp: Utc::now().timestamp(),
        }
    }
}

/// USER_JOINED_CHANNEL payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelJoinEvent {
    pub channel_id: ChannelId,
    pub user_id: UserId,
    pub timestamp: i64,
}

/// ONLINE_USERS reply payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineUsersEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
    pub count: usize,
    pub user_ids: Vec<UserId>,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_event_serialization() {
        let event = PresenceEvent::now(UserId::random(), PresenceStatus::Online, "gw-1");
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains("\"status\":\"online\""));
        assert!(json.contains("\"instance_id\":\"gw-1\""));
    }

    #[test]
    fn test_offline_event_carries_last_seen() {
        let event = OfflineEvent::now(UserId::random(), "gw-2");
        assert_eq!(event.status, PresenceStatus::Offline);
        assert_eq!(event.last_seen, event.timestamp);
    }

    #[test]
    fn test_typing_event_roundtrip() {
        let event = TypingEvent::now(UserId::random(), ChannelId::random(), true);
        let json = serde_json::to_string(&event).unwrap();
        let parsed: TypingEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.user_id, event.user_id);
        assert!(parsed.is_typing);
    }
}
