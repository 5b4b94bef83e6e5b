//! Presence status
//!
//! The three-state machine a user's tracked connectivity moves through:
//! online ⇄ away ⇄ offline.

use serde::{Deserialize, Serialize};

/// A user's tracked connectivity state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    /// User has at least one live session and a fresh heartbeat
    Online,
    /// Sessions exist but the client is not actively live (e.g. backgrounded)
    Away,
    /// No live sessions
    Offline,
}

impl Default for PresenceStatus {
    fn default() -> Self {
        Self::Offline
    }
}

impl PresenceStatus {
    /// Check if this status counts toward the online set
    #[must_use]
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }

    /// Status string stored in the presence hash
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresenceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "away" => Ok(Self::Away),
            "offline" => Ok(Self::Offline),
            _ => Err(format!("Invalid status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(PresenceStatus::Online.to_string(), "online");
        assert_eq!(PresenceStatus::Away.to_string(), "away");
        assert_eq!(PresenceStatus::Offline.to_string(), "offline");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "online".parse::<PresenceStatus>().unwrap(),
            PresenceStatus::Online
        );
        assert_eq!(
            "AWAY".parse::<PresenceStatus>().unwrap(),
            PresenceStatus::Away
        );
        assert!("busy".parse::<PresenceStatus>().is_err());
    }

    #[test]
    fn test_default_is_offline() {
        assert_eq!(PresenceStatus::default(), PresenceStatus::Offline);
        assert!(!PresenceStatus::default().is_online());
    }
}
