//! Record types crossing the store edge.
//!
//! Presence and session state live in store hashes. The (de)serialization
//! boundary is explicit: `to_fields` produces the exact field list written,
//! `from_fields` reads one back. Malformed or missing fields degrade to safe
//! defaults rather than erroring — a half-written record is treated like a
//! cache miss, never a crash.

use arena_core::{PresenceStatus, SessionId, UserId};
use chrono::Utc;
use std::collections::HashMap;

fn parse_i64(fields: &HashMap<String, String>, name: &str) -> i64 {
    fields
        .get(name)
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0)
}

/// Per-user presence record (`presence:{userId}` hash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceRecord {
    /// Current status
    pub status: PresenceStatus,
    /// When the user was last seen (unix seconds)
    pub last_seen: i64,
    /// When this record was last written (unix seconds)
    pub updated_at: i64,
    /// Session count at write time; informational, the session set is
    /// authoritative
    pub session_count: u64,
    /// Session that triggered the last write, if any
    pub last_session_id: Option<SessionId>,
}

impl PresenceRecord {
    /// Create a record stamped with the current time
    #[must_use]
    pub fn new(status: PresenceStatus, session_count: u64, last_session_id: Option<SessionId>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            status,
            last_seen: now,
            updated_at: now,
            session_count,
            last_session_id,
        }
    }

    /// Serialize to hash fields
    #[must_use]
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("status", self.status.to_string()),
            ("last_seen", self.last_seen.to_string()),
            ("updated_at", self.updated_at.to_string()),
            ("session_count", self.session_count.to_string()),
        ];
        if let Some(session_id) = &self.last_session_id {
            fields.push(("last_session_id", session_id.to_string()));
        }
        fields
    }

    /// Deserialize from hash fields; `None` only when the hash is missing
    /// entirely. Unparseable fields fall back to defaults.
    #[must_use]
    pub fn from_fields(fields: &HashMap<String, String>) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }
        Some(Self {
            status: fields
                .get("status")
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            last_seen: parse_i64(fields, "last_seen"),
            updated_at: parse_i64(fields, "updated_at"),
            session_count: fields
                .get("session_count")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            last_session_id: fields
                .get("last_session_id")
                .filter(|s| !s.is_empty())
                .map(SessionId::new),
        })
    }

    /// Check if the record claims the user is online
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.status.is_online()
    }
}

/// Per-session record (`session:{sessionId}` hash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Session id (the hash key suffix; not stored as a field)
    pub id: SessionId,
    /// Owning user
    pub user_id: UserId,
    /// Creation timestamp (unix seconds)
    pub created_at: i64,
    /// Last activity timestamp (unix seconds)
    pub last_active: i64,
    /// Server process that accepted the connection
    pub instance_id: String,
}

impl SessionRecord {
    /// Create a record stamped with the current time
    #[must_use]
    pub fn new(id: SessionId, user_id: UserId, instance_id: impl Into<String>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id,
            user_id,
            created_at: now,
            last_active: now,
            instance_id: instance_id.into(),
        }
    }

    /// Serialize to hash fields
    #[must_use]
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("user_id", self.user_id.to_string()),
            ("created_at", self.created_at.to_string()),
            ("last_active", self.last_active.to_string()),
            ("status", "active".to_string()),
            ("instance_id", self.instance_id.clone()),
        ]
    }

    /// Deserialize from hash fields.
    ///
    /// Returns `None` for a missing hash or one without a parseable owner —
    /// either way the session is unusable and the caller prunes it.
    #[must_use]
    pub fn from_fields(id: SessionId, fields: &HashMap<String, String>) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }
        let user_id = fields.get("user_id")?.parse::<UserId>().ok()?;
        Some(Self {
            id,
            user_id,
            created_at: parse_i64(fields, "created_at"),
            last_active: parse_i64(fields, "last_active"),
            instance_id: fields.get("instance_id").cloned().unwrap_or_default(),
        })
    }

    /// Seconds since the session last showed activity
    #[must_use]
    pub fn idle_secs(&self, now: i64) -> i64 {
        (now - self.last_active).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields_of(pairs: Vec<(&'static str, String)>) -> HashMap<String, String> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_presence_record_roundtrip() {
        let session_id = SessionId::generate();
        let record = PresenceRecord::new(PresenceStatus::Online, 2, Some(session_id.clone()));

        let parsed = PresenceRecord::from_fields(&fields_of(record.to_fields())).unwrap();

        assert_eq!(parsed.status, PresenceStatus::Online);
        assert_eq!(parsed.session_count, 2);
        assert_eq!(parsed.last_session_id, Some(session_id));
        assert!(parsed.is_online());
    }

    #[test]
    fn test_presence_record_missing_hash() {
        assert!(PresenceRecord::from_fields(&HashMap::new()).is_none());
    }

    #[test]
    fn test_presence_record_malformed_fields_default() {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), "banana".to_string());
        fields.insert("session_count".to_string(), "-3".to_string());

        let record = PresenceRecord::from_fields(&fields).unwrap();
        assert_eq!(record.status, PresenceStatus::Offline);
        assert_eq!(record.session_count, 0);
        assert_eq!(record.last_seen, 0);
    }

    #[test]
    fn test_session_record_roundtrip() {
        let user_id = UserId::random();
        let session_id = SessionId::generate();
        let record = SessionRecord::new(session_id.clone(), user_id, "gw-1");

        let parsed =
            SessionRecord::from_fields(session_id.clone(), &fields_of(record.to_fields())).unwrap();

        assert_eq!(parsed.id, session_id);
        assert_eq!(parsed.user_id, user_id);
        assert_eq!(parsed.instance_id, "gw-1");
    }

    #[test]
    fn test_session_record_requires_owner() {
        let mut fields = HashMap::new();
        fields.insert("created_at".to_string(), "100".to_string());

        assert!(SessionRecord::from_fields(SessionId::new("s"), &fields).is_none());

        fields.insert("user_id".to_string(), "not-a-uuid".to_string());
        assert!(SessionRecord::from_fields(SessionId::new("s"), &fields).is_none());
    }

    #[test]
    fn test_idle_secs() {
        let mut record = SessionRecord::new(SessionId::new("s"), UserId::random(), "gw-1");
        record.last_active = 1_000;
        assert_eq!(record.idle_secs(1_060), 60);
        assert_eq!(record.idle_secs(900), 0);
    }
}
