//! Key-space contract
//!
//! Every key the presence system touches is built here. The names are stable
//! across instances and restarts; two processes pointed at the same store
//! must agree on them byte for byte.

use arena_core::{ChannelId, SessionId, UserId};

/// Global set of user ids considered online
pub const ONLINE_USERS: &str = "online_users";
/// Global set of `{userId}:{sessionId}` composite members for all live sessions
pub const ACTIVE_SESSIONS: &str = "active_sessions";

/// Per-user presence record hash
#[must_use]
pub fn presence(user_id: UserId) -> String {
    format!("presence:{user_id}")
}

/// Per-user set of live session ids
#[must_use]
pub fn user_sessions(user_id: UserId) -> String {
    format!("user:{user_id}:sessions")
}

/// Per-session metadata hash
#[must_use]
pub fn session(session_id: &SessionId) -> String {
    format!("session:{session_id}")
}

/// Per-user heartbeat key
#[must_use]
pub fn heartbeat(user_id: UserId) -> String {
    format!("heartbeat:{user_id}")
}

/// Per-channel durable member mirror set
#[must_use]
pub fn channel_members(channel_id: ChannelId) -> String {
    format!("channel:{channel_id}:members")
}

/// Per-channel ephemeral online subset
#[must_use]
pub fn channel_online(channel_id: ChannelId) -> String {
    format!("channel:{channel_id}:online")
}

/// Per-(channel, user) typing indicator key
#[must_use]
pub fn typing(channel_id: ChannelId, user_id: UserId) -> String {
    format!("typing:{channel_id}:{user_id}")
}

/// Composite member stored in [`ACTIVE_SESSIONS`].
///
/// Carries the user id alongside the session id so a reconciliation sweep
/// can still prune the entry after the session hash itself has expired.
#[must_use]
pub fn active_member(user_id: UserId, session_id: &SessionId) -> String {
    format!("{user_id}:{session_id}")
}

/// Split an [`ACTIVE_SESSIONS`] member back into its parts.
///
/// Returns `None` for members that do not parse; callers treat those as
/// stale and remove them.
#[must_use]
pub fn parse_active_member(member: &str) -> Option<(UserId, SessionId)> {
    let (user, session) = member.split_once(':')?;
    let user_id = user.parse::<UserId>().ok()?;
    if session.is_empty() {
        return None;
    }
    Some((user_id, SessionId::new(session)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let user_id = UserId::random();
        let channel_id = ChannelId::random();
        let session_id = SessionId::new("abc123");

        assert_eq!(presence(user_id), format!("presence:{user_id}"));
        assert_eq!(user_sessions(user_id), format!("user:{user_id}:sessions"));
        assert_eq!(session(&session_id), "session:abc123");
        assert_eq!(heartbeat(user_id), format!("heartbeat:{user_id}"));
        assert_eq!(
            channel_members(channel_id),
            format!("channel:{channel_id}:members")
        );
        assert_eq!(
            channel_online(channel_id),
            format!("channel:{channel_id}:online")
        );
        assert_eq!(
            typing(channel_id, user_id),
            format!("typing:{channel_id}:{user_id}")
        );
    }

    #[test]
    fn test_active_member_roundtrip() {
        let user_id = UserId::random();
        let session_id = SessionId::generate();

        let member = active_member(user_id, &session_id);
        let (parsed_user, parsed_session) = parse_active_member(&member).unwrap();

        assert_eq!(parsed_user, user_id);
        assert_eq!(parsed_session, session_id);
    }

    #[test]
    fn test_parse_active_member_rejects_garbage() {
        assert!(parse_active_member("no-separator").is_none());
        assert!(parse_active_member("not-a-uuid:session").is_none());
        assert!(parse_active_member(&format!("{}:", UserId::random())).is_none());
    }
}
