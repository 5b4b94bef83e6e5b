//! Gateway message envelope

use super::{
    CloseCode, HelloPayload, IdentifyPayload, OnlineUsersPayload, OpCode, PresenceUpdatePayload,
    TypingPayload,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope for every message crossing the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event type (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl GatewayMessage {
    // === Server Messages ===

    /// Create a Dispatch message (op=0)
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event_type.into()),
            s: Some(sequence),
            d: Some(data),
        }
    }

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(payload: HelloPayload) -> Self {
        Self {
            op: OpCode::Hello,
            t: None,
            s: None,
            d: Some(serde_json::to_value(payload).unwrap_or_default()),
        }
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self {
            op: OpCode::HeartbeatAck,
            t: None,
            s: None,
            d: None,
        }
    }

    // === Parsing Client Messages ===

    /// Try to parse as an Identify payload (op=2)
    pub fn as_identify(&self) -> Option<IdentifyPayload> {
        self.payload_for(OpCode::Identify)
    }

    /// Try to parse as a Presence Update payload (op=3)
    pub fn as_presence_update(&self) -> Option<PresenceUpdatePayload> {
        self.payload_for(OpCode::PresenceUpdate)
    }

    /// Try to parse as a Typing payload (ops 5 and 6)
    pub fn as_typing(&self) -> Option<TypingPayload> {
        if !matches!(self.op, OpCode::TypingStart | OpCode::TypingStop) {
            return None;
        }
        self.d
            .as_ref()
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    /// Try to parse as an Online Users payload (op=7); a missing payload
    /// means the global list
    pub fn as_online_users(&self) -> Option<OnlineUsersPayload> {
        if self.op != OpCode::OnlineUsers {
            return None;
        }
        match &self.d {
            Some(d) => serde_json::from_value(d.clone()).ok(),
            None => Some(OnlineUsersPayload::default()),
        }
    }

    fn payload_for<T: serde::de::DeserializeOwned>(&self, op: OpCode) -> Option<T> {
        if self.op != op {
            return None;
        }
        self.d
            .as_ref()
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Create an error close frame
    #[must_use]
    pub fn close_frame(code: CloseCode) -> (u16, String) {
        (code.as_u16(), code.description().to_string())
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={t}", self.op)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_message() {
        let msg = GatewayMessage::dispatch(
            "USER_ONLINE",
            42,
            serde_json::json!({"user_id": "u1", "status": "online"}),
        );

        assert_eq!(msg.op, OpCode::Dispatch);
        assert_eq!(msg.t, Some("USER_ONLINE".to_string()));
        assert_eq!(msg.s, Some(42));
        assert!(msg.d.is_some());
    }

    #[test]
    fn test_hello_message() {
        let msg = GatewayMessage::hello(HelloPayload::new());
        assert_eq!(msg.op, OpCode::Hello);

        let json = msg.to_json().unwrap();
        assert!(json.contains("45000"));
    }

    #[test]
    fn test_heartbeat_ack_message() {
        let msg = GatewayMessage::heartbeat_ack();
        assert_eq!(msg.op, OpCode::HeartbeatAck);
        assert!(msg.t.is_none());
        assert!(msg.s.is_none());
        assert!(msg.d.is_none());
    }

    #[test]
    fn test_parse_identify() {
        let msg = GatewayMessage {
            op: OpCode::Identify,
            t: None,
            s: None,
            d: Some(serde_json::json!({"token": "Bearer xyz"})),
        };

        let identify = msg.as_identify().unwrap();
        assert_eq!(identify.token, "Bearer xyz");

        // Wrong op never parses
        let wrong = GatewayMessage {
            op: OpCode::Heartbeat,
            t: None,
            s: None,
            d: Some(serde_json::json!({"token": "Bearer xyz"})),
        };
        assert!(wrong.as_identify().is_none());
    }

    #[test]
    fn test_parse_typing_for_both_ops() {
        let channel_id = arena_core::ChannelId::random();
        for op in [OpCode::TypingStart, OpCode::TypingStop] {
            let msg = GatewayMessage {
                op,
                t: None,
                s: None,
                d: Some(serde_json::json!({"channel_id": channel_id})),
            };
            assert_eq!(msg.as_typing().unwrap().channel_id, channel_id);
        }
    }

    #[test]
    fn test_parse_online_users_without_payload() {
        let msg = GatewayMessage {
            op: OpCode::OnlineUsers,
            t: None,
            s: None,
            d: None,
        };

        let payload = msg.as_online_users().unwrap();
        assert!(payload.channel_id.is_none());
    }

    #[test]
    fn test_message_roundtrip() {
        let msg = GatewayMessage::dispatch("READY", 1, serde_json::json!({"v": 1}));
        let json = msg.to_json().unwrap();
        let parsed = GatewayMessage::from_json(&json).unwrap();

        assert_eq!(parsed.op, msg.op);
        assert_eq!(parsed.t, msg.t);
        assert_eq!(parsed.s, msg.s);
    }

    #[test]
    fn test_close_frame() {
        let (code, desc) = GatewayMessage::close_frame(CloseCode::AuthenticationFailed);
        assert_eq!(code, 4004);
        assert!(desc.contains("Authentication"));
    }
}
