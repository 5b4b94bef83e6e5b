//! Wire protocol
//!
//! JSON envelope and op codes for the gateway WebSocket connection.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use messages::GatewayMessage;
pub use opcodes::OpCode;
pub use payloads::{
    HelloPayload, IdentifyPayload, OnlineUsersPayload, PresenceUpdatePayload, TypingPayload,
};
