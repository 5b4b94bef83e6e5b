//! Dispatch events and their payloads.

mod event_types;
mod payloads;

pub use event_types::GatewayEventType;
pub use payloads::{
    ChannelJoinEvent, OfflineEvent, OnlineUsersEvent, PresenceEvent, ReadyEvent, TypingEvent,
};
