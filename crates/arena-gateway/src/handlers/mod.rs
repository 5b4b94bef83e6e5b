//! Op code handlers
//!
//! Dispatches incoming WebSocket messages to the handler for their op code.

mod error;
mod heartbeat;
mod identify;
mod join;
mod online_users;
mod presence;
mod typing;

pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use identify::IdentifyHandler;
pub use join::JoinHandler;
pub use online_users::OnlineUsersHandler;
pub use presence::PresenceHandler;
pub use typing::TypingHandler;

use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage, OpCode};
use crate::server::GatewayState;
use std::sync::Arc;

/// Dispatch incoming client messages to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle an incoming client message
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: GatewayMessage,
    ) -> HandlerResult<Option<CloseCode>> {
        if !message.op.is_client_op() {
            tracing::warn!(
                session_id = %connection.session_id(),
                op = %message.op,
                "Received server-only op code from client"
            );
            return Ok(Some(CloseCode::UnknownOpcode));
        }

        match message.op {
            OpCode::Identify => {
                let payload = message.as_identify().ok_or_else(|| {
                    HandlerError::InvalidPayload("Invalid Identify payload".to_string())
                })?;

                IdentifyHandler::handle(state, connection, payload).await
            }
            OpCode::Heartbeat => HeartbeatHandler::handle(state, connection).await,
            OpCode::PresenceUpdate => {
                let payload = message.as_presence_update().ok_or_else(|| {
                    HandlerError::InvalidPayload("Invalid PresenceUpdate payload".to_string())
                })?;

                PresenceHandler::handle(state, connection, payload).await
            }
            OpCode::JoinChannels => JoinHandler::handle(state, connection).await,
            OpCode::TypingStart | OpCode::TypingStop => {
                let payload = message.as_typing().ok_or_else(|| {
                    HandlerError::InvalidPayload("Invalid Typing payload".to_string())
                })?;

                TypingHandler::handle(
                    state,
                    connection,
                    payload,
                    message.op == OpCode::TypingStart,
                )
                .await
            }
            OpCode::OnlineUsers => {
                let payload = message.as_online_users().ok_or_else(|| {
                    HandlerError::InvalidPayload("Invalid OnlineUsers payload".to_string())
                })?;

                OnlineUsersHandler::handle(state, connection, payload).await
            }
            // Unreachable due to the is_client_op check
            _ => {
                tracing::error!(op = %message.op, "Unhandled client op code");
                Ok(Some(CloseCode::UnknownOpcode))
            }
        }
    }
}
