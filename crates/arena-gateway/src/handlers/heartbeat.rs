//! Heartbeat handler (op 1)

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{CloseCode, GatewayMessage};
use crate::server::GatewayState;
use std::sync::Arc;

/// Handles heartbeat messages
pub struct HeartbeatHandler;

impl HeartbeatHandler {
    /// Handle a heartbeat from the client.
    ///
    /// Refreshes both liveness signals: the user's heartbeat key and the
    /// session's activity timestamp. Pre-auth heartbeats are legal (the
    /// client starts beating on Hello) and only touch the local connection.
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
    ) -> HandlerResult<Option<CloseCode>> {
        connection.record_heartbeat().await;

        if let Some(user_id) = connection.user_id().await {
            state.context().coordinator().heartbeat(user_id).await;
            state
                .context()
                .registry()
                .touch(user_id, connection.session_id())
                .await
                .ok();
        }

        tracing::trace!(
            session_id = %connection.session_id(),
            "Heartbeat received"
        );

        if let Err(e) = connection.send(GatewayMessage::heartbeat_ack()).await {
            tracing::warn!(
                session_id = %connection.session_id(),
                error = %e,
                "Failed to send heartbeat ACK"
            );
            return Err(HandlerError::Internal(
                "Failed to send heartbeat ACK".to_string(),
            ));
        }

        Ok(None)
    }
}
