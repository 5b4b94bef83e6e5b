//! Online Users handler (op 7)
//!
//! Replies with the validated online list; the read itself repairs drift.

use super::HandlerResult;
use crate::connection::Connection;
use crate::events::{GatewayEventType, OnlineUsersEvent};
use crate::protocol::{CloseCode, GatewayMessage, OnlineUsersPayload};
use crate::server::GatewayState;
use chrono::Utc;
use std::sync::Arc;

/// Handles Online Users requests
pub struct OnlineUsersHandler;

impl OnlineUsersHandler {
    /// Handle an Online Users request
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: OnlineUsersPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        if connection.user_id().await.is_none() {
            return Ok(Some(CloseCode::NotAuthenticated));
        }

        let user_ids = state
            .context()
            .coordinator()
            .get_online_users(payload.channel_id)
            .await;

        let event = OnlineUsersEvent {
            channel_id: payload.channel_id,
            count: user_ids.len(),
            user_ids,
            timestamp: Utc::now().timestamp(),
        };

        let seq = connection.next_sequence();
        connection
            .send(GatewayMessage::dispatch(
                GatewayEventType::OnlineUsers.as_str(),
                seq,
                serde_json::to_value(&event).unwrap_or_default(),
            ))
            .await
            .ok();

        Ok(None)
    }
}
