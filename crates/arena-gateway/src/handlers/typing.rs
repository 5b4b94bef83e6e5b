//! Typing handlers (ops 5 and 6)
//!
//! Ephemeral per-(channel, user) keys with a short TTL. No reconciliation:
//! staleness is bounded by expiry.

use super::HandlerResult;
use crate::connection::Connection;
use crate::events::{GatewayEventType, TypingEvent};
use crate::protocol::{CloseCode, TypingPayload};
use crate::server::GatewayState;
use arena_cache::{keys, BusChannel, BusEvent};
use chrono::Utc;
use std::sync::Arc;

/// Handles Typing Start / Typing Stop messages
pub struct TypingHandler;

impl TypingHandler {
    /// Handle a typing message; `started` distinguishes the two ops
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: TypingPayload,
        started: bool,
    ) -> HandlerResult<Option<CloseCode>> {
        let Some(user_id) = connection.user_id().await else {
            return Ok(Some(CloseCode::NotAuthenticated));
        };

        let channel_id = payload.channel_id;
        if !connection.is_subscribed_to(channel_id).await {
            tracing::debug!(
                session_id = %connection.session_id(),
                channel_id = %channel_id,
                "Typing indicator for unjoined channel ignored"
            );
            return Ok(None);
        }

        let ctx = state.context();
        let typing_key = keys::typing(channel_id, user_id);

        if started {
            ctx.store()
                .put(
                    &typing_key,
                    &Utc::now().timestamp().to_string(),
                    Some(ctx.presence().typing_ttl),
                )
                .await?;
        } else {
            ctx.store().delete(&typing_key).await?;
        }

        let event = TypingEvent::now(user_id, channel_id, started);
        ctx.bus()
            .publish(
                &BusChannel::channel(channel_id),
                &BusEvent::new(
                    GatewayEventType::UserTyping.as_str(),
                    serde_json::to_value(&event).unwrap_or_default(),
                )
                .excluding(user_id.to_string()),
            )
            .await
            .ok();

        tracing::trace!(
            session_id = %connection.session_id(),
            channel_id = %channel_id,
            started = started,
            "Typing indicator"
        );

        Ok(None)
    }
}
