//! Join Channels handler (op 4)
//!
//! Authentication and subscription are two phases: the client asks to join
//! when it is ready, which keeps event ordering under its control.

use super::{HandlerError, HandlerResult};
use crate::connection::{Connection, ConnectionState};
use crate::events::{ChannelJoinEvent, GatewayEventType, PresenceEvent};
use crate::protocol::CloseCode;
use crate::server::GatewayState;
use arena_cache::{keys, BusChannel, BusEvent};
use arena_core::PresenceStatus;
use chrono::Utc;
use std::sync::Arc;

/// Handles Join Channels messages
pub struct JoinHandler;

impl JoinHandler {
    /// Subscribe the connection to every durable channel membership
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
    ) -> HandlerResult<Option<CloseCode>> {
        let Some(user_id) = connection.user_id().await else {
            return Ok(Some(CloseCode::NotAuthenticated));
        };

        let ctx = state.context();
        let channels = ctx.channels().channels_for_user(user_id).await?;

        for channel_id in &channels {
            state
                .connection_manager()
                .subscribe_to_channel(connection.session_id(), *channel_id)
                .await;

            // This instance needs the channel's feed from the bus
            ctx.bus()
                .subscribe(&[BusChannel::channel(*channel_id)])
                .await
                .ok();

            // Mirror membership and mark the user live in the channel
            let member = user_id.to_string();
            ctx.store()
                .set_add(&keys::channel_members(*channel_id), &member)
                .await?;
            ctx.store()
                .set_add(&keys::channel_online(*channel_id), &member)
                .await?;

            let join_event = ChannelJoinEvent {
                channel_id: *channel_id,
                user_id,
                timestamp: Utc::now().timestamp(),
            };
            ctx.bus()
                .publish(
                    &BusChannel::channel(*channel_id),
                    &BusEvent::new(
                        GatewayEventType::UserJoinedChannel.as_str(),
                        serde_json::to_value(&join_event).unwrap_or_default(),
                    )
                    .excluding(user_id.to_string()),
                )
                .await
                .ok();
        }

        connection.transition(ConnectionState::Joined).await;

        // Fan the user's arrival out to every instance
        let presence = PresenceEvent::now(user_id, PresenceStatus::Online, ctx.instance_id());
        ctx.bus()
            .publish(
                &BusChannel::broadcast(),
                &BusEvent::new(
                    GatewayEventType::UserOnline.as_str(),
                    serde_json::to_value(&presence).unwrap_or_default(),
                ),
            )
            .await
            .map_err(HandlerError::Bus)?;

        tracing::info!(
            session_id = %connection.session_id(),
            user_id = %user_id,
            channels = channels.len(),
            "Joined channels"
        );

        Ok(None)
    }
}
