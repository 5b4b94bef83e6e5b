//! Presence Update handler (op 3)
//!
//! A manual status change: the coordinator is asked to move the state
//! machine, the session registry is left alone.

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::events::{GatewayEventType, PresenceEvent};
use crate::protocol::{CloseCode, PresenceUpdatePayload};
use crate::server::GatewayState;
use arena_cache::{BusChannel, BusEvent};
use std::sync::Arc;

/// Handles Presence Update messages
pub struct PresenceHandler;

impl PresenceHandler {
    /// Handle a Presence Update message
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: PresenceUpdatePayload,
    ) -> HandlerResult<Option<CloseCode>> {
        let Some(user_id) = connection.user_id().await else {
            tracing::warn!(
                session_id = %connection.session_id(),
                "Presence update from unauthenticated client"
            );
            return Ok(Some(CloseCode::NotAuthenticated));
        };

        let status = payload.status().ok_or_else(|| {
            HandlerError::InvalidPayload(format!(
                "Invalid status: {}. Must be one of: online, away, offline",
                payload.status
            ))
        })?;

        let update = state
            .context()
            .coordinator()
            .set_status(user_id, status, None)
            .await;

        if !update.success {
            tracing::warn!(
                session_id = %connection.session_id(),
                user_id = %user_id,
                error = ?update.error,
                "Manual presence update failed"
            );
            return Ok(None);
        }

        tracing::debug!(
            session_id = %connection.session_id(),
            user_id = %user_id,
            status = %status,
            "Presence updated"
        );

        let event = PresenceEvent::now(user_id, update.status, state.context().instance_id());
        state
            .context()
            .bus()
            .publish(
                &BusChannel::broadcast(),
                &BusEvent::new(
                    GatewayEventType::UserPresenceUpdated.as_str(),
                    serde_json::to_value(&event).unwrap_or_default(),
                ),
            )
            .await
            .ok();

        Ok(None)
    }
}
