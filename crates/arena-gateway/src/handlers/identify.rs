//! Identify handler (op 2)
//!
//! Token verification happens before any presence mutation: a rejected
//! token closes the socket having written nothing.

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::events::{GatewayEventType, ReadyEvent};
use crate::protocol::{CloseCode, GatewayMessage, IdentifyPayload};
use crate::server::GatewayState;
use arena_cache::BusChannel;
use arena_core::PresenceStatus;
use chrono::Utc;
use std::sync::Arc;

/// Handles Identify messages
pub struct IdentifyHandler;

impl IdentifyHandler {
    /// Handle an Identify message
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        payload: IdentifyPayload,
    ) -> HandlerResult<Option<CloseCode>> {
        if connection.is_authenticated().await {
            tracing::warn!(
                session_id = %connection.session_id(),
                "Client sent Identify while already authenticated"
            );
            return Ok(Some(CloseCode::AlreadyAuthenticated));
        }

        // Verify the token before touching any presence state
        let token = payload.token.strip_prefix("Bearer ").unwrap_or(&payload.token);
        let claims = state
            .context()
            .jwt()
            .validate_access_token(token)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token validation failed");
                HandlerError::AuthenticationFailed(e.to_string())
            })?;
        let user_id = claims
            .user_id()
            .map_err(|e| HandlerError::AuthenticationFailed(e.to_string()))?;

        let session_id = connection.session_id().clone();

        // Link the connection before the status write so fan-outs triggered
        // by it can already reach this socket
        state
            .connection_manager()
            .authenticate_connection(&session_id, user_id)
            .await;

        // Register the session and go online. Presence is advisory: a store
        // failure degrades accuracy, it does not break the connection.
        let update = state
            .context()
            .coordinator()
            .set_status(user_id, PresenceStatus::Online, Some(&session_id))
            .await;
        if !update.success {
            tracing::warn!(
                session_id = %session_id,
                user_id = %user_id,
                error = ?update.error,
                "Connected without presence"
            );
        }

        // Receive user-scoped events published by other instances
        state
            .context()
            .bus()
            .subscribe(&[BusChannel::user(user_id)])
            .await
            .ok();

        // Ready carries the online snapshot so the client renders presence
        // immediately. Channel joining stays a separate, client-ordered step.
        let online = state.context().coordinator().get_online_users(None).await;
        let ready = ReadyEvent {
            user_id,
            session_id: session_id.clone(),
            online_count: online.len(),
            online_user_ids: online,
            timestamp: Utc::now().timestamp(),
        };

        let seq = connection.next_sequence();
        connection
            .send(GatewayMessage::dispatch(
                GatewayEventType::Ready.as_str(),
                seq,
                serde_json::to_value(&ready).unwrap_or_default(),
            ))
            .await
            .map_err(|e| HandlerError::Internal(format!("Failed to send READY: {e}")))?;

        tracing::info!(
            session_id = %session_id,
            user_id = %user_id,
            online_count = ready.online_count,
            "Client identified"
        );

        Ok(None)
    }
}
