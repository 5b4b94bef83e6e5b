//! WebSocket handler
//!
//! Accepts connections, pumps messages, monitors heartbeats, and drives the
//! disconnect path. Disconnect is the only cancellation signal; presence
//! writes already in flight are left to complete.

use crate::connection::{Connection, ConnectionState};
use crate::events::{GatewayEventType, OfflineEvent};
use crate::handlers::MessageDispatcher;
use crate::protocol::{CloseCode, GatewayMessage, HelloPayload};
use crate::server::GatewayState;
use arena_cache::{keys, BusChannel, BusEvent};
use arena_core::{PresenceStatus, SessionId};
use axum::{
    extract::{ws::Message, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Heartbeat interval advertised in Hello (under half the heartbeat TTL)
const HEARTBEAT_INTERVAL_MS: u64 = 45_000;

/// No heartbeat for this long means the connection is dead
const HEARTBEAT_TIMEOUT_MS: u64 = 90_000;

/// Channel buffer size for outgoing messages
const MESSAGE_BUFFER_SIZE: usize = 100;

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: axum::extract::ws::WebSocket) {
    let session_id = SessionId::generate();

    let (tx, mut rx) = mpsc::channel::<GatewayMessage>(MESSAGE_BUFFER_SIZE);
    let connection = state
        .connection_manager()
        .add_connection(session_id.clone(), tx);

    tracing::info!(session_id = %session_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Hello goes out immediately; the client starts heartbeating on it
    let hello = GatewayMessage::hello(HelloPayload::with_interval(HEARTBEAT_INTERVAL_MS));
    if let Ok(json) = hello.to_json() {
        if ws_sink.send(Message::Text(json.into())).await.is_err() {
            tracing::warn!(session_id = %session_id, "Failed to send Hello message");
            cleanup_connection(&state, &session_id, &connection).await;
            return;
        }
    }

    let state_recv = state.clone();
    let session_id_recv = session_id.clone();
    let connection_recv = connection.clone();

    // Receive messages from the WebSocket
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Err(close_code) =
                        handle_text_message(&state_recv, &connection_recv, &text).await
                    {
                        tracing::debug!(
                            session_id = %session_id_recv,
                            close_code = ?close_code,
                            "Closing connection due to error"
                        );
                        return Some(close_code);
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(
                        session_id = %session_id_recv,
                        "Binary messages not supported"
                    );
                    return Some(CloseCode::DecodeError);
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    tracing::trace!(session_id = %session_id_recv, "Ping/pong received");
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(session_id = %session_id_recv, "Client closed connection");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id_recv,
                        error = %e,
                        "WebSocket error"
                    );
                    return Some(CloseCode::UnknownError);
                }
            }
        }
        None
    });

    let session_id_send = session_id.clone();

    // Forward queued messages to the WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = msg.to_json() {
                if ws_sink.send(Message::Text(json.into())).await.is_err() {
                    tracing::warn!(
                        session_id = %session_id_send,
                        "Failed to send message to WebSocket"
                    );
                    break;
                }
            }
        }

        let _ = ws_sink.close().await;
    });

    let session_id_hb = session_id.clone();
    let connection_hb = connection.clone();

    // Drop connections that stop heartbeating
    let heartbeat_task = tokio::spawn(async move {
        let mut check_interval = interval(Duration::from_millis(HEARTBEAT_INTERVAL_MS / 2));

        loop {
            check_interval.tick().await;

            let time_since = connection_hb.time_since_heartbeat().await;
            if time_since > Duration::from_millis(HEARTBEAT_TIMEOUT_MS) {
                tracing::warn!(
                    session_id = %session_id_hb,
                    time_since_ms = time_since.as_millis(),
                    "Connection timed out (no heartbeat)"
                );
                break;
            }
        }
    });

    tokio::select! {
        result = recv_task => {
            if let Ok(Some(close_code)) = result {
                tracing::debug!(
                    session_id = %session_id,
                    close_code = ?close_code,
                    "Receive task ended with close code"
                );
            }
        }
        _ = send_task => {
            tracing::debug!(session_id = %session_id, "Send task ended");
        }
        _ = heartbeat_task => {
            tracing::debug!(session_id = %session_id, "Heartbeat task ended");
        }
    }

    cleanup_connection(&state, &session_id, &connection).await;
}

/// Handle a text message from the client
async fn handle_text_message(
    state: &GatewayState,
    connection: &Arc<Connection>,
    text: &str,
) -> Result<(), CloseCode> {
    let message = match GatewayMessage::from_json(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(
                session_id = %connection.session_id(),
                error = %e,
                "Failed to parse message"
            );
            return Err(CloseCode::DecodeError);
        }
    };

    tracing::trace!(
        session_id = %connection.session_id(),
        op = %message.op,
        "Received message"
    );

    match MessageDispatcher::dispatch(state, connection, message).await {
        Ok(Some(close_code)) => Err(close_code),
        Ok(None) => Ok(()),
        Err(e) => {
            tracing::warn!(
                session_id = %connection.session_id(),
                error = %e,
                "Handler error"
            );
            Err(e.to_close_code().unwrap_or(CloseCode::UnknownError))
        }
    }
}

/// Disconnect path, for every cause of disconnection.
///
/// Deregisters only this session; other devices keep the user online. The
/// USER_OFFLINE fan-out happens only when the last session is gone.
async fn cleanup_connection(
    state: &GatewayState,
    session_id: &SessionId,
    connection: &Arc<Connection>,
) {
    tracing::info!(session_id = %session_id, "Cleaning up connection");

    connection.transition(ConnectionState::Disconnected).await;

    if let Some(user_id) = connection.user_id().await {
        let ctx = state.context();

        let update = ctx
            .coordinator()
            .set_status(user_id, PresenceStatus::Offline, Some(session_id))
            .await;
        if !update.success {
            tracing::warn!(
                session_id = %session_id,
                user_id = %user_id,
                error = ?update.error,
                "Disconnect presence update failed"
            );
        }

        let channels = connection.channels().await;

        // This connection's typing indicators die with it (TTL would bound
        // them anyway)
        for channel_id in &channels {
            ctx.store()
                .delete(&keys::typing(*channel_id, user_id))
                .await
                .ok();
        }

        let remaining = ctx.registry().session_count(user_id).await.unwrap_or(0);
        if remaining == 0 {
            for channel_id in &channels {
                ctx.store()
                    .set_remove(&keys::channel_online(*channel_id), &user_id.to_string())
                    .await
                    .ok();
            }

            let event = OfflineEvent::now(user_id, ctx.instance_id());
            ctx.bus()
                .publish(
                    &BusChannel::broadcast(),
                    &BusEvent::new(
                        GatewayEventType::UserOffline.as_str(),
                        serde_json::to_value(&event).unwrap_or_default(),
                    ),
                )
                .await
                .ok();

            tracing::debug!(user_id = %user_id, "Last session gone, user offline");
        } else {
            // Other devices remain; show them as alive
            ctx.coordinator().heartbeat(user_id).await;

            tracing::debug!(
                user_id = %user_id,
                remaining = remaining,
                "User still has active sessions"
            );
        }
    }

    state
        .connection_manager()
        .remove_connection(session_id)
        .await;
}
