//! WebSocket handler
//!
//! Handles WebSocket connections and message processing.

use crate::connection::SessionHandle;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::server::GatewayState;
use axum::{
    extract::{ws::Message, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use presence_common::{AppError, ErrorResponse};
use std::sync::Arc;
use tokio::sync::mpsc;

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
    let session_id = SessionHandle::generate_id();

    // Create message channel for outgoing messages
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(MESSAGE_BUFFER_SIZE);

    // Register session
    let session = state.sessions().register(session_id.clone(), tx);

    tracing::info!(session_id = %session_id, "WebSocket connection established");

    // Split the WebSocket
    let (mut ws_sink, mut ws_stream) = socket.split();

    // Send Hello immediately so the client learns its session ID
    let hello = ServerMessage::hello(&session_id);
    if let Ok(json) = hello.to_json() {
        if ws_sink.send(Message::Text(json.into())).await.is_err() {
            tracing::warn!(session_id = %session_id, "Failed to send Hello message");
            state.sessions().remove(&session_id);
            return;
        }
    }

    // Clone for receive task
    let state_recv = state.clone();
    let session_recv = session.clone();
    let session_id_recv = session_id.clone();

    // Spawn task to receive messages from WebSocket
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handle_text_message(&state_recv, &session_recv, &text).await;
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(
                        session_id = %session_id_recv,
                        "Binary messages not supported"
                    );
                    session_recv
                        .send(ServerMessage::error(
                            "DECODE_ERROR",
                            "binary frames are not supported",
                        ))
                        .await
                        .ok();
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Pong is handled automatically by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(session_id = %session_id_recv, "Client closed connection");
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id_recv,
                        error = %e,
                        "WebSocket error"
                    );
                    return;
                }
            }
        }
    });

    // Clone for send task
    let session_id_send = session_id.clone();

    // Spawn task to send messages to WebSocket
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

        // Close the WebSocket when channel is closed
        let _ = ws_sink.close().await;
    });

    // Wait for either task to complete
    tokio::select! {
        _ = recv_task => {
            tracing::debug!(session_id = %session_id, "Receive task ended");
        }
        _ = send_task => {
            tracing::debug!(session_id = %session_id, "Send task ended");
        }
    }

    // Clean up: aborts every subscription forwarder this session owned,
    // which drops its tracker subscription and listener registration.
    state.sessions().remove(&session_id);
    tracing::info!(session_id = %session_id, "Connection cleaned up");
}

/// Handle a text message from the client
async fn handle_text_message(state: &GatewayState, session: &Arc<SessionHandle>, text: &str) {
    let message = match ClientMessage::from_json(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(
                session_id = %session.session_id(),
                error = %e,
                "Failed to parse message"
            );
            session
                .send(ServerMessage::error("DECODE_ERROR", "malformed message"))
                .await
                .ok();
            return;
        }
    };

    if let Err(e) = message.validate_payload() {
        let err = AppError::validation(e);
        session.send(ErrorResponse::from(err).into()).await.ok();
        return;
    }

    match message {
        ClientMessage::Typing(payload) => {
            state
                .tracker()
                .set_typing(&payload.channel_id, &payload.user_id, payload.typing);
        }
        ClientMessage::Subscribe(payload) => {
            subscribe_channel(state, session, payload.channel_id);
        }
        ClientMessage::Unsubscribe(payload) => {
            if session.remove_subscription(&payload.channel_id) {
                tracing::debug!(
                    session_id = %session.session_id(),
                    channel_id = %payload.channel_id,
                    "Unsubscribed from channel"
                );
            } else {
                let err =
                    AppError::not_found(format!("subscription to channel {}", payload.channel_id));
                session.send(ErrorResponse::from(err).into()).await.ok();
            }
        }
    }
}

/// Start streaming a channel's typist list to a session
///
/// Spawns a forwarder task that pumps tracker snapshots into the session's
/// outbox. The task lives until the session unsubscribes, disconnects, or
/// the tracker shuts down.
fn subscribe_channel(state: &GatewayState, session: &Arc<SessionHandle>, channel_id: String) {
    let mut subscription = state.tracker().subscribe(&channel_id);
    let outbox = session.outbox();
    let update_channel = channel_id.clone();

    let task = tokio::spawn(async move {
        while let Some(user_ids) = subscription.next().await {
            let update = ServerMessage::typing_update(update_channel.clone(), user_ids);
            if outbox.send(update).await.is_err() {
                break;
            }
        }
    });

    tracing::debug!(
        session_id = %session.session_id(),
        channel_id = %channel_id,
        "Subscribed to channel"
    );

    session.add_subscription(channel_id, task);
}
