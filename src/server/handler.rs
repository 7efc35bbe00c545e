//! WebSocket connection handling and message dispatch.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::ConnectionId;
use crate::protocol::{ClientAction, ServerMessage};

use super::{session::Outgoing, state::AppState};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let conn_id: ConnectionId = Uuid::new_v4();

    // Register the writer channel before any message can arrive.
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.connections.lock().await.insert(conn_id, tx);
    tracing::info!("Client {} connected", conn_id);

    let (mut sender, mut receiver) = socket.split();

    // Receive frames from this client and dispatch them one at a time.
    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error on {}: {}", conn_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => dispatch(&recv_state, conn_id, &text).await,
                Message::Ping(_) => {
                    // Ping/pong is handled automatically by the protocol.
                    tracing::debug!("Received ping from {}", conn_id);
                }
                Message::Close(_) => {
                    tracing::info!("Client {} requested close", conn_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // Forward queued outbound messages to this client's socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // If one task completes, abort the other.
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Close cleanup: leave every room this connection was part of, then
    // drop its writer channel. Departure notifications go out to whoever
    // remains.
    let outgoing = {
        let mut sessions = state.sessions.lock().await;
        sessions.disconnect(conn_id)
    };
    state.connections.lock().await.remove(&conn_id);
    deliver(&state, outgoing).await;
    tracing::info!("Client {} disconnected and cleaned up", conn_id);
}

/// Decode one inbound frame, run the matching session transition, and
/// deliver whatever it produced. The session lock is dropped before any
/// delivery happens.
async fn dispatch(state: &AppState, conn_id: ConnectionId, text: &str) {
    tracing::debug!("Received text from {}: {}", conn_id, text);

    let action = match ClientAction::parse(text) {
        Ok(action) => action,
        Err(e) => {
            tracing::warn!("Malformed frame from {}: {}", conn_id, e);
            let reply = Outgoing::message(
                conn_id,
                ServerMessage::Error {
                    message: e.to_string(),
                },
            );
            deliver(state, vec![reply]).await;
            return;
        }
    };

    let outgoing = {
        let mut sessions = state.sessions.lock().await;
        match action {
            ClientAction::CreateRoom => sessions.create_room(conn_id),
            ClientAction::JoinRoom { room } => sessions.join_room(conn_id, &room),
            ClientAction::StartGame(request) => sessions.start_game(request),
            ClientAction::Move { room, payload } => sessions.relay_move(conn_id, &room, payload),
            ClientAction::LeaveRoom { room } => sessions.leave_room(conn_id, &room),
            ClientAction::Surrender { room, payload } => sessions.surrender(conn_id, &room, payload),
            ClientAction::Unknown(tag) => {
                tracing::warn!("Unrecognized action '{}' from {}", tag, conn_id);
                vec![Outgoing::message(
                    conn_id,
                    ServerMessage::Error {
                        message: format!("unrecognized action: {tag}"),
                    },
                )]
            }
        }
    };
    deliver(state, outgoing).await;
}

/// Best-effort delivery: a target that already disconnected, or whose
/// channel closed mid-send, is skipped with a warning.
async fn deliver(state: &AppState, outgoing: Vec<Outgoing>) {
    if outgoing.is_empty() {
        return;
    }
    let connections = state.connections.lock().await;
    for out in outgoing {
        match connections.get(&out.target) {
            Some(sender) => {
                if sender.send(out.to_json()).is_err() {
                    tracing::warn!("Failed to send to client {}, channel closed", out.target);
                }
            }
            None => {
                tracing::warn!("Client {} not connected, skipping delivery", out.target);
            }
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
