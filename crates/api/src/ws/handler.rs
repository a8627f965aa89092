use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use pulseward_core::channels::patient_group;
use pulseward_core::types::DbId;
use serde::Deserialize;

use crate::state::AppState;
use crate::ws::manager::WsManager;

/// Group membership request sent by a client.
///
/// `{"action": "join", "patientId": 12}` / `{"action": "leave", "patientId": 12}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientMessage {
    Join {
        #[serde(rename = "patientId")]
        patient_id: DbId,
    },
    Leave {
        #[serde(rename = "patientId")]
        patient_id: DbId,
    },
}

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager))
}

/// Manage a single WebSocket connection after upgrade.
///
/// A spawned sender task forwards manager messages to the socket while this
/// task reads join/leave requests. On disconnect the connection and its
/// group memberships are removed.
async fn handle_socket(socket: WebSocket, ws_manager: Arc<WsManager>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let mut rx = ws_manager.add(conn_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Text(text)) => {
                handle_client_message(&ws_manager, &conn_id, text.as_str()).await;
            }
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Apply a text frame from a client.
///
/// Malformed requests are logged and dropped; they never close the
/// connection.
pub async fn handle_client_message(ws_manager: &WsManager, conn_id: &str, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(conn_id, error = %e, "Ignoring malformed client message");
            return;
        }
    };

    match message {
        ClientMessage::Join { patient_id } => {
            let group = patient_group(patient_id);
            if ws_manager.join(conn_id, &group).await {
                tracing::debug!(conn_id, patient_id, "Joined patient group");
            }
        }
        ClientMessage::Leave { patient_id } => {
            let group = patient_group(patient_id);
            if ws_manager.leave(conn_id, &group).await {
                tracing::debug!(conn_id, patient_id, "Left patient group");
            }
        }
    }
}
