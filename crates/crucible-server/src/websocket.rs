//! WebSocket transport for search sessions

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::ServerState;
use crate::manager::ClientEnd;

/// Handle WebSocket upgrade requests
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Bridge one socket to its session until either side goes away.
async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let ClientEnd {
        id,
        requests,
        mut frames,
    } = state.sessions.open();
    info!(session = %id, "WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();

    // Forward frames produced by the session to the client
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            let text = match frame.encode() {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode frame: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                debug!("Failed to send frame to WebSocket client");
                break;
            }
        }
        let _ = sender.close().await;
    });

    // Queue client requests for the session
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    debug!("Received WebSocket message: {}", text);
                    if requests.send(text).await.is_err() {
                        break;
                    }
                }
                Message::Binary(_) => {
                    warn!("Ignoring binary WebSocket message");
                }
                Message::Close(_) => {
                    debug!("WebSocket client disconnected");
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    state.sessions.on_close(id);
    info!(session = %id, "WebSocket connection closed");
}
