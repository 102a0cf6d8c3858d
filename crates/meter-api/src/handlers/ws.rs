//! WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use crate::state::AppState;

/// GET /ws
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

/// Drives one established connection until either side goes away.
async fn handle_socket(state: AppState, socket: WebSocket) {
    let sessions = state.engine.sessions.clone();
    let mut shutdown = sessions.shutdown_receiver();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (session, mut outbound_rx) = sessions.register();
    let session_id = session.id;

    // Outbound forwarder
    let outbound_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match msg.to_json() {
                Ok(text) => text,
                Err(e) => {
                    error!(session_id = %session_id, error = %e, "Failed to serialize payload");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    while !*shutdown.borrow() {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!(session_id = %session_id, "Closing socket for shutdown");
                    break;
                }
            }
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    sessions.handle_inbound(&session_id, text.as_str());
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(session_id = %session_id, error = %e, "WebSocket error");
                    break;
                }
            },
        }
    }

    sessions.unregister(&session_id);
    outbound_task.abort();

    info!(session_id = %session_id, "WebSocket connection closed");
}
