//! Change-feed API endpoint.
//!
//! The admin view opens one WebSocket per mount and refetches the affected
//! table whenever an event arrives; closing the socket tears the
//! subscription down.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use tokio::sync::broadcast;

use crate::events::ChangeEvent;
use crate::AppState;

/// GET /api/admin/events - Subscribe to change notifications for both tables.
pub async fn subscribe_changes(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let rx = state.feed.subscribe();
    ws.on_upgrade(move |socket| stream_changes(socket, rx))
}

async fn stream_changes(mut socket: WebSocket, mut rx: broadcast::Receiver<ChangeEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!("Failed to serialize change event: {}", e);
                        continue;
                    }
                };
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                // Subscribers refetch the whole table on the next event, so
                // skipped notifications resolve themselves.
                tracing::warn!("Change-feed subscriber lagged, skipped {} events", missed);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
