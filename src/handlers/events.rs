//! Dashboard push channel (WebSocket).
//!
//! Subscribers connect to `GET /ws/events` and receive every event the
//! engine publishes, as JSON text frames:
//!
//! ```json
//! { "type": "scan.ingested", "payload": { ... } }
//! ```
//!
//! The connection's lifecycle belongs to the transport: a dashboard
//! disconnecting (or never connecting at all) is silent and has no effect
//! on ingestion. Delivery is at-least-once to sockets open at publish
//! time; dashboards render idempotently and treat unknown `type` values as
//! ignorable.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};

use crate::state::AppState;

/// Upgrade the connection and start forwarding events.
pub async fn subscribe(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_subscriber(socket, state))
}

/// Pump broadcast events into one subscriber socket until either side goes
/// away.
///
/// A subscriber that falls behind the broadcast channel's capacity misses
/// the dropped events (`Lagged`) and simply continues from the newest;
/// it is expected to re-fetch state over the read API.
async fn serve_subscriber(socket: WebSocket, state: AppState) {
    let mut events = state.broadcaster.subscribe();
    let (mut sink, mut stream) = socket.split();

    // S->C: forward published events as text frames.
    let mut forward_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(text) => {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("Events subscriber lagged; {missed} events dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // C->S: drain control frames (ping/pong/close); subscribers don't send
    // application messages on this channel.
    let mut drain_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    // Whichever side finishes first tears the connection down.
    tokio::select! {
        _ = &mut forward_task => drain_task.abort(),
        _ = &mut drain_task => forward_task.abort(),
    }

    tracing::debug!("Events subscriber disconnected");
}
