//! WebSocket transport onto the gateway
//!
//! Each socket is split in two. A writer task drains the connection's outbox
//! and serializes every [`ServerMessage`] as one text frame; the reader loop
//! decodes text frames into [`ClientMessage`]s and hands them to the gateway.
//! A frame that is not a valid command is answered with an `error` event and
//! otherwise ignored.
//!
//! On close the gateway forgets the connection, which drops the last sender of
//! the outbox. The writer then flushes whatever the disconnect produced and
//! exits; it is only cut off after [`WRITER_GRACE`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{Sink, SinkExt, StreamExt};
use shared::protocol::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::AppState;
use crate::gateway::Gateway;

/// How long a closing socket may spend flushing queued events
pub const WRITER_GRACE: Duration = Duration::from_secs(5);

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.gateway))
}

async fn handle_socket(socket: WebSocket, gateway: Arc<Gateway>) {
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut events) = mpsc::unbounded_channel::<ServerMessage>();
    let conn = gateway.connect(outbox.clone());

    let writer = tokio::spawn(write_events(events, sender));

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(t) => t.to_string(),
            Message::Close(_) => break,
            _ => continue,
        };

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(command) => gateway.handle(conn, command),
            Err(err) => {
                debug!(connection = conn, error = %err, "undecodable frame");
                let _ = outbox.send(ServerMessage::error(format!("Invalid message: {err}")));
            }
        }
    }

    gateway.disconnect(conn, Instant::now());
    drop(outbox);
    if tokio::time::timeout(WRITER_GRACE, writer).await.is_err() {
        debug!(connection = conn, "writer did not drain in time");
    }
}

/// Forward events as text frames until every sender is gone or the sink fails.
async fn write_events<S>(mut events: mpsc::UnboundedReceiver<ServerMessage>, mut sink: S)
where
    S: Sink<Message> + Unpin,
{
    while let Some(event) = events.recv().await {
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "failed to encode event");
                continue;
            }
        };
        if sink.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
}
