use std::sync::Arc;
use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, State},
    response::Response,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use futures_util::{StreamExt, SinkExt};
use uuid::Uuid;

use crate::AppState;
use crate::models::{FrameError, InboundFrame, ReceivedMessage};
use crate::websocket::msg_delta_handler::handle_submit_delta;
use crate::websocket::msg_reset_handler::handle_reset_state;
use crate::websocket::msg_saved_state_handler::handle_add_saved_state;
use crate::ws::{Room, Session};

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> Response {
    debug!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state.room))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, room: Arc<Room>) {

    // Connection id only tags log lines; participants are addressed by their room id
    let connection_id = Uuid::new_v4().to_string();

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    // Everything the room sends this participant goes through one ordered queue
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<String>();

    // Joining sends the welcome into the queue before anything else
    let session = Session::open(room, event_tx).await;
    let participant_id = session.id();
    info!(
        connection_id = %connection_id,
        participant_id,
        "WebSocket connection established for {}", session.participant().display_identity
    );

    // Drain the queue into the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = event_rx.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    // Read client events until the socket closes, then hand the session back
    // so it can be closed in order
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => handle_text_message(&text, &session).await,
                Message::Close(_) => break,
                // Binary frames carry nothing we understand; pings are answered by axum
                _ => continue,
            }
        }
        session
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        finished = (&mut recv_task) => {
            if let Ok(session) = finished {
                session.close().await;
            }
            send_task.abort();
        }
        // The aborted reader drops the session, which leaves the room
        _ = (&mut send_task) => recv_task.abort(),
    };
    info!(connection_id = %connection_id, participant_id, "WebSocket connection terminated");
}

/// Parse one text frame and route it to its handler
async fn handle_text_message(text: &str, session: &Session) {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            error!("Failed to parse message from participant {}: {}", session.id(), e);
            return;
        }
    };

    match ReceivedMessage::try_from(frame) {
        Ok(ReceivedMessage::SubmitDelta(msg)) => handle_submit_delta(msg, session).await,
        Ok(ReceivedMessage::ResetState(msg)) => handle_reset_state(msg, session).await,
        Ok(ReceivedMessage::AddSavedState(msg)) => handle_add_saved_state(msg, session).await,
        Err(FrameError::UnknownEvent(event)) => {
            debug!("Ignoring unknown event '{}' from participant {}", event, session.id());
        }
        Err(e) => warn!("Dropping message from participant {}: {}", session.id(), e),
    }
}
