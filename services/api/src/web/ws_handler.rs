//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! Client messages drive the playback cursor; viewer and playback updates are
//! pushed back from the broadcast channel by a forwarding task.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use quran_viewer_core::controller::ViewerController;
use quran_viewer_core::playback::PlaybackSignal;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

type SharedSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    // The sender is wrapped in an Arc<Mutex<>> to allow for shared mutable access across tasks.
    let (sender, mut receiver) = socket.split();
    let ws_sender: SharedSender = Arc::new(Mutex::new(sender));

    // --- 1. Initial Sync ---
    let events = app_state.events.subscribe();
    let viewer = &app_state.viewer;
    let hello = ServerMessage::Playback {
        signal: viewer.inspect_playback(|cursor| cursor.current_load()),
        snapshot: viewer.playback(),
    };
    if !send_message(&ws_sender, &hello).await {
        error!("Failed to send initial playback state.");
        return;
    }
    app_state.socket_opened();

    let token = CancellationToken::new();
    let forward_task = tokio::spawn(forward_events(events, ws_sender.clone(), token.clone()));

    // --- 2. Main Message Loop ---
    loop {
        if let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_text_message(text.as_str(), &app_state, &ws_sender).await;
                }
                Message::Close(_) => {
                    info!("Client sent close message.");
                    break;
                }
                _ => {}
            }
        } else {
            info!("Client disconnected.");
            break;
        }
    }

    // --- 3. Cleanup ---
    token.cancel();
    app_state.socket_closed();
    if let Err(e) = forward_task.await {
        warn!("Event forwarding task ended abnormally: {}", e);
    }
    info!("WebSocket connection closed.");
}

async fn handle_text_message(text: &str, app_state: &Arc<AppState>, ws_sender: &SharedSender) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => {
            apply_client_message(&app_state.viewer, message);
        }
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            let reply = ServerMessage::Error {
                message: format!("Unrecognized message: {}", e),
            };
            send_message(ws_sender, &reply).await;
        }
    }
}

/// Applies a transport command or media report to the playback cursor.
/// Resulting updates reach every socket through the playback listener.
pub fn apply_client_message(
    viewer: &ViewerController,
    message: ClientMessage,
) -> Option<PlaybackSignal> {
    viewer.drive_playback(|cursor| match message {
        ClientMessage::TogglePlayback => {
            cursor.toggle_playback();
            None
        }
        ClientMessage::SkipNext => cursor.skip_next(),
        ClientMessage::SkipPrevious => cursor.skip_previous(),
        ClientMessage::Replay => cursor.replay(),
        ClientMessage::Seek { percent } => cursor.seek(percent),
        ClientMessage::SetVolume { volume } => {
            cursor.set_volume(volume);
            None
        }
        ClientMessage::ToggleMute => {
            cursor.toggle_mute();
            None
        }
        ClientMessage::AudioReady { load_id, duration } => {
            cursor.on_ready(load_id, duration);
            None
        }
        ClientMessage::AudioProgress {
            load_id,
            position,
            duration,
        } => {
            cursor.on_progress(load_id, position, duration);
            None
        }
        ClientMessage::AudioEnded { load_id } => cursor.on_track_ended(load_id),
        ClientMessage::AudioError { load_id, message } => {
            cursor.on_load_failed(load_id, &message);
            None
        }
    })
}

/// Pushes broadcast updates to one socket until cancelled or the socket fails.
async fn forward_events(
    mut events: broadcast::Receiver<ServerMessage>,
    ws_sender: SharedSender,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            received = events.recv() => match received {
                Ok(message) => {
                    if !send_message(&ws_sender, &message).await {
                        warn!("Failed to push update to client.");
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Socket lagged behind, {} updates dropped.", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
        }
    }
}

/// Serializes and sends one message. Returns `false` when the socket is gone.
async fn send_message(ws_sender: &SharedSender, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => ws_sender
            .lock()
            .await
            .send(Message::Text(json.into()))
            .await
            .is_ok(),
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            true
        }
    }
}
