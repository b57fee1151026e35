//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the bridge from viewer events to
//! connected WebSockets.

use crate::config::Config;
use crate::web::playback_task::playback_process;
use crate::web::protocol::ServerMessage;
use quran_viewer_core::annotations::AnnotationStore;
use quran_viewer_core::controller::{ViewerController, ViewerOptions};
use quran_viewer_core::playback::{PlaybackSignal, PlaybackSnapshot};
use quran_viewer_core::ports::{
    ContentSource, KeyValueStore, PlaybackListener, ViewerEvent, ViewerListener,
};
use quran_viewer_core::preferences::Preferences;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Messages buffered per subscriber before a slow socket starts lagging.
const EVENT_BUFFER: usize = 256;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub viewer: Arc<ViewerController>,
    /// Fan-out of viewer and playback updates to every open socket.
    pub events: broadcast::Sender<ServerMessage>,
    driver: Mutex<DriverSlot>,
}

/// Bookkeeping for the single playback driver shared by all sockets.
#[derive(Default)]
struct DriverSlot {
    connections: usize,
    token: Option<CancellationToken>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn ContentSource>,
        kv: Arc<dyn KeyValueStore>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let listener = Arc::new(BroadcastListener {
            sender: events.clone(),
        });

        let defaults = Preferences {
            reciter: config.default_reciter.clone(),
            show_translation: config.default_translation.is_some(),
            translation: config.default_translation.clone(),
            ..Preferences::default()
        };
        let viewer = ViewerController::new(
            source,
            Arc::new(AnnotationStore::open(kv.clone())),
            kv,
            ViewerOptions {
                initial_page: None,
                autoplay: config.autoplay,
                defaults,
            },
        )
        .with_viewer_listener(listener.clone())
        .with_playback_listener(listener);

        Arc::new(Self {
            config,
            viewer: Arc::new(viewer),
            events,
            driver: Mutex::new(DriverSlot::default()),
        })
    }

    /// Registers a socket. The first one starts the playback driver.
    pub fn socket_opened(self: &Arc<Self>) {
        let mut slot = self.driver.lock().unwrap_or_else(PoisonError::into_inner);
        slot.connections += 1;
        if slot.token.is_none() {
            let token = CancellationToken::new();
            tokio::spawn(playback_process(self.clone(), token.clone()));
            slot.token = Some(token);
            info!("Playback driver started.");
        }
    }

    /// Unregisters a socket. The last one stops the playback driver.
    pub fn socket_closed(&self) {
        let mut slot = self.driver.lock().unwrap_or_else(PoisonError::into_inner);
        slot.connections = slot.connections.saturating_sub(1);
        if slot.connections == 0 {
            if let Some(token) = slot.token.take() {
                token.cancel();
                info!("Playback driver stopped.");
            }
        }
    }
}

//=========================================================================================
// BroadcastListener
//=========================================================================================

/// Forwards viewer events and playback updates to the broadcast channel.
/// Sending fails only when no socket is subscribed, which is ignored.
pub struct BroadcastListener {
    sender: broadcast::Sender<ServerMessage>,
}

impl ViewerListener for BroadcastListener {
    fn on_event(&self, event: &ViewerEvent) {
        let _ = self.sender.send(ServerMessage::from(event));
    }
}

impl PlaybackListener for BroadcastListener {
    fn on_playback(&self, signal: Option<&PlaybackSignal>, snapshot: &PlaybackSnapshot) {
        let _ = self.sender.send(ServerMessage::Playback {
            signal: signal.cloned(),
            snapshot: snapshot.clone(),
        });
        if signal == Some(&PlaybackSignal::Completed) {
            let _ = self.sender.send(ServerMessage::PlaybackCompleted);
        }
    }
}
