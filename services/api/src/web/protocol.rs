//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for the page viewer. The browser owns the actual audio element; the server owns the
//! playback cursor and tells the browser what to load.

use quran_viewer_core::domain::Selection;
use quran_viewer_core::playback::{PlaybackSignal, PlaybackSnapshot};
use quran_viewer_core::ports::ViewerEvent;
use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    // --- Transport controls ---
    TogglePlayback,
    SkipNext,
    SkipPrevious,
    /// Starts the page again after it completed.
    Replay,
    Seek { percent: f64 },
    SetVolume { volume: u8 },
    ToggleMute,

    // --- Reports from the browser's audio element ---
    // Each echoes the `load_id` of the `load` signal it answers; reports for
    // an older load are ignored.
    AudioReady {
        load_id: u64,
        #[serde(default)]
        duration: Option<f64>,
    },
    AudioProgress {
        load_id: u64,
        position: f64,
        #[serde(default)]
        duration: Option<f64>,
    },
    AudioEnded { load_id: u64 },
    AudioError { load_id: u64, message: String },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    PageChanged {
        page_number: u16,
    },
    /// `None` when the selection was cleared.
    SelectionChanged {
        selection: Option<Selection>,
    },
    /// The cursor changed. `signal`, when present, tells the audio element what to do.
    Playback {
        signal: Option<PlaybackSignal>,
        snapshot: PlaybackSnapshot,
    },
    /// The last verse of the page finished.
    PlaybackCompleted,
    /// Reports an error to the client, which should display an error message.
    Error { message: String },
}

impl From<&ViewerEvent> for ServerMessage {
    fn from(event: &ViewerEvent) -> Self {
        match event {
            ViewerEvent::PageChanged { page_number } => ServerMessage::PageChanged {
                page_number: *page_number,
            },
            ViewerEvent::SelectionChanged { selection } => ServerMessage::SelectionChanged {
                selection: *selection,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let seek: ClientMessage = serde_json::from_str(r#"{"type":"seek","percent":42.5}"#).unwrap();
        assert_eq!(seek, ClientMessage::Seek { percent: 42.5 });

        let ready: ClientMessage =
            serde_json::from_str(r#"{"type":"audio_ready","load_id":4}"#).unwrap();
        assert_eq!(ready, ClientMessage::AudioReady { load_id: 4, duration: None });

        let ended: ClientMessage =
            serde_json::from_str(r#"{"type":"audio_ended","load_id":4}"#).unwrap();
        assert_eq!(ended, ClientMessage::AudioEnded { load_id: 4 });
    }

    #[test]
    fn media_reports_without_a_load_id_are_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"audio_ended"}"#).is_err());
    }

    #[test]
    fn viewer_events_become_server_messages() {
        let message = ServerMessage::from(&ViewerEvent::PageChanged { page_number: 12 });
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "page_changed");
        assert_eq!(json["page_number"], 12);
    }
}
