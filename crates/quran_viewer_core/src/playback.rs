//! crates/quran_viewer_core/src/playback.rs
//!
//! The playback cursor walks the per-unit audio of the current page.
//!
//! It never touches audio itself. Transitions return a [`PlaybackSignal`]
//! telling the media layer what to load or seek, and the media layer reports
//! back through `on_ready`, `on_progress`, `on_track_ended` and
//! `on_load_failed`. Every `Load` carries a `load_id`; reports must echo it and
//! reports for any other load are ignored. A track that cannot be played falls
//! back to a simulated ramp driven by `tick`, which reaches the same skip and
//! completion transitions as real audio.

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::UnitKey;

/// Time a simulated track takes to go from 0 to 100%.
pub const SIMULATED_UNIT_DURATION: Duration = Duration::from_secs(10);

/// Interval at which drivers are expected to call [`PlaybackCursor::tick`].
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Loading,
    Playing,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressSource {
    Media,
    Simulated,
}

/// Audio for one unit of the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioTrack {
    pub unit_key: UnitKey,
    pub audio_ref: Option<String>,
}

/// Instruction for the media layer produced by a transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackSignal {
    /// Load the audio of the track at `index`. `None` means there is nothing to
    /// load and the track will be simulated.
    Load {
        load_id: u64,
        index: usize,
        audio_ref: Option<String>,
    },
    /// Move the current track to this position, in seconds.
    SeekTo { seconds: f64 },
    /// The last track finished. Produced once per completed run.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    /// Id of the most recent `Load`.
    pub load_id: u64,
    pub index: usize,
    pub track_count: usize,
    pub unit_key: Option<UnitKey>,
    pub progress: f64,
    pub source: ProgressSource,
    pub volume: u8,
    pub muted: bool,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct PlaybackCursor {
    tracks: Vec<AudioTrack>,
    index: usize,
    /// Bumped on every `Load` signal.
    load_id: u64,
    /// Progress through the current track, 0..=100.
    progress: f64,
    duration: Option<f64>,
    state: PlaybackState,
    source: ProgressSource,
    play_when_ready: bool,
    volume: u8,
    muted: bool,
    last_error: Option<String>,
}

impl Default for PlaybackCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackCursor {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            index: 0,
            load_id: 0,
            progress: 0.0,
            duration: None,
            state: PlaybackState::Idle,
            source: ProgressSource::Media,
            play_when_ready: false,
            volume: 80,
            muted: false,
            last_error: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn load_id(&self) -> u64 {
        self.load_id
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn source(&self) -> ProgressSource {
        self.source
    }

    pub fn tracks(&self) -> &[AudioTrack] {
        &self.tracks
    }

    pub fn current_track(&self) -> Option<&AudioTrack> {
        self.tracks.get(self.index)
    }

    /// The `Load` of the current track, for a media layer that attaches late.
    pub fn current_load(&self) -> Option<PlaybackSignal> {
        self.current_track().map(|track| PlaybackSignal::Load {
            load_id: self.load_id,
            index: self.index,
            audio_ref: track.audio_ref.clone(),
        })
    }

    /// Replaces the track list and rewinds to the first track.
    pub fn load(&mut self, tracks: Vec<AudioTrack>, autoplay: bool) -> Option<PlaybackSignal> {
        self.tracks = tracks;
        self.index = 0;
        self.play_when_ready = autoplay;
        self.last_error = None;
        if self.tracks.is_empty() {
            self.state = PlaybackState::Idle;
            self.reset_track();
            return None;
        }
        self.state = PlaybackState::Loading;
        Some(self.begin_track())
    }

    /// Starts the list again after completion.
    pub fn replay(&mut self) -> Option<PlaybackSignal> {
        if self.state != PlaybackState::Completed {
            return None;
        }
        let tracks = std::mem::take(&mut self.tracks);
        self.load(tracks, true)
    }

    /// The media layer can play the current track.
    pub fn on_ready(&mut self, load_id: u64, duration_secs: Option<f64>) {
        if self.is_current(load_id, "ready") {
            self.mark_ready(duration_secs);
        }
    }

    fn mark_ready(&mut self, duration_secs: Option<f64>) {
        self.duration = duration_secs.filter(|d| d.is_finite() && *d > 0.0);
        if self.state == PlaybackState::Loading {
            self.state = if self.play_when_ready {
                PlaybackState::Playing
            } else {
                PlaybackState::Paused
            };
        }
    }

    /// The current track could not be loaded or played. Playback continues on
    /// a simulated ramp.
    pub fn on_load_failed(&mut self, load_id: u64, reason: &str) {
        if !self.is_current(load_id, "load failure") {
            return;
        }
        if matches!(self.state, PlaybackState::Idle | PlaybackState::Completed) {
            return;
        }
        warn!(index = self.index, "Audio unavailable, simulating playback: {}", reason);
        self.last_error = Some(reason.to_string());
        self.source = ProgressSource::Simulated;
        self.duration = None;
        if self.state == PlaybackState::Loading {
            self.state = if self.play_when_ready {
                PlaybackState::Playing
            } else {
                PlaybackState::Paused
            };
        }
    }

    pub fn toggle_playback(&mut self) {
        self.state = match self.state {
            PlaybackState::Playing => PlaybackState::Paused,
            PlaybackState::Paused => PlaybackState::Playing,
            other => {
                debug!(state = ?other, "Toggle ignored");
                return;
            }
        };
        self.play_when_ready = self.state == PlaybackState::Playing;
    }

    /// Media-reported position of the current track.
    pub fn on_progress(&mut self, load_id: u64, position_secs: f64, duration_secs: Option<f64>) {
        if load_id != self.load_id {
            return;
        }
        if self.source != ProgressSource::Media || self.state != PlaybackState::Playing {
            return;
        }
        if let Some(d) = duration_secs.filter(|d| d.is_finite() && *d > 0.0) {
            self.duration = Some(d);
        }
        if let Some(d) = self.duration {
            self.progress = (position_secs / d * 100.0).clamp(0.0, 100.0);
        }
    }

    /// Advances the simulated ramp.
    pub fn tick(&mut self, elapsed: Duration) -> Option<PlaybackSignal> {
        if self.source != ProgressSource::Simulated || self.state != PlaybackState::Playing {
            return None;
        }
        let step = elapsed.as_secs_f64() / SIMULATED_UNIT_DURATION.as_secs_f64() * 100.0;
        self.progress = (self.progress + step).min(100.0);
        if self.progress >= 100.0 {
            self.finish_track()
        } else {
            None
        }
    }

    /// The current track finished playing.
    pub fn on_track_ended(&mut self, load_id: u64) -> Option<PlaybackSignal> {
        if !self.is_current(load_id, "track end") {
            return None;
        }
        self.finish_track()
    }

    fn finish_track(&mut self) -> Option<PlaybackSignal> {
        if self.state != PlaybackState::Playing {
            return None;
        }
        if self.index + 1 < self.tracks.len() {
            self.index += 1;
            debug!(index = self.index, "Advancing to next track");
            Some(self.begin_track())
        } else {
            self.state = PlaybackState::Completed;
            self.index = 0;
            self.play_when_ready = false;
            self.reset_track();
            debug!("Playback completed");
            Some(PlaybackSignal::Completed)
        }
    }

    pub fn skip_next(&mut self) -> Option<PlaybackSignal> {
        if !self.can_skip() || self.index + 1 >= self.tracks.len() {
            return None;
        }
        self.index += 1;
        self.after_skip();
        Some(self.begin_track())
    }

    pub fn skip_previous(&mut self) -> Option<PlaybackSignal> {
        if !self.can_skip() || self.index == 0 {
            return None;
        }
        self.index -= 1;
        self.after_skip();
        Some(self.begin_track())
    }

    /// Moves inside the current track only. Returns the media position when
    /// the track plays real audio with a known duration.
    pub fn seek(&mut self, percent: f64) -> Option<PlaybackSignal> {
        if self.tracks.is_empty() || self.state == PlaybackState::Loading {
            return None;
        }
        self.progress = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        match (self.source, self.duration) {
            (ProgressSource::Media, Some(d)) => Some(PlaybackSignal::SeekTo {
                seconds: self.progress / 100.0 * d,
            }),
            _ => None,
        }
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        self.muted = self.volume == 0;
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state,
            load_id: self.load_id,
            index: self.index,
            track_count: self.tracks.len(),
            unit_key: self.current_track().map(|t| t.unit_key),
            progress: self.progress,
            source: self.source,
            volume: self.volume,
            muted: self.muted,
            last_error: self.last_error.clone(),
        }
    }

    fn is_current(&self, load_id: u64, report: &str) -> bool {
        if load_id == self.load_id {
            return true;
        }
        debug!(load_id, current = self.load_id, "Ignoring {} for a superseded load", report);
        false
    }

    fn can_skip(&self) -> bool {
        !self.tracks.is_empty() && self.state != PlaybackState::Loading
    }

    fn after_skip(&mut self) {
        if self.state == PlaybackState::Completed {
            self.state = PlaybackState::Paused;
        }
    }

    fn reset_track(&mut self) {
        self.progress = 0.0;
        self.duration = None;
        self.source = ProgressSource::Media;
    }

    fn begin_track(&mut self) -> PlaybackSignal {
        self.reset_track();
        self.load_id += 1;
        let audio_ref = self.tracks.get(self.index).and_then(|t| t.audio_ref.clone());
        if audio_ref.is_none() {
            self.source = ProgressSource::Simulated;
            if self.state == PlaybackState::Loading {
                self.mark_ready(None);
            }
        }
        PlaybackSignal::Load {
            load_id: self.load_id,
            index: self.index,
            audio_ref,
        }
    }
}
