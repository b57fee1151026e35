//! crates/quran_viewer_core/src/controller.rs
//!
//! The viewer controller owns the viewer state and orchestrates the content
//! source, the annotation store, the overlay layout and the playback cursor.
//!
//! Page loads follow a last-request-wins policy: every request takes a new
//! generation number and a response is applied only if its generation is
//! still the latest when it resolves. Failed loads leave the current page in
//! place and record a retryable `Failed` status.

use futures::future::join;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::annotations::AnnotationStore;
use crate::domain::{
    Annotation, AnnotationCategory, CatalogEntry, HighlightRange, NewAnnotation, PageContent,
    SearchHit, Selection, UnitKey, TOTAL_PAGES,
};
use crate::export;
use crate::index::{self, clamp_page};
use crate::lock;
use crate::overlay::{build_overlay, hit_test, PageOverlay};
use crate::playback::{AudioTrack, PlaybackCursor, PlaybackSignal, PlaybackSnapshot};
use crate::ports::{
    ContentSource, KeyValueStore, PlaybackListener, PortError, PortResult, ViewerEvent,
    ViewerListener,
};
use crate::preferences::{
    PreferenceStore, Preferences, BOOKMARKS_KEY, DARK_MODE_KEY, RECENT_PAGES_KEY, RECITER_KEY,
    SHOW_TRANSLATION_KEY, TRANSLATION_KEY, ZOOM_KEY,
};

pub const MIN_ZOOM: u8 = 50;
pub const MAX_ZOOM: u8 = 150;
pub const ZOOM_STEP: u8 = 10;
pub const RECENT_PAGES_LIMIT: usize = 5;

//=========================================================================================
// State Types
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadStatus {
    /// Nothing requested yet.
    Idle,
    Loading { page_number: u16 },
    Ready,
    /// The last request failed. `page_number` is the page a retry will request.
    Failed { page_number: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewerState {
    pub current_page: u16,
    pub zoom_level: u8,
    pub selected_unit_key: Option<UnitKey>,
    pub recording_mode: bool,
    pub active_category: Option<AnnotationCategory>,
    pub bookmarks: BTreeSet<u16>,
    pub recent_pages: Vec<u16>,
    pub dark_mode: bool,
    pub reciter: String,
    pub show_translation: bool,
    pub translation: Option<String>,
    /// Student the recorded notes are attributed to.
    pub student_id: Option<String>,
}

/// Serializable view of the whole viewer, for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerSnapshot {
    pub state: ViewerState,
    pub status: LoadStatus,
    pub is_bookmarked: bool,
    pub content: Option<PageContent>,
    pub playback: PlaybackSnapshot,
}

/// Outcome of a page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLoad {
    Applied(u16),
    /// A newer request was made while this one was in flight.
    Discarded(u16),
}

#[derive(Debug, Clone)]
pub struct ViewerOptions {
    /// Page to open on. Falls back to the most recent page, then page 1.
    pub initial_page: Option<u16>,
    pub autoplay: bool,
    pub defaults: Preferences,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            initial_page: None,
            autoplay: false,
            defaults: Preferences::default(),
        }
    }
}

//=========================================================================================
// Keyboard Commands
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    NextPage,
    PreviousPage,
    FirstPage,
    LastPage,
    ToggleBookmark,
    ZoomIn,
    ZoomOut,
}

impl ViewerCommand {
    /// Maps a keyboard key name to a command. Pages read right to left, so
    /// the right arrow goes back.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowRight" => Some(Self::PreviousPage),
            "ArrowLeft" => Some(Self::NextPage),
            "Home" => Some(Self::FirstPage),
            "End" => Some(Self::LastPage),
            "b" | "B" => Some(Self::ToggleBookmark),
            "+" => Some(Self::ZoomIn),
            "-" => Some(Self::ZoomOut),
            _ => None,
        }
    }
}

//=========================================================================================
// Controller
//=========================================================================================

struct Inner {
    state: ViewerState,
    status: LoadStatus,
    content: Option<PageContent>,
    highlights: Vec<HighlightRange>,
    generation: u64,
}

pub struct ViewerController {
    source: Arc<dyn ContentSource>,
    annotations: Arc<AnnotationStore>,
    preferences: PreferenceStore,
    viewer_listeners: Vec<Arc<dyn ViewerListener>>,
    playback_listeners: Vec<Arc<dyn PlaybackListener>>,
    autoplay: bool,
    inner: Mutex<Inner>,
    cursor: Mutex<PlaybackCursor>,
    playback_order: PlaybackOrder,
}

/// Result of one cursor transition, published after the locks are released.
struct PlaybackUpdate {
    stamp: u64,
    signal: Option<PlaybackSignal>,
    snapshot: PlaybackSnapshot,
    changed: bool,
}

/// Keeps playback listeners from seeing an older snapshot after a newer one.
/// Stamps are taken under the cursor lock, so they follow transition order.
#[derive(Default)]
struct PlaybackOrder {
    next: AtomicU64,
    latest: Mutex<Published>,
}

#[derive(Default)]
struct Published {
    stamp: u64,
    load_id: u64,
}

impl PlaybackOrder {
    fn stamp(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decides whether an update may still reach the listeners. A late update
    /// only passes if it carries a signal for the load that is still current.
    fn admit(&self, update: &PlaybackUpdate) -> bool {
        let mut latest = lock(&self.latest);
        if update.stamp > latest.stamp {
            latest.stamp = update.stamp;
            latest.load_id = update.snapshot.load_id;
            return true;
        }
        match &update.signal {
            Some(PlaybackSignal::Load { load_id, .. }) => *load_id >= latest.load_id,
            Some(_) => update.snapshot.load_id >= latest.load_id,
            None => false,
        }
    }
}

impl ViewerController {
    pub fn new(
        source: Arc<dyn ContentSource>,
        annotations: Arc<AnnotationStore>,
        preference_kv: Arc<dyn KeyValueStore>,
        options: ViewerOptions,
    ) -> Self {
        let preferences = PreferenceStore::new(preference_kv);
        let prefs = preferences.load(options.defaults);
        let current_page = options
            .initial_page
            .map(|page| clamp_page(page.into()))
            .or_else(|| prefs.recent_pages.first().map(|&page| clamp_page(page.into())))
            .unwrap_or(1);

        let state = ViewerState {
            current_page,
            zoom_level: snap_zoom(prefs.zoom.into()),
            selected_unit_key: None,
            recording_mode: false,
            active_category: None,
            bookmarks: prefs.bookmarks,
            recent_pages: prefs.recent_pages,
            dark_mode: prefs.dark_mode,
            reciter: prefs.reciter,
            show_translation: prefs.show_translation,
            translation: prefs.translation,
            student_id: None,
        };

        Self {
            source,
            annotations,
            preferences,
            viewer_listeners: Vec::new(),
            playback_listeners: Vec::new(),
            autoplay: options.autoplay,
            inner: Mutex::new(Inner {
                state,
                status: LoadStatus::Idle,
                content: None,
                highlights: Vec::new(),
                generation: 0,
            }),
            cursor: Mutex::new(PlaybackCursor::new()),
            playback_order: PlaybackOrder::default(),
        }
    }

    pub fn with_viewer_listener(mut self, listener: Arc<dyn ViewerListener>) -> Self {
        self.viewer_listeners.push(listener);
        self
    }

    pub fn with_playback_listener(mut self, listener: Arc<dyn PlaybackListener>) -> Self {
        self.playback_listeners.push(listener);
        self
    }

    pub fn annotations(&self) -> &Arc<AnnotationStore> {
        &self.annotations
    }

    pub fn current_page(&self) -> u16 {
        lock(&self.inner).state.current_page
    }

    pub fn current_content(&self) -> Option<PageContent> {
        lock(&self.inner).content.clone()
    }

    pub fn state(&self) -> ViewerState {
        lock(&self.inner).state.clone()
    }

    pub fn status(&self) -> LoadStatus {
        lock(&self.inner).status.clone()
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        let playback = lock(&self.cursor).snapshot();
        let inner = lock(&self.inner);
        ViewerSnapshot {
            is_bookmarked: inner.state.bookmarks.contains(&inner.state.current_page),
            state: inner.state.clone(),
            status: inner.status.clone(),
            content: inner.content.clone(),
            playback,
        }
    }

    //-------------------------------------------------------------------------------------
    // Navigation
    //-------------------------------------------------------------------------------------

    /// Requests a page, clamped to the valid range, and applies it unless a
    /// newer request superseded it in the meantime.
    pub async fn change_page(&self, requested: i64) -> PortResult<PageLoad> {
        let page = clamp_page(requested);
        let (generation, translation, reciter) = {
            let mut inner = lock(&self.inner);
            inner.generation += 1;
            inner.status = LoadStatus::Loading { page_number: page };
            let translation = if inner.state.show_translation {
                inner.state.translation.clone()
            } else {
                None
            };
            (inner.generation, translation, inner.state.reciter.clone())
        };
        debug!(page, generation, "Requesting page");

        let content = async {
            match translation.as_deref() {
                Some(translation_id) => {
                    self.source
                        .fetch_page_with_translation(page, translation_id)
                        .await
                }
                None => self.source.fetch_page(page).await,
            }
        };
        let (content, audio) = join(content, self.source.fetch_audio_refs(page, &reciter)).await;
        self.apply_page(generation, page, content, audio)
    }

    pub async fn next_page(&self) -> PortResult<PageLoad> {
        let page = index::next_page(self.current_page());
        self.change_page(page.into()).await
    }

    pub async fn previous_page(&self) -> PortResult<PageLoad> {
        let page = index::previous_page(self.current_page());
        self.change_page(page.into()).await
    }

    pub async fn first_page(&self) -> PortResult<PageLoad> {
        self.change_page(1).await
    }

    pub async fn last_page(&self) -> PortResult<PageLoad> {
        self.change_page(TOTAL_PAGES.into()).await
    }

    pub async fn go_to_major_division(&self, number: u16) -> PortResult<PageLoad> {
        let page = index::page_for_major_division(number)?;
        self.change_page(page.into()).await
    }

    pub async fn go_to_structural_division(&self, number: u16) -> PortResult<PageLoad> {
        let page = index::page_for_structural_division(number)?;
        self.change_page(page.into()).await
    }

    /// Requests the failed page again, or reloads the current one.
    pub async fn retry(&self) -> PortResult<PageLoad> {
        let page = {
            let inner = lock(&self.inner);
            match &inner.status {
                LoadStatus::Failed { page_number, .. } => *page_number,
                _ => inner.state.current_page,
            }
        };
        self.change_page(page.into()).await
    }

    pub async fn execute(&self, command: ViewerCommand) -> PortResult<()> {
        match command {
            ViewerCommand::NextPage => self.next_page().await.map(drop),
            ViewerCommand::PreviousPage => self.previous_page().await.map(drop),
            ViewerCommand::FirstPage => self.first_page().await.map(drop),
            ViewerCommand::LastPage => self.last_page().await.map(drop),
            ViewerCommand::ToggleBookmark => self.toggle_bookmark().map(drop),
            ViewerCommand::ZoomIn => self.set_zoom(ZOOM_STEP.into()).map(drop),
            ViewerCommand::ZoomOut => self.set_zoom(-i32::from(ZOOM_STEP)).map(drop),
        }
    }

    fn apply_page(
        &self,
        generation: u64,
        page: u16,
        content: PortResult<PageContent>,
        audio: PortResult<Vec<String>>,
    ) -> PortResult<PageLoad> {
        let mut events = Vec::new();
        let update = {
            let mut inner = lock(&self.inner);
            if inner.generation != generation {
                debug!(page, generation, "Discarding stale page response");
                return Ok(PageLoad::Discarded(page));
            }

            let content = content.and_then(|content| {
                if content.page_number() == page {
                    Ok(content)
                } else {
                    Err(PortError::ContentUnavailable(format!(
                        "Provider returned page {} for page {}",
                        content.page_number(),
                        page
                    )))
                }
            });
            let content = match content {
                Ok(content) => content,
                Err(e) => {
                    warn!(page, "Failed to load page: {}", e);
                    inner.status = LoadStatus::Failed {
                        page_number: page,
                        message: e.to_string(),
                    };
                    return Err(e);
                }
            };

            let previously_loaded = inner.content.as_ref().map(PageContent::page_number);
            inner.state.current_page = page;
            record_visit(&mut inner.state.recent_pages, page);
            if let Err(e) = self
                .preferences
                .write(RECENT_PAGES_KEY, &inner.state.recent_pages)
            {
                warn!("Failed to persist recent pages: {}", e);
            }
            if previously_loaded != Some(page) {
                events.push(ViewerEvent::PageChanged { page_number: page });
            }
            if inner.state.selected_unit_key.take().is_some() {
                events.push(ViewerEvent::SelectionChanged { selection: None });
            }

            let tracks = build_tracks(&content, audio);
            inner.content = Some(content);
            inner.status = LoadStatus::Ready;
            // Loaded under `inner` so a newer page cannot land in between.
            let mut cursor = lock(&self.cursor);
            self.transition(&mut cursor, |cursor| cursor.load(tracks, self.autoplay))
        };
        info!(page, "Page loaded");

        self.emit(&events);
        self.publish_playback(update);
        Ok(PageLoad::Applied(page))
    }

    //-------------------------------------------------------------------------------------
    // Selection and Recording Mode
    //-------------------------------------------------------------------------------------

    /// Toggles the selection of a unit on the loaded page. In recording mode
    /// with an active category, selecting a unit first records a note on it.
    pub fn select(&self, key: UnitKey) -> PortResult<Option<Annotation>> {
        let (created, selection) = {
            let mut inner = lock(&self.inner);
            let content = inner
                .content
                .as_ref()
                .ok_or_else(|| PortError::NotFound("No page is loaded".to_string()))?;
            let page = content.page_number();
            if !content.contains(&key) {
                return Err(PortError::NotFound(format!(
                    "Unit {} is not on page {}",
                    key, page
                )));
            }

            let already_selected = inner.state.selected_unit_key == Some(key);
            let recording = inner.state.active_category.filter(|_| inner.state.recording_mode);
            let created = match recording {
                Some(category) if !already_selected => Some(self.annotations.add(NewAnnotation {
                    page_number: page,
                    unit_key: key,
                    sub_unit: None,
                    student_id: inner.state.student_id.clone(),
                    category,
                    text: category.default_text(&key),
                })?),
                _ => None,
            };

            if already_selected {
                inner.state.selected_unit_key = None;
                (created, None)
            } else {
                inner.state.selected_unit_key = Some(key);
                let selection = Selection {
                    start_key: key,
                    end_key: key,
                    page_number: page,
                };
                (created, Some(selection))
            }
        };
        self.emit(&[ViewerEvent::SelectionChanged { selection }]);
        Ok(created)
    }

    /// Selects the unit under a point of the page image. `y` is measured from
    /// the top of the content area as a fraction of its height.
    pub fn select_at(&self, y: f64) -> PortResult<Option<Annotation>> {
        let key = {
            let inner = lock(&self.inner);
            let content = inner
                .content
                .as_ref()
                .ok_or_else(|| PortError::NotFound("No page is loaded".to_string()))?;
            hit_test(y, content.unit_count())
                .and_then(|index| content.units().get(index))
                .map(|unit| unit.key)
                .ok_or_else(|| PortError::NotFound(format!("No unit at position {}", y)))?
        };
        self.select(key)
    }

    /// Records a note anchored to a unit. The unit must be on the given page,
    /// checked against the loaded page or, for any other page, a fresh fetch.
    pub async fn record_annotation(&self, new: NewAnnotation) -> PortResult<Annotation> {
        if new.page_number == 0 || new.page_number > TOTAL_PAGES {
            return Err(PortError::NotFound(format!(
                "Page {} does not exist",
                new.page_number
            )));
        }
        let loaded = lock(&self.inner)
            .content
            .as_ref()
            .filter(|content| content.page_number() == new.page_number)
            .map(|content| content.contains(&new.unit_key));
        let on_page = match loaded {
            Some(on_page) => on_page,
            None => self
                .source
                .fetch_page(new.page_number)
                .await?
                .contains(&new.unit_key),
        };
        if !on_page {
            return Err(PortError::NotFound(format!(
                "Unit {} is not on page {}",
                new.unit_key, new.page_number
            )));
        }
        self.annotations.add(new)
    }

    pub fn clear_selection(&self) {
        let cleared = lock(&self.inner).state.selected_unit_key.take().is_some();
        if cleared {
            self.emit(&[ViewerEvent::SelectionChanged { selection: None }]);
        }
    }

    pub fn enter_recording_mode(&self, category: AnnotationCategory) {
        let mut inner = lock(&self.inner);
        inner.state.recording_mode = true;
        inner.state.active_category = Some(category);
        debug!(?category, "Recording mode on");
    }

    pub fn exit_recording_mode(&self) {
        let mut inner = lock(&self.inner);
        inner.state.recording_mode = false;
        inner.state.active_category = None;
        debug!("Recording mode off");
    }

    /// Attributes subsequently recorded notes to a student.
    pub fn set_student(&self, student_id: Option<String>) {
        lock(&self.inner).state.student_id = student_id;
    }

    //-------------------------------------------------------------------------------------
    // Preferences
    //-------------------------------------------------------------------------------------

    /// Adds or removes the current page from the bookmarks. Returns whether
    /// the page is bookmarked afterwards.
    pub fn toggle_bookmark(&self) -> PortResult<bool> {
        let mut inner = lock(&self.inner);
        let page = inner.state.current_page;
        let mut bookmarks = inner.state.bookmarks.clone();
        let bookmarked = if bookmarks.remove(&page) {
            false
        } else {
            bookmarks.insert(page);
            true
        };
        self.preferences.write(BOOKMARKS_KEY, &bookmarks)?;
        inner.state.bookmarks = bookmarks;
        Ok(bookmarked)
    }

    /// Adjusts the zoom by `delta` percent, snapped to the zoom step and
    /// clamped to the zoom range.
    pub fn set_zoom(&self, delta: i32) -> PortResult<u8> {
        let mut inner = lock(&self.inner);
        let zoom = snap_zoom(i32::from(inner.state.zoom_level) + delta);
        self.preferences.write(ZOOM_KEY, &zoom)?;
        inner.state.zoom_level = zoom;
        Ok(zoom)
    }

    pub fn set_dark_mode(&self, enabled: bool) -> PortResult<()> {
        let mut inner = lock(&self.inner);
        self.preferences.write(DARK_MODE_KEY, &enabled)?;
        inner.state.dark_mode = enabled;
        Ok(())
    }

    /// Switches reciter and reloads the audio of the loaded page.
    pub async fn set_reciter(&self, reciter: String) -> PortResult<()> {
        {
            let mut inner = lock(&self.inner);
            self.preferences.write(RECITER_KEY, &reciter)?;
            inner.state.reciter = reciter;
        }
        self.reload_audio().await;
        Ok(())
    }

    /// Selects a translation, or hides translations with `None`, and reloads
    /// the current page with it.
    pub async fn set_translation(&self, translation: Option<String>) -> PortResult<PageLoad> {
        {
            let mut inner = lock(&self.inner);
            let show = translation.is_some();
            match &translation {
                Some(id) => self.preferences.write(TRANSLATION_KEY, id)?,
                None => self.preferences.clear(TRANSLATION_KEY)?,
            }
            self.preferences.write(SHOW_TRANSLATION_KEY, &show)?;
            inner.state.translation = translation;
            inner.state.show_translation = show;
        }
        self.retry().await
    }

    async fn reload_audio(&self) {
        let (generation, page, reciter) = {
            let inner = lock(&self.inner);
            match &inner.content {
                Some(content) => (
                    inner.generation,
                    content.page_number(),
                    inner.state.reciter.clone(),
                ),
                None => return,
            }
        };
        let audio = self.source.fetch_audio_refs(page, &reciter).await;
        let update = {
            let inner = lock(&self.inner);
            let tracks = match &inner.content {
                Some(content) if inner.generation == generation => build_tracks(content, audio),
                _ => {
                    debug!(page, "Discarding stale audio response");
                    return;
                }
            };
            let mut cursor = lock(&self.cursor);
            self.transition(&mut cursor, |cursor| cursor.load(tracks, self.autoplay))
        };
        self.publish_playback(update);
    }

    //-------------------------------------------------------------------------------------
    // Overlay, Search and Export
    //-------------------------------------------------------------------------------------

    /// Replaces the externally supplied highlight ranges.
    pub fn set_highlights(&self, ranges: Vec<HighlightRange>) {
        lock(&self.inner).highlights = ranges;
    }

    /// Unit regions and highlights for the loaded page.
    pub fn overlay(&self) -> Option<PageOverlay> {
        let inner = lock(&self.inner);
        let content = inner.content.as_ref()?;
        let annotations = self.annotations.list_by_page(content.page_number());
        Some(build_overlay(
            content,
            inner.state.selected_unit_key.as_ref(),
            &inner.highlights,
            &annotations,
        ))
    }

    pub async fn search(&self, query: &str, language: &str) -> PortResult<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.source.search(query, language).await
    }

    pub async fn reciters(&self) -> PortResult<Vec<CatalogEntry>> {
        self.source.list_reciters().await
    }

    pub async fn translations(&self) -> PortResult<Vec<CatalogEntry>> {
        self.source.list_translations().await
    }

    pub fn printable_document(&self) -> PortResult<String> {
        let inner = lock(&self.inner);
        inner
            .content
            .as_ref()
            .map(export::printable_document)
            .ok_or_else(|| PortError::NotFound("No page is loaded".to_string()))
    }

    pub fn share_link(&self, base_url: &str) -> String {
        export::share_link(base_url, self.current_page())
    }

    /// Opens the page a share link points at.
    pub async fn open_share_link(&self, link: &str) -> PortResult<PageLoad> {
        let page = export::page_from_share_link(link)
            .ok_or_else(|| PortError::NotFound(format!("No page in link '{}'", link)))?;
        self.change_page(page.into()).await
    }

    //-------------------------------------------------------------------------------------
    // Playback
    //-------------------------------------------------------------------------------------

    pub fn playback(&self) -> PlaybackSnapshot {
        lock(&self.cursor).snapshot()
    }

    /// Reads the cursor without notifying anyone.
    pub fn inspect_playback<R>(&self, read: impl FnOnce(&PlaybackCursor) -> R) -> R {
        read(&lock(&self.cursor))
    }

    /// Runs a transition on the playback cursor and notifies playback
    /// listeners when it produced a signal or changed the cursor.
    pub fn drive_playback<F>(&self, transition: F) -> Option<PlaybackSignal>
    where
        F: FnOnce(&mut PlaybackCursor) -> Option<PlaybackSignal>,
    {
        let update = {
            let mut cursor = lock(&self.cursor);
            self.transition(&mut cursor, transition)
        };
        let signal = update.signal.clone();
        self.publish_playback(update);
        signal
    }

    /// Runs a transition on a locked cursor. Lock order is `inner`, then `cursor`.
    fn transition<F>(&self, cursor: &mut PlaybackCursor, transition: F) -> PlaybackUpdate
    where
        F: FnOnce(&mut PlaybackCursor) -> Option<PlaybackSignal>,
    {
        let before = cursor.snapshot();
        let signal = transition(cursor);
        let snapshot = cursor.snapshot();
        PlaybackUpdate {
            stamp: self.playback_order.stamp(),
            changed: signal.is_some() || before != snapshot,
            signal,
            snapshot,
        }
    }

    fn publish_playback(&self, update: PlaybackUpdate) {
        if !update.changed || !self.playback_order.admit(&update) {
            return;
        }
        for listener in &self.playback_listeners {
            listener.on_playback(update.signal.as_ref(), &update.snapshot);
        }
    }

    fn emit(&self, events: &[ViewerEvent]) {
        for event in events {
            for listener in &self.viewer_listeners {
                listener.on_event(event);
            }
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Moves `page` to the front of the recent list, without duplicates.
fn record_visit(recent: &mut Vec<u16>, page: u16) {
    recent.retain(|&p| p != page);
    recent.insert(0, page);
    recent.truncate(RECENT_PAGES_LIMIT);
}

fn snap_zoom(value: i32) -> u8 {
    let step = i32::from(ZOOM_STEP);
    let snapped = (value + step / 2).div_euclid(step) * step;
    // Clamped to 50..=150, so the cast cannot truncate.
    snapped.clamp(MIN_ZOOM.into(), MAX_ZOOM.into()) as u8
}

/// Pairs each unit with its audio. A failed or misaligned audio list leaves
/// every track without media, which the cursor plays as a simulation.
fn build_tracks(content: &PageContent, audio: PortResult<Vec<String>>) -> Vec<AudioTrack> {
    let count = content.unit_count();
    let refs: Vec<Option<String>> = match audio {
        Ok(refs) if refs.len() == count => refs.into_iter().map(Some).collect(),
        Ok(refs) => {
            warn!(
                page = content.page_number(),
                expected = count,
                received = refs.len(),
                "Audio list does not match the page, simulating playback"
            );
            vec![None; count]
        }
        Err(e) => {
            warn!(page = content.page_number(), "Audio unavailable, simulating playback: {}", e);
            vec![None; count]
        }
    };
    content
        .units()
        .iter()
        .zip(refs)
        .map(|(unit, audio_ref)| AudioTrack {
            unit_key: unit.key,
            audio_ref: audio_ref.or_else(|| unit.audio_ref.clone()),
        })
        .collect()
}
