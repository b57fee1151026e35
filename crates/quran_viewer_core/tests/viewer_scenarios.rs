//! End-to-end scenarios for the viewer controller against an in-process
//! content source.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{mpsc, Arc, Mutex};
use tokio::sync::Notify;

use quran_viewer_core::preferences::TRANSLATION_KEY;
use quran_viewer_core::{
    AnnotationCategory, AnnotationStore, CatalogEntry, ContentSource, KeyValueStore, MemoryStore,
    PageContent, PageLoad, PlaybackListener, PlaybackSignal, PlaybackSnapshot, PortResult,
    SearchHit, StructuralInfo, Unit, UnitKey, ViewerController, ViewerEvent, ViewerListener,
    ViewerOptions,
};

/// Serves five units per page. Requests for `gated_page` block until released.
#[derive(Default)]
struct FakeSource {
    gated_page: Option<u16>,
    requested: Notify,
    release: Notify,
}

impl FakeSource {
    fn gated(page: u16) -> Self {
        Self {
            gated_page: Some(page),
            ..Self::default()
        }
    }
}

fn page_content(page: u16) -> PageContent {
    let first = (page - 1) * 5;
    let units = (1..=5)
        .map(|i| Unit::new(UnitKey::new(2, first + i), format!("page {} verse {}", page, i)))
        .collect();
    PageContent::new(
        page,
        units,
        StructuralInfo {
            major_division_name: "Al-Baqarah".to_string(),
            minor_division_index: 1,
            sub_division_index: 1,
        },
    )
    .unwrap()
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn fetch_page(&self, page_number: u16) -> PortResult<PageContent> {
        if self.gated_page == Some(page_number) {
            self.requested.notify_one();
            self.release.notified().await;
        }
        Ok(page_content(page_number))
    }

    async fn fetch_page_with_translation(
        &self,
        page_number: u16,
        _translation_id: &str,
    ) -> PortResult<PageContent> {
        self.fetch_page(page_number).await
    }

    async fn fetch_audio_refs(&self, page_number: u16, reciter_id: &str) -> PortResult<Vec<String>> {
        Ok((1..=5)
            .map(|i| format!("https://audio.test/{}/{}/{}.mp3", reciter_id, page_number, i))
            .collect())
    }

    async fn search(&self, _query: &str, _language: &str) -> PortResult<Vec<SearchHit>> {
        Ok(Vec::new())
    }

    async fn list_reciters(&self) -> PortResult<Vec<CatalogEntry>> {
        Ok(Vec::new())
    }

    async fn list_translations(&self) -> PortResult<Vec<CatalogEntry>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct EventLog(Mutex<Vec<ViewerEvent>>);

impl ViewerListener for EventLog {
    fn on_event(&self, event: &ViewerEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

fn viewer(source: Arc<FakeSource>) -> (Arc<ViewerController>, Arc<EventLog>) {
    let kv = Arc::new(MemoryStore::new());
    let log = Arc::new(EventLog::default());
    let controller = ViewerController::new(
        source,
        Arc::new(AnnotationStore::open(kv.clone())),
        kv,
        ViewerOptions::default(),
    )
    .with_viewer_listener(log.clone());
    (Arc::new(controller), log)
}

#[tokio::test]
async fn late_response_for_an_older_request_is_discarded() {
    let source = Arc::new(FakeSource::gated(5));
    let (viewer, log) = viewer(source.clone());

    let slow = tokio::spawn({
        let viewer = viewer.clone();
        async move { viewer.change_page(5).await }
    });
    source.requested.notified().await;

    assert_eq!(viewer.change_page(7).await.unwrap(), PageLoad::Applied(7));
    source.release.notify_one();
    assert_eq!(slow.await.unwrap().unwrap(), PageLoad::Discarded(5));

    assert_eq!(viewer.current_page(), 7);
    assert_eq!(viewer.current_content().unwrap().page_number(), 7);
    assert_eq!(
        log.0.lock().unwrap().as_slice(),
        &[ViewerEvent::PageChanged { page_number: 7 }]
    );
}

/// Blocks the thread that reports `PageChanged` for `page` until resumed.
struct PauseOnPage {
    page: u16,
    reached: Notify,
    resume: Mutex<mpsc::Receiver<()>>,
}

impl ViewerListener for PauseOnPage {
    fn on_event(&self, event: &ViewerEvent) {
        if *event == (ViewerEvent::PageChanged { page_number: self.page }) {
            self.reached.notify_one();
            let _ = self.resume.lock().unwrap().recv();
        }
    }
}

#[derive(Default)]
struct LastPlayback(Mutex<Option<PlaybackSnapshot>>);

impl PlaybackListener for LastPlayback {
    fn on_playback(&self, _signal: Option<&PlaybackSignal>, snapshot: &PlaybackSnapshot) {
        *self.0.lock().unwrap() = Some(snapshot.clone());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn newer_page_applied_during_listener_callbacks_keeps_its_audio() {
    let (resume, paused) = mpsc::channel();
    let pause = Arc::new(PauseOnPage {
        page: 5,
        reached: Notify::new(),
        resume: Mutex::new(paused),
    });
    let last = Arc::new(LastPlayback::default());
    let kv = Arc::new(MemoryStore::new());
    let viewer = Arc::new(
        ViewerController::new(
            Arc::new(FakeSource::default()),
            Arc::new(AnnotationStore::open(kv.clone())),
            kv,
            ViewerOptions::default(),
        )
        .with_viewer_listener(pause.clone())
        .with_playback_listener(last.clone()),
    );

    let older = tokio::spawn({
        let viewer = viewer.clone();
        async move { viewer.change_page(5).await }
    });
    pause.reached.notified().await;

    assert_eq!(viewer.change_page(7).await.unwrap(), PageLoad::Applied(7));
    resume.send(()).unwrap();
    assert_eq!(older.await.unwrap().unwrap(), PageLoad::Applied(5));

    let page_seven_start = UnitKey::new(2, 31);
    assert_eq!(viewer.current_content().unwrap().page_number(), 7);
    assert_eq!(viewer.playback().unit_key, Some(page_seven_start));
    let published = last.0.lock().unwrap().clone().unwrap();
    assert_eq!(published.unit_key, Some(page_seven_start));
    assert_eq!(published.load_id, viewer.playback().load_id);
}

#[tokio::test]
async fn recording_mode_click_creates_exactly_one_annotation() {
    let (viewer, log) = viewer(Arc::new(FakeSource::default()));
    viewer.change_page(1).await.unwrap();
    viewer.enter_recording_mode(AnnotationCategory::PronunciationError);

    let key: UnitKey = "2:5".parse().unwrap();
    let created = viewer.select(key).unwrap().unwrap();
    assert_eq!(created.category, AnnotationCategory::PronunciationError);
    assert_eq!(created.page_number, 1);
    assert_eq!(created.unit_key, key);

    // Second click deselects and records nothing.
    assert_eq!(viewer.select(key).unwrap(), None);
    assert_eq!(viewer.state().selected_unit_key, None);
    assert_eq!(viewer.annotations().list_by_page(1), vec![created]);

    let events = log.0.lock().unwrap();
    let selections: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, ViewerEvent::SelectionChanged { .. }))
        .collect();
    assert_eq!(selections.len(), 2);

    let overlay = viewer.overlay().unwrap();
    assert_eq!(overlay.highlights.len(), 1);
    assert_eq!(overlay.highlights[0].color, "#f87171");
}

#[tokio::test]
async fn bookmark_toggles_the_current_page() {
    let (viewer, _) = viewer(Arc::new(FakeSource::default()));
    viewer.change_page(12).await.unwrap();
    assert!(viewer.state().bookmarks.is_empty());

    assert!(viewer.toggle_bookmark().unwrap());
    assert_eq!(viewer.state().bookmarks, BTreeSet::from([12]));
    assert!(viewer.snapshot().is_bookmarked);

    assert!(!viewer.toggle_bookmark().unwrap());
    assert!(viewer.state().bookmarks.is_empty());
}

#[tokio::test]
async fn recent_pages_are_most_recent_first_without_duplicates() {
    let (viewer, _) = viewer(Arc::new(FakeSource::default()));
    for page in [1, 2, 3, 2, 4] {
        viewer.change_page(page).await.unwrap();
    }
    assert_eq!(viewer.state().recent_pages, vec![4, 2, 3, 1]);
}

#[tokio::test]
async fn preferences_survive_a_new_controller() {
    let kv = Arc::new(MemoryStore::new());
    let source = Arc::new(FakeSource::default());
    let first = ViewerController::new(
        source.clone(),
        Arc::new(AnnotationStore::open(kv.clone())),
        kv.clone(),
        ViewerOptions::default(),
    );
    first.change_page(40).await.unwrap();
    first.toggle_bookmark().unwrap();
    first.set_zoom(20).unwrap();
    first.set_dark_mode(true).unwrap();

    let second = ViewerController::new(
        source,
        Arc::new(AnnotationStore::open(kv.clone())),
        kv,
        ViewerOptions::default(),
    );
    let state = second.state();
    assert_eq!(state.current_page, 40);
    assert_eq!(state.zoom_level, 120);
    assert!(state.dark_mode);
    assert_eq!(state.bookmarks, BTreeSet::from([40]));
}

#[tokio::test]
async fn hiding_translations_forgets_the_stored_choice() {
    let kv = Arc::new(MemoryStore::new());
    let source = Arc::new(FakeSource::default());
    let first = ViewerController::new(
        source.clone(),
        Arc::new(AnnotationStore::open(kv.clone())),
        kv.clone(),
        ViewerOptions::default(),
    );
    first.set_translation(Some("en.sahih".to_string())).await.unwrap();
    assert_eq!(kv.get(TRANSLATION_KEY).unwrap().as_deref(), Some("\"en.sahih\""));

    first.set_translation(None).await.unwrap();
    assert_eq!(kv.get(TRANSLATION_KEY).unwrap(), None);

    let second = ViewerController::new(
        source,
        Arc::new(AnnotationStore::open(kv.clone())),
        kv,
        ViewerOptions::default(),
    );
    let state = second.state();
    assert_eq!(state.translation, None);
    assert!(!state.show_translation);
}
