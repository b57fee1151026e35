use api_lib::config::Config;
use api_lib::web::protocol::ClientMessage;
use api_lib::web::{router, state::AppState, ws_handler::apply_client_message};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use quran_viewer_core::domain::{CatalogEntry, PageContent, SearchHit, StructuralInfo, Unit, UnitKey};
use quran_viewer_core::ports::{ContentSource, PortError, PortResult};
use quran_viewer_core::playback::{PlaybackState, ProgressSource};
use quran_viewer_core::storage::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Serves five units per page; page 13 is always unavailable.
struct FakeSource;

const BROKEN_PAGE: u16 = 13;

fn page(number: u16) -> PageContent {
    let first = (number - 1) * 5 + 1;
    let units = (first..first + 5)
        .map(|i| Unit::new(UnitKey::new(2, i), format!("verse {}", i)))
        .collect();
    PageContent::new(
        number,
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
        if page_number == BROKEN_PAGE {
            return Err(PortError::ContentUnavailable("provider timed out".to_string()));
        }
        Ok(page(page_number))
    }

    async fn fetch_page_with_translation(
        &self,
        page_number: u16,
        _translation_id: &str,
    ) -> PortResult<PageContent> {
        self.fetch_page(page_number).await
    }

    async fn fetch_audio_refs(&self, page_number: u16, _reciter_id: &str) -> PortResult<Vec<String>> {
        Ok(page(page_number)
            .units()
            .iter()
            .map(|u| format!("https://audio.test/{}.mp3", u.key))
            .collect())
    }

    async fn search(&self, query: &str, _language: &str) -> PortResult<Vec<SearchHit>> {
        Ok(vec![SearchHit {
            page_number: 2,
            unit_key: UnitKey::new(2, 7),
            text: query.to_string(),
        }])
    }

    async fn list_reciters(&self) -> PortResult<Vec<CatalogEntry>> {
        Ok(vec![CatalogEntry {
            identifier: "ar.alafasy".to_string(),
            name: "Alafasy".to_string(),
            language: Some("ar".to_string()),
        }])
    }

    async fn list_translations(&self) -> PortResult<Vec<CatalogEntry>> {
        Ok(Vec::new())
    }
}

fn app_state() -> Arc<AppState> {
    let config = Config::from_lookup(|_| None).unwrap();
    AppState::new(Arc::new(config), Arc::new(FakeSource), Arc::new(MemoryStore::new()))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn viewer_starts_idle_and_clamps_page_requests() {
    let app = router(app_state());

    let (status, body) = call(&app, Method::GET, "/viewer", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["status"], "idle");

    let (status, body) = call(&app, Method::POST, "/viewer/page", Some(json!({ "page": 900 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["current_page"], 604);
    assert_eq!(body["content"]["units"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn provider_failure_is_retryable_and_keeps_the_page() {
    let app = router(app_state());
    call(&app, Method::POST, "/viewer/page", Some(json!({ "page": 12 }))).await;

    let (status, body) = call(&app, Method::POST, "/viewer/page", Some(json!({ "page": 13 }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["retryable"], true);

    let (_, body) = call(&app, Method::GET, "/viewer", None).await;
    assert_eq!(body["state"]["current_page"], 12);
    assert_eq!(body["status"]["status"], "failed");
    assert_eq!(body["status"]["page_number"], 13);
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let app = router(app_state());

    let (status, _) = call(&app, Method::GET, "/viewer/overlay", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::POST, "/viewer/navigate", Some(json!({ "target": "major" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, Method::POST, "/viewer/key", Some(json!({ "key": "q" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, Method::POST, "/viewer/select", Some(json!({ "unit_key": "2-5" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, Method::POST, "/viewer/recording", Some(json!({ "category": "typo" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn annotations_round_trip_through_the_api() {
    let app = router(app_state());
    call(&app, Method::POST, "/viewer/page", Some(json!({ "page": 1 }))).await;

    let (status, created) = call(
        &app,
        Method::POST,
        "/annotations",
        Some(json!({
            "page_number": 1,
            "unit_key": "2:5",
            "category": "memorization-error",
            "student_id": "s-1",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["color"], "#fbbf24");
    let id = created["id"].as_str().unwrap().to_string();

    // A unit that is not on the page it claims.
    let (status, _) = call(
        &app,
        Method::POST,
        "/annotations",
        Some(json!({ "page_number": 1, "unit_key": "2:6", "category": "general-note" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = call(
        &app,
        Method::PATCH,
        &format!("/annotations/{}", id),
        Some(json!({ "text": "revise", "category": "general-note" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["text"], "revise");
    assert_eq!(updated["color"], "#10b981");

    let (_, listed) = call(&app, Method::GET, "/annotations?page=1&student=s-1", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let (_, listed) = call(&app, Method::GET, "/annotations?student=someone-else", None).await;
    assert!(listed.as_array().unwrap().is_empty());

    let (_, overlay) = call(&app, Method::GET, "/viewer/overlay", None).await;
    assert_eq!(overlay["highlights"].as_array().unwrap().len(), 1);

    let uri = format!("/annotations/{}", id);
    let (status, _) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recording_mode_records_one_note_per_selection() {
    let app = router(app_state());
    call(&app, Method::POST, "/viewer/page", Some(json!({ "page": 1 }))).await;
    let (status, _) = call(
        &app,
        Method::POST,
        "/viewer/recording",
        Some(json!({ "category": "pronunciation-error" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, note) = call(&app, Method::POST, "/viewer/select", Some(json!({ "unit_key": "2:5" }))).await;
    assert_eq!(note["category"], "pronunciation-error");
    assert_eq!(note["page_number"], 1);
    let (_, second) = call(&app, Method::POST, "/viewer/select", Some(json!({ "unit_key": "2:5" }))).await;
    assert_eq!(second, Value::Null);

    let (_, listed) = call(&app, Method::GET, "/annotations", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn arrow_keys_follow_right_to_left_reading() {
    let app = router(app_state());
    call(&app, Method::POST, "/viewer/page", Some(json!({ "page": 20 }))).await;

    let (_, body) = call(&app, Method::POST, "/viewer/key", Some(json!({ "key": "ArrowLeft" }))).await;
    assert_eq!(body["state"]["current_page"], 21);
    let (_, body) = call(&app, Method::POST, "/viewer/key", Some(json!({ "key": "ArrowRight" }))).await;
    assert_eq!(body["state"]["current_page"], 20);
    assert_eq!(body["state"]["recent_pages"], json!([20, 21, 1]));
}

#[tokio::test]
async fn bookmarks_zoom_and_share_link() {
    let app = router(app_state());
    call(&app, Method::POST, "/viewer/page", Some(json!({ "page": 20 }))).await;

    let (_, body) = call(&app, Method::POST, "/viewer/bookmark", None).await;
    assert_eq!(body, json!({ "page_number": 20, "bookmarked": true }));

    let (_, body) = call(&app, Method::POST, "/viewer/zoom", Some(json!({ "delta": 10 }))).await;
    assert_eq!(body["zoom_level"], 110);

    let (_, body) = call(&app, Method::GET, "/viewer/share", None).await;
    assert_eq!(body["url"], "http://localhost:3000?page=20");
}

#[tokio::test]
async fn client_messages_drive_the_shared_cursor() {
    let state = app_state();
    state.viewer.change_page(3).await.unwrap();

    apply_client_message(&state.viewer, ClientMessage::SetVolume { volume: 30 });
    apply_client_message(&state.viewer, ClientMessage::ToggleMute);

    let playback = state.viewer.playback();
    assert_eq!(playback.volume, 30);
    assert!(playback.muted);
    assert_eq!(playback.track_count, 5);
}

#[tokio::test]
async fn media_reports_for_a_previous_page_are_ignored() {
    let state = app_state();
    state.viewer.change_page(3).await.unwrap();
    let page_three = state.viewer.playback().load_id;
    state.viewer.change_page(4).await.unwrap();

    let stale = ClientMessage::AudioError {
        load_id: page_three,
        message: "page 3 audio failed".to_string(),
    };
    apply_client_message(&state.viewer, stale);
    let current = state.viewer.playback().load_id;
    apply_client_message(&state.viewer, ClientMessage::AudioReady { load_id: current, duration: Some(6.0) });

    let playback = state.viewer.playback();
    assert_eq!(playback.source, ProgressSource::Media);
    assert_eq!(playback.last_error, None);
    assert_eq!(playback.state, PlaybackState::Paused);
    assert_eq!(playback.unit_key, Some(UnitKey::new(2, 16)));
}

#[tokio::test]
async fn points_and_share_links_reach_the_viewer() {
    let app = router(app_state());
    call(&app, Method::POST, "/viewer/page", Some(json!({ "page": 2 }))).await;

    let (status, _) = call(&app, Method::POST, "/viewer/select-at", Some(json!({ "y": 0.9 }))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = call(&app, Method::GET, "/viewer", None).await;
    assert_eq!(body["state"]["selected_unit_key"], "2:10");

    let (status, _) = call(&app, Method::POST, "/viewer/select-at", Some(json!({ "y": 1.5 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let link = json!({ "link": "http://localhost:3000?page=77" });
    let (status, body) = call(&app, Method::POST, "/viewer/open", Some(link)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["current_page"], 77);

    let (status, _) = call(&app, Method::POST, "/viewer/open", Some(json!({ "link": "http://localhost:3000" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
