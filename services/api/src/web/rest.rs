//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
};
use quran_viewer_core::controller::{ViewerCommand, ViewerSnapshot};
use quran_viewer_core::domain::{
    Annotation, AnnotationCategory, AnnotationPatch, CatalogEntry, HighlightRange, NewAnnotation,
    SearchHit, UnitKey,
};
use quran_viewer_core::overlay::PageOverlay;
use quran_viewer_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

type ApiResult<T> = Result<T, ApiError>;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_viewer_handler,
        change_page_handler,
        navigate_handler,
        retry_handler,
        toggle_bookmark_handler,
        zoom_handler,
        select_handler,
        select_at_handler,
        recording_handler,
        highlights_handler,
        overlay_handler,
        key_handler,
        preferences_handler,
        list_annotations_handler,
        create_annotation_handler,
        update_annotation_handler,
        delete_annotation_handler,
        search_handler,
        reciters_handler,
        translations_handler,
        print_handler,
        share_handler,
        open_link_handler,
    ),
    components(schemas(
        PageRequest,
        NavigateTarget,
        NavigateRequest,
        ZoomRequest,
        ZoomResponse,
        BookmarkResponse,
        SelectRequest,
        SelectAtRequest,
        RecordingRequest,
        HighlightPayload,
        KeyRequest,
        PreferencesRequest,
        CreateAnnotationRequest,
        UpdateAnnotationRequest,
        ShareResponse,
        OpenLinkRequest,
    )),
    tags(
        (name = "Quran Viewer API", description = "Page navigation, annotations and recitation playback for the paginated viewer.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request and Response Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct PageRequest {
    /// Out-of-range values are clamped to the first or last page.
    pub page: i64,
}

#[derive(Deserialize, ToSchema, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NavigateTarget {
    Next,
    Previous,
    First,
    Last,
    /// Start page of a chapter; requires `number`.
    Major,
    /// Start page of a juz; requires `number`.
    Structural,
}

#[derive(Deserialize, ToSchema)]
pub struct NavigateRequest {
    pub target: NavigateTarget,
    #[serde(default)]
    pub number: Option<u16>,
}

#[derive(Deserialize, ToSchema)]
pub struct ZoomRequest {
    pub delta: i32,
}

#[derive(Serialize, ToSchema)]
pub struct ZoomResponse {
    pub zoom_level: u8,
}

#[derive(Serialize, ToSchema)]
pub struct BookmarkResponse {
    pub page_number: u16,
    pub bookmarked: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct SelectRequest {
    /// Unit key such as `"2:255"`.
    pub unit_key: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SelectAtRequest {
    /// Distance from the top of the content area, as a fraction of its height.
    pub y: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct OpenLinkRequest {
    /// A link produced by `/viewer/share`.
    pub link: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RecordingRequest {
    /// Category of the notes to record, or `null` to leave recording mode.
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct HighlightPayload {
    pub start_key: String,
    pub end_key: String,
    pub page_number: u16,
    pub color: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct KeyRequest {
    /// Keyboard key name, e.g. `ArrowLeft` or `+`.
    pub key: String,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct PreferencesRequest {
    #[serde(default)]
    pub dark_mode: Option<bool>,
    #[serde(default)]
    pub reciter: Option<String>,
    #[serde(default)]
    pub translation: Option<String>,
    /// `false` hides translations regardless of `translation`.
    #[serde(default)]
    pub show_translation: Option<bool>,
    #[serde(default)]
    pub student_id: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateAnnotationRequest {
    pub page_number: u16,
    pub unit_key: String,
    #[serde(default)]
    pub sub_unit: Option<u16>,
    #[serde(default)]
    pub student_id: Option<String>,
    pub category: String,
    /// Defaults to the category's label for the unit.
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateAnnotationRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ShareResponse {
    pub url: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnnotationQuery {
    pub page: Option<u16>,
    pub student: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    pub q: String,
    /// Edition language for the search, `ar` when omitted.
    #[serde(default)]
    pub language: Option<String>,
}

fn parse_key(raw: &str) -> ApiResult<UnitKey> {
    raw.parse::<UnitKey>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn parse_category(raw: &str) -> ApiResult<AnnotationCategory> {
    raw.parse::<AnnotationCategory>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

//=========================================================================================
// Viewer Handlers
//=========================================================================================

/// The full viewer state, loaded page and playback cursor.
#[utoipa::path(
    get,
    path = "/viewer",
    responses((status = 200, description = "Current viewer snapshot"))
)]
pub async fn get_viewer_handler(State(app_state): State<Arc<AppState>>) -> Json<ViewerSnapshot> {
    Json(app_state.viewer.snapshot())
}

/// Go to a page.
///
/// A request superseded by a newer one returns the snapshot of the newer page.
#[utoipa::path(
    post,
    path = "/viewer/page",
    request_body = PageRequest,
    responses(
        (status = 200, description = "Page loaded"),
        (status = 502, description = "The content provider could not deliver the page")
    )
)]
pub async fn change_page_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<PageRequest>,
) -> ApiResult<Json<ViewerSnapshot>> {
    app_state.viewer.change_page(request.page).await?;
    Ok(Json(app_state.viewer.snapshot()))
}

#[utoipa::path(
    post,
    path = "/viewer/navigate",
    request_body = NavigateRequest,
    responses(
        (status = 200, description = "Page loaded"),
        (status = 400, description = "`number` is missing for a division target"),
        (status = 404, description = "No such division")
    )
)]
pub async fn navigate_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<NavigateRequest>,
) -> ApiResult<Json<ViewerSnapshot>> {
    let viewer = &app_state.viewer;
    let number = || {
        request
            .number
            .ok_or_else(|| ApiError::BadRequest("`number` is required for this target".to_string()))
    };
    match request.target {
        NavigateTarget::Next => viewer.next_page().await?,
        NavigateTarget::Previous => viewer.previous_page().await?,
        NavigateTarget::First => viewer.first_page().await?,
        NavigateTarget::Last => viewer.last_page().await?,
        NavigateTarget::Major => viewer.go_to_major_division(number()?).await?,
        NavigateTarget::Structural => viewer.go_to_structural_division(number()?).await?,
    };
    Ok(Json(viewer.snapshot()))
}

/// Re-request the failed or current page.
#[utoipa::path(
    post,
    path = "/viewer/retry",
    responses(
        (status = 200, description = "Page loaded"),
        (status = 502, description = "Still unavailable")
    )
)]
pub async fn retry_handler(State(app_state): State<Arc<AppState>>) -> ApiResult<Json<ViewerSnapshot>> {
    app_state.viewer.retry().await?;
    Ok(Json(app_state.viewer.snapshot()))
}

#[utoipa::path(
    post,
    path = "/viewer/bookmark",
    responses((status = 200, description = "Bookmark toggled", body = BookmarkResponse))
)]
pub async fn toggle_bookmark_handler(
    State(app_state): State<Arc<AppState>>,
) -> ApiResult<Json<BookmarkResponse>> {
    let bookmarked = app_state.viewer.toggle_bookmark()?;
    Ok(Json(BookmarkResponse {
        page_number: app_state.viewer.current_page(),
        bookmarked,
    }))
}

#[utoipa::path(
    post,
    path = "/viewer/zoom",
    request_body = ZoomRequest,
    responses((status = 200, description = "New zoom level", body = ZoomResponse))
)]
pub async fn zoom_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<ZoomRequest>,
) -> ApiResult<Json<ZoomResponse>> {
    let zoom_level = app_state.viewer.set_zoom(request.delta)?;
    Ok(Json(ZoomResponse { zoom_level }))
}

/// Toggle the selection of a unit on the loaded page.
///
/// In recording mode this also records a note, returned as the body.
#[utoipa::path(
    post,
    path = "/viewer/select",
    request_body = SelectRequest,
    responses(
        (status = 200, description = "Selection toggled; the recorded note, if any"),
        (status = 400, description = "Malformed unit key"),
        (status = 404, description = "The unit is not on the loaded page")
    )
)]
pub async fn select_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<SelectRequest>,
) -> ApiResult<Json<Option<Annotation>>> {
    let key = parse_key(&request.unit_key)?;
    Ok(Json(app_state.viewer.select(key)?))
}

/// Toggle the selection of the unit under a point of the page image.
#[utoipa::path(
    post,
    path = "/viewer/select-at",
    request_body = SelectAtRequest,
    responses(
        (status = 200, description = "Selection toggled; the recorded note, if any"),
        (status = 404, description = "No page is loaded or no unit at that point")
    )
)]
pub async fn select_at_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<SelectAtRequest>,
) -> ApiResult<Json<Option<Annotation>>> {
    Ok(Json(app_state.viewer.select_at(request.y)?))
}

#[utoipa::path(
    post,
    path = "/viewer/recording",
    request_body = RecordingRequest,
    responses(
        (status = 204, description = "Recording mode updated"),
        (status = 400, description = "Unknown category")
    )
)]
pub async fn recording_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<RecordingRequest>,
) -> ApiResult<StatusCode> {
    match request.category.as_deref() {
        Some(raw) => app_state.viewer.enter_recording_mode(parse_category(raw)?),
        None => app_state.viewer.exit_recording_mode(),
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the highlight ranges painted over pages.
#[utoipa::path(
    put,
    path = "/viewer/highlights",
    request_body = Vec<HighlightPayload>,
    responses(
        (status = 204, description = "Highlights replaced"),
        (status = 400, description = "Malformed unit key")
    )
)]
pub async fn highlights_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<Vec<HighlightPayload>>,
) -> ApiResult<StatusCode> {
    let ranges = payload
        .into_iter()
        .map(|h| -> ApiResult<HighlightRange> {
            Ok(HighlightRange {
                start_key: parse_key(&h.start_key)?,
                end_key: parse_key(&h.end_key)?,
                page_number: h.page_number,
                color: h.color,
                note: h.note,
            })
        })
        .collect::<ApiResult<Vec<_>>>()?;
    app_state.viewer.set_highlights(ranges);
    Ok(StatusCode::NO_CONTENT)
}

/// Unit regions and highlight regions of the loaded page.
#[utoipa::path(
    get,
    path = "/viewer/overlay",
    responses(
        (status = 200, description = "Overlay of the loaded page"),
        (status = 404, description = "No page is loaded")
    )
)]
pub async fn overlay_handler(State(app_state): State<Arc<AppState>>) -> ApiResult<Json<PageOverlay>> {
    app_state
        .viewer
        .overlay()
        .map(Json)
        .ok_or_else(|| PortError::NotFound("No page is loaded".to_string()).into())
}

#[utoipa::path(
    post,
    path = "/viewer/key",
    request_body = KeyRequest,
    responses(
        (status = 200, description = "Command applied"),
        (status = 400, description = "The key is not bound to a command")
    )
)]
pub async fn key_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<KeyRequest>,
) -> ApiResult<Json<ViewerSnapshot>> {
    let command = ViewerCommand::from_key(&request.key)
        .ok_or_else(|| ApiError::BadRequest(format!("No command is bound to '{}'", request.key)))?;
    app_state.viewer.execute(command).await?;
    Ok(Json(app_state.viewer.snapshot()))
}

/// Update any subset of the persisted preferences.
#[utoipa::path(
    put,
    path = "/viewer/preferences",
    request_body = PreferencesRequest,
    responses(
        (status = 200, description = "Preferences applied"),
        (status = 502, description = "The page could not be reloaded with the new translation")
    )
)]
pub async fn preferences_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<PreferencesRequest>,
) -> ApiResult<Json<ViewerSnapshot>> {
    let viewer = &app_state.viewer;
    if let Some(enabled) = request.dark_mode {
        viewer.set_dark_mode(enabled)?;
    }
    if let Some(student_id) = request.student_id {
        viewer.set_student(Some(student_id).filter(|s| !s.is_empty()));
    }
    if let Some(reciter) = request.reciter {
        viewer.set_reciter(reciter).await?;
    }
    match (request.show_translation, request.translation) {
        (Some(false), _) => {
            viewer.set_translation(None).await?;
        }
        (_, Some(translation)) => {
            viewer.set_translation(Some(translation)).await?;
        }
        (Some(true), None) => {
            warn!("show_translation requested without a translation; ignored");
        }
        (None, None) => {}
    }
    Ok(Json(viewer.snapshot()))
}

//=========================================================================================
// Annotation Handlers
//=========================================================================================

/// List annotations, optionally filtered by page and student.
#[utoipa::path(
    get,
    path = "/annotations",
    params(AnnotationQuery),
    responses((status = 200, description = "Annotations in creation order"))
)]
pub async fn list_annotations_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<AnnotationQuery>,
) -> Json<Vec<Annotation>> {
    let store = app_state.viewer.annotations();
    let mut annotations = match query.student.as_deref() {
        Some(student) => store.list_for_student(student),
        None => store.list_all(),
    };
    if let Some(page) = query.page {
        annotations.retain(|a| a.page_number == page);
    }
    Json(annotations)
}

#[utoipa::path(
    post,
    path = "/annotations",
    request_body = CreateAnnotationRequest,
    responses(
        (status = 201, description = "Annotation created"),
        (status = 400, description = "Malformed unit key or unknown category"),
        (status = 404, description = "The unit is not on the given page")
    )
)]
pub async fn create_annotation_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<CreateAnnotationRequest>,
) -> ApiResult<impl IntoResponse> {
    let unit_key = parse_key(&request.unit_key)?;
    let category = parse_category(&request.category)?;
    let text = request
        .text
        .unwrap_or_else(|| category.default_text(&unit_key));
    let annotation = app_state
        .viewer
        .record_annotation(NewAnnotation {
            page_number: request.page_number,
            unit_key,
            sub_unit: request.sub_unit,
            student_id: request.student_id,
            category,
            text,
        })
        .await?;
    info!(id = %annotation.id, "Annotation created");
    Ok((StatusCode::CREATED, Json(annotation)))
}

#[utoipa::path(
    patch,
    path = "/annotations/{id}",
    params(("id" = Uuid, Path, description = "Annotation id")),
    request_body = UpdateAnnotationRequest,
    responses(
        (status = 200, description = "Annotation updated"),
        (status = 404, description = "No annotation with this id")
    )
)]
pub async fn update_annotation_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAnnotationRequest>,
) -> ApiResult<Json<Annotation>> {
    let category = request.category.as_deref().map(parse_category).transpose()?;
    let patch = AnnotationPatch {
        text: request.text,
        category,
    };
    Ok(Json(app_state.viewer.annotations().update(id, patch)?))
}

#[utoipa::path(
    delete,
    path = "/annotations/{id}",
    params(("id" = Uuid, Path, description = "Annotation id")),
    responses(
        (status = 204, description = "Annotation deleted"),
        (status = 404, description = "No annotation with this id")
    )
)]
pub async fn delete_annotation_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    app_state.viewer.annotations().delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Search, Catalogs and Export
//=========================================================================================

#[utoipa::path(
    get,
    path = "/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matches in reading order"),
        (status = 502, description = "The content provider failed")
    )
)]
pub async fn search_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<SearchHit>>> {
    let language = query.language.as_deref().unwrap_or("ar");
    Ok(Json(app_state.viewer.search(&query.q, language).await?))
}

#[utoipa::path(
    get,
    path = "/reciters",
    responses((status = 200, description = "Reciters offered by the provider"))
)]
pub async fn reciters_handler(
    State(app_state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<CatalogEntry>>> {
    Ok(Json(app_state.viewer.reciters().await?))
}

#[utoipa::path(
    get,
    path = "/translations",
    responses((status = 200, description = "Translations offered by the provider"))
)]
pub async fn translations_handler(
    State(app_state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<CatalogEntry>>> {
    Ok(Json(app_state.viewer.translations().await?))
}

/// A standalone printable HTML document of the loaded page.
#[utoipa::path(
    get,
    path = "/viewer/print",
    responses(
        (status = 200, description = "Printable page", content_type = "text/html"),
        (status = 404, description = "No page is loaded")
    )
)]
pub async fn print_handler(State(app_state): State<Arc<AppState>>) -> ApiResult<Html<String>> {
    Ok(Html(app_state.viewer.printable_document()?))
}

#[utoipa::path(
    get,
    path = "/viewer/share",
    responses((status = 200, description = "Link to the current page", body = ShareResponse))
)]
pub async fn share_handler(State(app_state): State<Arc<AppState>>) -> Json<ShareResponse> {
    Json(ShareResponse {
        url: app_state.viewer.share_link(&app_state.config.public_base_url),
    })
}

/// Open the page a share link points at.
#[utoipa::path(
    post,
    path = "/viewer/open",
    request_body = OpenLinkRequest,
    responses(
        (status = 200, description = "Page loaded"),
        (status = 404, description = "The link names no page"),
        (status = 502, description = "The content provider could not deliver the page")
    )
)]
pub async fn open_link_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<OpenLinkRequest>,
) -> ApiResult<Json<ViewerSnapshot>> {
    app_state.viewer.open_share_link(&request.link).await?;
    Ok(Json(app_state.viewer.snapshot()))
}
