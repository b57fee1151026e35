pub mod playback_task;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use rest::*;
use state::AppState;
use std::sync::Arc;

// Re-export the main WebSocket handler to make it easily accessible
// to the binary that will build the web server router.
pub use ws_handler::ws_handler;

/// Builds the REST and WebSocket routes over the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/viewer", get(get_viewer_handler))
        .route("/viewer/page", post(change_page_handler))
        .route("/viewer/navigate", post(navigate_handler))
        .route("/viewer/retry", post(retry_handler))
        .route("/viewer/bookmark", post(toggle_bookmark_handler))
        .route("/viewer/zoom", post(zoom_handler))
        .route("/viewer/select", post(select_handler))
        .route("/viewer/select-at", post(select_at_handler))
        .route("/viewer/recording", post(recording_handler))
        .route("/viewer/highlights", put(highlights_handler))
        .route("/viewer/overlay", get(overlay_handler))
        .route("/viewer/key", post(key_handler))
        .route("/viewer/preferences", put(preferences_handler))
        .route("/viewer/print", get(print_handler))
        .route("/viewer/share", get(share_handler))
        .route("/viewer/open", post(open_link_handler))
        .route(
            "/annotations",
            get(list_annotations_handler).post(create_annotation_handler),
        )
        .route(
            "/annotations/{id}",
            patch(update_annotation_handler).delete(delete_annotation_handler),
        )
        .route("/search", get(search_handler))
        .route("/reciters", get(reciters_handler))
        .route("/translations", get(translations_handler))
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}
