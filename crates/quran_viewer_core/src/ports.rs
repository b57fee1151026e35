//! crates/quran_viewer_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the viewer's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the content provider, the local storage and the UI.

use async_trait::async_trait;

use crate::domain::{CatalogEntry, PageContent, SearchHit, Selection};
use crate::playback::{PlaybackSignal, PlaybackSnapshot};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (network, storage).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// The provider could not deliver a page or its audio. Retriable.
    #[error("Content unavailable: {0}")]
    ContentUnavailable(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    /// An anchor refers to a unit that is not on the loaded page.
    #[error("Stale anchor: {0}")]
    AnchorStale(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Source of page content, audio references and search results.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch_page(&self, page_number: u16) -> PortResult<PageContent>;

    /// Fetches a page with `translated_text` populated for every unit.
    async fn fetch_page_with_translation(
        &self,
        page_number: u16,
        translation_id: &str,
    ) -> PortResult<PageContent>;

    /// Audio references aligned 1:1 with the page's units.
    async fn fetch_audio_refs(&self, page_number: u16, reciter_id: &str)
        -> PortResult<Vec<String>>;

    async fn search(&self, query: &str, language: &str) -> PortResult<Vec<SearchHit>>;

    async fn list_reciters(&self) -> PortResult<Vec<CatalogEntry>>;

    async fn list_translations(&self) -> PortResult<Vec<CatalogEntry>>;
}

/// Durable local key/value storage. Writes complete before the call returns.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PortResult<()>;

    fn remove(&self, key: &str) -> PortResult<()>;
}

//=========================================================================================
// Viewer Events
//=========================================================================================

/// The two events the viewer reports to the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerEvent {
    PageChanged { page_number: u16 },
    /// `None` when the selection was cleared.
    SelectionChanged { selection: Option<Selection> },
}

/// Receives viewer events. Registered on the controller at construction time.
pub trait ViewerListener: Send + Sync {
    fn on_event(&self, event: &ViewerEvent);
}

/// Receives playback updates: the signal for the media layer, if any, and the
/// cursor state after the transition.
pub trait PlaybackListener: Send + Sync {
    fn on_playback(&self, signal: Option<&PlaybackSignal>, snapshot: &PlaybackSnapshot);
}
