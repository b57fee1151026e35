//! crates/quran_viewer_core/src/lib.rs
//!
//! Core of the paginated Quran viewer: the domain model, the ports to the
//! outside world, and the components that drive a page view.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod annotations;
pub mod controller;
pub mod domain;
pub mod export;
pub mod index;
pub mod overlay;
pub mod playback;
pub mod ports;
pub mod preferences;
pub mod storage;

pub use annotations::AnnotationStore;
pub use controller::{
    LoadStatus, PageLoad, ViewerCommand, ViewerController, ViewerOptions, ViewerSnapshot,
    ViewerState,
};
pub use domain::{
    Annotation, AnnotationCategory, AnnotationPatch, CatalogEntry, HighlightRange, NewAnnotation,
    PageContent, SearchHit, Selection, StructuralInfo, Unit, UnitKey, TOTAL_PAGES,
};
pub use overlay::{Band, PageOverlay};
pub use playback::{PlaybackCursor, PlaybackSignal, PlaybackSnapshot, PlaybackState};
pub use ports::{
    ContentSource, KeyValueStore, PlaybackListener, PortError, PortResult, ViewerEvent,
    ViewerListener,
};
pub use preferences::Preferences;
pub use storage::MemoryStore;

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
