//! crates/quran_viewer_core/src/preferences.rs
//!
//! User preferences persisted under independent keys. Each key is read on its
//! own so that one corrupt entry only resets that preference.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

use crate::ports::{KeyValueStore, PortError, PortResult};

pub const DARK_MODE_KEY: &str = "quran-dark-mode";
pub const ZOOM_KEY: &str = "quran-zoom";
pub const RECITER_KEY: &str = "quran-reciter";
pub const RECENT_PAGES_KEY: &str = "quran-last-visited";
pub const BOOKMARKS_KEY: &str = "quran-bookmarks";
pub const SHOW_TRANSLATION_KEY: &str = "quran-show-translation";
pub const TRANSLATION_KEY: &str = "quran-translation";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub dark_mode: bool,
    pub zoom: u8,
    pub reciter: String,
    pub recent_pages: Vec<u16>,
    pub bookmarks: BTreeSet<u16>,
    pub show_translation: bool,
    pub translation: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            dark_mode: false,
            zoom: 100,
            reciter: "ar.alafasy".to_string(),
            recent_pages: vec![1],
            bookmarks: BTreeSet::new(),
            show_translation: false,
            translation: None,
        }
    }
}

pub struct PreferenceStore {
    kv: Arc<dyn KeyValueStore>,
}

impl PreferenceStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Reads every preference, falling back to `defaults` key by key.
    pub fn load(&self, defaults: Preferences) -> Preferences {
        Preferences {
            dark_mode: self.read(DARK_MODE_KEY).unwrap_or(defaults.dark_mode),
            zoom: self.read(ZOOM_KEY).unwrap_or(defaults.zoom),
            reciter: self.read(RECITER_KEY).unwrap_or(defaults.reciter),
            recent_pages: self.read(RECENT_PAGES_KEY).unwrap_or(defaults.recent_pages),
            bookmarks: self.read(BOOKMARKS_KEY).unwrap_or(defaults.bookmarks),
            show_translation: self
                .read(SHOW_TRANSLATION_KEY)
                .unwrap_or(defaults.show_translation),
            translation: self.read(TRANSLATION_KEY).unwrap_or(defaults.translation),
        }
    }

    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> PortResult<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| PortError::Storage(format!("Failed to serialize {}: {}", key, e)))?;
        self.kv.set(key, &raw)
    }

    /// Forgets a stored preference so the next load falls back to its default.
    pub fn clear(&self, key: &str) -> PortResult<()> {
        self.kv.remove(key)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.kv.get(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Ignoring unreadable preference '{}': {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read preference '{}': {}", key, e);
                None
            }
        }
    }
}
