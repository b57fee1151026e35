//! crates/quran_viewer_core/src/domain.rs
//!
//! Defines the pure, core data structures for the page viewer.
//! These structs are independent of any provider, transport or storage format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::{PortError, PortResult};

/// Number of pages in the fixed page layout.
pub const TOTAL_PAGES: u16 = 604;

//=========================================================================================
// Unit Keys
//=========================================================================================

/// Error returned when a string is not a valid `"{major}:{index}"` unit key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid unit key '{0}', expected '<division>:<index>'")]
pub struct ParseUnitKeyError(pub String);

/// Globally unique address of a unit, `"{majorDivisionNumber}:{indexWithinDivision}"`.
///
/// Ordering follows reading order: by division first, then by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitKey {
    major: u16,
    index: u16,
}

impl UnitKey {
    pub fn new(major: u16, index: u16) -> Self {
        Self { major, index }
    }

    pub fn major(&self) -> u16 {
        self.major
    }

    /// 1-based position of the unit inside its major division.
    pub fn index(&self) -> u16 {
        self.index
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.index)
    }
}

impl FromStr for UnitKey {
    type Err = ParseUnitKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, index) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| ParseUnitKeyError(s.to_string()))?;
        let major = major
            .parse::<u16>()
            .map_err(|_| ParseUnitKeyError(s.to_string()))?;
        let index = index
            .parse::<u16>()
            .map_err(|_| ParseUnitKeyError(s.to_string()))?;
        if major == 0 || index == 0 {
            return Err(ParseUnitKeyError(s.to_string()));
        }
        Ok(Self { major, index })
    }
}

impl TryFrom<String> for UnitKey {
    type Error = ParseUnitKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UnitKey> for String {
    fn from(key: UnitKey) -> Self {
        key.to_string()
    }
}

//=========================================================================================
// Page Content
//=========================================================================================

/// The atomic addressable item on a page (a verse).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub key: UnitKey,
    pub text: String,
    pub translated_text: Option<String>,
    pub audio_ref: Option<String>,
}

impl Unit {
    pub fn new(key: UnitKey, text: impl Into<String>) -> Self {
        Self {
            key,
            text: text.into(),
            translated_text: None,
            audio_ref: None,
        }
    }
}

/// Structural position of a page: chapter name, section and sub-section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralInfo {
    pub major_division_name: String,
    pub minor_division_index: u16,
    pub sub_division_index: u16,
}

/// One fetched page. Units are kept in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    page_number: u16,
    units: Vec<Unit>,
    structural_info: StructuralInfo,
}

impl PageContent {
    /// Builds a page, rejecting out-of-range page numbers and empty unit lists.
    pub fn new(
        page_number: u16,
        units: Vec<Unit>,
        structural_info: StructuralInfo,
    ) -> PortResult<Self> {
        if page_number == 0 || page_number > TOTAL_PAGES {
            return Err(PortError::NotFound(format!(
                "Page {} is outside 1..={}",
                page_number, TOTAL_PAGES
            )));
        }
        if units.is_empty() {
            return Err(PortError::ContentUnavailable(format!(
                "Page {} has no units",
                page_number
            )));
        }
        Ok(Self {
            page_number,
            units,
            structural_info,
        })
    }

    pub fn page_number(&self) -> u16 {
        self.page_number
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn structural_info(&self) -> &StructuralInfo {
        &self.structural_info
    }

    /// Reading-order position of a unit on this page.
    pub fn unit_index(&self, key: &UnitKey) -> Option<usize> {
        self.units.iter().position(|u| &u.key == key)
    }

    pub fn unit(&self, key: &UnitKey) -> Option<&Unit> {
        self.units.iter().find(|u| &u.key == key)
    }

    pub fn contains(&self, key: &UnitKey) -> bool {
        self.unit_index(key).is_some()
    }
}

//=========================================================================================
// Annotations
//=========================================================================================

/// The kind of a recitation note. The color of a note is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationCategory {
    GeneralNote,
    PronunciationError,
    RecitationRuleError,
    MemorizationError,
}

impl AnnotationCategory {
    pub const ALL: [AnnotationCategory; 4] = [
        AnnotationCategory::PronunciationError,
        AnnotationCategory::RecitationRuleError,
        AnnotationCategory::MemorizationError,
        AnnotationCategory::GeneralNote,
    ];

    pub fn color(&self) -> &'static str {
        match self {
            AnnotationCategory::PronunciationError => "#f87171",
            AnnotationCategory::RecitationRuleError => "#a78bfa",
            AnnotationCategory::MemorizationError => "#fbbf24",
            AnnotationCategory::GeneralNote => "#10b981",
        }
    }

    /// Label shown on the recording toolbar.
    pub fn label(&self) -> &'static str {
        match self {
            AnnotationCategory::PronunciationError => "خطأ نطق",
            AnnotationCategory::RecitationRuleError => "خطأ تجويد",
            AnnotationCategory::MemorizationError => "خطأ حفظ",
            AnnotationCategory::GeneralNote => "ملاحظة",
        }
    }

    /// Text given to a note created by clicking a unit in recording mode.
    pub fn default_text(&self, key: &UnitKey) -> String {
        format!("{} في الآية {}", self.label(), key.index())
    }
}

/// Error returned when a string names no annotation category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown annotation category '{0}'")]
pub struct ParseCategoryError(pub String);

impl FromStr for AnnotationCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general-note" => Ok(Self::GeneralNote),
            "pronunciation-error" => Ok(Self::PronunciationError),
            "recitation-rule-error" => Ok(Self::RecitationRuleError),
            "memorization-error" => Ok(Self::MemorizationError),
            other => Err(ParseCategoryError(other.to_string())),
        }
    }
}

/// A user note anchored to a unit on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: Uuid,
    pub page_number: u16,
    pub unit_key: UnitKey,
    /// Word position inside the unit, when the note targets a single word.
    pub sub_unit: Option<u16>,
    pub student_id: Option<String>,
    pub category: AnnotationCategory,
    pub color: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// An annotation before the store has assigned it an id and a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnnotation {
    pub page_number: u16,
    pub unit_key: UnitKey,
    #[serde(default)]
    pub sub_unit: Option<u16>,
    #[serde(default)]
    pub student_id: Option<String>,
    pub category: AnnotationCategory,
    pub text: String,
}

/// A partial update. Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPatch {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub category: Option<AnnotationCategory>,
}

//=========================================================================================
// Ranges, Selection and Search
//=========================================================================================

/// A range of units to paint on a page. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightRange {
    pub start_key: UnitKey,
    pub end_key: UnitKey,
    pub page_number: u16,
    pub color: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl From<&Annotation> for HighlightRange {
    fn from(annotation: &Annotation) -> Self {
        Self {
            start_key: annotation.unit_key,
            end_key: annotation.unit_key,
            page_number: annotation.page_number,
            color: annotation.color.clone(),
            note: Some(annotation.text.clone()),
        }
    }
}

/// The selection reported to the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub start_key: UnitKey,
    pub end_key: UnitKey,
    pub page_number: u16,
}

/// A single search match, normalized across providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub page_number: u16,
    pub unit_key: UnitKey,
    pub text: String,
}

/// A reciter or translation offered by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub identifier: String,
    pub name: String,
    pub language: Option<String>,
}
