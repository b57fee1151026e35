//! crates/quran_viewer_core/src/annotations.rs
//!
//! The annotation store. It owns every recitation note and writes the whole
//! collection to the key/value store before any mutating call returns.

use chrono::Utc;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{Annotation, AnnotationPatch, NewAnnotation};
use crate::lock;
use crate::ports::{KeyValueStore, PortError, PortResult};

/// Storage key holding the serialized annotation collection.
pub const ANNOTATIONS_KEY: &str = "quran-notes";

pub struct AnnotationStore {
    kv: Arc<dyn KeyValueStore>,
    annotations: Mutex<Vec<Annotation>>,
}

impl AnnotationStore {
    /// Loads the stored collection. A missing or unreadable entry starts an
    /// empty collection instead of failing.
    pub fn open(kv: Arc<dyn KeyValueStore>) -> Self {
        let annotations = match kv.get(ANNOTATIONS_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<Vec<Annotation>>(&raw).unwrap_or_else(|e| {
                warn!("Ignoring unreadable annotation collection: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read annotation collection: {}", e);
                Vec::new()
            }
        };
        debug!("Loaded {} annotations", annotations.len());
        Self {
            kv,
            annotations: Mutex::new(annotations),
        }
    }

    /// Assigns an id and a creation time, appends and persists.
    pub fn add(&self, new: NewAnnotation) -> PortResult<Annotation> {
        let annotation = Annotation {
            id: Uuid::new_v4(),
            page_number: new.page_number,
            unit_key: new.unit_key,
            sub_unit: new.sub_unit,
            student_id: new.student_id,
            category: new.category,
            color: new.category.color().to_string(),
            text: new.text,
            created_at: Utc::now(),
        };
        let mut guard = lock(&self.annotations);
        let mut next = guard.clone();
        next.push(annotation.clone());
        self.persist(&next)?;
        *guard = next;
        debug!(id = %annotation.id, page = annotation.page_number, "Annotation added");
        Ok(annotation)
    }

    /// Applies only the fields present in `patch`. A category change recomputes the color.
    pub fn update(&self, id: Uuid, patch: AnnotationPatch) -> PortResult<Annotation> {
        let mut guard = lock(&self.annotations);
        let mut next = guard.clone();
        let target = next
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Annotation {} not found", id)))?;
        if let Some(text) = patch.text {
            target.text = text;
        }
        if let Some(category) = patch.category {
            target.category = category;
            target.color = category.color().to_string();
        }
        let updated = target.clone();
        self.persist(&next)?;
        *guard = next;
        Ok(updated)
    }

    /// Removes an annotation. Deleting an unknown id fails with `NotFound`.
    pub fn delete(&self, id: Uuid) -> PortResult<()> {
        let mut guard = lock(&self.annotations);
        let position = guard
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Annotation {} not found", id)))?;
        let mut next = guard.clone();
        next.remove(position);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> PortResult<Annotation> {
        lock(&self.annotations)
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Annotation {} not found", id)))
    }

    /// Annotations on a page, in creation order.
    pub fn list_by_page(&self, page_number: u16) -> Vec<Annotation> {
        lock(&self.annotations)
            .iter()
            .filter(|a| a.page_number == page_number)
            .cloned()
            .collect()
    }

    pub fn list_for_student(&self, student_id: &str) -> Vec<Annotation> {
        lock(&self.annotations)
            .iter()
            .filter(|a| a.student_id.as_deref() == Some(student_id))
            .cloned()
            .collect()
    }

    pub fn list_all(&self) -> Vec<Annotation> {
        lock(&self.annotations).clone()
    }

    fn persist(&self, annotations: &[Annotation]) -> PortResult<()> {
        let raw = serde_json::to_string(annotations)
            .map_err(|e| PortError::Storage(format!("Failed to serialize annotations: {}", e)))?;
        self.kv.set(ANNOTATIONS_KEY, &raw)
    }
}
