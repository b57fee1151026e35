//! crates/quran_viewer_core/src/overlay.rs
//!
//! Proportional overlay layout. Without glyph coordinates every unit gets an
//! equal, full-width vertical band of the content area: unit `i` of `L` covers
//! `[i/L, (i+1)/L)`. Range highlights cover the union of their units' bands.

use serde::Serialize;
use tracing::debug;

use crate::domain::{Annotation, HighlightRange, PageContent, UnitKey};
use crate::ports::{PortError, PortResult};

/// A vertical band of the content area, as fractions of its height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub top: f64,
    pub bottom: f64,
}

impl Band {
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Half-open: the bottom edge belongs to the next band.
    pub fn contains(&self, y: f64) -> bool {
        self.top <= y && y < self.bottom
    }

    pub fn top_percent(&self) -> f64 {
        self.top * 100.0
    }

    pub fn height_percent(&self) -> f64 {
        self.height() * 100.0
    }
}

fn edge(i: usize, count: usize) -> f64 {
    i as f64 / count as f64
}

/// Band of the `index`-th unit out of `count`.
pub fn unit_band(index: usize, count: usize) -> Band {
    range_band(index, index, count)
}

/// Band spanning units `start..=end`.
pub fn range_band(start: usize, end: usize, count: usize) -> Band {
    Band {
        top: edge(start, count),
        bottom: edge(end + 1, count),
    }
}

/// Index of the unit whose band contains `y`, or `None` outside `[0, 1)`.
pub fn hit_test(y: f64, count: usize) -> Option<usize> {
    if count == 0 || !(0.0..1.0).contains(&y) {
        return None;
    }
    let mut index = ((y * count as f64).floor() as usize).min(count - 1);
    // Floor of the product can land one band off near an edge.
    if index > 0 && y < edge(index, count) {
        index -= 1;
    } else if index + 1 < count && y >= edge(index + 1, count) {
        index += 1;
    }
    Some(index)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitRegion {
    pub key: UnitKey,
    pub index: usize,
    pub band: Band,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightRegion {
    pub start_key: UnitKey,
    pub end_key: UnitKey,
    pub band: Band,
    pub color: String,
    pub note: Option<String>,
}

/// Everything needed to paint the interactive layer of one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageOverlay {
    pub page_number: u16,
    pub units: Vec<UnitRegion>,
    pub highlights: Vec<HighlightRegion>,
}

pub fn layout_units(page: &PageContent, selected: Option<&UnitKey>) -> Vec<UnitRegion> {
    let count = page.unit_count();
    page.units()
        .iter()
        .enumerate()
        .map(|(index, unit)| UnitRegion {
            key: unit.key,
            index,
            band: unit_band(index, count),
            selected: selected == Some(&unit.key),
        })
        .collect()
}

/// Resolves a range against the loaded page. Fails with `AnchorStale` when
/// either end is not on the page. Reversed ranges are normalized.
pub fn resolve_range(page: &PageContent, range: &HighlightRange) -> PortResult<Band> {
    let stale = |key: &UnitKey| {
        PortError::AnchorStale(format!(
            "Unit {} is not on page {}",
            key,
            page.page_number()
        ))
    };
    let start = page
        .unit_index(&range.start_key)
        .ok_or_else(|| stale(&range.start_key))?;
    let end = page
        .unit_index(&range.end_key)
        .ok_or_else(|| stale(&range.end_key))?;
    Ok(range_band(start.min(end), start.max(end), page.unit_count()))
}

/// Lays out every range that belongs to the page; stale anchors are skipped.
pub fn layout_highlights(page: &PageContent, ranges: &[HighlightRange]) -> Vec<HighlightRegion> {
    ranges
        .iter()
        .filter(|r| r.page_number == page.page_number())
        .filter_map(|range| match resolve_range(page, range) {
            Ok(band) => Some(HighlightRegion {
                start_key: range.start_key,
                end_key: range.end_key,
                band,
                color: range.color.clone(),
                note: range.note.clone(),
            }),
            Err(e) => {
                debug!("Skipping highlight: {}", e);
                None
            }
        })
        .collect()
}

/// External ranges for the page followed by one range per annotation on it.
pub fn merge_ranges(
    page_number: u16,
    external: &[HighlightRange],
    annotations: &[Annotation],
) -> Vec<HighlightRange> {
    external
        .iter()
        .filter(|r| r.page_number == page_number)
        .cloned()
        .chain(
            annotations
                .iter()
                .filter(|a| a.page_number == page_number)
                .map(HighlightRange::from),
        )
        .collect()
}

pub fn build_overlay(
    page: &PageContent,
    selected: Option<&UnitKey>,
    external: &[HighlightRange],
    annotations: &[Annotation],
) -> PageOverlay {
    let ranges = merge_ranges(page.page_number(), external, annotations);
    PageOverlay {
        page_number: page.page_number(),
        units: layout_units(page, selected),
        highlights: layout_highlights(page, &ranges),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnnotationCategory, StructuralInfo, Unit};
    use chrono::Utc;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn page(number: u16, keys: &[(u16, u16)]) -> PageContent {
        let units = keys
            .iter()
            .map(|&(m, i)| Unit::new(UnitKey::new(m, i), format!("unit {}:{}", m, i)))
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

    fn range(page_number: u16, start: (u16, u16), end: (u16, u16)) -> HighlightRange {
        HighlightRange {
            start_key: UnitKey::new(start.0, start.1),
            end_key: UnitKey::new(end.0, end.1),
            page_number,
            color: "#22c55e".to_string(),
            note: None,
        }
    }

    proptest! {
        #[test]
        fn unit_bands_partition_the_page(count in 1usize..700) {
            let bands: Vec<Band> = (0..count).map(|i| unit_band(i, count)).collect();
            prop_assert_eq!(bands[0].top, 0.0);
            prop_assert_eq!(bands[count - 1].bottom, 1.0);
            for band in &bands {
                prop_assert!(band.height() > 0.0);
            }
            for pair in bands.windows(2) {
                prop_assert_eq!(pair[0].bottom, pair[1].top);
            }
        }

        #[test]
        fn hit_test_agrees_with_bands(count in 1usize..300, y in 0.0f64..1.0) {
            let index = hit_test(y, count).unwrap();
            prop_assert!(unit_band(index, count).contains(y));
        }

        #[test]
        fn range_band_is_union_of_unit_bands(count in 1usize..200, a in 0usize..200, b in 0usize..200) {
            let start = a % count;
            let end = start.max(b % count);
            let band = range_band(start, end, count);
            prop_assert_eq!(band.top, unit_band(start, count).top);
            prop_assert_eq!(band.bottom, unit_band(end, count).bottom);
        }
    }

    #[test]
    fn hit_test_rejects_outside_content_area() {
        assert_eq!(hit_test(-0.1, 5), None);
        assert_eq!(hit_test(1.0, 5), None);
        assert_eq!(hit_test(0.5, 0), None);
    }

    #[test]
    fn layout_marks_selected_unit() {
        let p = page(2, &[(1, 6), (1, 7), (2, 1)]);
        let regions = layout_units(&p, Some(&UnitKey::new(1, 7)));
        assert_eq!(regions.len(), 3);
        assert!(!regions[0].selected);
        assert!(regions[1].selected);
        assert_eq!(regions[2].band.bottom, 1.0);
    }

    #[test]
    fn range_highlight_spans_its_units() {
        let p = page(3, &[(2, 6), (2, 7), (2, 8), (2, 9)]);
        let regions = layout_highlights(&p, &[range(3, (2, 7), (2, 8))]);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].band, Band { top: 0.25, bottom: 0.75 });
    }

    #[test]
    fn reversed_range_is_normalized() {
        let p = page(3, &[(2, 6), (2, 7), (2, 8), (2, 9)]);
        let band = resolve_range(&p, &range(3, (2, 9), (2, 6))).unwrap();
        assert_eq!(band, Band { top: 0.0, bottom: 1.0 });
    }

    #[test]
    fn stale_anchor_is_skipped_not_rendered() {
        let p = page(3, &[(2, 6), (2, 7)]);
        let stale = range(3, (2, 100), (2, 100));
        assert!(matches!(resolve_range(&p, &stale), Err(PortError::AnchorStale(_))));
        let regions = layout_highlights(&p, &[stale, range(3, (2, 6), (2, 6))]);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].start_key, UnitKey::new(2, 6));
    }

    #[test]
    fn overlay_merges_external_ranges_and_annotations_for_the_page() {
        let p = page(4, &[(2, 20), (2, 21), (2, 22)]);
        let annotation = Annotation {
            id: Uuid::new_v4(),
            page_number: 4,
            unit_key: UnitKey::new(2, 22),
            sub_unit: None,
            student_id: None,
            category: AnnotationCategory::MemorizationError,
            color: AnnotationCategory::MemorizationError.color().to_string(),
            text: "forgot a word".to_string(),
            created_at: Utc::now(),
        };
        let elsewhere = Annotation {
            page_number: 9,
            ..annotation.clone()
        };
        let overlay = build_overlay(
            &p,
            None,
            &[range(4, (2, 20), (2, 21)), range(5, (2, 20), (2, 20))],
            &[annotation, elsewhere],
        );
        assert_eq!(overlay.highlights.len(), 2);
        assert_eq!(overlay.highlights[1].color, "#fbbf24");
        assert_eq!(overlay.highlights[1].note.as_deref(), Some("forgot a word"));
    }
}
