//! services/api/src/adapters/alquran.rs
//!
//! Content source backed by the AlQuran Cloud API. Every resource comes back
//! wrapped as `{ "code", "status", "data" }`; pages are fetched per edition, so
//! translations and audio each take a second request that is zipped with the
//! text by position.

use async_trait::async_trait;
use futures::future::try_join;
use quran_viewer_core::domain::{
    CatalogEntry, PageContent, SearchHit, StructuralInfo, Unit, UnitKey,
};
use quran_viewer_core::index;
use quran_viewer_core::ports::{ContentSource, PortError, PortResult};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::get_json;

/// Edition holding the source text.
const TEXT_EDITION: &str = "quran-uthmani";

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct PagePayload {
    number: u16,
    ayahs: Vec<AyahPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AyahPayload {
    text: String,
    surah: SurahPayload,
    number_in_surah: u16,
    juz: Option<u16>,
    page: Option<u16>,
    hizb_quarter: Option<u16>,
    audio: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SurahPayload {
    number: u16,
    name: String,
    english_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    matches: Vec<AyahPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditionPayload {
    identifier: String,
    name: String,
    english_name: Option<String>,
    language: Option<String>,
}

//=========================================================================================
// Adapter
//=========================================================================================

pub struct AlQuranCloudAdapter {
    http: Client,
    base_url: String,
}

impl AlQuranCloudAdapter {
    pub fn new(http: Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    /// Appends percent-encoded path segments to the base URL.
    fn url(&self, segments: &[&str]) -> PortResult<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            PortError::Unexpected(format!("Invalid base URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                PortError::Unexpected(format!("Base URL {} cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch_edition_page(&self, page_number: u16, edition: &str) -> PortResult<PagePayload> {
        let url = self.url(&["page", &page_number.to_string(), edition])?;
        let what = format!("page {} ({})", page_number, edition);
        let envelope: Envelope<PagePayload> = get_json(self.http.get(url), &what).await?;
        Ok(envelope.data)
    }

    async fn fetch_editions(&self, segments: &[&str]) -> PortResult<Vec<CatalogEntry>> {
        let url = self.url(segments)?;
        let envelope: Envelope<Vec<EditionPayload>> =
            get_json(self.http.get(url), "edition list").await?;
        Ok(envelope.data.into_iter().map(catalog_entry).collect())
    }
}

#[async_trait]
impl ContentSource for AlQuranCloudAdapter {
    #[instrument(skip(self))]
    async fn fetch_page(&self, page_number: u16) -> PortResult<PageContent> {
        let page = self.fetch_edition_page(page_number, TEXT_EDITION).await?;
        normalize_page(page_number, page, None)
    }

    #[instrument(skip(self))]
    async fn fetch_page_with_translation(
        &self,
        page_number: u16,
        translation_id: &str,
    ) -> PortResult<PageContent> {
        let (page, translation) = try_join(
            self.fetch_edition_page(page_number, TEXT_EDITION),
            self.fetch_edition_page(page_number, translation_id),
        )
        .await?;
        normalize_page(page_number, page, Some(translation))
    }

    #[instrument(skip(self))]
    async fn fetch_audio_refs(&self, page_number: u16, reciter_id: &str) -> PortResult<Vec<String>> {
        let page = self.fetch_edition_page(page_number, reciter_id).await?;
        audio_refs(page)
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, language: &str) -> PortResult<Vec<SearchHit>> {
        let url = self.url(&["search", query, "all", language])?;
        // The provider answers 404 when nothing matches.
        match get_json::<Envelope<SearchPayload>>(self.http.get(url), "search").await {
            Ok(envelope) => Ok(normalize_search(envelope.data)),
            Err(PortError::NotFound(_)) => {
                debug!("No search matches");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn list_reciters(&self) -> PortResult<Vec<CatalogEntry>> {
        self.fetch_editions(&["edition", "format", "audio"]).await
    }

    async fn list_translations(&self) -> PortResult<Vec<CatalogEntry>> {
        self.fetch_editions(&["edition", "type", "translation"]).await
    }
}

//=========================================================================================
// Normalization
//=========================================================================================

fn unit_key(ayah: &AyahPayload) -> UnitKey {
    UnitKey::new(ayah.surah.number, ayah.number_in_surah)
}

fn normalize_page(
    page_number: u16,
    page: PagePayload,
    translation: Option<PagePayload>,
) -> PortResult<PageContent> {
    if page.number != page_number {
        return Err(PortError::ContentUnavailable(format!(
            "Provider returned page {} for page {}",
            page.number, page_number
        )));
    }
    let first = page.ayahs.first().ok_or_else(|| {
        PortError::ContentUnavailable(format!("Page {} has no verses", page_number))
    })?;
    let structural_info = StructuralInfo {
        major_division_name: first
            .surah
            .english_name
            .clone()
            .unwrap_or_else(|| first.surah.name.clone()),
        minor_division_index: first
            .juz
            .unwrap_or_else(|| index::structural_division_for_page(page_number)),
        sub_division_index: first.hizb_quarter.unwrap_or(0),
    };

    let translations: Vec<Option<String>> = match translation {
        Some(translation) => {
            if translation.ayahs.len() != page.ayahs.len() {
                return Err(PortError::ContentUnavailable(format!(
                    "Translation of page {} has {} verses, expected {}",
                    page_number,
                    translation.ayahs.len(),
                    page.ayahs.len()
                )));
            }
            translation.ayahs.into_iter().map(|a| Some(a.text)).collect()
        }
        None => vec![None; page.ayahs.len()],
    };

    let units = page
        .ayahs
        .into_iter()
        .zip(translations)
        .map(|(ayah, translated_text)| Unit {
            key: unit_key(&ayah),
            text: ayah.text,
            translated_text,
            audio_ref: ayah.audio,
        })
        .collect();
    PageContent::new(page_number, units, structural_info)
}

fn audio_refs(page: PagePayload) -> PortResult<Vec<String>> {
    let page_number = page.number;
    page.ayahs
        .into_iter()
        .map(|ayah| {
            let key = unit_key(&ayah);
            ayah.audio.ok_or_else(|| {
                PortError::ContentUnavailable(format!(
                    "No audio for verse {} on page {}",
                    key, page_number
                ))
            })
        })
        .collect()
}

fn normalize_search(payload: SearchPayload) -> Vec<SearchHit> {
    payload
        .matches
        .into_iter()
        .map(|ayah| {
            let unit_key = unit_key(&ayah);
            // Matches usually carry no page; fall back to the chapter's first page.
            let page_number = ayah.page.unwrap_or_else(|| {
                index::page_for_major_division(unit_key.major()).unwrap_or(1)
            });
            SearchHit {
                page_number,
                unit_key,
                text: ayah.text,
            }
        })
        .collect()
}

fn catalog_entry(edition: EditionPayload) -> CatalogEntry {
    CatalogEntry {
        identifier: edition.identifier,
        name: edition.english_name.unwrap_or(edition.name),
        language: edition.language,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_ONE: &str = r#"{
        "code": 200,
        "status": "OK",
        "data": {
            "number": 1,
            "ayahs": [
                {"number": 1, "text": "بِسْمِ ٱللَّهِ", "surah": {"number": 1, "name": "سُورَةُ ٱلْفَاتِحَةِ", "englishName": "Al-Faatiha"}, "numberInSurah": 1, "juz": 1, "page": 1, "hizbQuarter": 1},
                {"number": 2, "text": "ٱلْحَمْدُ لِلَّهِ", "surah": {"number": 1, "name": "سُورَةُ ٱلْفَاتِحَةِ", "englishName": "Al-Faatiha"}, "numberInSurah": 2, "juz": 1, "page": 1, "hizbQuarter": 1}
            ]
        }
    }"#;

    const PAGE_ONE_TRANSLATION: &str = r#"{
        "data": {
            "number": 1,
            "ayahs": [
                {"text": "In the name of Allah", "surah": {"number": 1, "name": "x"}, "numberInSurah": 1},
                {"text": "All praise is due to Allah", "surah": {"number": 1, "name": "x"}, "numberInSurah": 2}
            ]
        }
    }"#;

    fn page(json: &str) -> PagePayload {
        serde_json::from_str::<Envelope<PagePayload>>(json).unwrap().data
    }

    #[test]
    fn page_is_normalized_in_reading_order() {
        let content = normalize_page(1, page(PAGE_ONE), None).unwrap();
        assert_eq!(content.page_number(), 1);
        assert_eq!(content.units()[0].key, UnitKey::new(1, 1));
        assert_eq!(content.units()[1].key, UnitKey::new(1, 2));
        assert_eq!(content.structural_info().major_division_name, "Al-Faatiha");
        assert_eq!(content.structural_info().minor_division_index, 1);
        assert_eq!(content.units()[0].translated_text, None);
    }

    #[test]
    fn translation_is_zipped_by_position() {
        let content =
            normalize_page(1, page(PAGE_ONE), Some(page(PAGE_ONE_TRANSLATION))).unwrap();
        assert_eq!(
            content.units()[1].translated_text.as_deref(),
            Some("All praise is due to Allah")
        );
    }

    #[test]
    fn mismatched_translation_fails_closed() {
        let mut translation = page(PAGE_ONE_TRANSLATION);
        translation.ayahs.pop();
        let result = normalize_page(1, page(PAGE_ONE), Some(translation));
        assert!(matches!(result, Err(PortError::ContentUnavailable(_))));
    }

    #[test]
    fn empty_or_wrong_page_fails_closed() {
        let empty = PagePayload {
            number: 3,
            ayahs: Vec::new(),
        };
        assert!(matches!(
            normalize_page(3, empty, None),
            Err(PortError::ContentUnavailable(_))
        ));
        assert!(matches!(
            normalize_page(2, page(PAGE_ONE), None),
            Err(PortError::ContentUnavailable(_))
        ));
    }

    #[test]
    fn audio_edition_yields_one_ref_per_verse() {
        let json = r#"{"data": {"number": 604, "ayahs": [
            {"text": "a", "surah": {"number": 114, "name": "n"}, "numberInSurah": 1, "audio": "https://cdn.example/ar.alafasy/6231"},
            {"text": "b", "surah": {"number": 114, "name": "n"}, "numberInSurah": 2, "audio": "https://cdn.example/ar.alafasy/6232"}
        ]}}"#;
        let refs = audio_refs(page(json)).unwrap();
        assert_eq!(refs.len(), 2);
        assert!(refs[1].ends_with("6232"));

        let missing = r#"{"data": {"number": 604, "ayahs": [
            {"text": "a", "surah": {"number": 114, "name": "n"}, "numberInSurah": 1}
        ]}}"#;
        assert!(audio_refs(page(missing)).is_err());
    }

    #[test]
    fn search_hits_without_page_use_chapter_start() {
        let json = r#"{"count": 1, "matches": [
            {"text": "match", "surah": {"number": 2, "name": "n"}, "numberInSurah": 255}
        ]}"#;
        let hits = normalize_search(serde_json::from_str(json).unwrap());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].page_number, 2);
        assert_eq!(hits[0].unit_key, UnitKey::new(2, 255));
    }

    #[test]
    fn url_segments_are_encoded() {
        let adapter = AlQuranCloudAdapter::new(Client::new(), "https://api.alquran.cloud/v1".into());
        let url = adapter.url(&["search", "الحمد لله", "all", "ar"]).unwrap();
        assert!(url.as_str().starts_with("https://api.alquran.cloud/v1/search/"));
        assert!(!url.as_str().contains(' '));
    }
}
