//! services/api/src/adapters/foundation.rs
//!
//! Content source backed by the Quran Foundation API. Pages embed their
//! translations, and per-verse audio is addressed by reciter and verse key.

use async_trait::async_trait;
use quran_viewer_core::domain::{
    CatalogEntry, PageContent, SearchHit, StructuralInfo, Unit, UnitKey,
};
use quran_viewer_core::index;
use quran_viewer_core::ports::{ContentSource, PortError, PortResult};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::instrument;

use super::get_json;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Debug, Deserialize)]
struct PageEnvelope {
    page: PagePayload,
}

#[derive(Debug, Deserialize)]
struct PagePayload {
    page: u16,
    verses: Vec<VersePayload>,
    meta: Option<MetaPayload>,
}

#[derive(Debug, Deserialize)]
struct VersePayload {
    verse_key: String,
    text_uthmani: String,
    juz_number: Option<u16>,
    rub_number: Option<u16>,
    page_number: Option<u16>,
    surah: Option<SurahPayload>,
    #[serde(default)]
    translations: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SurahPayload {
    name: String,
    english_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetaPayload {
    juz: Option<u16>,
    rub: Option<u16>,
    #[serde(default)]
    surahs: Vec<MetaSurahPayload>,
}

#[derive(Debug, Deserialize)]
struct MetaSurahPayload {
    name: String,
    #[serde(rename = "englishName")]
    english_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    verses: Vec<VersePayload>,
}

#[derive(Debug, Deserialize)]
struct RecitationsPayload {
    recitations: Vec<RecitationPayload>,
}

#[derive(Debug, Deserialize)]
struct RecitationPayload {
    id: u32,
    name: String,
    style: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranslationsPayload {
    translations: Vec<TranslationPayload>,
}

#[derive(Debug, Deserialize)]
struct TranslationPayload {
    id: u32,
    name: String,
    language_name: Option<String>,
}

//=========================================================================================
// Adapter
//=========================================================================================

pub struct QuranFoundationAdapter {
    http: Client,
    base_url: String,
}

impl QuranFoundationAdapter {
    pub fn new(http: Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    async fn fetch_payload(
        &self,
        page_number: u16,
        translation_id: Option<&str>,
    ) -> PortResult<PagePayload> {
        let mut request = self
            .http
            .get(format!("{}/pages/{}", self.base_url, page_number))
            .query(&[("words", "true")]);
        if let Some(translation_id) = translation_id {
            request = request.query(&[("translations", translation_id)]);
        }
        let envelope: PageEnvelope = get_json(request, &format!("page {}", page_number)).await?;
        Ok(envelope.page)
    }

    fn verse_audio_url(&self, reciter_id: &str, key: &str) -> String {
        format!(
            "{}/recitations/{}/by_verse/{}",
            self.base_url, reciter_id, key
        )
    }
}

#[async_trait]
impl ContentSource for QuranFoundationAdapter {
    #[instrument(skip(self))]
    async fn fetch_page(&self, page_number: u16) -> PortResult<PageContent> {
        let payload = self.fetch_payload(page_number, None).await?;
        normalize_page(page_number, payload, None)
    }

    #[instrument(skip(self))]
    async fn fetch_page_with_translation(
        &self,
        page_number: u16,
        translation_id: &str,
    ) -> PortResult<PageContent> {
        let payload = self.fetch_payload(page_number, Some(translation_id)).await?;
        normalize_page(page_number, payload, Some(translation_id))
    }

    #[instrument(skip(self))]
    async fn fetch_audio_refs(&self, page_number: u16, reciter_id: &str) -> PortResult<Vec<String>> {
        let payload = self.fetch_payload(page_number, None).await?;
        if payload.verses.is_empty() {
            return Err(PortError::ContentUnavailable(format!(
                "Page {} has no verses",
                page_number
            )));
        }
        Ok(payload
            .verses
            .iter()
            .map(|verse| self.verse_audio_url(reciter_id, &verse.verse_key))
            .collect())
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str, language: &str) -> PortResult<Vec<SearchHit>> {
        let request = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("query", query), ("language", language)]);
        let payload: SearchPayload = get_json(request, "search").await?;
        normalize_search(payload)
    }

    async fn list_reciters(&self) -> PortResult<Vec<CatalogEntry>> {
        let request = self
            .http
            .get(format!("{}/resources/recitations", self.base_url));
        let payload: RecitationsPayload = get_json(request, "recitation list").await?;
        Ok(payload
            .recitations
            .into_iter()
            .map(|r| CatalogEntry {
                identifier: r.id.to_string(),
                name: match r.style {
                    Some(style) => format!("{} ({})", r.name, style),
                    None => r.name,
                },
                language: None,
            })
            .collect())
    }

    async fn list_translations(&self) -> PortResult<Vec<CatalogEntry>> {
        let request = self
            .http
            .get(format!("{}/resources/translations", self.base_url));
        let payload: TranslationsPayload = get_json(request, "translation list").await?;
        Ok(payload
            .translations
            .into_iter()
            .map(|t| CatalogEntry {
                identifier: t.id.to_string(),
                name: t.name,
                language: t.language_name,
            })
            .collect())
    }
}

//=========================================================================================
// Normalization
//=========================================================================================

fn parse_key(verse: &VersePayload) -> PortResult<UnitKey> {
    verse.verse_key.parse().map_err(|e| {
        PortError::ContentUnavailable(format!("Provider sent a bad verse key: {}", e))
    })
}

fn normalize_page(
    page_number: u16,
    payload: PagePayload,
    translation_id: Option<&str>,
) -> PortResult<PageContent> {
    if payload.page != page_number {
        return Err(PortError::ContentUnavailable(format!(
            "Provider returned page {} for page {}",
            payload.page, page_number
        )));
    }
    let first = payload.verses.first().ok_or_else(|| {
        PortError::ContentUnavailable(format!("Page {} has no verses", page_number))
    })?;
    let first_key = parse_key(first)?;

    let meta_surah = payload.meta.as_ref().and_then(|m| m.surahs.first());
    let major_division_name = first
        .surah
        .as_ref()
        .map(|s| s.english_name.clone().unwrap_or_else(|| s.name.clone()))
        .or_else(|| meta_surah.map(|s| s.english_name.clone().unwrap_or_else(|| s.name.clone())))
        .or_else(|| {
            index::major_division(first_key.major())
                .ok()
                .map(|d| d.name.to_string())
        })
        .unwrap_or_default();
    let structural_info = StructuralInfo {
        major_division_name,
        minor_division_index: first
            .juz_number
            .or_else(|| payload.meta.as_ref().and_then(|m| m.juz))
            .unwrap_or_else(|| index::structural_division_for_page(page_number)),
        sub_division_index: first
            .rub_number
            .or_else(|| payload.meta.as_ref().and_then(|m| m.rub))
            .unwrap_or(0),
    };

    let mut units = Vec::with_capacity(payload.verses.len());
    for mut verse in payload.verses {
        let key = parse_key(&verse)?;
        let translated_text = match translation_id {
            Some(id) => Some(verse.translations.remove(id).ok_or_else(|| {
                PortError::ContentUnavailable(format!("Verse {} has no translation {}", key, id))
            })?),
            None => None,
        };
        units.push(Unit {
            key,
            text: verse.text_uthmani,
            translated_text,
            audio_ref: None,
        });
    }
    PageContent::new(page_number, units, structural_info)
}

fn normalize_search(payload: SearchPayload) -> PortResult<Vec<SearchHit>> {
    payload
        .verses
        .into_iter()
        .map(|verse| {
            let unit_key = parse_key(&verse)?;
            let page_number = verse.page_number.unwrap_or_else(|| {
                index::page_for_major_division(unit_key.major()).unwrap_or(1)
            });
            Ok(SearchHit {
                page_number,
                unit_key,
                text: verse.text_uthmani,
            })
        })
        .collect()
}
