//! services/api/src/adapters/mod.rs
//!
//! Concrete implementations of the core ports: the two HTTP content providers
//! and the file-backed key/value store.

pub mod alquran;
pub mod file_store;
pub mod foundation;

pub use alquran::AlQuranCloudAdapter;
pub use file_store::FileKvStore;
pub use foundation::QuranFoundationAdapter;

use crate::config::{Config, ContentProvider};
use crate::error::ApiError;
use quran_viewer_core::ports::{ContentSource, PortError, PortResult};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Builds the content source selected by the configuration.
pub fn content_source(config: &Config) -> Result<Arc<dyn ContentSource>, ApiError> {
    let http = Client::builder().timeout(config.http_timeout).build()?;
    let base_url = config.content_api_base_url.clone();
    Ok(match config.content_provider {
        ContentProvider::AlQuranCloud => Arc::new(AlQuranCloudAdapter::new(http, base_url)),
        ContentProvider::QuranFoundation => Arc::new(QuranFoundationAdapter::new(http, base_url)),
    })
}

/// Sends a request and decodes its JSON body. Transport failures and bad
/// responses become `ContentUnavailable`; a 404 becomes `NotFound`.
pub(crate) async fn get_json<T: DeserializeOwned>(
    request: RequestBuilder,
    what: &str,
) -> PortResult<T> {
    let response = request.send().await.map_err(|e| {
        PortError::ContentUnavailable(format!("Request for {} failed: {}", what, e))
    })?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(PortError::NotFound(format!("{} not found", what)));
    }
    if !status.is_success() {
        return Err(PortError::ContentUnavailable(format!(
            "Provider answered {} for {}",
            status, what
        )));
    }

    response.json::<T>().await.map_err(|e| {
        PortError::ContentUnavailable(format!("Malformed response for {}: {}", what, e))
    })
}
