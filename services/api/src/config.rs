//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// The remote service pages, audio and search results come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentProvider {
    AlQuranCloud,
    QuranFoundation,
}

impl ContentProvider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ContentProvider::AlQuranCloud => "https://api.alquran.cloud/v1",
            ContentProvider::QuranFoundation => "https://api.quran.foundation/api/v1",
        }
    }
}

impl FromStr for ContentProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alquran" => Ok(ContentProvider::AlQuranCloud),
            "foundation" => Ok(ContentProvider::QuranFoundation),
            other => Err(format!(
                "'{}' is not a known provider (expected 'alquran' or 'foundation')",
                other
            )),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub content_provider: ContentProvider,
    pub content_api_base_url: String,
    pub http_timeout: Duration,
    pub data_dir: PathBuf,
    pub default_reciter: String,
    pub default_translation: Option<String>,
    pub autoplay: bool,
    pub public_base_url: String,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Content Provider Settings ---
        let content_provider = lookup("CONTENT_PROVIDER")
            .unwrap_or_else(|| "alquran".to_string())
            .parse::<ContentProvider>()
            .map_err(|e| ConfigError::InvalidValue("CONTENT_PROVIDER".to_string(), e))?;
        let content_api_base_url = lookup("CONTENT_API_BASE_URL")
            .unwrap_or_else(|| content_provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string();

        let timeout_str = lookup("HTTP_TIMEOUT_SECS").unwrap_or_else(|| "30".to_string());
        let timeout_secs = timeout_str.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(
                "HTTP_TIMEOUT_SECS".to_string(),
                format!("'{}' is not a number of seconds", timeout_str),
            )
        })?;

        // --- Viewer Settings ---
        let data_dir = lookup("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data"));
        let default_reciter =
            lookup("DEFAULT_RECITER").unwrap_or_else(|| "ar.alafasy".to_string());
        let default_translation = lookup("DEFAULT_TRANSLATION").filter(|t| !t.trim().is_empty());

        let autoplay_str = lookup("AUTOPLAY").unwrap_or_else(|| "false".to_string());
        let autoplay = autoplay_str.parse::<bool>().map_err(|_| {
            ConfigError::InvalidValue(
                "AUTOPLAY".to_string(),
                format!("'{}' is not 'true' or 'false'", autoplay_str),
            )
        })?;

        let public_base_url =
            lookup("PUBLIC_BASE_URL").unwrap_or_else(|| "http://localhost:3000".to_string());
        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".to_string());

        Ok(Self {
            bind_address,
            log_level,
            content_provider,
            content_api_base_url,
            http_timeout: Duration::from_secs(timeout_secs),
            data_dir,
            default_reciter,
            default_translation,
            autoplay,
            public_base_url,
            cors_origin,
        })
    }
}
