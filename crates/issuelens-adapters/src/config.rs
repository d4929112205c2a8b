//! Configuration management for issuelens
//!
//! Stores settings in ~/.config/issuelens/config.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Where the analysis service listens when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const API_URL_ENV: &str = "ISSUELENS_API_URL";
pub const STATE_FILE_ENV: &str = "ISSUELENS_STATE_FILE";

const APP_DIR: &str = "issuelens";
const CONFIG_FILE: &str = "config.json";
const STATE_FILE: &str = "state.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid analysis service URL {url:?}: {source}")]
    InvalidApiUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Analysis service URL must be http(s), got {0:?}")]
    UnsupportedApiUrl(String),
    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("Could not determine a data directory; pass --state-file or set ISSUELENS_STATE_FILE")]
    NoStateDir,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the analysis service, without the `/analyze` suffix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Transport timeout. Unset means the HTTP client default (none).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

impl Config {
    fn sanitize(&mut self) {
        if let Some(url) = self.api_url.take() {
            let url = url.trim();
            if !url.is_empty() {
                self.api_url = Some(url.to_string());
            }
        }
        if self.request_timeout_secs == Some(0) {
            self.request_timeout_secs = None;
        }
    }

    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR))
    }

    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join(CONFIG_FILE))
    }

    /// Load config from disk, or return default
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load config from a specific file. Missing files yield defaults; a
    /// corrupt file is moved aside to `config.json.corrupt`.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<Config>(&content) {
            Ok(mut config) => {
                config.sanitize();
                config
            }
            Err(err) => {
                preserve_corrupt_config(path, &content);
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "config file was corrupted; a backup was saved and defaults were loaded"
                );
                Self::default()
            }
        }
    }

    /// Base URL, preferring `override_url` (flag or environment) over the file.
    pub fn api_url<'a>(&'a self, override_url: Option<&'a str>) -> &'a str {
        override_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .or(self.api_url.as_deref())
            .unwrap_or(DEFAULT_API_URL)
    }

    /// Location of the persisted analysis state.
    pub fn state_path(&self, override_path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = override_path.or(self.state_file.as_deref()) {
            return Ok(path.to_path_buf());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR).join(STATE_FILE))
            .ok_or(ConfigError::NoStateDir)
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("~/.config/{}/{}", APP_DIR, CONFIG_FILE))
    }
}

/// Parse and check a service base URL.
pub fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidApiUrl {
        url: raw.to_string(),
        source,
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::UnsupportedApiUrl(raw.to_string()));
    }
    Ok(url)
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}
