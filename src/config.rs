// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const APP_ID: &str = "io.github.sethcottle.Flashdeck";
pub const APP_NAME: &str = "Flashdeck";

#[cfg(feature = "devel")]
pub const IS_DEVEL: bool = true;
#[cfg(not(feature = "devel"))]
pub const IS_DEVEL: bool = false;

/// Environment variable overriding the remote API base URL
pub const API_URL_ENV: &str = "FLASHDECK_API_URL";

/// File name of the local database inside the data dir
pub const DATABASE_FILE: &str = "flashdeck.db";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 8;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 3;
const DEFAULT_STREAK_CHECK_SECS: u64 = 60;

/// On-disk shape of settings.json. Every field is optional so a partial
/// file still loads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    data_dir: Option<PathBuf>,
    #[serde(default)]
    request_timeout_secs: Option<u64>,
    #[serde(default)]
    probe_timeout_secs: Option<u64>,
    #[serde(default)]
    streak_check_secs: Option<u64>,
}

/// Runtime configuration for the data core
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Remote API root. `None` means the client never leaves the device.
    pub api_base_url: Option<Url>,
    /// Directory holding the local database
    pub data_dir: PathBuf,
    /// Upper bound on any single remote request before falling back
    pub request_timeout: Duration,
    /// Upper bound on the reachability probe
    pub probe_timeout: Duration,
    /// How often the streak watcher re-evaluates the streak
    pub streak_check_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            data_dir: default_data_dir(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            streak_check_interval: Duration::from_secs(DEFAULT_STREAK_CHECK_SECS),
        }
    }
}

impl AppConfig {
    /// Get the settings file path (~/.config/io.github.sethcottle.Flashdeck/settings.json)
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push(APP_ID);
            p.push("settings.json");
            p
        })
    }

    /// Load settings from disk and the environment, falling back to defaults
    pub fn load() -> Self {
        let file = Self::settings_path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .map(|contents| Self::parse_settings(&contents))
            .unwrap_or_default();

        let mut config = Self::from_settings(file);
        if let Ok(raw) = std::env::var(API_URL_ENV) {
            config.api_base_url = parse_base_url(&raw);
        }
        config
    }

    fn parse_settings(contents: &str) -> SettingsFile {
        serde_json::from_str(contents).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring malformed settings.json");
            SettingsFile::default()
        })
    }

    fn from_settings(file: SettingsFile) -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: file.api_base_url.as_deref().and_then(parse_base_url),
            data_dir: file.data_dir.unwrap_or(defaults.data_dir),
            request_timeout: file
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            probe_timeout: file
                .probe_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.probe_timeout),
            streak_check_interval: file
                .streak_check_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.streak_check_interval),
        }
    }

    /// Configuration for a device with no remote at all
    pub fn offline(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_api_base_url(mut self, url: Url) -> Self {
        self.api_base_url = Some(url);
        self
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

/// Parse a base URL, making sure it ends with `/` so relative joins keep the path
fn parse_base_url(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    match Url::parse(&normalized) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(url = %raw, error = %e, "ignoring invalid remote API url");
            None
        }
    }
}

fn default_data_dir() -> PathBuf {
    let dir = dirs::data_dir()
        .map(|p| p.join("flashdeck"))
        .unwrap_or_else(|| PathBuf::from(".flashdeck"));
    debug!(path = %dir.display(), "resolved data dir");
    dir
}
