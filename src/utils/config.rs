//! Application configuration
//!
//! A flat JSON object persisted under the user config directory. Loading is
//! fail-soft: the application must always be able to start, so a missing or
//! corrupt file falls back to defaults. Saving surfaces errors to the caller
//! because a lost save is user-visible (forgotten window geometry, forgotten
//! download folder).

use crate::utils::error::Mp3LoaderError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CONFIG_DIR_NAME: &str = "youtube-mp3-downloader";
const CONFIG_FILE_NAME: &str = "config.json";
const LEGACY_FILE_NAME: &str = ".youtube-mp3-downloader-config.json";

/// Persisted application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where downloaded MP3s land
    pub download_path: String,

    /// Source session cookies from Firefox for private playlists
    pub use_youtube_auth: bool,

    /// Desktop notifications on download completion
    pub notifications_enabled: bool,

    pub window_width: u32,
    pub window_height: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_y: Option<i32>,

    /// Keys this version does not know about pass through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_path: dirs::download_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .to_string_lossy()
                .to_string(),
            use_youtube_auth: false,
            notifications_enabled: true,
            window_width: 600,
            window_height: 400,
            window_x: None,
            window_y: None,
            extra: Map::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the per-user location, falling back to
    /// defaults on any read or parse failure.
    pub fn load() -> Self {
        let dir = config_dir();
        let legacy = legacy_config_path();
        Self::load_from(&dir, legacy.as_deref())
    }

    /// Load from an explicit directory, migrating a legacy single-file config
    /// into it the first time one is found.
    pub fn load_from(dir: &Path, legacy: Option<&Path>) -> Self {
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("Could not create config directory {}: {}", dir.display(), e);
            return Self::default();
        }

        let file = dir.join(CONFIG_FILE_NAME);

        if let Some(legacy_path) = legacy {
            if legacy_path.exists() && !file.exists() {
                match std::fs::rename(legacy_path, &file) {
                    Ok(()) => info!("Migrated legacy config into {}", file.display()),
                    Err(e) => warn!("Legacy config migration failed: {}", e),
                }
            }
        }

        match std::fs::read_to_string(&file) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    debug!("Loaded config from {}", file.display());
                    config
                }
                Err(e) => {
                    warn!("Config file {} is corrupt ({}); using defaults", file.display(), e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!("Could not read config {} ({}); using defaults", file.display(), e);
                Self::default()
            }
        }
    }

    /// Save the full configuration object to the per-user location.
    pub fn save(&self) -> Result<(), Mp3LoaderError> {
        self.save_to(&config_dir())
    }

    /// Save into an explicit directory.
    pub fn save_to(&self, dir: &Path) -> Result<(), Mp3LoaderError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| Mp3LoaderError::Config(format!("creating {}: {}", dir.display(), e)))?;

        let file = dir.join(CONFIG_FILE_NAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&file, json)
            .map_err(|e| Mp3LoaderError::Config(format!("writing {}: {}", file.display(), e)))?;

        debug!("Saved config to {}", file.display());
        Ok(())
    }
}

/// Per-user config directory (`~/.config/youtube-mp3-downloader` on Linux).
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

fn legacy_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(LEGACY_FILE_NAME))
}
