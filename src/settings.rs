use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pdf::{
    DEFAULT_CACHE_SIZE, DEFAULT_MAX_DIMENSION, DEFAULT_SCALE, DEFAULT_WORKERS, is_valid_scale,
};
use crate::preview::PreviewConfig;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const SESSION_FILENAME: &str = "session.json";
const APP_NAME: &str = "bookpreview";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Zoom applied to every rendered page
    #[serde(default = "default_scale")]
    pub scale: f32,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Longest side of a rendered page in pixels
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// Where the upload step leaves the document; defaults to the data dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_scale() -> f32 {
    DEFAULT_SCALE
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_render_timeout_ms() -> u64 {
    30_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            scale: default_scale(),
            workers: default_workers(),
            cache_size: default_cache_size(),
            max_dimension: default_max_dimension(),
            render_timeout_ms: default_render_timeout_ms(),
            session_file: None,
        }
    }
}

impl Settings {
    /// Preview tunables, with out-of-range values replaced by defaults
    #[must_use]
    pub fn preview_config(&self) -> PreviewConfig {
        let scale = if is_valid_scale(self.scale) {
            self.scale
        } else {
            warn!("Invalid scale {} in settings, using {DEFAULT_SCALE}", self.scale);
            DEFAULT_SCALE
        };
        PreviewConfig {
            scale,
            workers: self.workers.max(1),
            cache_size: self.cache_size.max(1),
            max_dimension: self.max_dimension.max(1),
            render_timeout: Duration::from_millis(self.render_timeout_ms.max(1)),
        }
    }

    /// Session file from settings, or the per-user default
    #[must_use]
    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .clone()
            .or_else(default_session_path)
            .unwrap_or_else(|| PathBuf::from(SESSION_FILENAME))
    }
}

#[must_use]
pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

fn default_session_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|data| data.join(APP_NAME).join(SESSION_FILENAME))
}

/// Load settings from `path`, or from the per-user config file.
///
/// A missing per-user file is created with defaults. Unreadable files are
/// logged and defaults are used.
#[must_use]
pub fn load_settings(path: Option<&Path>) -> Settings {
    if let Some(path) = path {
        return load_settings_from_path(path).unwrap_or_default();
    }

    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return Settings::default();
    };
    if path.exists() {
        return load_settings_from_path(&path).unwrap_or_default();
    }

    info!("Settings file not found, creating with defaults at {path:?}");
    let settings = Settings::default();
    save_settings_to_file(&settings, &path);
    settings
}

fn load_settings_from_path(path: &Path) -> Option<Settings> {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }
                Some(settings)
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
                None
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
            None
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = match serde_yaml::to_string(settings) {
        Ok(yaml) => format!("{SETTINGS_HEADER}{yaml}"),
        Err(e) => {
            error!("Failed to serialize settings: {e}");
            return;
        }
    };

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

const SETTINGS_HEADER: &str = "\
# bookpreview settings
#
# scale:             zoom applied to every rendered page
# workers:           render threads per document
# cache_size:        rendered pages kept in memory
# max_dimension:     longest side of a rendered page in pixels
# render_timeout_ms: how long to wait for a spread before giving up
# session_file:      where the upload step stores the document
";
