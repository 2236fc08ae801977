use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub viewer: ViewerConfig,
    pub document: DocumentConfig,
    pub input: InputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ViewerConfig {
    pub path: Option<PathBuf>,
    pub args: Vec<String>,
    pub debug: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            path: None,
            args: vec!["/F".to_string(), "/S".to_string()],
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DocumentConfig {
    pub generate_thumbnails: bool,
    /// Thumbnail width in pixels; 0 keeps the full window size.
    pub thumbnail_width: u32,
    pub open_hidden: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            generate_thumbnails: true,
            thumbnail_width: 200,
            open_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputConfig {
    pub key_pause_ms: u64,
    pub offscreen_x: i32,
    pub offscreen_y: i32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            key_pause_ms: 10,
            offscreen_x: -32000,
            offscreen_y: -32000,
        }
    }
}

impl InputConfig {
    const MAX_KEY_PAUSE_MS: u64 = 1000;
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> AppResult<Self> {
        let Some(path) = default_config_path() else {
            return Ok(Self::default());
        };
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        if !path.is_file() {
            return Err(AppError::invalid_argument(format!(
                "config path is not a regular file: {}",
                path.display()
            )));
        }

        let raw = fs::read_to_string(path).map_err(|source| {
            AppError::io_with_context(source, format!("failed to read config: {}", path.display()))
        })?;
        let parsed = toml::from_str::<Self>(&raw).map_err(|source| {
            AppError::invalid_argument(format!(
                "failed to parse config {}: {source}",
                path.display()
            ))
        })?;
        Ok(parsed.sanitized())
    }

    fn sanitized(mut self) -> Self {
        if self
            .viewer
            .path
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            self.viewer.path = None;
        }
        self.input.key_pause_ms = self.input.key_pause_ms.min(InputConfig::MAX_KEY_PAUSE_MS);
        if self.logging.filter.trim().is_empty() {
            self.logging.filter = LoggingConfig::default().filter;
        }
        self
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os("PVR_CONFIG_PATH")
        && !explicit.is_empty()
    {
        return Some(PathBuf::from(explicit));
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return Some(PathBuf::from(xdg).join("pvr").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME")
        && !home.is_empty()
    {
        return Some(
            PathBuf::from(home)
                .join(".config")
                .join("pvr")
                .join("config.toml"),
        );
    }
    if let Some(appdata) = std::env::var_os("APPDATA")
        && !appdata.is_empty()
    {
        return Some(PathBuf::from(appdata).join("pvr").join("config.toml"));
    }
    None
}
