//! Configuration for the facegallery CLI.
//!
//! Stored in ~/.opensight/facegallery/config.yaml:
//!
//! ```yaml
//! database: /data/faces_database.bin
//! dim: 192
//! threshold: 0.65
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use opensight_gallery::{GalleryConfig, DEFAULT_FILE_NAME, DEFAULT_THRESHOLD};
use serde::{Deserialize, Serialize};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".opensight";
/// Application directory under the base directory.
pub const APP_NAME: &str = "facegallery";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// CLI configuration file contents. Empty or absent fields fall back to
/// defaults; a zero dimension means the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Gallery file path.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub database: String,

    /// Embedding dimension.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub dim: usize,

    /// Match threshold. An explicit 0 is kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// Effective settings after applying flags and defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database: PathBuf,
    pub gallery: GalleryConfig,
}

impl Config {
    /// Gets the default app directory (~/.opensight/facegallery).
    pub fn default_app_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(APP_NAME))
    }

    /// Gets the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_app_dir().map(|dir| dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Loads the config file. A missing file yields the default config.
    pub fn load(custom_path: Option<&str>) -> anyhow::Result<Self> {
        let path = match custom_path {
            Some(p) => PathBuf::from(p),
            None => match Self::default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("parse config {}", path.display()))
    }

    /// Applies command-line overrides and defaults.
    pub fn resolve(
        &self,
        database: Option<&str>,
        threshold: Option<f32>,
    ) -> anyhow::Result<Settings> {
        let database = match database.filter(|d| !d.is_empty()) {
            Some(d) => PathBuf::from(d),
            None if !self.database.is_empty() => PathBuf::from(&self.database),
            None => Self::default_app_dir()
                .map(|dir| dir.join(DEFAULT_FILE_NAME))
                .ok_or_else(|| anyhow::anyhow!("cannot determine gallery path, use --database"))?,
        };

        let threshold = threshold.or(self.threshold).unwrap_or(DEFAULT_THRESHOLD);
        if !(-1.0..=1.0).contains(&threshold) {
            anyhow::bail!("threshold {threshold} out of range [-1, 1]");
        }

        Ok(Settings {
            database,
            gallery: GalleryConfig {
                dim: self.dim,
                threshold,
            }
            .with_defaults(),
        })
    }
}
