//! Configuration Management
//!
//! This module handles loading and saving tool settings.
//!
//! # Configuration Locations
//! - Local: `.udfkit/config.json` (per working directory)
//! - Global: `~/.config/udfkit/config.json` (per user)
//!
//! # Resolution Precedence
//! 1. Command-line flags (highest priority)
//! 2. Local config file (`.udfkit/config.json`)
//! 3. Global config file (`~/.config/udfkit/config.json`)
//! 4. Built-in defaults
//!
//! Every field of a config file is optional; a file only needs to name the
//! settings it overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::OutputEncoding;
use crate::error::{Result, UdfkitError};

/// Artifact directory used when no layer names one
pub const DEFAULT_ARTIFACT_DIR: &str = "plugins/mysql";

/// One layer of settings as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsFile {
    /// Path of the SQLite session catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    /// Directory holding the per-platform hex payload files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_dir: Option<PathBuf>,

    /// Encoding used for command output when `--encoding` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_encoding: Option<OutputEncoding>,
}

impl SettingsFile {
    /// Overlay `other` on top of `self`; fields set in `other` win
    #[must_use]
    pub fn merged_with(self, other: Self) -> Self {
        Self {
            catalog_path: other.catalog_path.or(self.catalog_path),
            artifact_dir: other.artifact_dir.or(self.artifact_dir),
            default_encoding: other.default_encoding.or(self.default_encoding),
        }
    }
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub catalog_path: PathBuf,
    pub artifact_dir: PathBuf,
    pub default_encoding: OutputEncoding,
}

/// Configuration file location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLocation {
    /// Local config: `.udfkit/config.json`
    Local,
    /// Global config: `~/.config/udfkit/config.json`
    Global,
}

/// Get path to local config file (`.udfkit/config.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        UdfkitError::config_error(format!("Could not determine current directory: {e}"))
    })?;

    Ok(current_dir.join(".udfkit").join("config.json"))
}

/// Get path to global config file (`~/.config/udfkit/config.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| UdfkitError::config_error("Could not determine user config directory"))?;

    Ok(config_dir.join("udfkit").join("config.json"))
}

/// Default catalog location: `<data dir>/udfkit/sessions.db`
pub fn default_catalog_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| UdfkitError::config_error("Could not determine user data directory"))?;

    Ok(data_dir.join("udfkit").join("sessions.db"))
}

/// Path for a config location
pub fn config_path(location: ConfigLocation) -> Result<PathBuf> {
    match location {
        ConfigLocation::Local => local_config_path(),
        ConfigLocation::Global => global_config_path(),
    }
}

/// Load one settings layer; a missing file is an empty layer
pub fn load_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| UdfkitError::config_error(format!("Could not read config file: {e}")))?;

    serde_json::from_str(&contents).map_err(|e| {
        UdfkitError::config_error(format!("Invalid config file format in {}: {e}", path.display()))
    })
}

/// Save one settings layer, creating the parent directory if needed
pub fn save_settings(path: &Path, settings: &SettingsFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            UdfkitError::config_error(format!("Could not create config directory: {e}"))
        })?;
    }

    let contents = serde_json::to_string_pretty(settings)
        .map_err(|e| UdfkitError::config_error(format!("Could not serialize config: {e}")))?;

    fs::write(path, contents)
        .map_err(|e| UdfkitError::config_error(format!("Could not write config file: {e}")))?;

    Ok(())
}

/// Load both layers from explicit paths and merge them, local over global
pub fn load_layers(local: &Path, global: &Path) -> Result<SettingsFile> {
    let global = load_settings(global)?;
    let local = load_settings(local)?;
    Ok(global.merged_with(local))
}

/// Load the merged view of the global and local config files
pub fn load_with_precedence() -> Result<SettingsFile> {
    load_layers(&local_config_path()?, &global_config_path()?)
}

/// Apply command-line overrides on top of the file layers and fill defaults
pub fn resolve_settings(files: SettingsFile, overrides: SettingsFile) -> Result<Settings> {
    let merged = files.merged_with(overrides);

    let catalog_path = match merged.catalog_path {
        Some(path) => path,
        None => default_catalog_path()?,
    };

    Ok(Settings {
        catalog_path,
        artifact_dir: merged.artifact_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_DIR)),
        default_encoding: merged.default_encoding.unwrap_or_default(),
    })
}
