//! TOML-based configuration for the daemon.
//!
//! Reads and writes `DaemonConfig` at `$XDG_CONFIG_HOME/spotlight/config.toml`
//! (falling back to `~/.config/spotlight/config.toml`), or at an explicit
//! path passed on the command line.
//!
//! ```toml
//! [daemon]
//! log_level = "info"
//! grab_event_nodes = true
//! virtual_device_name = "Virtual Spotlight Mouse"
//!
//! [gestures.baseus]
//! long_press_ms = 700
//!
//! [gestures.vrbox]
//! double_tap_ms = 350
//! ```
//!
//! # Serde default values
//!
//! Every field has a `#[serde(default)]`, so an empty or partial file is
//! valid and a missing file means "all defaults".  Gesture overrides are
//! optional per field; anything left out keeps the device's built-in timing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spotlight_core::{DeviceModel, GestureProfile, ProfileError};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `XDG_CONFIG_HOME` nor `HOME` is set.
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A `[gestures.<key>]` table names no supported model.
    #[error("unknown model '{0}' in [gestures]")]
    UnknownModel(String),

    /// The overrides for one model leave the gesture engine unusable.
    #[error("invalid gesture timing for {model}: {source}")]
    Invalid {
        model: DeviceModel,
        #[source]
        source: ProfileError,
    },
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DaemonConfig {
    #[serde(default)]
    pub daemon: DaemonSection,
    /// Per-model timing overrides keyed by [`DeviceModel::key`].
    #[serde(default)]
    pub gestures: BTreeMap<String, GestureOverrides>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonSection {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Grab presenter event nodes so their native key events do not reach
    /// the desktop.  Pointer motion and clicks are re-emitted.
    #[serde(default = "default_true")]
    pub grab_event_nodes: bool,
    #[serde(default = "default_device_name")]
    pub virtual_device_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GestureOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_tap_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_press_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_ms: Option<u64>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_device_name() -> String {
    "Virtual Spotlight Mouse".to_string()
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            grab_event_nodes: default_true(),
            virtual_device_name: default_device_name(),
        }
    }
}

impl DaemonConfig {
    /// The model's built-in profile with any configured overrides applied.
    pub fn profile_for(&self, model: DeviceModel) -> GestureProfile {
        let base = model.profile();
        match self.gestures.get(model.key()) {
            Some(o) => base.with_timing(
                o.double_tap_ms.map(Duration::from_millis),
                o.long_press_ms.map(Duration::from_millis),
                o.repeat_ms.map(Duration::from_millis),
            ),
            None => base,
        }
    }

    /// Checks every gesture override table against the model it names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownModel`] for a table whose key is not a
    /// model, and [`ConfigError::Invalid`] when the resulting timing is
    /// unusable (zero hold or repeat, or a double-tap window longer than the
    /// long-press threshold).
    pub fn validate(&self) -> Result<(), ConfigError> {
        for key in self.gestures.keys() {
            let model =
                DeviceModel::from_key(key).ok_or_else(|| ConfigError::UnknownModel(key.clone()))?;
            self.profile_for(model)
                .validate()
                .map_err(|source| ConfigError::Invalid { model, source })?;
        }
        Ok(())
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path.
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDir`] when neither `XDG_CONFIG_HOME` nor
/// `HOME` is set.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join("spotlight").join("config.toml"))
}

/// Loads the config from `path` (or the default location), returning
/// defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and the errors of
/// [`DaemonConfig::validate`] for unusable gesture overrides.
pub fn load_config(path: Option<&Path>) -> Result<DaemonConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };

    let config: DaemonConfig = match std::fs::read_to_string(&path) {
        Ok(content) => toml::from_str(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(DaemonConfig::default()),
        Err(e) => return Err(ConfigError::Io { path, source: e }),
    };
    config.validate()?;
    Ok(config)
}

/// Writes `config` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &DaemonConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
