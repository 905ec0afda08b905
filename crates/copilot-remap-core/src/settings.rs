// Copilot Remap Settings Module
// Optional TOML file providing defaults for the command line options

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::key::key_from_name;
use crate::Key;

/// Default delay before the target key is released
pub const DEFAULT_DELAY_MS: u64 = 300;
/// Largest accepted release delay
pub const MAX_DELAY_MS: u64 = 10_000;

/// Settings loaded from a TOML file (default: ~/.config/copilot-remap/settings.toml)
///
/// ```toml
/// [remap]
/// device = "/dev/input/event3"
/// delay_ms = 300
/// target_key = "RIGHT_CTRL"
/// ```
///
/// Every field is optional; command line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    device: Option<PathBuf>,
    delay_ms: Option<u64>,
    target_key: Option<Key>,

    /// Path to the settings file, when loaded from disk
    source_path: Option<PathBuf>,
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// TOML representation for deserializing settings
#[derive(Debug, Clone, serde::Deserialize, Default)]
struct SettingsToml {
    #[serde(default)]
    remap: Option<RemapSection>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct RemapSection {
    #[serde(default)]
    device: Option<PathBuf>,
    #[serde(default)]
    delay_ms: Option<i64>,
    #[serde(default)]
    target_key: Option<String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let parsed: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();
        let Some(remap) = parsed.remap else {
            return Ok(settings);
        };

        settings.device = remap.device;

        if let Some(delay) = remap.delay_ms {
            let delay = u64::try_from(delay)
                .map_err(|_| SettingsError::InvalidValue(format!("delay_ms = {}", delay)))?;
            validate_delay_ms(delay)?;
            settings.delay_ms = Some(delay);
        }

        if let Some(name) = remap.target_key {
            let key = key_from_name(&name).ok_or_else(|| {
                SettingsError::InvalidValue(format!("Unknown target_key '{}'", name))
            })?;
            settings.target_key = Some(key);
        }

        Ok(settings)
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("copilot-remap").join("settings.toml"))
    }

    /// Load from the default location, or empty settings if there is no file
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Ok(Self::new())
    }

    pub fn device(&self) -> Option<&Path> {
        self.device.as_deref()
    }

    pub fn delay_ms(&self) -> Option<u64> {
        self.delay_ms
    }

    pub fn target_key(&self) -> Option<Key> {
        self.target_key
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }
}

/// Check a release delay against the accepted range
pub fn validate_delay_ms(delay_ms: u64) -> Result<Duration, SettingsError> {
    if delay_ms > MAX_DELAY_MS {
        return Err(SettingsError::InvalidValue(format!(
            "Delay must be between 0 and {} ms, got {}",
            MAX_DELAY_MS, delay_ms
        )));
    }
    Ok(Duration::from_millis(delay_ms))
}
