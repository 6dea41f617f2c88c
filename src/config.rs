//! Application configuration.
//!
//! Stored as JSON in the user's config directory:
//! - Linux: ~/.config/acer-sense/config.json
//!
//! A missing file yields the defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::device::{DeviceOptions, DeviceProfile};
use crate::error::{Result, SenseError};
use crate::firmware::AcpiPaths;

// =============================================================================
// Config Path
// =============================================================================

pub const APP_NAME: &str = "acer-sense";
const CONFIG_FILE: &str = "config.json";

/// Get the configuration directory path.
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join(APP_NAME))
        .ok_or_else(|| SenseError::Config("Could not find config directory".into()))
}

/// Get the full path to the config file.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

// =============================================================================
// Config Structure
// =============================================================================

/// Main configuration file structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Device preset name, see [`DeviceProfile::from_model`].
    #[serde(default = "default_model")]
    pub model: String,

    /// Mode key cycles through all profiles instead of toggling turbo.
    #[serde(default = "default_cycle_profiles")]
    pub cycle_profiles: bool,

    /// Directory for persisted power and keyboard state.
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// off, error, warn, info, debug or trace
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// ACPI method paths for the `/proc/acpi/call` transport.
    #[serde(default)]
    pub acpi: AcpiPaths,
}

fn default_model() -> String {
    "phn16-72".to_string()
}

fn default_cycle_profiles() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            cycle_profiles: default_cycle_profiles(),
            state_dir: None,
            log_level: default_log_level(),
            acpi: AcpiPaths::default(),
        }
    }
}

impl AppConfig {
    /// Directory for persisted state blobs.
    ///
    /// Falls back to the platform state (or local data) directory.
    pub fn state_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.state_dir {
            return Ok(dir.clone());
        }
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .map(|p| p.join(APP_NAME))
            .ok_or_else(|| SenseError::Config("Could not find state directory".into()))
    }

    pub fn device_profile(&self) -> Result<DeviceProfile> {
        DeviceProfile::from_model(&self.model)
    }

    pub fn device_options(&self) -> DeviceOptions {
        DeviceOptions {
            cycle_profiles: self.cycle_profiles,
            ..DeviceOptions::default()
        }
    }

    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| SenseError::Config(format!("Unknown log level '{}'", self.log_level)))
    }
}

// =============================================================================
// Load / Save
// =============================================================================

/// Load configuration from the default location.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path()?)
}

/// Load configuration from `path`, or the defaults if it does not exist.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| SenseError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

    serde_json::from_str(&content)
        .map_err(|e| SenseError::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Save configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<PathBuf> {
    let path = config_path()?;
    save_config_to(config, &path)?;
    Ok(path)
}

/// Save configuration to `path`, creating its directory.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .map_err(|e| SenseError::Config(format!("Failed to create config dir: {}", e)))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| SenseError::Config(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path, content)
        .map_err(|e| SenseError::Config(format!("Failed to write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.cycle_profiles);
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Info);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "model": "nitro-v4", "cycle_profiles": false }"#).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.model, "nitro-v4");
        assert!(!config.device_options().cycle_profiles);
        assert_eq!(config.acpi, AcpiPaths::default());
        assert!(config.device_profile().unwrap().nitro_v4);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = AppConfig {
            state_dir: Some(dir.path().join("state")),
            log_level: "debug".to_string(),
            ..AppConfig::default()
        };

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.state_dir().unwrap(), dir.path().join("state"));
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_config_from(&path),
            Err(SenseError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_log_level() {
        let config = AppConfig {
            log_level: "chatty".to_string(),
            ..AppConfig::default()
        };
        assert!(config.level_filter().is_err());
    }
}
