use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::error::AppError;

pub const CONFIG_PATH_ENV: &str = "ADB_MANAGER_CONFIG_PATH";
const CONFIG_DIR_NAME: &str = "adb-manager";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdbSettings {
    pub command_path: String,
    pub command_timeout_secs: u64,
    pub install_timeout_secs: u64,
}

impl Default for AdbSettings {
    fn default() -> Self {
        Self {
            command_path: String::new(),
            command_timeout_secs: 30,
            install_timeout_secs: 180,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeviceSettings {
    /// Abort the refresh when `adb devices` lists no ready device.
    pub require_connected_device: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogSettings {
    pub enabled: bool,
    pub language: String,
    pub country: String,
    pub request_timeout_secs: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            language: "en".to_string(),
            country: "us".to_string(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IconSettings {
    pub placeholder_path: String,
    pub size_px: u32,
    pub preferred_fonts: Vec<String>,
}

impl Default for IconSettings {
    fn default() -> Self {
        Self {
            placeholder_path: String::new(),
            size_px: 64,
            preferred_fonts: default_font_candidates(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ApkInstallSettings {
    pub replace_existing: bool,
    pub allow_downgrade: bool,
    pub grant_permissions: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    pub log_level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub adb: AdbSettings,
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub icons: IconSettings,
    #[serde(default)]
    pub apk_install: ApkInstallSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            adb: AdbSettings::default(),
            device: DeviceSettings::default(),
            catalog: CatalogSettings::default(),
            icons: IconSettings::default(),
            apk_install: ApkInstallSettings::default(),
            logging: LoggingSettings::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn default_font_candidates() -> Vec<String> {
    [
        "C:\\Windows\\Fonts\\arial.ttf",
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/Library/Fonts/Arial.ttf",
        "/usr/share/fonts/truetype/msttcorefonts/Arial.ttf",
        "/usr/share/fonts/TTF/arial.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
    ]
    .iter()
    .map(|path| path.to_string())
    .collect()
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

pub fn load_or_init_config(trace_id: &str) -> Result<AppConfig, AppError> {
    let path = config_path();
    if path.exists() {
        return load_config_from_path(&path, trace_id);
    }
    let config = AppConfig::default();
    save_config_to_path(&config, &path, trace_id)?;
    Ok(config)
}

pub fn load_config_from_path(path: &Path, trace_id: &str) -> Result<AppConfig, AppError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| AppError::system(format!("Failed to read config: {err}"), trace_id))?;
    let config: AppConfig = serde_json::from_str(&raw)
        .map_err(|err| AppError::system(format!("Failed to parse config: {err}"), trace_id))?;
    Ok(validate_config(config))
}

pub fn save_config_to_path(
    config: &AppConfig,
    path: &Path,
    trace_id: &str,
) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let payload = serde_json::to_string_pretty(config)
        .map_err(|err| AppError::system(format!("Failed to serialize config: {err}"), trace_id))?;
    fs::write(path, payload)
        .map_err(|err| AppError::system(format!("Failed to write config: {err}"), trace_id))?;
    Ok(())
}

fn validate_config(mut config: AppConfig) -> AppConfig {
    let defaults = AppConfig::default();
    if config.adb.command_timeout_secs == 0 {
        config.adb.command_timeout_secs = defaults.adb.command_timeout_secs;
    }
    if config.adb.install_timeout_secs == 0 {
        config.adb.install_timeout_secs = defaults.adb.install_timeout_secs;
    }
    if config.catalog.request_timeout_secs == 0 {
        config.catalog.request_timeout_secs = defaults.catalog.request_timeout_secs;
    }
    if config.catalog.language.trim().is_empty() {
        config.catalog.language = defaults.catalog.language;
    }
    if config.catalog.country.trim().is_empty() {
        config.catalog.country = defaults.catalog.country;
    }
    if !(16..=256).contains(&config.icons.size_px) {
        config.icons.size_px = defaults.icons.size_px;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{ "adb": { "command_path": "/opt/adb", "command_timeout_secs": 5, "install_timeout_secs": 60 } }"#)
            .expect("write");

        let config = load_config_from_path(&path, "trace-cfg").expect("load");
        assert_eq!(config.adb.command_path, "/opt/adb");
        assert_eq!(config.adb.command_timeout_secs, 5);
        assert_eq!(config.catalog, CatalogSettings::default());
        assert!(!config.device.require_connected_device);
        assert_eq!(config.icons.size_px, 64);
    }

    #[test]
    fn clamps_invalid_values() {
        let mut config = AppConfig::default();
        config.adb.command_timeout_secs = 0;
        config.catalog.language = " ".to_string();
        config.icons.size_px = 4096;
        let validated = validate_config(config);
        assert_eq!(validated.adb.command_timeout_secs, 30);
        assert_eq!(validated.catalog.language, "en");
        assert_eq!(validated.icons.size_px, 64);
    }

    #[test]
    fn rejects_malformed_json() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("config.json");
        fs::write(&path, "{ not json").expect("write");
        let err = load_config_from_path(&path, "trace-bad").expect_err("should fail");
        assert_eq!(err.code, "ERR_SYSTEM");
        assert_eq!(err.trace_id, "trace-bad");
    }

    #[test]
    fn saved_config_round_trips_through_disk() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join("nested").join("config.json");
        let mut config = AppConfig::default();
        config.device.require_connected_device = true;
        save_config_to_path(&config, &path, "trace-save").expect("save");
        let loaded = load_config_from_path(&path, "trace-save").expect("load");
        assert_eq!(loaded, config);
    }
}
