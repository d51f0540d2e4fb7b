//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MontageError, MontageResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Engine location and working directories used by exports.
    pub engine: EngineConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Where the composition engine lives and where exports read and write.
///
/// Passed explicitly into the compiler so independent instances can run
/// side by side with different settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine binary (name resolved through `PATH`, or an absolute path).
    pub binary: PathBuf,

    /// Directory for per-export graph scripts.
    pub temp_dir: PathBuf,

    /// Directory finished exports are written into.
    pub output_dir: PathBuf,

    /// Prefix of the relative reference returned for a finished export.
    pub public_base: String,

    /// Local directories whose files the engine may read directly.
    pub media_roots: Vec<PathBuf>,

    /// Font used by text layers. The engine default applies when unset.
    pub font_file: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "montage=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let data = data_dir();
        Self {
            binary: PathBuf::from("ffmpeg"),
            temp_dir: std::env::temp_dir(),
            output_dir: data.join("exports"),
            public_base: "exports".to_string(),
            media_roots: vec![data.join("media")],
            font_file: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path()).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Using default configuration");
            Self::default()
        })
    }

    /// Load config from `path`. A missing file yields the defaults; a file
    /// that cannot be read or parsed is a [`MontageError::Config`].
    pub fn load_from(path: &Path) -> MontageResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            MontageError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| MontageError::config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<PathBuf, std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&config_path, json)?;
        Ok(config_path)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("montage").join("config.json")
}

/// Default data directory holding media and exports.
fn data_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("montage")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults_point_at_ffmpeg() {
        let config = EngineConfig::default();
        assert_eq!(config.binary, PathBuf::from("ffmpeg"));
        assert_eq!(config.public_base, "exports");
        assert_eq!(config.media_roots.len(), 1);
        assert!(config.font_file.is_none());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{"engine": {"binary": "/opt/ffmpeg/bin/ffmpeg"}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.engine.binary, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.engine.public_base, "exports");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_reports_invalid_config() {
        let dir = std::env::temp_dir().join("montage_test_config_invalid");
        std::fs::create_dir_all(&dir).unwrap();

        let missing = AppConfig::load_from(&dir.join("absent.json")).unwrap();
        assert_eq!(missing.engine.binary, PathBuf::from("ffmpeg"));

        let broken = dir.join("config.json");
        std::fs::write(&broken, "{ \"engine\": ").unwrap();
        let err = AppConfig::load_from(&broken).unwrap_err();
        assert!(matches!(err, MontageError::Config { .. }));
        assert!(err.to_string().contains("cannot parse"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
