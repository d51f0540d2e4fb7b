//! Export options.
//!
//! Output resolution is independent of the project canvas; the render
//! engine maps canvas coordinates onto it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::project::ProjectError;

/// Global settings for one export request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    /// Output resolution in pixels.
    pub width: u32,
    pub height: u32,

    /// Output frame rate.
    pub fps: u32,

    /// Used to name the output file.
    pub title: String,

    /// Output container.
    pub format: ExportFormat,

    /// Encoder name or alias (`h264`, `h265`, `prores`, or any engine codec).
    pub video_codec: String,

    /// Video bitrate in kbps (0 = encoder default).
    pub video_bitrate_kbps: u32,

    pub audio_codec: AudioCodec,

    /// Audio bitrate in kbps; ignored for PCM.
    pub audio_bitrate_kbps: u32,

    /// Audio sample rate in Hz.
    pub audio_sample_rate: u32,
}

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Mp4,
    Mov,
    Gif,
}

/// Output audio codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    #[default]
    Aac,
    Pcm,
}

impl ExportFormat {
    /// File extension for this container.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Gif => "gif",
        }
    }

    /// Whether the container carries audio.
    pub fn has_audio(self) -> bool {
        !matches!(self, Self::Gif)
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "mov" => Ok(Self::Mov),
            "gif" => Ok(Self::Gif),
            other => Err(format!("Unknown format: {other}. Use: mp4, mov, gif")),
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            title: "export".to_string(),
            format: ExportFormat::Mp4,
            video_codec: "libx264".to_string(),
            video_bitrate_kbps: 8000,
            audio_codec: AudioCodec::Aac,
            audio_bitrate_kbps: 192,
            audio_sample_rate: 48000,
        }
    }
}

impl ExportOptions {
    /// Load export options from a JSON file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Reject settings the engine cannot encode.
    pub fn validate(&self) -> Result<(), ProjectError> {
        if self.width == 0 || self.height == 0 {
            return Err(ProjectError::ValidationError {
                message: format!(
                    "export resolution must be non-empty (got {}x{})",
                    self.width, self.height
                ),
            });
        }
        if self.fps == 0 {
            return Err(ProjectError::ValidationError {
                message: "export fps must be positive".to_string(),
            });
        }
        Ok(())
    }
}
