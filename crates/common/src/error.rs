//! Error types shared across Montage crates.

use std::path::PathBuf;

/// Top-level error type for Montage operations.
#[derive(Debug, thiserror::Error)]
pub enum MontageError {
    /// Classification left nothing the engine could draw.
    #[error("No renderable layers: every clip was skipped")]
    NoRenderableLayers,

    /// The external engine exited unsuccessfully or could not be started.
    #[error("Encoder invocation failed: {message}")]
    EncoderInvocation { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Project error: {message}")]
    Project { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using MontageError.
pub type MontageResult<T> = Result<T, MontageError>;

impl MontageError {
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::EncoderInvocation {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_error_carries_engine_message() {
        let err = MontageError::encoder("ffmpeg exited with status 1: Invalid argument");
        assert_eq!(
            err.to_string(),
            "Encoder invocation failed: ffmpeg exited with status 1: Invalid argument"
        );
    }

    #[test]
    fn test_io_error_converts_transparently() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MontageError = io.into();
        assert!(matches!(err, MontageError::Io(_)));
        assert_eq!(err.to_string(), "missing");
    }
}
