//! External composition engine.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use montage_common::error::{MontageError, MontageResult};

use crate::invocation::EncoderInvocation;

/// Something that can carry out an [`EncoderInvocation`].
pub trait MediaEngine: Send + Sync {
    /// Run the invocation to completion. No progress is streamed back.
    fn run(&self, invocation: &EncoderInvocation) -> impl Future<Output = MontageResult<()>> + Send;

    /// Check if this engine is available on the system.
    fn is_available(&self) -> bool;

    /// Engine name.
    fn name(&self) -> &str;
}

/// Runs invocations through the ffmpeg command-line tool.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    binary: PathBuf,
}

impl FfmpegEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl MediaEngine for FfmpegEngine {
    async fn run(&self, invocation: &EncoderInvocation) -> MontageResult<()> {
        tracing::debug!(command = %invocation.command_line(), "Running ffmpeg");
        let started = std::time::Instant::now();

        let output = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                MontageError::encoder(format!(
                    "Failed to start {}: {e}",
                    invocation.program.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MontageError::encoder(format!(
                "ffmpeg export failed (status {}): {}",
                output.status,
                stderr.trim()
            )));
        }

        tracing::info!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            output = %invocation.output_path.display(),
            "ffmpeg finished"
        );
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

fn command_exists(binary: &Path) -> bool {
    if binary.components().count() > 1 && !binary.is_file() {
        return false;
    }
    Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
