pub mod check;
pub mod config;
pub mod export;
pub mod plan;

use std::path::PathBuf;

use clap::Args;
use montage_common::config::EngineConfig;
use montage_project_model::export::{ExportFormat, ExportOptions};
use montage_project_model::project::Project;

/// Inputs shared by `export` and `plan`.
#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Path to the project JSON document
    pub project: PathBuf,

    /// Export options JSON document
    #[arg(short, long)]
    pub options: Option<PathBuf>,

    /// Output width
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height
    #[arg(long)]
    pub height: Option<u32>,

    /// Output frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Output format: mp4, mov or gif
    #[arg(long)]
    pub format: Option<ExportFormat>,

    /// Title used for the output file name
    #[arg(long)]
    pub title: Option<String>,

    /// Directory receiving the export
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl RenderArgs {
    /// Load the project and options, applying command-line overrides.
    pub fn load(&self) -> anyhow::Result<(Project, ExportOptions)> {
        let project = Project::load(&self.project)
            .map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

        let mut options = match &self.options {
            Some(path) => ExportOptions::load(path)
                .map_err(|e| anyhow::anyhow!("Failed to load export options: {e}"))?,
            None => ExportOptions::default(),
        };
        self.apply(&mut options);

        if let Err(e) = project.validate() {
            tracing::warn!(error = %e, "Project has validation issues");
        }
        Ok((project, options))
    }

    fn apply(&self, options: &mut ExportOptions) {
        if let Some(width) = self.width {
            options.width = width;
        }
        if let Some(height) = self.height {
            options.height = height;
        }
        if let Some(fps) = self.fps {
            options.fps = fps;
        }
        if let Some(format) = self.format {
            options.format = format;
        }
        if let Some(title) = &self.title {
            options.title = title.clone();
        }
    }

    /// Engine configuration with the output directory override applied.
    pub fn engine_config(&self, mut engine: EngineConfig) -> EngineConfig {
        if let Some(dir) = &self.output_dir {
            engine.output_dir = dir.clone();
        }
        engine
    }
}
