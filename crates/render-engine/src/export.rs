//! Export compilation and job execution.

use std::path::PathBuf;

use montage_common::config::EngineConfig;
use montage_common::error::{MontageError, MontageResult};
use montage_project_model::export::ExportOptions;
use montage_project_model::project::Project;

use crate::engine::{FfmpegEngine, MediaEngine};
use crate::fast_path::{self, FastPathPlan};
use crate::geometry::GeometryMapper;
use crate::graph::{build_graph, CompositionGraph};
use crate::invocation::{EncoderInvocation, InvocationBuilder};
use crate::layers::{classify, LayerCounts, MediaRoots, SkippedClip, SourceResolver};

/// How an export will be rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanKind {
    /// One full-length video: trim and scale the source directly.
    FastPath(FastPathPlan),
    /// General multi-layer composition.
    Graph(CompositionGraph),
}

/// Compiled plan for one export.
#[derive(Debug, Clone)]
pub struct CompositionPlan {
    pub kind: PlanKind,
    /// Renderable layers per type.
    pub counts: LayerCounts,
    /// Clips left out, with reasons.
    pub skipped: Vec<SkippedClip>,
    /// Timeline length in seconds.
    pub duration: f64,
}

impl CompositionPlan {
    pub fn is_fast_path(&self) -> bool {
        matches!(self.kind, PlanKind::FastPath(_))
    }

    /// The composition graph, unless the fast path was chosen.
    pub fn graph(&self) -> Option<&CompositionGraph> {
        match &self.kind {
            PlanKind::Graph(graph) => Some(graph),
            PlanKind::FastPath(_) => None,
        }
    }
}

/// A finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutput {
    /// Absolute location of the produced file.
    pub path: PathBuf,
    /// Relative reference handed back to callers (`exports/title-1a2b3c4d.mp4`).
    pub relative_url: String,
}

/// Compiles projects into engine invocations and runs them.
pub struct Compiler {
    config: EngineConfig,
    resolver: Box<dyn SourceResolver + Send + Sync>,
    builder: InvocationBuilder,
}

impl Compiler {
    /// Compiler resolving sources against `config.media_roots`.
    pub fn new(config: EngineConfig) -> Self {
        let roots = MediaRoots::new(config.media_roots.clone());
        Self::with_resolver(config, roots)
    }

    /// Compiler with a custom source resolver.
    pub fn with_resolver(
        config: EngineConfig,
        resolver: impl SourceResolver + Send + Sync + 'static,
    ) -> Self {
        let builder = InvocationBuilder::new(&config);
        Self {
            config,
            resolver: Box::new(resolver),
            builder,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the composition plan. Pure: no files, no processes.
    pub fn compile(
        &self,
        project: &Project,
        options: &ExportOptions,
    ) -> MontageResult<CompositionPlan> {
        if project.width == 0 || project.height == 0 {
            return Err(MontageError::project(format!(
                "project canvas must be non-empty (got {}x{})",
                project.width, project.height
            )));
        }
        options
            .validate()
            .map_err(|e| MontageError::project(e.to_string()))?;

        let classified = classify(project, self.resolver.as_ref())?;
        let duration = project.duration();

        let kind = match fast_path::detect(&classified, duration) {
            Some(plan) => PlanKind::FastPath(plan),
            None => {
                let mapper =
                    GeometryMapper::new(project.width, project.height, options.width, options.height);
                PlanKind::Graph(build_graph(
                    &classified.layers,
                    &mapper,
                    options,
                    duration,
                    &project.background_color,
                    self.config.font_file.as_deref(),
                ))
            }
        };

        tracing::info!(
            project = %project.id,
            fast_path = matches!(kind, PlanKind::FastPath(_)),
            video_layers = classified.counts.video,
            image_layers = classified.counts.image,
            text_layers = classified.counts.text,
            skipped = classified.skipped.len(),
            duration_secs = duration,
            "Composition plan built"
        );

        Ok(CompositionPlan {
            kind,
            counts: classified.counts,
            skipped: classified.skipped,
            duration,
        })
    }

    /// Turn a plan into engine arguments. Writes the graph script for
    /// general-path plans.
    pub fn prepare(
        &self,
        plan: &CompositionPlan,
        options: &ExportOptions,
    ) -> MontageResult<EncoderInvocation> {
        if let Some(font) = &self.config.font_file {
            if plan.counts.text > 0 && !font.is_file() {
                return Err(MontageError::FileNotFound { path: font.clone() });
            }
        }
        match &plan.kind {
            PlanKind::FastPath(fast) => Ok(self.builder.fast_path(fast, options)),
            PlanKind::Graph(graph) => self.builder.general(graph, options),
        }
    }

    /// Compile, run the engine, and clean up temp resources on every path.
    pub async fn export<E: MediaEngine>(
        &self,
        project: &Project,
        options: &ExportOptions,
        engine: &E,
    ) -> MontageResult<ExportOutput> {
        tracing::info!(
            project = %project.id,
            format = ?options.format,
            width = options.width,
            height = options.height,
            "Starting export"
        );

        let plan = self.compile(project, options)?;

        std::fs::create_dir_all(&self.config.output_dir)?;
        let mut invocation = self.prepare(&plan, options)?;
        tracing::debug!(command = %invocation.command_line(), engine = engine.name(), "Invoking engine");

        let result = engine.run(&invocation).await;
        invocation.cleanup();
        if let Err(err) = result {
            tracing::warn!(error = %err, "Export failed");
            return Err(err);
        }
        if !invocation.output_path.is_file() {
            return Err(MontageError::render(format!(
                "{} reported success but wrote no file at {}",
                engine.name(),
                invocation.output_path.display()
            )));
        }

        let output = ExportOutput {
            relative_url: relative_url(&self.config.public_base, &invocation.file_name),
            path: invocation.output_path.clone(),
        };
        tracing::info!(output = %output.relative_url, "Export finished");
        Ok(output)
    }
}

fn relative_url(base: &str, file_name: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        file_name.to_string()
    } else {
        format!("{base}/{file_name}")
    }
}

/// Export `project` with ffmpeg, returning the relative output reference.
///
/// This is the main entry point for rendering.
pub async fn export_project(
    project: &Project,
    options: &ExportOptions,
    config: EngineConfig,
) -> MontageResult<String> {
    let engine = FfmpegEngine::new(config.binary.clone());
    if !engine.is_available() {
        return Err(MontageError::unsupported(format!(
            "No supported render engine found (expected {} in PATH)",
            config.binary.display()
        )));
    }
    let compiler = Compiler::new(config);
    let output = compiler.export(project, options, &engine).await?;
    Ok(output.relative_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_url_joins_base() {
        assert_eq!(relative_url("exports/", "a-1.mp4"), "exports/a-1.mp4");
        assert_eq!(relative_url("/media/out", "a-1.gif"), "/media/out/a-1.gif");
        assert_eq!(relative_url("", "a-1.mov"), "a-1.mov");
    }

    #[test]
    fn test_zero_canvas_is_rejected_before_classification() {
        let project = Project::new("Broken", 0, 1080);
        let compiler = Compiler::new(EngineConfig::default());
        let err = compiler
            .compile(&project, &ExportOptions::default())
            .unwrap_err();
        assert!(matches!(err, MontageError::Project { .. }));
    }

    #[test]
    fn test_empty_project_has_no_renderable_layers() {
        let project = Project::new("Empty", 1920, 1080);
        let compiler = Compiler::new(EngineConfig::default());
        let err = compiler
            .compile(&project, &ExportOptions::default())
            .unwrap_err();
        assert!(matches!(err, MontageError::NoRenderableLayers));
    }

    fn title_card() -> Project {
        use montage_project_model::project::{Asset, Clip, MediaKind, Track};

        let mut project = Project::new("Card", 1920, 1080);
        project.assets = vec![Asset {
            id: "t".to_string(),
            source: String::new(),
            kind: MediaKind::Text,
            text_meta: None,
        }];
        let mut params = serde_json::Map::new();
        params.insert("text".to_string(), serde_json::json!("Hello"));
        project.tracks = vec![Track {
            id: "track".to_string(),
            kind: MediaKind::Text,
            order: 0,
            hidden: false,
            clips: vec![Clip {
                id: "c".to_string(),
                track_id: "track".to_string(),
                asset_id: "t".to_string(),
                kind: MediaKind::Text,
                start: 0.0,
                end: 2.0,
                in_point: None,
                out_point: None,
                transform: None,
                params,
            }],
        }];
        project
    }

    fn scratch_config(name: &str) -> EngineConfig {
        let dir = std::env::temp_dir().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        EngineConfig {
            temp_dir: dir.clone(),
            output_dir: dir.join("out"),
            ..EngineConfig::default()
        }
    }

    /// Reports success without producing anything.
    struct SilentEngine;

    impl MediaEngine for SilentEngine {
        async fn run(&self, _invocation: &EncoderInvocation) -> MontageResult<()> {
            Ok(())
        }

        fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    #[test]
    fn test_missing_font_file_is_reported() {
        let mut config = scratch_config("montage_test_missing_font");
        config.font_file = Some(PathBuf::from("/nonexistent/montage/Inter.ttf"));
        let compiler = Compiler::new(config);
        let options = ExportOptions::default();

        let plan = compiler.compile(&title_card(), &options).unwrap();
        let err = compiler.prepare(&plan, &options).unwrap_err();
        match err {
            MontageError::FileNotFound { path } => {
                assert_eq!(path, PathBuf::from("/nonexistent/montage/Inter.ttf"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_engine_success_without_output_is_a_render_error() {
        let compiler = Compiler::new(scratch_config("montage_test_silent_engine"));
        let err = compiler
            .export(&title_card(), &ExportOptions::default(), &SilentEngine)
            .await
            .unwrap_err();
        assert!(matches!(err, MontageError::Render { .. }));
    }
}
