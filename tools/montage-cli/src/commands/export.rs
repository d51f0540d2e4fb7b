//! Export a project to video.

use montage_common::config::EngineConfig;
use montage_render_engine::export::Compiler;
use montage_render_engine::{FfmpegEngine, MediaEngine};

use super::RenderArgs;

pub async fn run(render: RenderArgs, engine_config: EngineConfig) -> anyhow::Result<()> {
    println!("Exporting project at: {}", render.project.display());

    let (project, options) = render.load()?;
    let engine_config = render.engine_config(engine_config);

    let engine = FfmpegEngine::new(engine_config.binary.clone());
    if !engine.is_available() {
        anyhow::bail!(
            "No supported render engine found (expected {} in PATH)",
            engine_config.binary.display()
        );
    }

    println!("  Format: {:?}", options.format);
    println!("  Resolution: {}x{} @ {} fps", options.width, options.height, options.fps);
    println!("  Output dir: {}", engine_config.output_dir.display());

    let compiler = Compiler::new(engine_config);
    let output = compiler
        .export(&project, &options, &engine)
        .await
        .map_err(|e| anyhow::anyhow!("Export failed: {e}"))?;

    println!("\nExport complete: {}", output.path.display());
    println!("  Reference: {}", output.relative_url);
    Ok(())
}
