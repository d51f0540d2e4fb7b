//! Dry run: show how a project would be rendered.

use montage_common::config::EngineConfig;
use montage_render_engine::export::Compiler;
use montage_render_engine::script::render_graph;

use super::RenderArgs;

pub fn run(render: RenderArgs, engine_config: EngineConfig) -> anyhow::Result<()> {
    let (project, options) = render.load()?;
    let compiler = Compiler::new(render.engine_config(engine_config));
    let plan = compiler.compile(&project, &options)?;

    println!("Project: {} ({}x{})", project.name, project.width, project.height);
    println!("  Duration: {:.3}s", plan.duration);
    println!(
        "  Layers: {} video, {} image, {} text",
        plan.counts.video, plan.counts.image, plan.counts.text
    );
    for skipped in &plan.skipped {
        println!("  Skipped clip {}: {:?}", skipped.clip_id, skipped.reason);
    }

    match plan.graph() {
        None => println!("  Path: fast (single full-length video)"),
        Some(graph) => {
            println!("  Path: composition graph ({} inputs)", graph.inputs.len() + 1);
            println!("\nGraph script:");
            println!("{}", render_graph(graph));
        }
    }

    let mut invocation = compiler.prepare(&plan, &options)?;
    println!("\nCommand:");
    println!("{}", invocation.command_line());
    invocation.cleanup();
    Ok(())
}
