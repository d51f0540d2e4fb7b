//! Montage CLI: plan and export timeline compositions with ffmpeg.
//!
//! Usage:
//!   montage export <PROJECT>   Render a project to a video or GIF
//!   montage plan <PROJECT>     Show the composition plan without rendering
//!   montage check              Check engine availability and configuration
//!   montage config             Show (or write) the effective configuration

use clap::{Parser, Subcommand};

mod commands;

use commands::RenderArgs;

#[derive(Parser)]
#[command(
    name = "montage",
    about = "Compile multi-track timelines into ffmpeg exports",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a project to a video file
    Export {
        #[command(flatten)]
        render: RenderArgs,
    },

    /// Print the composition plan, graph script and engine command
    Plan {
        #[command(flatten)]
        render: RenderArgs,
    },

    /// Check engine availability and configured paths
    Check,

    /// Print the effective configuration
    Config {
        /// Write the configuration file to its standard location
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = montage_common::config::AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    montage_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Export { render } => commands::export::run(render, config.engine).await,
        Commands::Plan { render } => commands::plan::run(render, config.engine),
        Commands::Check => commands::check::run(&config.engine),
        Commands::Config { write } => commands::config::run(&config, write),
    }
}
