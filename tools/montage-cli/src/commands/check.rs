//! Check engine availability and configured paths.

use montage_common::config::{config_file_path, AppConfig, EngineConfig};
use montage_render_engine::{FfmpegEngine, MediaEngine};

pub fn run(engine_config: &EngineConfig) -> anyhow::Result<()> {
    println!("Montage System Check");
    println!("{}", "=".repeat(50));

    let config_path = config_file_path();
    match AppConfig::load_from(&config_path) {
        Ok(_) if config_path.exists() => println!("[OK] Config: {}", config_path.display()),
        Ok(_) => println!("[OK] Config: defaults ({} not present)", config_path.display()),
        Err(e) => println!("[WARN] {e}"),
    }

    let engine = FfmpegEngine::new(engine_config.binary.clone());
    let engine_ok = engine.is_available();
    if engine_ok {
        println!("[OK] Engine: {}", engine_config.binary.display());
    } else {
        println!("[FAIL] Engine not found: {}", engine_config.binary.display());
    }

    report_dir("Temp dir", &engine_config.temp_dir);
    report_dir("Output dir", &engine_config.output_dir);
    for root in &engine_config.media_roots {
        report_dir("Media root", root);
    }
    match &engine_config.font_file {
        Some(font) if font.is_file() => println!("[OK] Font file: {}", font.display()),
        Some(font) => println!("[WARN] Font file missing: {}", font.display()),
        None => println!("[OK] Font file: engine default"),
    }

    println!();
    if engine_ok {
        println!("Montage is ready to export.");
    } else {
        println!("Install ffmpeg or set engine.binary in the config file.");
    }
    Ok(())
}

fn report_dir(label: &str, path: &std::path::Path) {
    if path.is_dir() {
        println!("[OK] {label}: {}", path.display());
    } else {
        println!("[WARN] {label} does not exist yet: {}", path.display());
    }
}
