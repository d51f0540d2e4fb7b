//! Show or write the effective configuration.

use montage_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, write: bool) -> anyhow::Result<()> {
    println!("# {}", config_file_path().display());
    println!("{}", serde_json::to_string_pretty(config)?);

    if write {
        let path = config.save()?;
        println!("\nWrote {}", path.display());
    }
    Ok(())
}
