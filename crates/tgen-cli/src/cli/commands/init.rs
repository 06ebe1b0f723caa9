//! `tgen init` – write a default config file.

use anyhow::Result;
use std::path::Path;
use tgen_core::config;

pub fn run_init(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }
    config::load_or_init(config_path)?;
    println!("Wrote default config to {}", config_path.display());
    println!("Add at least two endpoints to `urls` before running.");
    Ok(())
}
