//! `tgen check` – validate the config and show what a run would use.

use anyhow::Result;
use std::path::Path;
use tgen_core::config;
use tgen_core::limiter::mbps_to_bytes_per_sec;
use tgen_core::scheduler::MIN_ENDPOINTS;

pub fn run_check(config_path: &Path) -> Result<()> {
    let cfg = config::load(config_path)?;
    println!("Config: {}", config_path.display());
    for (i, url) in cfg.urls.iter().enumerate() {
        println!("  URL {}: {}", i + 1, url);
    }
    println!(
        "Speed: {:.1}-{:.1} Mbps ({}-{} B/s per transfer)",
        cfg.min_speed,
        cfg.max_speed,
        mbps_to_bytes_per_sec(cfg.min_speed),
        mbps_to_bytes_per_sec(cfg.max_speed)
    );
    println!("Concurrency: {}", cfg.max_concurrency);
    println!(
        "Interval: {}-{} s",
        cfg.min_interval_sec, cfg.max_interval_sec
    );
    println!("Traffic log: {}", cfg.log_file.display());
    if cfg.urls.len() < MIN_ENDPOINTS {
        anyhow::bail!(
            "{} endpoint(s) configured; at least {} are required",
            cfg.urls.len(),
            MIN_ENDPOINTS
        );
    }
    println!("OK");
    Ok(())
}
