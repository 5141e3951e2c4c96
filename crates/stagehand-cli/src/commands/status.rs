//! Show project status command

use anyhow::{Context, Result};
use stagehand_core::config::{Config, JobConfig};

/// Run the status command
pub async fn run(config_path: &str) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;

    println!("Project: {} v{}", config.project.name, config.project.version);
    println!("Runtime mode: {:?}", config.project.runtime.mode);

    let jobs = config.load_jobs().context("Failed to load jobs")?;
    let warehouse = jobs
        .iter()
        .filter(|j| matches!(j, JobConfig::Warehouse(_)))
        .count();
    let extract = jobs
        .iter()
        .filter(|j| matches!(j, JobConfig::Extract(_)))
        .count();
    let feed = jobs.iter().filter(|j| matches!(j, JobConfig::Feed(_))).count();
    println!(
        "Jobs: {} ({} warehouse, {} extract, {} feed)",
        jobs.len(),
        warehouse,
        extract,
        feed
    );

    let data_dir = config
        .base_path
        .join(&config.project.runtime.local.data_dir);
    if data_dir.exists() {
        println!("Local database: initialized at {}", data_dir.display());
    } else {
        println!("Local database: not initialized");
    }

    Ok(())
}
