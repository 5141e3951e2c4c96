//! Validate configuration command

use anyhow::{Context, Result};
use stagehand_core::config::{Config, JobConfig};

/// Run the validate command
pub async fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating configuration: {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;

    tracing::info!("✓ Project: {}", config.project.name);
    tracing::info!("✓ Version: {}", config.project.version);
    tracing::info!("✓ Runtime mode: {:?}", config.project.runtime.mode);

    let jobs = config.load_jobs().context("Failed to load jobs")?;
    for job in &jobs {
        match job {
            JobConfig::Warehouse(job) => {
                config.load_connector_config(&job.source)?;
                config.load_connector_config(&job.destination)?;
                let pipeline = job.resolved_pipeline();
                pipeline.validate()?;
                // Every transform stage needs a policy to run
                let policies = job.resolved_policies();
                for stage in &pipeline.stages {
                    if let Some(table) = stage.id.strip_prefix("transform_") {
                        if !policies.iter().any(|p| p.table == table) {
                            anyhow::bail!(
                                "job '{}' has no stage policy for table '{}'",
                                job.name,
                                table
                            );
                        }
                    }
                }
                tracing::info!("✓ Warehouse job: {}", job.name);
            }
            JobConfig::Extract(job) => {
                config.load_connector_config(&job.source)?;
                config.load_connector_config(&job.destination)?;
                if job.tables.is_empty() {
                    anyhow::bail!("job '{}' lists no tables", job.name);
                }
                tracing::info!("✓ Extract job: {}", job.name);
            }
            JobConfig::Feed(job) => {
                config.load_connector_config(&job.source)?;
                config.load_connector_config(&job.destination)?;
                tracing::info!("✓ Feed job: {}", job.name);
            }
        }
    }
    tracing::info!("✓ {} job(s)", jobs.len());

    tracing::info!("✓ Configuration is valid");
    Ok(())
}
