//! Run warehouse pipeline jobs

use anyhow::{Context, Result};
use stagehand_core::config::{Config, JobConfig};
use stagehand_runtime::BatchRuntime;

use crate::credentials::EnvCredentials;
use crate::factory;

/// Run the run command
pub async fn run(config_path: &str, job_filter: Option<&str>) -> Result<()> {
    tracing::info!("Loading configuration from {}", config_path);
    let config = Config::load(config_path).context("Failed to load configuration")?;
    tracing::info!("Project: {}", config.project.name);

    let jobs = config.load_jobs().context("Failed to load jobs")?;
    let mut ran = 0;
    for job in &jobs {
        let JobConfig::Warehouse(job) = job else {
            continue;
        };
        if job_filter.is_some_and(|filter| filter != job.name) {
            continue;
        }

        tracing::info!("Running warehouse job {}", job.name);
        let credentials = EnvCredentials;
        let source = factory::open_source(&config, &job.source, &credentials).await?;
        let mut destination =
            factory::open_destination(&config, &job.destination, &credentials).await?;
        BatchRuntime::new(source.as_ref(), destination.connector())
            .run_warehouse(job)
            .await
            .with_context(|| format!("Job '{}' failed", job.name))?;
        ran += 1;
    }

    if ran == 0 {
        anyhow::bail!("no matching warehouse job found");
    }
    tracing::info!("{} job(s) completed", ran);
    Ok(())
}
