//! Run discovery-then-load extract jobs

use anyhow::{Context, Result};
use stagehand_core::config::{Config, JobConfig};
use stagehand_runtime::{BatchRuntime, ExtractPolicy};

use crate::credentials::EnvCredentials;
use crate::factory;

/// Run the extract command.
///
/// Unlike a pipeline run, a failure on one table does not abort the rest:
/// every reachable table still loads.
pub async fn run(config_path: &str, job_filter: Option<&str>) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;

    let jobs = config.load_jobs().context("Failed to load jobs")?;
    let mut ran = 0;
    for job in &jobs {
        let JobConfig::Extract(job) = job else {
            continue;
        };
        if job_filter.is_some_and(|filter| filter != job.name) {
            continue;
        }

        tracing::info!("Running extract job {}", job.name);
        let credentials = EnvCredentials;
        let source = factory::open_source(&config, &job.source, &credentials).await?;
        let mut destination =
            factory::open_destination(&config, &job.destination, &credentials).await?;
        let loaded = BatchRuntime::new(source.as_ref(), destination.connector())
            .extract_raw(&job.tables, ExtractPolicy::Continue)
            .await
            .with_context(|| format!("Job '{}' failed", job.name))?;
        tracing::info!(
            "Job {} imported {} of {} tables",
            job.name,
            loaded.len(),
            job.tables.len()
        );
        ran += 1;
    }

    if ran == 0 {
        anyhow::bail!("no matching extract job found");
    }
    Ok(())
}
