//! Run API feed jobs

use anyhow::{Context, Result};
use chrono::Utc;
use stagehand_core::config::{Config, JobConfig};
use stagehand_runtime::{FeedOutcome, run_feed};

use crate::credentials::EnvCredentials;
use crate::factory;

/// Run the feed command
pub async fn run(config_path: &str, job_filter: Option<&str>) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;

    let jobs = config.load_jobs().context("Failed to load jobs")?;
    let mut ran = 0;
    for job in &jobs {
        let JobConfig::Feed(job) = job else {
            continue;
        };
        if job_filter.is_some_and(|filter| filter != job.name) {
            continue;
        }

        tracing::info!("Running feed job {}", job.name);
        let credentials = EnvCredentials;
        let client = factory::open_feed(&config, &job.source, &credentials)?;
        let mut destination =
            factory::open_destination(&config, &job.destination, &credentials).await?;
        let outcome = run_feed(&client, destination.connector(), &job.table, Utc::now())
            .await
            .with_context(|| format!("Job '{}' failed", job.name))?;
        match outcome {
            FeedOutcome::Loaded(rows) => {
                tracing::info!("Job {} loaded {} tracks", job.name, rows);
            }
            FeedOutcome::Skipped => {
                tracing::info!("Job {} had nothing to load", job.name);
            }
            FeedOutcome::AlreadyLoaded => {
                tracing::info!("Job {} found its batch already loaded", job.name);
            }
        }
        ran += 1;
    }

    if ran == 0 {
        anyhow::bail!("no matching feed job found");
    }
    Ok(())
}
