//! Print declared pipeline stages

use anyhow::{Context, Result};
use stagehand_core::config::{Config, JobConfig};

/// Run the plan command
pub async fn run(config_path: &str, job_filter: Option<&str>) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;

    let jobs = config.load_jobs().context("Failed to load jobs")?;
    let mut shown = 0;
    for job in &jobs {
        let JobConfig::Warehouse(job) = job else {
            continue;
        };
        if job_filter.is_some_and(|filter| filter != job.name) {
            continue;
        }

        let pipeline = job.resolved_pipeline();
        pipeline.validate()?;

        println!("Job: {}", job.name);
        println!(
            "Pipeline: {} (schedule: {}, catchup: {})",
            pipeline.id,
            pipeline.schedule.as_deref().unwrap_or("-"),
            pipeline.catchup
        );
        for (index, stage) in pipeline.execution_order()?.iter().enumerate() {
            let needs = if stage.depends_on.is_empty() {
                "-".to_string()
            } else {
                stage.depends_on.join(", ")
            };
            let siblings = pipeline.parallel_siblings(&stage.id);
            if siblings.is_empty() {
                println!("  {}. {}  [needs: {}]", index + 1, stage.id, needs);
            } else {
                println!(
                    "  {}. {}  [needs: {}]  [parallel with: {}]",
                    index + 1,
                    stage.id,
                    needs,
                    siblings.join(", ")
                );
            }
        }
        println!();
        shown += 1;
    }

    if shown == 0 {
        anyhow::bail!("no matching warehouse job found");
    }
    Ok(())
}
