//! Batch job execution
//!
//! [`BatchRuntime`] drives the warehouse path: extract raw tables into the
//! `src_` layer, stage them into `stg_`, and merge the staged tables into a
//! `prd_` reporting model, following the job's pipeline declaration in
//! topological order. The feed path validates a downloaded batch and
//! appends it, downgrading only a duplicate-key violation to a non-fatal
//! outcome.

use std::collections::HashMap;

use chrono::{DateTime, Days, NaiveDate, Utc};

use stagehand_core::config::WarehouseJob;
use stagehand_core::connectors::{
    DestinationConnector, SourceConnector, WriteMode, model_table_name, raw_table_name,
    staged_table_name,
};
use stagehand_core::error::Error;
use stagehand_core::feed::{self, PlayedTrack, Verdict};
use stagehand_core::model::ModelSpec;
use stagehand_core::stage::StagePolicy;

use crate::error::Result;
use crate::http::FeedClient;

/// How extraction reacts to a per-table failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractPolicy {
    /// Log the failure and keep extracting the remaining tables
    Continue,
    /// Abort the whole job on the first failure
    Abort,
}

/// Outcome of a feed job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Batch validated and appended
    Loaded(u64),
    /// Empty batch, nothing to load
    Skipped,
    /// Duplicate key on append; the batch was already loaded
    AlreadyLoaded,
}

/// Runs warehouse jobs against a source and destination pair
pub struct BatchRuntime<'a> {
    source: &'a dyn SourceConnector,
    destination: &'a mut dyn DestinationConnector,
}

impl<'a> BatchRuntime<'a> {
    /// Create a runtime over the given connectors
    pub fn new(
        source: &'a dyn SourceConnector,
        destination: &'a mut dyn DestinationConnector,
    ) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Extract the named tables into the raw (`src_`) layer, full-replace.
    ///
    /// Returns the names that loaded. With [`ExtractPolicy::Continue`] a
    /// per-table failure is logged and the rest still load; with
    /// [`ExtractPolicy::Abort`] the first failure fails the job.
    pub async fn extract_raw(
        &mut self,
        tables: &[String],
        policy: ExtractPolicy,
    ) -> Result<Vec<String>> {
        let names = self.source.table_names(tables).await?;
        let mut loaded = Vec::with_capacity(names.len());
        for name in names {
            match self.copy_table(&name).await {
                Ok(rows) => {
                    tracing::info!("imported {} rows for table {}", rows, name);
                    loaded.push(name);
                }
                Err(e) => match policy {
                    ExtractPolicy::Abort => return Err(e.into()),
                    ExtractPolicy::Continue => {
                        tracing::error!("data extraction error for table {}: {}", name, e);
                    }
                },
            }
        }
        Ok(loaded)
    }

    async fn copy_table(&mut self, name: &str) -> stagehand_core::Result<u64> {
        let table = self.source.fetch_table(name).await?;
        tracing::info!(
            "importing rows 0 to {} for table {}",
            table.row_count(),
            name
        );
        self.destination
            .write_table(&raw_table_name(name), &table, WriteMode::Replace)
            .await
    }

    /// Stage one raw table: read `src_`, apply the policy, write `stg_`.
    pub async fn stage_table(&mut self, policy: &StagePolicy) -> Result<u64> {
        let raw = self
            .destination
            .read_table(&raw_table_name(&policy.table))
            .await?;
        let staged = policy.apply(&raw)?;
        let name = staged_table_name(&policy.table);
        let rows = self
            .destination
            .write_table(&name, &staged, WriteMode::Replace)
            .await?;
        tracing::info!("staged {} rows into {}", rows, name);
        Ok(rows)
    }

    /// Build the reporting model from the staged tables and write `prd_`.
    pub async fn build_model(&mut self, spec: &ModelSpec) -> Result<u64> {
        let mut staged = HashMap::new();
        for input in spec.inputs() {
            let table = self
                .destination
                .read_table(&staged_table_name(input))
                .await?;
            staged.insert(input.to_string(), table);
        }
        let model = spec.build(&staged)?;
        let name = model_table_name(&spec.name);
        let rows = self
            .destination
            .write_table(&name, &model, WriteMode::Replace)
            .await?;
        tracing::info!("built model {} with {} rows", name, rows);
        Ok(rows)
    }

    /// Run a warehouse job end to end, following its pipeline declaration.
    ///
    /// Stage ids map onto the engine's operations: `extract_load` extracts
    /// every job table, `transform_<Table>` applies that table's stage
    /// policy, and `load_model` builds the reporting model. Any failure
    /// aborts the run.
    pub async fn run_warehouse(&mut self, job: &WarehouseJob) -> Result<()> {
        let pipeline = job.resolved_pipeline();
        pipeline.validate()?;
        let policies = job.resolved_policies();
        let model = job.resolved_model();

        for stage in pipeline.execution_order()? {
            tracing::info!("running stage {}", stage.id);
            if stage.id == "extract_load" {
                self.extract_raw(&job.resolved_tables(), ExtractPolicy::Abort)
                    .await?;
            } else if let Some(table) = stage.id.strip_prefix("transform_") {
                let policy = policies
                    .iter()
                    .find(|p| p.table == table)
                    .ok_or_else(|| Error::ConfigInvalid {
                        message: format!("no stage policy for table '{}'", table),
                    })?;
                self.stage_table(policy).await?;
            } else if stage.id == "load_model" {
                self.build_model(&model).await?;
            } else {
                anyhow::bail!(
                    "pipeline '{}' declares unknown stage id '{}'",
                    pipeline.id,
                    stage.id
                );
            }
        }
        tracing::info!("job {} finished", job.name);
        Ok(())
    }
}

/// Unix-millisecond cutoff for the feed request: one day before `now`.
pub fn feed_cutoff_ms(now: DateTime<Utc>) -> i64 {
    (now - Days::new(1)).timestamp_millis()
}

/// Validate a feed batch and append it to `table`.
///
/// An empty batch skips cleanly. A duplicate key on append means the batch
/// was already loaded and is reported as a non-fatal outcome; every other
/// error, including validation failures, aborts the job.
pub async fn load_feed_batch(
    destination: &mut dyn DestinationConnector,
    table: &str,
    batch: &[PlayedTrack],
    run_date: NaiveDate,
) -> Result<FeedOutcome> {
    match feed::validate(batch, run_date)? {
        Verdict::Skip => return Ok(FeedOutcome::Skipped),
        Verdict::Load => {
            tracing::info!("batch validated, proceeding to load");
        }
    }

    destination
        .ensure_table(
            table,
            &feed::feed_table_schema(),
            Some(feed::FEED_PRIMARY_KEY),
        )
        .await?;
    let data = feed::to_table(table, batch);
    match destination
        .write_table(table, &data, WriteMode::Append)
        .await
    {
        Ok(rows) => {
            tracing::info!("loaded {} tracks into {}", rows, table);
            Ok(FeedOutcome::Loaded(rows))
        }
        Err(Error::Constraint { .. }) => {
            tracing::warn!("data already exists in table {}", table);
            Ok(FeedOutcome::AlreadyLoaded)
        }
        Err(e) => Err(e.into()),
    }
}

/// Run a feed job: fetch everything played since yesterday, validate, and
/// append.
pub async fn run_feed(
    client: &FeedClient,
    destination: &mut dyn DestinationConnector,
    table: &str,
    now: DateTime<Utc>,
) -> Result<FeedOutcome> {
    let batch = client.recently_played(feed_cutoff_ms(now)).await?;
    tracing::info!("downloaded {} tracks from the feed", batch.len());
    load_feed_batch(destination, table, &batch, now.date_naive()).await
}
