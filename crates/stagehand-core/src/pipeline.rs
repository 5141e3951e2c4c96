//! Pipeline declarations
//!
//! A [`PipelineSpec`] is the directed-acyclic list of stage descriptors a
//! job declares to an external scheduler: stage ids, dependencies, a
//! schedule string, and a catchup flag. Scheduling, retries, and backfill
//! belong to that engine; the core only validates the declaration and
//! derives a sequential execution order for its own single-threaded runs.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One schedulable stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDescriptor {
    /// Stage id, unique within the pipeline
    pub id: String,

    /// Ids of stages that must complete first
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// A declared pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Pipeline id
    pub id: String,

    /// Cron-style schedule for the external scheduler
    #[serde(default)]
    pub schedule: Option<String>,

    /// Whether the external scheduler should backfill missed runs
    #[serde(default)]
    pub catchup: bool,

    /// Stage descriptors
    pub stages: Vec<StageDescriptor>,
}

impl PipelineSpec {
    /// Check ids are unique, dependencies exist, and the graph is acyclic.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.id.as_str()) {
                return Err(Error::InvalidPipeline {
                    pipeline: self.id.clone(),
                    message: format!("duplicate stage id '{}'", stage.id),
                });
            }
        }
        for stage in &self.stages {
            for dep in &stage.depends_on {
                if !seen.contains(dep.as_str()) {
                    return Err(Error::InvalidPipeline {
                        pipeline: self.id.clone(),
                        message: format!("stage '{}' depends on unknown '{}'", stage.id, dep),
                    });
                }
            }
        }
        self.execution_order().map(|_| ())
    }

    /// Stages in an order that satisfies every dependency.
    pub fn execution_order(&self) -> Result<Vec<&StageDescriptor>> {
        let mut graph = DiGraph::<usize, ()>::new();
        let mut nodes = HashMap::new();
        for (index, stage) in self.stages.iter().enumerate() {
            nodes.insert(stage.id.as_str(), graph.add_node(index));
        }
        for stage in &self.stages {
            for dep in &stage.depends_on {
                let from = nodes.get(dep.as_str()).ok_or_else(|| Error::InvalidPipeline {
                    pipeline: self.id.clone(),
                    message: format!("stage '{}' depends on unknown '{}'", stage.id, dep),
                })?;
                graph.add_edge(*from, nodes[stage.id.as_str()], ());
            }
        }
        let order = toposort(&graph, None).map_err(|cycle| Error::InvalidPipeline {
            pipeline: self.id.clone(),
            message: format!(
                "dependency cycle through stage '{}'",
                self.stages[graph[cycle.node_id()]].id
            ),
        })?;
        Ok(order.into_iter().map(|n| &self.stages[graph[n]]).collect())
    }

    /// Stages declared with the same dependency set as `id`, excluding `id`
    /// itself. These are the siblings an external scheduler may run in
    /// parallel.
    pub fn parallel_siblings(&self, id: &str) -> Vec<&str> {
        let Some(stage) = self.stages.iter().find(|s| s.id == id) else {
            return Vec::new();
        };
        let deps: HashSet<&str> = stage.depends_on.iter().map(String::as_str).collect();
        self.stages
            .iter()
            .filter(|s| s.id != id)
            .filter(|s| {
                let other: HashSet<&str> = s.depends_on.iter().map(String::as_str).collect();
                other == deps
            })
            .map(|s| s.id.as_str())
            .collect()
    }

    /// The fixed daily product pipeline: extract and load the raw tables,
    /// stage the three product dimensions (mutually independent), then
    /// build the reporting model.
    pub fn product_etl() -> Self {
        let stage = |id: &str, deps: &[&str]| StageDescriptor {
            id: id.to_string(),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
        };
        PipelineSpec {
            id: "product_etl".to_string(),
            schedule: Some("0 9 * * *".to_string()),
            catchup: false,
            stages: vec![
                stage("extract_load", &[]),
                stage("transform_DimProduct", &["extract_load"]),
                stage("transform_DimProductSubcategory", &["extract_load"]),
                stage("transform_DimProductCategory", &["extract_load"]),
                stage(
                    "load_model",
                    &[
                        "transform_DimProduct",
                        "transform_DimProductSubcategory",
                        "transform_DimProductCategory",
                    ],
                ),
            ],
        }
    }
}
