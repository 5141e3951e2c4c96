//! Configuration parsing and validation
//!
//! This module handles loading and validating Stagehand configuration files.
//!
//! # Configuration Files
//!
//! - `stagehand.yaml` - Project root configuration
//! - `jobs/*.yaml` - Individual job definitions
//! - `connectors/*.yaml` - Connector definitions, referenced as `"file.key"`

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::connectors::ConnectorConfig;
use crate::error::{Error, Result};
use crate::model::{ModelSpec, product_model};
use crate::pipeline::PipelineSpec;
use crate::stage::{StagePolicy, product_dimension_policies};

/// Root project configuration from `stagehand.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Runtime configuration
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuntimeConfig {
    /// Runtime mode: local or remote
    #[serde(default)]
    pub mode: RuntimeMode,

    /// Local runtime settings
    #[serde(default)]
    pub local: LocalConfig,

    /// Remote runtime settings
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// Runtime mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Local mode with embedded PostgreSQL as the destination
    #[default]
    Local,
    /// Remote mode connecting to external services
    Remote,
}

/// Local runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Directory for local data (embedded Postgres)
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Port for embedded PostgreSQL
    #[serde(default = "default_pg_port")]
    pub port: u16,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            port: default_pg_port(),
        }
    }
}

fn default_data_dir() -> String {
    ".stagehand/data".to_string()
}

fn default_pg_port() -> u16 {
    5433 // Avoid conflict with system Postgres on 5432
}

/// Remote runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RemoteConfig {
    /// Destination PostgreSQL connection URL
    pub postgres_url: Option<String>,
}

/// A job definition from `jobs/*.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobConfig {
    /// Full warehouse pipeline: extract raw, stage, build the model
    Warehouse(WarehouseJob),

    /// Discovery-then-load: copy source tables to the destination raw layer
    Extract(ExtractJob),

    /// API feed: fetch, validate, append
    Feed(FeedJob),
}

impl JobConfig {
    /// Job name
    pub fn name(&self) -> &str {
        match self {
            JobConfig::Warehouse(j) => &j.name,
            JobConfig::Extract(j) => &j.name,
            JobConfig::Feed(j) => &j.name,
        }
    }
}

/// Warehouse pipeline job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseJob {
    /// Job name (must be unique within project)
    pub name: String,

    /// Source connector reference
    pub source: String,

    /// Destination connector reference
    pub destination: String,

    /// Source tables to extract; defaults to the tables the policies cover
    #[serde(default)]
    pub tables: Vec<String>,

    /// Stage policies; defaults to the built-in product dimension policies
    #[serde(default)]
    pub policies: Vec<StagePolicy>,

    /// Model specification; defaults to the built-in product model
    #[serde(default)]
    pub model: Option<ModelSpec>,

    /// Pipeline declaration; defaults to the built-in product pipeline
    #[serde(default)]
    pub pipeline: Option<PipelineSpec>,
}

impl WarehouseJob {
    /// Stage policies, falling back to the built-ins
    pub fn resolved_policies(&self) -> Vec<StagePolicy> {
        if self.policies.is_empty() {
            product_dimension_policies()
        } else {
            self.policies.clone()
        }
    }

    /// Model specification, falling back to the built-in product model
    pub fn resolved_model(&self) -> ModelSpec {
        self.model.clone().unwrap_or_else(product_model)
    }

    /// Pipeline declaration, falling back to the built-in product pipeline
    pub fn resolved_pipeline(&self) -> PipelineSpec {
        self.pipeline.clone().unwrap_or_else(PipelineSpec::product_etl)
    }

    /// Tables to extract, falling back to the policies' source tables
    pub fn resolved_tables(&self) -> Vec<String> {
        if self.tables.is_empty() {
            self.resolved_policies()
                .iter()
                .map(|p| p.table.clone())
                .collect()
        } else {
            self.tables.clone()
        }
    }
}

/// Discovery-then-load job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractJob {
    /// Job name
    pub name: String,

    /// Source connector reference
    pub source: String,

    /// Destination connector reference
    pub destination: String,

    /// Source tables to copy
    pub tables: Vec<String>,
}

/// API feed job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedJob {
    /// Job name
    pub name: String,

    /// Feed connector reference
    pub source: String,

    /// Destination connector reference
    pub destination: String,

    /// Destination table
    #[serde(default = "default_feed_table")]
    pub table: String,
}

fn default_feed_table() -> String {
    "my_played_tracks".to_string()
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: std::path::PathBuf,
}

impl Config {
    /// Load configuration from a directory or a `stagehand.yaml` path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join("stagehand.yaml"), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;

        Ok(Self { project, base_path })
    }

    /// Load all job definitions from `jobs/*.yaml`
    pub fn load_jobs(&self) -> Result<Vec<JobConfig>> {
        let jobs_dir = self.base_path.join("jobs");
        if !jobs_dir.exists() {
            return Ok(vec![]);
        }

        let mut jobs = Vec::new();
        let mut entries: Vec<_> = std::fs::read_dir(&jobs_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .collect();
        entries.sort_by_key(|e| e.path());

        for entry in entries {
            let contents = std::fs::read_to_string(entry.path())?;
            let job: JobConfig = serde_yaml::from_str(&contents)?;
            jobs.push(job);
        }
        Ok(jobs)
    }

    /// Resolve a dotted connector reference like `"warehouse.source"` to a
    /// `ConnectorConfig`.
    ///
    /// The reference format is `"<filename>.<key>"` which maps to
    /// `connectors/<filename>.yaml` → key `<key>`.
    pub fn load_connector_config(&self, reference: &str) -> Result<ConnectorConfig> {
        let (file, key) = reference
            .split_once('.')
            .ok_or_else(|| Error::ConfigInvalid {
                message: format!(
                    "connector reference '{}' must be in 'file.key' format",
                    reference
                ),
            })?;

        let path = self
            .base_path
            .join("connectors")
            .join(format!("{}.yaml", file));
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&path)?;
        let doc: serde_yaml::Value = serde_yaml::from_str(&contents)?;

        let connector_value = doc.get(key).ok_or_else(|| Error::ConfigInvalid {
            message: format!("key '{}' not found in {}", key, path.display()),
        })?;

        let config: ConnectorConfig = serde_yaml::from_value(connector_value.clone())?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_runtime_mode() {
        let mode = RuntimeMode::default();
        assert_eq!(mode, RuntimeMode::Local);
    }

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
name: test-project
"#;
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "test-project");
        assert_eq!(config.version, "0.1.0");
        assert_eq!(config.runtime.local.port, 5433);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
name: test-project
version: "1.0.0"
runtime:
  mode: remote
  remote:
    postgres_url: "postgres://warehouse-host/dw"
"#;
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.version, "1.0.0");
        assert_eq!(config.runtime.mode, RuntimeMode::Remote);
        assert_eq!(
            config.runtime.remote.postgres_url.as_deref(),
            Some("postgres://warehouse-host/dw")
        );
    }

    #[test]
    fn test_parse_warehouse_job_defaults() {
        let yaml = r#"
type: warehouse
name: product_warehouse
source: warehouse.source
destination: warehouse.destination
"#;
        let job: JobConfig = serde_yaml::from_str(yaml).unwrap();
        let JobConfig::Warehouse(job) = job else {
            panic!("Expected warehouse job");
        };
        assert_eq!(job.name, "product_warehouse");
        assert_eq!(job.resolved_policies().len(), 3);
        assert_eq!(job.resolved_model().name, "ProductModel");
        assert_eq!(job.resolved_pipeline().id, "product_etl");
        assert_eq!(
            job.resolved_tables(),
            vec!["DimProduct", "DimProductSubcategory", "DimProductCategory"]
        );
    }

    #[test]
    fn test_parse_extract_job() {
        let yaml = r#"
type: extract
name: copy_dimensions
source: warehouse.source
destination: warehouse.destination
tables:
  - DimProduct
  - DimSalesTerritory
  - FactInternetSales
"#;
        let job: JobConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(job.name(), "copy_dimensions");
        let JobConfig::Extract(job) = job else {
            panic!("Expected extract job");
        };
        assert_eq!(job.tables.len(), 3);
    }

    #[test]
    fn test_parse_feed_job_default_table() {
        let yaml = r#"
type: feed
name: played_tracks
source: feed.api
destination: feed.local
"#;
        let job: JobConfig = serde_yaml::from_str(yaml).unwrap();
        let JobConfig::Feed(job) = job else {
            panic!("Expected feed job");
        };
        assert_eq!(job.table, "my_played_tracks");
    }

    #[test]
    fn test_load_jobs_from_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("jobs")).unwrap();
        std::fs::write(dir.path().join("stagehand.yaml"), "name: test\n").unwrap();
        std::fs::write(
            dir.path().join("jobs/a.yaml"),
            "type: feed\nname: feed_a\nsource: feed.api\ndestination: feed.local\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        let jobs = config.load_jobs().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name(), "feed_a");
    }

    #[test]
    fn test_load_connector_config() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("connectors")).unwrap();
        std::fs::write(dir.path().join("stagehand.yaml"), "name: test\n").unwrap();
        std::fs::write(
            dir.path().join("connectors/warehouse.yaml"),
            "source:\n  type: postgres\n  url: postgres://src\ndestination:\n  type: postgres\n  url_key: WAREHOUSE_URL\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        let conn = config.load_connector_config("warehouse.source").unwrap();
        match conn {
            ConnectorConfig::Postgres(p) => {
                assert_eq!(p.url.as_deref(), Some("postgres://src"));
            }
            _ => panic!("Expected postgres connector"),
        }
    }

    #[test]
    fn test_load_connector_config_bad_reference() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("stagehand.yaml"), "name: test\n").unwrap();

        let config = Config::load(dir.path()).unwrap();
        let result = config.load_connector_config("noformat");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_config() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(dir.path());
        assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
    }
}
