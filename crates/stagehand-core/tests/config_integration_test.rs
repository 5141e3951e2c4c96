//! Integration tests for project configuration loading
//!
//! Tests use temporary directories with real file fixtures to verify:
//! - Project config loading
//! - Job discovery from jobs/*.yaml
//! - Connector reference resolution
//! - Pipeline validation of declared jobs

use stagehand_core::config::{Config, JobConfig};
use stagehand_core::connectors::ConnectorConfig;
use tempfile::TempDir;

/// Helper to create a temporary project directory with standard structure.
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("jobs")).unwrap();
    std::fs::create_dir_all(dir.path().join("connectors")).unwrap();
    dir
}

#[test]
fn test_complete_project_load() {
    let dir = setup_project();

    std::fs::write(
        dir.path().join("stagehand.yaml"),
        r#"
name: adventure-warehouse
version: "1.0.0"
runtime:
  mode: remote
  remote:
    postgres_url: "postgres://warehouse-host/dw"
"#,
    )
    .unwrap();

    std::fs::write(
        dir.path().join("jobs/warehouse.yaml"),
        r#"
type: warehouse
name: product_warehouse
source: warehouse.source
destination: warehouse.destination
"#,
    )
    .unwrap();

    std::fs::write(
        dir.path().join("jobs/feed.yaml"),
        r#"
type: feed
name: played_tracks
source: feed.api
destination: warehouse.destination
"#,
    )
    .unwrap();

    std::fs::write(
        dir.path().join("connectors/warehouse.yaml"),
        r#"
source:
  type: postgres
  url_key: SOURCE_URL
destination:
  type: postgres
  url_key: WAREHOUSE_URL
  schema: reporting
"#,
    )
    .unwrap();

    std::fs::write(
        dir.path().join("connectors/feed.yaml"),
        r#"
api:
  type: http_feed
  url: "https://api.example.com/v1/me/player/recently-played"
  token_key: FEED_TOKEN
"#,
    )
    .unwrap();

    let config = Config::load(dir.path()).unwrap();
    assert_eq!(config.project.name, "adventure-warehouse");

    let jobs = config.load_jobs().unwrap();
    assert_eq!(jobs.len(), 2);

    // jobs/*.yaml load in filename order
    let JobConfig::Feed(feed) = &jobs[0] else {
        panic!("Expected feed job first");
    };
    assert_eq!(feed.table, "my_played_tracks");

    let JobConfig::Warehouse(warehouse) = &jobs[1] else {
        panic!("Expected warehouse job");
    };

    // Built-in defaults kick in when the job declares nothing
    let pipeline = warehouse.resolved_pipeline();
    pipeline.validate().unwrap();
    assert_eq!(pipeline.stages.len(), 5);
    assert_eq!(warehouse.resolved_model().joins.len(), 2);

    // Connector references resolve through connectors/<file>.yaml
    let destination = config
        .load_connector_config(&warehouse.destination)
        .unwrap();
    match destination {
        ConnectorConfig::Postgres(p) => assert_eq!(p.schema, "reporting"),
        _ => panic!("Expected postgres destination"),
    }
    let api = config.load_connector_config(&feed.source).unwrap();
    assert!(matches!(api, ConnectorConfig::HttpFeed(_)));
}

#[test]
fn test_custom_policy_and_model_override_builtins() {
    let dir = setup_project();

    std::fs::write(dir.path().join("stagehand.yaml"), "name: custom\n").unwrap();
    std::fs::write(
        dir.path().join("jobs/custom.yaml"),
        r#"
type: warehouse
name: custom_warehouse
source: warehouse.source
destination: warehouse.destination
policies:
  - table: DimCurrency
    keep:
      - CurrencyKey
      - CurrencyAlternateKey
    rename:
      - from: CurrencyAlternateKey
        to: CurrencyCode
model:
  name: CurrencyModel
  base: DimCurrency
  joins: []
"#,
    )
    .unwrap();

    let config = Config::load(dir.path()).unwrap();
    let jobs = config.load_jobs().unwrap();
    let JobConfig::Warehouse(job) = &jobs[0] else {
        panic!("Expected warehouse job");
    };

    assert_eq!(job.resolved_policies().len(), 1);
    assert_eq!(job.resolved_tables(), vec!["DimCurrency"]);
    assert_eq!(job.resolved_model().name, "CurrencyModel");
    // Pipeline still falls back to the built-in declaration
    assert_eq!(job.resolved_pipeline().id, "product_etl");
}

#[test]
fn test_missing_connector_file_is_an_error() {
    let dir = setup_project();
    std::fs::write(dir.path().join("stagehand.yaml"), "name: test\n").unwrap();

    let config = Config::load(dir.path()).unwrap();
    assert!(config.load_connector_config("ghost.source").is_err());
}
