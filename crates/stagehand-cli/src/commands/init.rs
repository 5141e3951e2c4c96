//! Initialize a new Stagehand project

use anyhow::Result;
use std::fs;
use std::path::Path;

/// Run the init command
pub async fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    // Create directory if it doesn't exist
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    // Get absolute path for deriving name
    let abs_path = project_dir.canonicalize()?;

    // Derive project name from directory name if not provided
    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    // Check if already initialized
    if project_dir.join("stagehand.yaml").exists() {
        anyhow::bail!(
            "Directory '{}' already contains a stagehand.yaml",
            project_dir.display()
        );
    }

    tracing::info!("Creating new Stagehand project: {}", project_name);

    // Create directory structure
    fs::create_dir_all(project_dir.join("jobs"))?;
    fs::create_dir_all(project_dir.join("connectors"))?;

    // Create stagehand.yaml
    let config = format!(
        r#"# Stagehand Project Configuration
name: {project_name}
version: "0.1.0"

runtime:
  mode: local
  local:
    data_dir: ".stagehand/data"
    port: 5433
"#
    );
    fs::write(project_dir.join("stagehand.yaml"), config)?;

    // Create the warehouse job, relying on the built-in product policies,
    // model, and pipeline
    let warehouse_job = r#"# Warehouse pipeline job
#
# Extracts the product dimension tables into src_*, stages them into
# stg_* (projection, null fills, renames), and joins them into the
# prd_ProductModel reporting table. Policies, model, and pipeline
# declarations can be overridden here; the built-ins cover DimProduct,
# DimProductSubcategory, and DimProductCategory.
type: warehouse
name: product_warehouse
source: warehouse.source
destination: warehouse.destination
"#;
    fs::write(project_dir.join("jobs/warehouse.yaml"), warehouse_job)?;

    // Create the feed job
    let feed_job = r#"# API feed job
#
# Fetches yesterday's played tracks, validates the batch (unique
# played_at, no nulls, recency), and appends to the destination table.
type: feed
name: played_tracks
source: feed.api
destination: warehouse.destination
table: my_played_tracks
"#;
    fs::write(project_dir.join("jobs/feed.yaml"), feed_job)?;

    // Create example connectors
    let warehouse_connectors = r#"# Warehouse connector configurations
# Referenced in jobs as "warehouse.source", "warehouse.destination".
# url_key names an environment variable resolved at run time.

source:
  type: postgres
  url_key: SOURCE_DATABASE_URL

destination:
  type: postgres
  url_key: WAREHOUSE_DATABASE_URL
"#;
    fs::write(
        project_dir.join("connectors/warehouse.yaml"),
        warehouse_connectors,
    )?;

    let feed_connectors = r#"# Feed connector configuration
# Referenced in jobs as "feed.api".

api:
  type: http_feed
  url: "https://api.spotify.com/v1/me/player/recently-played"
  token_key: FEED_API_TOKEN
"#;
    fs::write(project_dir.join("connectors/feed.yaml"), feed_connectors)?;

    // Create .gitignore
    let gitignore = r#"# Stagehand local data
.stagehand/

# IDE
.idea/
.vscode/
*.swp
"#;
    fs::write(project_dir.join(".gitignore"), gitignore)?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  stagehand validate    # Check configuration");
    tracing::info!("  stagehand plan        # Inspect the pipeline");
    tracing::info!("  stagehand run         # Run the warehouse pipeline");

    Ok(())
}
