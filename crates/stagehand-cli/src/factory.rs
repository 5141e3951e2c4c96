//! Connector factory
//!
//! Resolves dotted connector references from the project configuration into
//! live connectors, injecting the credential store so the core never reads
//! the environment itself.

use anyhow::{Result, bail};
use stagehand_core::config::{Config, RuntimeMode};
use stagehand_core::connectors::{
    ConnectorConfig, CredentialStore, DestinationConnector, SourceConnector,
};
use stagehand_runtime::{FeedClient, PostgresDestination, PostgresSource};

use crate::local_db::LocalDatabase;

/// Open a tabular source for `reference`
pub async fn open_source(
    config: &Config,
    reference: &str,
    credentials: &dyn CredentialStore,
) -> Result<Box<dyn SourceConnector>> {
    match config.load_connector_config(reference)? {
        ConnectorConfig::Postgres(pg) => {
            let url = pg.resolve_url(credentials)?;
            Ok(Box::new(PostgresSource::connect(&url, pg.schema).await?))
        }
        ConnectorConfig::Memory(_) => {
            bail!("connector '{}' is memory-backed and only usable in tests", reference)
        }
        ConnectorConfig::HttpFeed(_) => {
            bail!("connector '{}' is a feed endpoint, not a tabular source", reference)
        }
    }
}

/// The destination a job writes to, holding the embedded database alive for
/// local-mode runs
pub struct Destination {
    /// Embedded server backing a local-mode destination; dropped with self
    #[allow(dead_code)]
    local: Option<LocalDatabase>,
    connector: Box<dyn DestinationConnector>,
}

impl Destination {
    /// The destination connector
    pub fn connector(&mut self) -> &mut dyn DestinationConnector {
        self.connector.as_mut()
    }
}

/// Open the destination for `reference`, honoring the runtime mode: local
/// mode starts the embedded database and writes there regardless of the
/// declared connector.
pub async fn open_destination(
    config: &Config,
    reference: &str,
    credentials: &dyn CredentialStore,
) -> Result<Destination> {
    if config.project.runtime.mode == RuntimeMode::Local {
        let db = LocalDatabase::new(&config.project.runtime.local).await?;
        let connector = Box::new(PostgresDestination::new(db.pool().clone(), "public"));
        return Ok(Destination {
            local: Some(db),
            connector,
        });
    }
    match config.load_connector_config(reference)? {
        ConnectorConfig::Postgres(pg) => {
            let url = pg.resolve_url(credentials)?;
            Ok(Destination {
                local: None,
                connector: Box::new(PostgresDestination::connect(&url, pg.schema).await?),
            })
        }
        ConnectorConfig::Memory(_) => {
            bail!("connector '{}' is memory-backed and only usable in tests", reference)
        }
        ConnectorConfig::HttpFeed(_) => {
            bail!("connector '{}' is a feed endpoint, not a destination", reference)
        }
    }
}

/// Build the feed client for `reference`
pub fn open_feed(
    config: &Config,
    reference: &str,
    credentials: &dyn CredentialStore,
) -> Result<FeedClient> {
    match config.load_connector_config(reference)? {
        ConnectorConfig::HttpFeed(feed) => Ok(FeedClient::from_config(&feed, credentials)?),
        _ => bail!("connector '{}' is not a feed endpoint", reference),
    }
}
