//! HTTP feed client
//!
//! Fetches recently-played tracks from the feed API: one GET with a bearer
//! token and a Unix-millisecond `after` cutoff. The response is an `items`
//! array; each item carries the track name, the first album artist, and the
//! ISO-8601 play time.

use serde::Deserialize;

use stagehand_core::connectors::{CredentialStore, HttpFeedConfig};
use stagehand_core::error::{Error, Result};
use stagehand_core::feed::PlayedTrack;

/// Client for the recently-played feed endpoint
pub struct FeedClient {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl FeedClient {
    /// Create a client for `url` authenticating with `token`
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            token: token.into(),
        }
    }

    /// Build a client from connector configuration, resolving the token
    /// through the credential store
    pub fn from_config(
        config: &HttpFeedConfig,
        credentials: &dyn CredentialStore,
    ) -> Result<Self> {
        Ok(Self::new(
            config.url.clone(),
            config.resolve_token(credentials)?,
        ))
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch every track played after the Unix-millisecond cutoff
    pub async fn recently_played(&self, after_ms: i64) -> Result<Vec<PlayedTrack>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("after", after_ms)])
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Connection {
                endpoint: self.url.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(Error::Connection {
                endpoint: self.url.clone(),
                message: format!("feed returned HTTP {}", response.status()),
            });
        }

        let body = response.text().await.map_err(|e| Error::Connection {
            endpoint: self.url.clone(),
            message: e.to_string(),
        })?;
        parse_items(&body)
    }
}

#[derive(Debug, Deserialize)]
struct RecentlyPlayed {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    track: Option<TrackInfo>,
    played_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackInfo {
    name: Option<String>,
    album: Option<AlbumInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct AlbumInfo {
    #[serde(default)]
    artists: Vec<ArtistInfo>,
}

#[derive(Debug, Deserialize)]
struct ArtistInfo {
    name: Option<String>,
}

fn parse_items(body: &str) -> Result<Vec<PlayedTrack>> {
    let parsed: RecentlyPlayed = serde_json::from_str(body)?;
    Ok(parsed.items.into_iter().map(into_track).collect())
}

fn into_track(item: Item) -> PlayedTrack {
    let (song_name, artist_name) = match item.track {
        Some(track) => {
            let artist = track
                .album
                .unwrap_or_default()
                .artists
                .into_iter()
                .next()
                .and_then(|a| a.name);
            (track.name, artist)
        }
        None => (None, None),
    };
    PlayedTrack {
        song_name,
        artist_name,
        played_at: item.played_at,
    }
}
