//! Played-track feed records and batch validation
//!
//! The API feed yields one record per played track. Before an append-mode
//! load the whole batch passes through [`validate`], which either clears it
//! for loading, skips an empty batch, or rejects it outright: `played_at`
//! must be unique, no cell may be null, and every record must have been
//! played yesterday relative to the run date.

use std::collections::HashSet;

use chrono::{Days, NaiveDate};

use crate::error::{Error, Result};
use crate::table::{Table, Value, ValueType};

/// Column holding the feed's unique key
pub const FEED_PRIMARY_KEY: &str = "played_at";

/// One played track from the feed.
///
/// Fields are optional because the upstream response may omit any of them;
/// [`validate`] treats a missing field as a fatal null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedTrack {
    /// Track name
    pub song_name: Option<String>,
    /// First album artist
    pub artist_name: Option<String>,
    /// ISO-8601 play time, the batch's unique key
    pub played_at: Option<String>,
}

impl PlayedTrack {
    /// Date-truncated `played_at` (`YYYY-MM-DD`), if present and long enough
    pub fn timestamp(&self) -> Option<&str> {
        self.played_at.as_deref().and_then(|p| p.get(..10))
    }
}

/// Outcome of batch validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Batch is clean, proceed to load
    Load,
    /// Batch is empty, nothing to do
    Skip,
}

/// Validate a feed batch against the run date.
///
/// An empty batch is a clean no-op ([`Verdict::Skip`]). A duplicate
/// `played_at`, a null cell, or a record not played on `run_date − 1 day`
/// fails the job with [`Error::Validation`].
pub fn validate(batch: &[PlayedTrack], run_date: NaiveDate) -> Result<Verdict> {
    if batch.is_empty() {
        tracing::info!("no tracks downloaded, finishing execution");
        return Ok(Verdict::Skip);
    }

    let mut seen = HashSet::new();
    for track in batch {
        if let Some(played_at) = &track.played_at {
            if !seen.insert(played_at.as_str()) {
                return Err(Error::Validation {
                    message: format!("primary key '{}' is not unique", FEED_PRIMARY_KEY),
                });
            }
        }
    }

    for track in batch {
        if track.song_name.is_none() || track.artist_name.is_none() || track.played_at.is_none() {
            return Err(Error::Validation {
                message: "null value found in batch".to_string(),
            });
        }
    }

    let yesterday = run_date
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| Error::Validation {
            message: "run date out of range".to_string(),
        })?;
    for track in batch {
        let played_on = track
            .timestamp()
            .and_then(|t| NaiveDate::parse_from_str(t, "%Y-%m-%d").ok());
        if played_on != Some(yesterday) {
            return Err(Error::Validation {
                message: "at least one track was played outside the previous day".to_string(),
            });
        }
    }

    Ok(Verdict::Load)
}

/// Column schema of the destination feed table
pub fn feed_table_schema() -> Vec<(String, ValueType)> {
    ["song_name", "artist_name", "played_at", "timestamp"]
        .iter()
        .map(|name| (name.to_string(), ValueType::Text))
        .collect()
}

/// Convert a batch into a table named `name`, one row per track.
///
/// Missing fields become nulls; callers are expected to have validated the
/// batch first.
pub fn to_table(name: &str, batch: &[PlayedTrack]) -> Table {
    let text = |field: Option<&str>| match field {
        Some(s) => Value::Text(s.to_string()),
        None => Value::Null,
    };
    let columns = vec![
        (
            "song_name".to_string(),
            batch
                .iter()
                .map(|t| text(t.song_name.as_deref()))
                .collect(),
        ),
        (
            "artist_name".to_string(),
            batch
                .iter()
                .map(|t| text(t.artist_name.as_deref()))
                .collect(),
        ),
        (
            "played_at".to_string(),
            batch
                .iter()
                .map(|t| text(t.played_at.as_deref()))
                .collect(),
        ),
        (
            "timestamp".to_string(),
            batch.iter().map(|t| text(t.timestamp())).collect(),
        ),
    ];
    // Columns are equal-length by construction
    Table::from_columns(name, columns).expect("feed columns are rectangular")
}
