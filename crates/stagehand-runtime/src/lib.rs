//! Stagehand Runtime
//!
//! This crate provides the execution runtime for Stagehand jobs:
//!
//! - Batch engine for the warehouse path (extract → stage → model)
//! - Feed path with validation-gated append
//! - PostgreSQL source/destination connectors
//! - HTTP feed client
//!
//! # Usage
//!
//! ```rust,ignore
//! use stagehand_runtime::BatchRuntime;
//!
//! let mut runtime = BatchRuntime::new(&source, &mut destination);
//! runtime.run_warehouse(&job).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod http;
pub mod postgres;

pub use engine::{BatchRuntime, ExtractPolicy, FeedOutcome, load_feed_batch, run_feed};
pub use error::{Error, Result};
pub use http::FeedClient;
pub use postgres::{PostgresDestination, PostgresSource};
