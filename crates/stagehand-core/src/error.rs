//! Error types for stagehand-core

use thiserror::Error;

/// Result type alias for stagehand-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in stagehand-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// Pipeline declaration error
    #[error("invalid pipeline '{pipeline}': {message}")]
    InvalidPipeline {
        /// Name of the pipeline with the error
        pipeline: String,
        /// Description of the error
        message: String,
    },

    /// Source or destination unreachable
    #[error("connection to '{endpoint}' failed: {message}")]
    Connection {
        /// Endpoint that could not be reached
        endpoint: String,
        /// Description of the failure
        message: String,
    },

    /// Expected column or table absent
    #[error("schema error in '{table}': {message}")]
    Schema {
        /// Table the error refers to
        table: String,
        /// Description of the error
        message: String,
    },

    /// Value not convertible to the target type
    #[error("cannot cast '{value}' in column '{column}' to {target}")]
    TypeCoercion {
        /// Column being cast
        column: String,
        /// Rendering of the offending value
        value: String,
        /// Target type name
        target: String,
    },

    /// Feed batch rejected by a validation gate
    #[error("validation failed: {message}")]
    Validation {
        /// Which gate rejected the batch
        message: String,
    },

    /// Duplicate key on an append-mode write
    #[error("constraint violation on '{table}': {message}")]
    Constraint {
        /// Destination table
        table: String,
        /// Description of the violated constraint
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
