//! Error types for the batch deletion run.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the tokensweep error type.
pub type Result<T> = std::result::Result<T, SweepError>;

/// Main error type for the batch deletion run.
///
/// Per-chunk dispatch failures are deliberately not represented here: the
/// dispatcher folds them into [`crate::outcome::Outcome`]s so the loop can
/// continue. Only configuration, input, transport plumbing, and flush
/// problems surface as errors.
#[derive(Error, Debug)]
pub enum SweepError {
    /// Invalid or missing configuration, fatal before any dispatch
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The token roster could not be read or parsed
    #[error("Failed to read token file '{path}': {source}")]
    TokenFile {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// An output file could not be written at flush time
    #[error("Failed to write results to '{path}': {source}")]
    Flush {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// HTTP client error
    #[error("HTTP request failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error from anyhow
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
