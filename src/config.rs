//! Run configuration and derived output locations.

use std::path::{Path, PathBuf};

use clap::ValueEnum;

use crate::error::{Result, SweepError};

/// Production deletion endpoint; overridable per run.
pub const DEFAULT_ENDPOINT: &str = "https://api.nexiopay.com/pay/v3/deleteToken";

/// Default number of tokens submitted per remote call.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// How the remote's response attributes success to tokens.
///
/// Observed response shapes vary between deployments, so the interpretation
/// is selected by configuration rather than sniffed from the body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ResponseMode {
    /// The body is an array of per-token result records; each token is
    /// classified individually.
    #[default]
    PerToken,
    /// Any successful (2xx) response marks the whole chunk deleted; anything
    /// else fails the whole chunk.
    WholeChunk,
}

/// Configuration for one deletion run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Input roster path; the output files are derived from it
    pub csv_path: PathBuf,

    /// Static credential sent as `Authorization: Basic <auth_token>`
    pub auth_token: String,

    /// Deletion endpoint receiving one POST per chunk
    pub endpoint: String,

    /// Maximum tokens per chunk
    pub chunk_size: usize,

    /// Pacing delay observed before every dispatch, including the first
    pub time_ms_between_requests: u64,

    /// Per-request timeout; `None` leaves the call unbounded
    pub request_timeout_ms: Option<u64>,

    /// How responses are mapped onto per-token outcomes
    pub response_mode: ResponseMode,
}

impl RunConfig {
    /// Build a config with the defaults the CLI advertises.
    pub fn new(csv_path: impl Into<PathBuf>, auth_token: impl Into<String>) -> Self {
        Self {
            csv_path: csv_path.into(),
            auth_token: auth_token.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            time_ms_between_requests: 0,
            request_timeout_ms: None,
            response_mode: ResponseMode::default(),
        }
    }

    /// Reject unusable configuration before anything is read or dispatched.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(SweepError::Config(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.auth_token.is_empty() {
            return Err(SweepError::Config("auth_token must not be empty".to_string()));
        }
        if self.endpoint.is_empty() {
            return Err(SweepError::Config("endpoint must not be empty".to_string()));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(SweepError::Config(
                "request_timeout_ms must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths::derive(&self.csv_path)
    }
}

/// Locations of the two audit files for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub completions: PathBuf,
    pub failures: PathBuf,
}

impl OutputPaths {
    /// Derive output locations by suffixing the full input path, so
    /// `tokens.csv` yields `tokens.csv.completions` / `tokens.csv.failures`
    /// next to the roster.
    pub fn derive(csv_path: &Path) -> Self {
        let suffixed = |suffix: &str| {
            let mut name = csv_path.as_os_str().to_os_string();
            name.push(suffix);
            PathBuf::from(name)
        };
        Self {
            completions: suffixed(".completions"),
            failures: suffixed(".failures"),
        }
    }
}
