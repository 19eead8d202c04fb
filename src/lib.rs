//! Chunked batch deletion of payment tokens with a crash-safe audit trail.
//!
//! This crate reads a roster of payment tokens from a CSV file, submits them
//! for deletion in fixed-size chunks against a remote tokenization service,
//! and classifies every token as completed or failed. Whatever ends the run,
//! normal completion, an operator signal, or a fault in the dispatch loop,
//! the results collected so far are flushed exactly once to a pair of CSV
//! audit files next to the input.

pub mod chunk;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod outcome;
pub mod persist;
pub mod results;
pub mod run;
pub mod signal;
pub mod token;

// Re-export commonly used types
pub use chunk::{chunk_tokens, Chunk};
pub use config::{OutputPaths, ResponseMode, RunConfig, DEFAULT_CHUNK_SIZE, DEFAULT_ENDPOINT};
pub use dispatch::Dispatcher;
pub use error::{Result, SweepError};
pub use http::{HttpClient, HttpResponse, MockHttpClient, ReqwestHttpClient};
pub use outcome::{ChunkVerdict, FailureReason, Outcome, TokenDisposition, TokenOutcome};
pub use persist::{FlushReport, FlushStatus, ShutdownPersister, StopCause};
pub use results::{FailedToken, ResultLedger, ResultSet};
pub use run::{execute, RunId, RunSummary};
pub use token::{read_tokens, Token, TOKEN_COLUMN};
