//! End-to-end orchestration of a deletion run.
//!
//! [`execute`] is the single entry point: it validates configuration, reads
//! the roster, drives the paced dispatch loop on a worker task, and flushes
//! the ledger on whichever termination path ends the run. The flush happens
//! on every path that gets past validation, so a roster that was read is
//! always accounted for on disk.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::chunk::chunk_tokens;
use crate::config::RunConfig;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::http::HttpClient;
use crate::persist::{ShutdownPersister, StopCause};
use crate::results::ResultLedger;
use crate::token::read_tokens;

/// Identifier for one run, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RunId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Truncate for readability in logs
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Final accounting for a run, after the flush.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: RunId,
    pub stop_cause: StopCause,
    /// Tokens in the roster, duplicates included.
    pub total_tokens: usize,
    pub completed: usize,
    pub failed: usize,
    /// Chunks whose outcome made it into the ledger.
    pub chunks_recorded: usize,
    pub duplicate_rejections: u64,
}

/// Runs a deletion sweep to completion, interruption, or fault.
///
/// Cancelling `shutdown` abandons the remaining chunks; a chunk whose
/// request is in flight at that moment is dropped without a recorded
/// outcome. Results collected so far are flushed before this returns.
pub async fn execute<H: HttpClient + 'static>(
    config: RunConfig,
    http: H,
    shutdown: CancellationToken,
) -> Result<RunSummary> {
    config.validate()?;

    let run_id = RunId::new();
    tracing::info!(
        run = %run_id,
        csv = %config.csv_path.display(),
        chunk_size = config.chunk_size,
        delay_ms = config.time_ms_between_requests,
        mode = ?config.response_mode,
        "Starting deletion run"
    );

    let tokens = read_tokens(&config.csv_path)?;
    let total_tokens = tokens.len();
    let chunks = chunk_tokens(&tokens, config.chunk_size);
    tracing::info!(run = %run_id, tokens = total_tokens, chunks = chunks.len(), "Read roster");

    let ledger = Arc::new(Mutex::new(ResultLedger::new()));
    let persister = ShutdownPersister::new(Arc::clone(&ledger), config.output_paths());
    let dispatcher = Dispatcher::new(http, &config);

    let loop_ledger = Arc::clone(&ledger);
    let mut handle = tokio::spawn(async move {
        for chunk in chunks {
            let outcome = dispatcher.dispatch(chunk).await;
            let index = outcome.chunk.index;
            let (deleted, failed) = outcome.tally();
            tracing::debug!(chunk = index, deleted, failed, "Recorded chunk outcome");
            loop_ledger.lock().record(outcome);
        }
    });

    let stop_cause = tokio::select! {
        result = &mut handle => match result {
            Ok(()) => StopCause::Completed,
            Err(e) if e.is_panic() => {
                tracing::error!(run = %run_id, error = %e, "Dispatch loop panicked");
                StopCause::Faulted
            }
            Err(e) => {
                tracing::error!(run = %run_id, error = %e, "Dispatch loop aborted");
                StopCause::Interrupted
            }
        },
        _ = shutdown.cancelled() => {
            tracing::info!(run = %run_id, "Shutdown requested, abandoning remaining chunks");
            handle.abort();
            // Wait for the worker to actually stop before snapshotting.
            let _ = (&mut handle).await;
            StopCause::Interrupted
        }
    };

    persister.flush(stop_cause)?;

    let (completed, failed, chunks_recorded, duplicate_rejections) = {
        let ledger = ledger.lock();
        (
            ledger.completed().len(),
            ledger.failed().len(),
            ledger.chunks_recorded(),
            ledger.duplicate_rejections(),
        )
    };

    let summary = RunSummary {
        run_id,
        stop_cause,
        total_tokens,
        completed,
        failed,
        chunks_recorded,
        duplicate_rejections,
    };
    tracing::info!(
        run = %run_id,
        cause = %stop_cause,
        completed,
        failed,
        chunks = chunks_recorded,
        duplicates = duplicate_rejections,
        "Run finished"
    );
    Ok(summary)
}
