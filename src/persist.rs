//! Terminal persistence of run results.
//!
//! [`ShutdownPersister`] owns the two audit files for a run. Whichever
//! termination path reaches it first gets to write them; every later call
//! observes [`FlushStatus::AlreadyFlushed`] and touches nothing. The claim is
//! taken before any I/O and never released, so a failed flush is reported but
//! not retried.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::config::OutputPaths;
use crate::error::{Result, SweepError};
use crate::results::{FailedToken, ResultLedger};
use crate::token::{Token, TOKEN_COLUMN};

/// Why the run stopped dispatching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// Every chunk was dispatched and recorded.
    Completed,
    /// A shutdown signal arrived before the roster was exhausted.
    Interrupted,
    /// The dispatch loop died on an uncaught fault.
    Faulted,
}

impl fmt::Display for StopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopCause::Completed => "completed",
            StopCause::Interrupted => "interrupted",
            StopCause::Faulted => "faulted",
        };
        write!(f, "{s}")
    }
}

/// What a successful flush wrote, for the final summary log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub completions_path: PathBuf,
    pub failures_path: PathBuf,
    pub completed: usize,
    pub failed: usize,
}

/// Outcome of a flush attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushStatus {
    Written(FlushReport),
    AlreadyFlushed,
}

/// Writes the ledger to the completions and failures files exactly once.
#[derive(Debug)]
pub struct ShutdownPersister {
    ledger: Arc<Mutex<ResultLedger>>,
    paths: OutputPaths,
    flushed: AtomicBool,
}

impl ShutdownPersister {
    pub fn new(ledger: Arc<Mutex<ResultLedger>>, paths: OutputPaths) -> Self {
        Self {
            ledger,
            paths,
            flushed: AtomicBool::new(false),
        }
    }

    /// Flushes the ledger to disk, first caller wins.
    ///
    /// Both files are written with headers even when empty, so an empty
    /// completions file still round-trips as an input roster.
    pub fn flush(&self, cause: StopCause) -> Result<FlushStatus> {
        if self.flushed.swap(true, Ordering::SeqCst) {
            tracing::debug!(cause = %cause, "Results already flushed, skipping");
            return Ok(FlushStatus::AlreadyFlushed);
        }

        let snapshot = self.ledger.lock().snapshot();
        write_completions(&self.paths.completions, &snapshot.completed)?;
        write_failures(&self.paths.failures, &snapshot.failed)?;

        tracing::info!(
            cause = %cause,
            completed = snapshot.completed.len(),
            failed = snapshot.failed.len(),
            completions = %self.paths.completions.display(),
            failures = %self.paths.failures.display(),
            "Flushed run results"
        );

        Ok(FlushStatus::Written(FlushReport {
            completions_path: self.paths.completions.clone(),
            failures_path: self.paths.failures.clone(),
            completed: snapshot.completed.len(),
            failed: snapshot.failed.len(),
        }))
    }
}

fn write_completions(path: &Path, tokens: &[Token]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| flush_error(path, e))?;
    writer
        .write_record([TOKEN_COLUMN])
        .map_err(|e| flush_error(path, e))?;
    for token in tokens {
        writer
            .write_record([token.as_str()])
            .map_err(|e| flush_error(path, e))?;
    }
    writer
        .flush()
        .map_err(|e| flush_error(path, e.into()))?;
    Ok(())
}

fn write_failures(path: &Path, failed: &[FailedToken]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| flush_error(path, e))?;
    writer
        .write_record([TOKEN_COLUMN, "status", "status_text", "detail"])
        .map_err(|e| flush_error(path, e))?;
    for entry in failed {
        let status = entry
            .reason
            .status()
            .map(|s| s.to_string())
            .unwrap_or_default();
        let status_text = entry.reason.status_text().unwrap_or_default();
        writer
            .write_record([
                entry.token.as_str(),
                status.as_str(),
                status_text,
                entry.reason.detail().as_str(),
            ])
            .map_err(|e| flush_error(path, e))?;
    }
    writer
        .flush()
        .map_err(|e| flush_error(path, e.into()))?;
    Ok(())
}

fn flush_error(path: &Path, source: csv::Error) -> SweepError {
    SweepError::Flush {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk_tokens;
    use crate::outcome::{FailureReason, Outcome};
    use crate::token::read_tokens;
    use chrono::Utc;
    use tempfile::tempdir;

    fn persister_for(dir: &Path) -> (ShutdownPersister, Arc<Mutex<ResultLedger>>, OutputPaths) {
        let paths = OutputPaths::derive(&dir.join("tokens.csv"));
        let ledger = Arc::new(Mutex::new(ResultLedger::new()));
        let persister = ShutdownPersister::new(Arc::clone(&ledger), paths.clone());
        (persister, ledger, paths)
    }

    fn record_completed(ledger: &Mutex<ResultLedger>, names: &[&str]) {
        let tokens: Vec<Token> = names.iter().map(|n| Token::from(*n)).collect();
        for chunk in chunk_tokens(&tokens, names.len()) {
            ledger.lock().record(Outcome::completed(chunk, Utc::now()));
        }
    }

    #[test]
    fn flush_writes_both_files_with_headers() {
        let dir = tempdir().unwrap();
        let (persister, ledger, paths) = persister_for(dir.path());
        record_completed(&ledger, &["tok_a", "tok_b"]);

        let status = persister.flush(StopCause::Completed).unwrap();
        let FlushStatus::Written(report) = status else {
            panic!("expected a write");
        };
        assert_eq!(report.completed, 2);
        assert_eq!(report.failed, 0);

        let completions = std::fs::read_to_string(&paths.completions).unwrap();
        assert_eq!(completions, "payment_token\ntok_a\ntok_b\n");

        let failures = std::fs::read_to_string(&paths.failures).unwrap();
        assert_eq!(failures, "payment_token,status,status_text,detail\n");
    }

    #[test]
    fn empty_run_still_writes_header_only_files() {
        let dir = tempdir().unwrap();
        let (persister, _ledger, paths) = persister_for(dir.path());

        persister.flush(StopCause::Completed).unwrap();

        assert!(paths.completions.exists());
        assert!(paths.failures.exists());
        let tokens = read_tokens(&paths.completions).unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn failures_rows_carry_status_columns_when_available() {
        let dir = tempdir().unwrap();
        let (persister, ledger, paths) = persister_for(dir.path());

        let tokens = vec![Token::from("tok_a"), Token::from("tok_b")];
        let chunks = chunk_tokens(&tokens, 1);
        let mut iter = chunks.into_iter();
        ledger.lock().record(Outcome::failed(
            iter.next().unwrap(),
            FailureReason::HttpStatus {
                status: 503,
                status_text: "Service Unavailable".to_string(),
                body: "maintenance".to_string(),
            },
            Utc::now(),
        ));
        ledger.lock().record(Outcome::failed(
            iter.next().unwrap(),
            FailureReason::Transport {
                error: "connection reset".to_string(),
            },
            Utc::now(),
        ));

        persister.flush(StopCause::Completed).unwrap();

        let failures = std::fs::read_to_string(&paths.failures).unwrap();
        let mut lines = failures.lines();
        assert_eq!(
            lines.next(),
            Some("payment_token,status,status_text,detail")
        );
        assert_eq!(lines.next(), Some("tok_a,503,Service Unavailable,maintenance"));
        assert_eq!(lines.next(), Some("tok_b,,,connection reset"));
    }

    #[test]
    fn second_flush_is_a_no_op() {
        let dir = tempdir().unwrap();
        let (persister, ledger, paths) = persister_for(dir.path());
        record_completed(&ledger, &["tok_a"]);

        persister.flush(StopCause::Interrupted).unwrap();
        let before = std::fs::read_to_string(&paths.completions).unwrap();

        // More results arrive after the first flush; they must not leak out.
        record_completed(&ledger, &["tok_b"]);
        let status = persister.flush(StopCause::Completed).unwrap();
        assert_eq!(status, FlushStatus::AlreadyFlushed);

        let after = std::fs::read_to_string(&paths.completions).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn failed_flush_keeps_the_claim() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("missing").join("tokens.csv");
        let paths = OutputPaths::derive(&input);
        let ledger = Arc::new(Mutex::new(ResultLedger::new()));
        let persister = ShutdownPersister::new(ledger, paths);

        let err = persister.flush(StopCause::Completed).unwrap_err();
        assert!(matches!(err, SweepError::Flush { .. }));

        // The claim is not released on failure; no retry happens.
        let status = persister.flush(StopCause::Completed).unwrap();
        assert_eq!(status, FlushStatus::AlreadyFlushed);
    }

    #[test]
    fn completions_file_round_trips_as_a_roster() {
        let dir = tempdir().unwrap();
        let (persister, ledger, paths) = persister_for(dir.path());
        record_completed(&ledger, &["tok_a", "tok_b", "tok_c"]);

        persister.flush(StopCause::Completed).unwrap();

        let tokens = read_tokens(&paths.completions).unwrap();
        assert_eq!(
            tokens,
            vec![Token::from("tok_a"), Token::from("tok_b"), Token::from("tok_c")]
        );
    }
}
