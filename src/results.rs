//! Run-level aggregation of chunk outcomes.
//!
//! [`ResultLedger`] is the single collection point for a run: every chunk
//! outcome is folded into it exactly once, and the persister snapshots it at
//! shutdown. A token is recorded at most once for the whole run; whichever
//! outcome arrives first wins and later sightings only bump a counter.

use std::collections::HashSet;

use crate::outcome::{ChunkVerdict, FailureReason, Outcome, TokenDisposition};
use crate::token::Token;

/// A token that failed, with the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedToken {
    pub token: Token,
    pub reason: FailureReason,
}

/// Point-in-time copy of the ledger, taken under the lock at flush time.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub completed: Vec<Token>,
    pub failed: Vec<FailedToken>,
}

/// Accumulates per-token results in arrival order.
#[derive(Debug, Default)]
pub struct ResultLedger {
    completed: Vec<Token>,
    failed: Vec<FailedToken>,
    seen: HashSet<Token>,
    duplicate_rejections: u64,
    chunks_recorded: usize,
}

impl ResultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one chunk outcome into the ledger.
    pub fn record(&mut self, outcome: Outcome) {
        let chunk_index = outcome.chunk.index;
        match outcome.verdict {
            ChunkVerdict::Completed => {
                for token in outcome.chunk.tokens {
                    self.record_completed(token, chunk_index);
                }
            }
            ChunkVerdict::Failed(reason) => {
                for token in outcome.chunk.tokens {
                    self.record_failed(token, reason.clone(), chunk_index);
                }
            }
            ChunkVerdict::PerToken(outcomes) => {
                for token_outcome in outcomes {
                    match token_outcome.disposition {
                        TokenDisposition::Deleted => {
                            self.record_completed(token_outcome.token, chunk_index);
                        }
                        TokenDisposition::Failed(reason) => {
                            self.record_failed(token_outcome.token, reason, chunk_index);
                        }
                    }
                }
            }
        }
        self.chunks_recorded += 1;
    }

    fn record_completed(&mut self, token: Token, chunk_index: usize) {
        if !self.claim(&token, chunk_index) {
            return;
        }
        self.completed.push(token);
    }

    fn record_failed(&mut self, token: Token, reason: FailureReason, chunk_index: usize) {
        if !self.claim(&token, chunk_index) {
            return;
        }
        self.failed.push(FailedToken { token, reason });
    }

    /// Returns whether this sighting of the token is its first.
    fn claim(&mut self, token: &Token, chunk_index: usize) -> bool {
        if self.seen.contains(token) {
            self.duplicate_rejections += 1;
            tracing::warn!(
                token = %token,
                chunk = chunk_index,
                "Duplicate result for token, keeping the first"
            );
            return false;
        }
        self.seen.insert(token.clone());
        true
    }

    pub fn completed(&self) -> &[Token] {
        &self.completed
    }

    pub fn failed(&self) -> &[FailedToken] {
        &self.failed
    }

    /// Total tokens recorded, completed plus failed.
    pub fn len(&self) -> usize {
        self.completed.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty() && self.failed.is_empty()
    }

    pub fn chunks_recorded(&self) -> usize {
        self.chunks_recorded
    }

    pub fn duplicate_rejections(&self) -> u64 {
        self.duplicate_rejections
    }

    pub fn snapshot(&self) -> ResultSet {
        ResultSet {
            completed: self.completed.clone(),
            failed: self.failed.clone(),
        }
    }
}
