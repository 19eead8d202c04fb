//! Outcome classification for dispatched chunks.
//!
//! The dispatcher normalizes the remote's heterogeneous response shapes into
//! one [`Outcome`] per chunk; the ledger only ever consumes this uniform
//! model. Failure reasons preserve the raw diagnostic material (status,
//! status text, body) verbatim for the audit file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;
use crate::token::Token;

/// Reason why a token, or a whole chunk, failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum FailureReason {
    /// The remote answered the chunk with an error status.
    HttpStatus {
        status: u16,
        status_text: String,
        body: String,
    },

    /// No response was obtained (connection failure, DNS, timeout).
    Transport { error: String },

    /// A successful status whose body was not the expected per-token
    /// report array.
    MalformedResponse { error: String, body: String },

    /// The remote reported this token as not deleted.
    Rejected { message: String },

    /// The per-token report omitted this token entirely.
    Omitted,
}

impl FailureReason {
    /// Returns a human-readable error message for this failure reason.
    pub fn to_error_message(&self) -> String {
        match self {
            FailureReason::HttpStatus {
                status,
                status_text,
                body,
            } => {
                format!("HTTP {} {}: {}", status, status_text, body)
            }
            FailureReason::Transport { error } => format!("Transport error: {}", error),
            FailureReason::MalformedResponse { error, body } => {
                format!("Unparseable per-token response ({}): {}", error, body)
            }
            FailureReason::Rejected { message } => {
                format!("Rejected by remote: {}", message)
            }
            FailureReason::Omitted => "Omitted from per-token response".to_string(),
        }
    }

    /// HTTP status code, when an error status was actually observed.
    pub fn status(&self) -> Option<u16> {
        match self {
            FailureReason::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Canonical status text, when an error status was actually observed.
    pub fn status_text(&self) -> Option<&str> {
        match self {
            FailureReason::HttpStatus { status_text, .. } => Some(status_text),
            _ => None,
        }
    }

    /// Free-form diagnostic column for the failures file: the response body,
    /// the transport error, or the remote's per-token message.
    pub fn detail(&self) -> String {
        match self {
            FailureReason::HttpStatus { body, .. } => body.clone(),
            FailureReason::Transport { error } => error.clone(),
            FailureReason::MalformedResponse { body, .. } => body.clone(),
            FailureReason::Rejected { message } => message.clone(),
            FailureReason::Omitted => "omitted from response".to_string(),
        }
    }
}

/// One record of a per-token report array: `{status, key, message}`.
///
/// `status` stays a plain string because only the exact value `"success"`
/// counts as success; anything else, known or not, fails the token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenReport {
    pub status: String,
    pub key: String,
    #[serde(default)]
    pub message: String,
}

impl TokenReport {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Disposition of a single token once its chunk has concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenDisposition {
    Deleted,
    Failed(FailureReason),
}

/// A token paired with its disposition, in chunk order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOutcome {
    pub token: Token,
    pub disposition: TokenDisposition,
}

/// How a dispatched chunk concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkVerdict {
    /// Every token in the chunk was deleted.
    Completed,
    /// Every token failed for one shared reason.
    Failed(FailureReason),
    /// Tokens resolved individually against a per-token report; exactly one
    /// entry per chunk token, in chunk order.
    PerToken(Vec<TokenOutcome>),
}

/// Result of dispatching one chunk. Created exactly once per chunk.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub chunk: Chunk,
    pub verdict: ChunkVerdict,
    pub dispatched_at: DateTime<Utc>,
}

impl Outcome {
    pub fn completed(chunk: Chunk, dispatched_at: DateTime<Utc>) -> Self {
        Self {
            chunk,
            verdict: ChunkVerdict::Completed,
            dispatched_at,
        }
    }

    pub fn failed(chunk: Chunk, reason: FailureReason, dispatched_at: DateTime<Utc>) -> Self {
        Self {
            chunk,
            verdict: ChunkVerdict::Failed(reason),
            dispatched_at,
        }
    }

    pub fn per_token(
        chunk: Chunk,
        outcomes: Vec<TokenOutcome>,
        dispatched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            chunk,
            verdict: ChunkVerdict::PerToken(outcomes),
            dispatched_at,
        }
    }

    /// Count of (deleted, failed) tokens in this outcome.
    pub fn tally(&self) -> (usize, usize) {
        match &self.verdict {
            ChunkVerdict::Completed => (self.chunk.len(), 0),
            ChunkVerdict::Failed(_) => (0, self.chunk.len()),
            ChunkVerdict::PerToken(outcomes) => {
                let deleted = outcomes
                    .iter()
                    .filter(|o| o.disposition == TokenDisposition::Deleted)
                    .count();
                (deleted, outcomes.len() - deleted)
            }
        }
    }
}
