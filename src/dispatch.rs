//! Chunk dispatch and response classification.
//!
//! [`Dispatcher`] owns the remote-facing half of a run: it paces requests,
//! sends each chunk through the [`HttpClient`] seam, and normalizes whatever
//! comes back into a single [`Outcome`]. Classification never fails; every
//! error path collapses into a [`FailureReason`] so the caller always gets
//! exactly one outcome per chunk.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;

use crate::chunk::Chunk;
use crate::config::{ResponseMode, RunConfig};
use crate::http::{HttpClient, HttpResponse};
use crate::outcome::{
    ChunkVerdict, FailureReason, Outcome, TokenDisposition, TokenOutcome, TokenReport,
};

/// Sends chunks to the deletion endpoint and classifies the responses.
#[derive(Debug, Clone)]
pub struct Dispatcher<H: HttpClient> {
    http: H,
    endpoint: String,
    auth_token: String,
    mode: ResponseMode,
    delay: Duration,
    timeout_ms: Option<u64>,
}

impl<H: HttpClient> Dispatcher<H> {
    pub fn new(http: H, config: &RunConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint.clone(),
            auth_token: config.auth_token.clone(),
            mode: config.response_mode,
            delay: Duration::from_millis(config.time_ms_between_requests),
            timeout_ms: config.request_timeout_ms,
        }
    }

    /// Dispatches one chunk and returns its outcome.
    ///
    /// The pacing gap is awaited before every request, including the first.
    #[tracing::instrument(skip_all, fields(chunk = chunk.index, tokens = chunk.len()))]
    pub async fn dispatch(&self, chunk: Chunk) -> Outcome {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let dispatched_at = Utc::now();
        tracing::debug!("Dispatching chunk");

        let response = match self
            .http
            .execute(&self.endpoint, &self.auth_token, &chunk.tokens, self.timeout_ms)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let reason = FailureReason::Transport {
                    error: e.to_string(),
                };
                tracing::warn!(
                    error = %reason.to_error_message(),
                    "Chunk failed before a response was received"
                );
                return Outcome::failed(chunk, reason, dispatched_at);
            }
        };

        let verdict = classify(&chunk, &response, self.mode);
        Outcome {
            chunk,
            verdict,
            dispatched_at,
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Turns an HTTP response into a chunk verdict.
///
/// Error statuses fail the whole chunk regardless of mode; the per-token
/// report is only consulted on a successful status.
fn classify(chunk: &Chunk, response: &HttpResponse, mode: ResponseMode) -> ChunkVerdict {
    if !response.is_success() {
        let reason = FailureReason::HttpStatus {
            status: response.status,
            status_text: response.status_text.clone(),
            body: response.body.clone(),
        };
        tracing::warn!(
            chunk = chunk.index,
            status = response.status,
            error = %reason.to_error_message(),
            "Chunk rejected with error status"
        );
        return ChunkVerdict::Failed(reason);
    }

    match mode {
        ResponseMode::WholeChunk => ChunkVerdict::Completed,
        ResponseMode::PerToken => classify_reports(chunk, &response.body),
    }
}

/// Resolves each chunk token against the per-token report array.
///
/// Tokens the report does not mention fail as omitted; report entries for
/// keys outside the chunk are logged and dropped. Duplicate keys keep their
/// first entry.
fn classify_reports(chunk: &Chunk, body: &str) -> ChunkVerdict {
    let reports: Vec<TokenReport> = match serde_json::from_str(body) {
        Ok(reports) => reports,
        Err(e) => {
            let reason = FailureReason::MalformedResponse {
                error: e.to_string(),
                body: body.to_string(),
            };
            tracing::warn!(
                chunk = chunk.index,
                error = %reason.to_error_message(),
                "Successful status but unparseable per-token body"
            );
            return ChunkVerdict::Failed(reason);
        }
    };

    let mut by_key: HashMap<&str, &TokenReport> = HashMap::with_capacity(reports.len());
    for report in &reports {
        if chunk.tokens.iter().all(|t| t.as_str() != report.key) {
            tracing::warn!(
                chunk = chunk.index,
                key = %report.key,
                "Report entry for a token outside this chunk, dropping"
            );
            continue;
        }
        by_key.entry(report.key.as_str()).or_insert(report);
    }

    let outcomes = chunk
        .tokens
        .iter()
        .map(|token| {
            let disposition = match by_key.get(token.as_str()) {
                Some(report) if report.is_success() => TokenDisposition::Deleted,
                Some(report) => TokenDisposition::Failed(FailureReason::Rejected {
                    message: report.message.clone(),
                }),
                None => TokenDisposition::Failed(FailureReason::Omitted),
            };
            TokenOutcome {
                token: token.clone(),
                disposition,
            }
        })
        .collect();

    ChunkVerdict::PerToken(outcomes)
}
