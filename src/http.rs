//! HTTP client abstraction for the deletion endpoint.
//!
//! This module defines the `HttpClient` trait to abstract HTTP request
//! execution, enabling testability with mock implementations. Every call in
//! this crate is the same shape: one POST of a token list to the configured
//! endpoint, authenticated with a static Basic credential.

use crate::error::Result;
use crate::token::Token;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Wire payload for one chunk: `{"tokens": [...]}`.
#[derive(Debug, Serialize)]
struct DeletePayload<'a> {
    tokens: &'a [Token],
}

/// Response from an HTTP request.
///
/// The status text is captured alongside the code because the failures audit
/// file records both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Canonical reason phrase for the status, empty when unknown
    pub status_text: String,
    /// Response body as a string
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for executing deletion requests.
///
/// This abstraction allows for different implementations (production vs.
/// testing) and makes chunk dispatch testable without real network calls.
///
/// # Example
/// ```ignore
/// let client = ReqwestHttpClient::new();
/// let response = client.execute(endpoint, auth_token, &chunk.tokens, None).await?;
/// println!("Status: {}, Body: {}", response.status, response.body);
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync + Clone {
    /// Execute one deletion request for a chunk of tokens.
    ///
    /// # Arguments
    /// * `endpoint` - Target URL, called with POST
    /// * `auth_token` - Credential for the `Authorization: Basic` header
    /// * `tokens` - The chunk's tokens, sent as the JSON payload
    /// * `timeout_ms` - Optional request timeout; `None` leaves the call unbounded
    ///
    /// # Errors
    /// Returns an error only for transport-level problems (connection,
    /// DNS, timeout) or an unserializable payload; responses with error
    /// statuses are returned as `Ok` and classified by the dispatcher.
    async fn execute(
        &self,
        endpoint: &str,
        auth_token: &str,
        tokens: &[Token],
        timeout_ms: Option<u64>,
    ) -> Result<HttpResponse>;
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Production HTTP client using reqwest.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    #[tracing::instrument(skip_all, fields(endpoint = %endpoint, tokens = tokens.len()))]
    async fn execute(
        &self,
        endpoint: &str,
        auth_token: &str,
        tokens: &[Token],
        timeout_ms: Option<u64>,
    ) -> Result<HttpResponse> {
        let body = serde_json::to_string(&DeletePayload { tokens })?;

        let mut req = self
            .client
            .post(endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Basic {auth_token}"))
            .body(body);

        if let Some(ms) = timeout_ms {
            req = req.timeout(Duration::from_millis(ms));
        }

        let response = req.send().await.map_err(|e| {
            tracing::error!(endpoint = %endpoint, error = %e, "HTTP request failed");
            e
        })?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.text().await?;

        tracing::debug!(
            status = status.as_u16(),
            response_len = body.len(),
            "HTTP request completed"
        );

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text,
            body,
        })
    }
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

/// Mock HTTP client for testing.
///
/// Responses are consumed in FIFO order, one per call, since every call in
/// this crate targets the same endpoint. Calls are recorded so tests can
/// assert on the credential and payload actually sent.
///
/// # Example
/// ```ignore
/// let mock = MockHttpClient::new();
/// mock.add_response(Ok(HttpResponse {
///     status: 200,
///     status_text: "OK".to_string(),
///     body: "[]".to_string(),
/// }));
/// ```
#[derive(Clone)]
pub struct MockHttpClient {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    in_flight: Arc<AtomicUsize>,
}

/// A mock response that can optionally wait for a trigger before completing.
enum MockResponse {
    /// Immediate response
    Immediate(Result<HttpResponse>),
    /// Response that waits for a trigger signal before completing
    Triggered {
        response: Result<HttpResponse>,
        trigger: Arc<Mutex<Option<oneshot::Receiver<()>>>>,
    },
}

/// Record of a call made to the mock HTTP client.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub endpoint: String,
    pub auth_token: String,
    pub tokens: Vec<Token>,
    pub timeout_ms: Option<u64>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a response; responses are consumed in FIFO order.
    pub fn add_response(&self, response: Result<HttpResponse>) {
        self.responses
            .lock()
            .push_back(MockResponse::Immediate(response));
    }

    /// Queue a response that will wait for a manual trigger before completing.
    ///
    /// Returns a sender that when triggered (by sending `()` or dropping)
    /// causes the blocked call to complete with the given response. This is
    /// how tests hold a chunk in flight while delivering a shutdown.
    pub fn add_response_with_trigger(&self, response: Result<HttpResponse>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.responses.lock().push_back(MockResponse::Triggered {
            response,
            trigger: Arc::new(Mutex::new(Some(rx))),
        });
        tx
    }

    /// Get all calls that have been made to this mock client.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Get the number of calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Get the number of requests currently in-flight (executing).
    ///
    /// Useful for testing interruption: an aborted call decrements this via
    /// its drop guard.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(
        &self,
        endpoint: &str,
        auth_token: &str,
        tokens: &[Token],
        timeout_ms: Option<u64>,
    ) -> Result<HttpResponse> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        // Guard to ensure we decrement even if cancelled/panicked
        let in_flight = self.in_flight.clone();
        let _guard = InFlightGuard { in_flight };

        self.calls.lock().push(MockCall {
            endpoint: endpoint.to_string(),
            auth_token: auth_token.to_string(),
            tokens: tokens.to_vec(),
            timeout_ms,
        });

        let next = self.responses.lock().pop_front();

        match next {
            Some(MockResponse::Immediate(response)) => response,
            Some(MockResponse::Triggered { response, trigger }) => {
                let rx = trigger.lock().take();
                if let Some(rx) = rx {
                    // Wait for trigger (ignore the result - we proceed either way)
                    let _ = rx.await;
                }
                response
            }
            None => Err(crate::error::SweepError::Other(anyhow::anyhow!(
                "No mock response queued for call #{}",
                self.calls.lock().len()
            ))),
        }
    }
}

/// Guard that decrements the in-flight counter when dropped.
/// This ensures the counter is decremented even if the task is cancelled or panics.
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
