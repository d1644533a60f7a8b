//! Transport abstraction and the retry-wrapped request pipeline.
//!
//! Providers never talk to a concrete HTTP client: they describe a request,
//! hand the [`HttpTransport`] a builder closure, and let
//! [`send_with_retries`] / [`stream_with_retries`] deal with transient
//! failures. The builder closure runs fresh on every attempt so headers and
//! bodies are never stale across retries.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::error::LLMError;
use crate::retry::RetryPolicy;

/// Enumerates HTTP methods understood by the lightweight transport abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Minimal HTTP request representation shared across providers.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Builds a POST request with a JSON request body.
    ///
    /// # Examples
    ///
    /// ```
    /// use musubi::http::{HttpMethod, HttpRequest};
    ///
    /// let request = HttpRequest::post_json("https://example.com", br"{}".to_vec());
    /// assert_eq!(request.method, HttpMethod::Post);
    /// assert_eq!(request.headers.get("Content-Type"), Some(&"application/json".to_string()));
    /// ```
    pub fn post_json(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: Some(body),
            timeout: None,
        }
    }

    /// Overrides the request headers after construction.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

/// Minimal buffered HTTP response representation.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// HTTP response that carries a streaming body.
///
/// The body stream owns the underlying connection: dropping it on any exit
/// path, including consumer cancellation, releases the connection.
pub struct HttpStreamResponse {
    pub status: u16,
    pub body: HttpBodyStream,
}

/// Alias for the body stream returned by [`HttpTransport::send_stream`].
pub type HttpBodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, LLMError>> + Send>>;

/// Transport abstraction used to decouple providers from the concrete HTTP client.
///
/// Implementations must map network failures to [`LLMError::Transport`] and
/// be safe for concurrent use by many in-flight logical requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and resolves when the full response is available.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError>;

    /// Sends a request and returns a streaming body.
    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError>;
}

/// Thread-safe handle to a transport implementation.
pub type DynHttpTransport = Arc<dyn HttpTransport>;

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Stamps the per-attempt timeout when the builder left it unset.
fn prepare_attempt(
    policy: &RetryPolicy,
    build_request: &dyn Fn() -> Result<HttpRequest, LLMError>,
) -> Result<HttpRequest, LLMError> {
    let mut request = build_request()?;
    if request.timeout.is_none() {
        request.timeout = Some(policy.timeout);
    }
    Ok(request)
}

async fn wait_before_attempt(policy: &RetryPolicy, attempt: u32) {
    if attempt == 0 {
        return;
    }
    let delay = policy.backoff_delay(attempt - 1);
    debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off before retry");
    tokio::time::sleep(delay).await;
}

/// Issues one logical buffered request with automatic retries.
///
/// Transport errors and non-2xx statuses both count as retryable failures,
/// up to `policy.max_attempts` attempts total. On final exhaustion a non-2xx
/// response surfaces as [`LLMError::HttpStatus`] carrying the drained body,
/// while a transport error is re-raised as-is. Any other error from the
/// builder or transport aborts immediately.
///
/// # Errors
///
/// Returns the classification described above; never panics on a policy with
/// zero attempts (which [`RetryPolicy::validated`] rejects anyway).
pub async fn send_with_retries(
    transport: &dyn HttpTransport,
    policy: &RetryPolicy,
    build_request: impl Fn() -> Result<HttpRequest, LLMError>,
) -> Result<Vec<u8>, LLMError> {
    let mut last_error = None;

    for attempt in 0..policy.max_attempts {
        wait_before_attempt(policy, attempt).await;
        let request = prepare_attempt(policy, &build_request)?;

        match transport.send(request).await {
            Ok(response) if is_success(response.status) => return Ok(response.body),
            Ok(response) => {
                warn!(status = response.status, attempt, "request failed with http status");
                last_error = Some(LLMError::HttpStatus {
                    status: response.status,
                    body: response.body,
                });
            }
            Err(err @ LLMError::Transport { .. }) => {
                warn!(error = %err, attempt, "request failed at transport level");
                last_error = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    Err(last_error.unwrap_or_else(|| LLMError::transport("retry policy allowed no attempts")))
}

/// Establishes one logical streaming request with automatic retries.
///
/// The retry/classification logic matches [`send_with_retries`] and applies
/// only to establishing the stream: once a response with a 2xx status is
/// returned, no further retries occur mid-stream, and partial data already
/// delivered to the caller is never replayed. A non-2xx response body is
/// drained so the resulting [`LLMError::HttpStatus`] carries it.
///
/// # Errors
///
/// Same classification as [`send_with_retries`].
pub async fn stream_with_retries(
    transport: &dyn HttpTransport,
    policy: &RetryPolicy,
    build_request: impl Fn() -> Result<HttpRequest, LLMError>,
) -> Result<HttpStreamResponse, LLMError> {
    let mut last_error = None;

    for attempt in 0..policy.max_attempts {
        wait_before_attempt(policy, attempt).await;
        let request = prepare_attempt(policy, &build_request)?;

        match transport.send_stream(request).await {
            Ok(response) if is_success(response.status) => {
                debug!(status = response.status, attempt, "stream established");
                return Ok(response);
            }
            Ok(response) => {
                warn!(status = response.status, attempt, "stream request failed with http status");
                let body = collect_error_body(response.body).await;
                last_error = Some(LLMError::HttpStatus {
                    status: response.status,
                    body,
                });
            }
            Err(err @ LLMError::Transport { .. }) => {
                warn!(error = %err, attempt, "stream request failed at transport level");
                last_error = Some(err);
            }
            Err(err) => return Err(err),
        }
    }

    Err(last_error.unwrap_or_else(|| LLMError::transport("retry policy allowed no attempts")))
}

/// Drains an error-response body, keeping whatever arrived before a mid-read
/// failure. The bytes only feed diagnostics, so a partial body is acceptable.
async fn collect_error_body(mut body: HttpBodyStream) -> Vec<u8> {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(chunk) => bytes.extend_from_slice(&chunk),
            Err(_) => break,
        }
    }
    bytes
}

pub mod reqwest;
