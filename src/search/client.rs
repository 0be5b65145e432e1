//! Retry-aware HTTP fetching.
//!
//! The fetch client is the only part of the search pipeline that sleeps. It issues one GET at
//! a time through an [`HttpTransport`], retries transient failures (transport errors, 429 and
//! 500-504) with exponential backoff, and hands back a uniform [`HttpOutcome`].

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::logging::redact_secrets;

/// Result of a single GET (or of a retried sequence of GETs)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpOutcome {
    /// HTTP status code; zero or negative means the request never got a response
    pub status: i32,
    pub body: String,
    pub content_type: String,
    /// Raw `Retry-After` header value, if any
    pub retry_after: Option<String>,
    /// Transport or retry-budget error text
    pub error: String,
    pub success: bool,
    /// Number of requests issued to produce this outcome
    pub attempts: u32,
}

impl HttpOutcome {
    /// Outcome for a request that failed before any response arrived.
    pub fn transport_failure(error: impl Into<String>) -> Self {
        Self {
            status: 0,
            error: error.into(),
            ..Self::default()
        }
    }

    /// Outcome for a response with the given status and body.
    pub fn from_response(status: i32, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            success: (200..300).contains(&status),
            ..Self::default()
        }
    }

    pub fn with_retry_after(mut self, value: impl Into<String>) -> Self {
        self.retry_after = Some(value.into());
        self
    }

    /// Transport failures, rate limiting and 500-504 are worth another attempt.
    pub fn is_retryable(status: i32) -> bool {
        status <= 0 || status == 429 || (500..=504).contains(&status)
    }

    /// Server-requested delay, honored only on 429 with a positive whole number of seconds.
    pub fn retry_after_delay(&self) -> Option<Duration> {
        if self.status != 429 {
            return None;
        }
        let secs: u64 = self.retry_after.as_deref()?.trim().parse().ok()?;
        (secs > 0).then(|| Duration::from_secs(secs))
    }

    /// Best human-readable explanation of a failed outcome.
    ///
    /// Prefers the API's own `error.message`, then the transport error, then the raw body.
    pub fn detail(&self) -> String {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&self.body) {
            if let Some(message) = json["error"]["message"].as_str() {
                return message.to_string();
            }
        }
        if !self.error.is_empty() {
            return self.error.clone();
        }
        let body = self.body.trim();
        if !body.is_empty() {
            return body.chars().take(500).collect();
        }
        format!("HTTP {}", self.status)
    }
}

/// Backoff settings for transient failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    /// Ceiling for computed backoff
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            backoff_multiplier: 2.0,
            max_backoff_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// Computed wait after the 0-indexed failed `attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = raw.min(self.max_backoff_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Wait before retrying `outcome`; a valid Retry-After on 429 replaces the computed backoff.
    pub fn delay_for(&self, outcome: &HttpOutcome, attempt: u32) -> Duration {
        outcome
            .retry_after_delay()
            .unwrap_or_else(|| self.backoff_for(attempt))
    }
}

/// Cooperative cancellation shared between a caller and one planning invocation.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Raw GET transport - swapped for a scripted one in tests
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue one GET. Never fails: transport errors come back as status 0.
    async fn get(&self, url: &str) -> HttpOutcome;
}

/// Production transport backed by `reqwest`
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> HttpOutcome {
        let response = match self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return HttpOutcome::transport_failure(redact_secrets(&e.to_string()));
            }
        };

        let status = i32::from(response.status().as_u16());
        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(reqwest::header::CONTENT_TYPE).unwrap_or_default();
        let retry_after = header(reqwest::header::RETRY_AFTER);

        let mut outcome = match response.text().await {
            Ok(body) => HttpOutcome::from_response(status, body),
            Err(e) => HttpOutcome {
                status,
                error: format!("Failed to read response body: {e}"),
                ..HttpOutcome::default()
            },
        };
        outcome.content_type = content_type;
        outcome.retry_after = retry_after;
        outcome
    }
}

/// Retrying wrapper around an [`HttpTransport`]
#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn HttpTransport>,
}

impl FetchClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Fetch `url`, retrying transient failures according to `policy`.
    ///
    /// Non-retryable failures return immediately. Once the retry budget is spent, the last
    /// outcome is returned with its `error` describing the exhausted budget.
    pub async fn fetch(&self, url: &str, policy: &RetryPolicy) -> HttpOutcome {
        self.fetch_cancellable(url, policy, &CancelFlag::new()).await
    }

    /// [`fetch`](Self::fetch), checking `cancel` before every backoff sleep.
    ///
    /// A cancellation returns the last outcome as-is; callers check their [`CancelFlag`] to
    /// tell it apart from an exhausted budget. A request already in flight is not interrupted.
    pub async fn fetch_cancellable(
        &self,
        url: &str,
        policy: &RetryPolicy,
        cancel: &CancelFlag,
    ) -> HttpOutcome {
        let mut attempt: u32 = 0;

        loop {
            let mut outcome = self.transport.get(url).await;
            outcome.attempts = attempt + 1;

            if outcome.success {
                return outcome;
            }

            if !HttpOutcome::is_retryable(outcome.status) {
                tracing::debug!(status = outcome.status, "non-retryable response");
                return outcome;
            }

            if attempt >= policy.max_retries {
                tracing::warn!(
                    status = outcome.status,
                    attempts = outcome.attempts,
                    url = %redact_secrets(url),
                    "retry budget exhausted"
                );
                let last = if outcome.error.is_empty() {
                    format!("last status {}", outcome.status)
                } else {
                    outcome.error.clone()
                };
                outcome.error = format!(
                    "Max retries exceeded for URL: {} ({last})",
                    redact_secrets(url)
                );
                return outcome;
            }

            let wait = policy.delay_for(&outcome, attempt);

            if cancel.is_cancelled() {
                outcome.error = "cancelled while waiting to retry".to_string();
                return outcome;
            }

            tracing::warn!(
                status = outcome.status,
                attempt,
                wait_ms = wait.as_millis() as u64,
                "transient search api failure, backing off"
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}
