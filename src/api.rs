//! Outbound JSON requests with exponential backoff retry logic.
//!
//! # Architecture
//!
//! The module uses a small trait-based design:
//! - [`SendRequest`]: core trait for an async request producing a response
//! - [`JsonGet`]: a GET request against a news API returning parsed JSON
//! - [`RetrySend`]: decorator that adds retry logic to any `SendRequest`
//!
//! # Retry Strategy
//!
//! - Transport errors, HTTP 429 and HTTP 5xx are retried
//! - Other HTTP errors (bad key, bad query) fail immediately
//! - Exponential backoff from `base_delay`, capped at 5 seconds
//! - Random jitter (0-100ms) added to each delay

use rand::{Rng, rng};
use reqwest::Client;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

use crate::config::Config;
use crate::error::{NewsdeskError, Result};

const USER_AGENT: &str = concat!("newsdesk/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client with the configured timeout.
pub fn build_client(config: &Config) -> Result<Client> {
    Ok(Client::builder()
        .timeout(config.request_timeout())
        .connect_timeout(config.request_timeout())
        .user_agent(USER_AGENT)
        .build()?)
}

/// Retry settings shared by every source adapter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(250),
        }
    }
}

/// An async request that can be attempted more than once.
pub trait SendRequest {
    type Response;

    async fn send(&self) -> Result<Self::Response>;
}

/// Decorator adding exponential backoff to an inner [`SendRequest`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..100ms)
/// ```
pub struct RetrySend<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T: SendRequest> RetrySend<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self {
            inner,
            max_retries: policy.max_retries,
            base_delay: policy.base_delay,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl<T> fmt::Debug for RetrySend<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySend")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> SendRequest for RetrySend<T>
where
    T: SendRequest + fmt::Debug,
{
    type Response = T::Response;

    async fn send(&self) -> Result<Self::Response> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.send().await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let total_ms = total_t0.elapsed().as_millis();

                    if !is_retryable(&e) || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_ms,
                            error = %e,
                            request = ?self.inner,
                            "request failed; giving up"
                        );
                        return Err(e);
                    }

                    let exp = u32::try_from(attempt - 1).unwrap_or(u32::MAX).min(16);
                    let delay = self.base_delay.saturating_mul(1 << exp).min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=100);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_ms,
                        ?delay,
                        error = %e,
                        "request attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

fn is_retryable(e: &NewsdeskError) -> bool {
    match e {
        NewsdeskError::Http(_) => true,
        NewsdeskError::HttpStatus { status, .. } => {
            status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
        }
        _ => false,
    }
}

/// A GET request against a news API that answers with JSON.
pub struct JsonGet<'a> {
    pub client: &'a Client,
    pub source_name: &'static str,
    pub url: &'a str,
    pub headers: Vec<(&'static str, String)>,
    pub query: Vec<(&'static str, String)>,
}

impl fmt::Debug for JsonGet<'_> {
    // Header values carry API keys; only their names are logged.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(k, _)| *k).collect();
        let query_names: Vec<&str> = self.query.iter().map(|(k, _)| *k).collect();
        f.debug_struct("JsonGet")
            .field("source", &self.source_name)
            .field("url", &self.url)
            .field("headers", &header_names)
            .field("query", &query_names)
            .finish()
    }
}

impl SendRequest for JsonGet<'_> {
    type Response = serde_json::Value;

    async fn send(&self) -> Result<Self::Response> {
        let mut request = self.client.get(self.url).query(&self.query);
        for (name, value) in &self.headers {
            request = request.header(*name, value);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(source = self.source_name, %status, body = %crate::utils::truncate_for_log(&body, 300), "Non-success response");
            return Err(NewsdeskError::HttpStatus {
                source_name: self.source_name,
                status,
            });
        }
        Ok(response.json().await?)
    }
}

/// GET `request` with the retry policy applied.
#[instrument(level = "info", skip_all, fields(source = request.source_name))]
pub async fn get_json_with_backoff(
    request: JsonGet<'_>,
    policy: RetryPolicy,
) -> Result<serde_json::Value> {
    let t0 = Instant::now();
    let res = RetrySend::new(request, policy).send().await;
    debug!(elapsed_ms_total = t0.elapsed().as_millis(), ok = res.is_ok(), "get_json_with_backoff finished");
    res
}
