//! Shared HTTP transport for the hosted providers
//!
//! Every provider client goes through [`HttpTransport`], which owns one pooled
//! `reqwest::Client`, applies the configured timeout and retries transient
//! failures at most `max_retries` times.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing::warn;

use crate::config::AppConfig;
use crate::errors::RagError;
use crate::errors::Result;

/// Which hosted service a request targets; decides the error variant on failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Embedding,
    VectorIndex,
    Llm,
}

impl Upstream {
    pub fn error(self, message: impl Into<String>) -> RagError {
        let message = message.into();
        match self {
            Self::Embedding => RagError::EmbeddingError(message),
            Self::VectorIndex => RagError::VectorIndexError(message),
            Self::Llm => RagError::LlmError(message),
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Embedding => "embedding provider",
            Self::VectorIndex => "vector index",
            Self::Llm => "language model",
        })
    }
}

/// Bounded retry with linear backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Outcome of one attempt, before deciding whether to retry
enum Failure {
    Transient(String),
    Permanent(String),
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RagError::HttpError(e.to_string()))?;

        Ok(Self { client, retry })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.http_timeout(),
            RetryPolicy {
                max_retries: config.http.max_retries,
                backoff: Duration::from_millis(config.http.retry_backoff_ms),
            },
        )
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Send a request built by `build` and decode a JSON response.
    ///
    /// `build` is invoked once per attempt so bodies never need to be cloned.
    pub async fn send_json<T, F>(&self, upstream: Upstream, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        self.send(upstream, &build, false)
            .await?
            .ok_or_else(|| upstream.error("resource not found"))
    }

    /// Like [`send_json`](Self::send_json), but a 404 yields `Ok(None)`
    pub async fn send_json_optional<T, F>(
        &self,
        upstream: Upstream,
        build: F,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        self.send(upstream, &build, true).await
    }

    async fn send<T, F>(
        &self,
        upstream: Upstream,
        build: &F,
        allow_not_found: bool,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match self.attempt(upstream, build, allow_not_found).await {
                Ok(value) => return Ok(value),
                Err(Failure::Transient(message)) if attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay(attempt);
                    warn!(
                        "Transient {} failure, retry {}/{} in {:?}: {}",
                        upstream, attempt, self.retry.max_retries, delay, message
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(Failure::Transient(message) | Failure::Permanent(message)) => {
                    return Err(upstream.error(message));
                }
            }
        }
    }

    async fn attempt<T, F>(
        &self,
        upstream: Upstream,
        build: &F,
        allow_not_found: bool,
    ) -> std::result::Result<Option<T>, Failure>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = build(&self.client).send().await.map_err(|e| {
            let message = format!("request to {upstream} failed: {e}");
            if e.is_timeout() || e.is_connect() {
                Failure::Transient(message)
            } else {
                Failure::Permanent(message)
            }
        })?;

        let status = response.status();
        debug!("{} responded with {}", upstream, status);

        if allow_not_found && status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = format!("{upstream} API error ({status}): {error_text}");
            return Err(if is_transient_status(status) {
                Failure::Transient(message)
            } else {
                Failure::Permanent(message)
            });
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| Failure::Permanent(format!("Failed to parse {upstream} response: {e}")))
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
