//! Transient-error classification and exponential backoff.

use std::future::Future;
use std::time::Duration;

use crate::error::{matches_network, matches_rate_limit, matches_timeout, ErrorCause};

/// Configuration for the retry policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the first try).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Maximum backoff delay (caps exponential growth).
    pub max_backoff: Duration,
    /// Multiplier applied to backoff on each retry.
    pub multiplier: f64,
    /// Add `jitter_fraction * backoff / 2` to every delay (0.0 = no jitter).
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1_000),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
            jitter_fraction: 0.0,
        }
    }
}

impl RetryConfig {
    /// `retry_count` retries starting at `base_delay`, doubling each time.
    pub fn exponential(retry_count: u32, base_delay: Duration) -> Self {
        Self {
            max_retries: retry_count,
            initial_backoff: base_delay,
            ..Default::default()
        }
    }
}

/// Stateless retry policy: decides *whether* to retry and *how long* to wait.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    pub config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(RetryConfig {
            max_retries: 0,
            ..Default::default()
        })
    }

    /// Returns `true` if `cause` is transient and worth resending.
    ///
    /// Rules are applied in order: RPC codes first (only the catch-all codes
    /// retry), then network, timeout, 5xx and rate-limit conditions.
    /// Everything else is a semantic failure.
    pub fn is_retryable(&self, cause: &ErrorCause) -> bool {
        match cause {
            ErrorCause::Rpc(_) => cause.rpc_code().is_some_and(|c| c.is_catch_all()),
            ErrorCause::Network(_) | ErrorCause::Timeout { .. } => true,
            ErrorCause::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            ErrorCause::MissingResponse { .. } | ErrorCause::ShuttingDown | ErrorCause::Decode(_) => {
                false
            }
            ErrorCause::Other(msg) => is_retryable_message(msg),
        }
    }

    /// Returns the delay before the `attempt`-th retry (1-based).
    /// Returns `None` if `attempt` exceeds `max_retries`.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.config.max_retries {
            return None;
        }
        let base_ms = self.config.initial_backoff.as_millis() as f64
            * self.config.multiplier.powi((attempt - 1) as i32);
        let cap_ms = self.config.max_backoff.as_millis() as f64;
        let capped = base_ms.min(cap_ms);

        let jitter_ms = capped * self.config.jitter_fraction * 0.5;
        let total_ms = (capped + jitter_ms) as u64;

        Some(Duration::from_millis(total_ms))
    }

    /// The full backoff schedule, one delay per permitted retry.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..=self.config.max_retries).filter_map(move |attempt| self.next_delay(attempt))
    }

    /// Run `op` until it succeeds, fails with a non-retryable cause, or the
    /// retry budget is spent. `label` only appears in log events.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ErrorCause>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ErrorCause>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if self.is_retryable(&e) => match self.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            target_call = label,
                            "retrying request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        if self.config.max_retries > 0 {
                            tracing::error!(
                                attempt,
                                error = %e,
                                target_call = label,
                                "max retries exceeded"
                            );
                        }
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        }
    }
}

/// Message-text rules for causes that arrived without a type.
fn is_retryable_message(msg: &str) -> bool {
    if msg.is_empty() {
        return false;
    }
    let lower = msg.to_ascii_lowercase();
    matches_network(&lower)
        || matches_timeout(&lower)
        || lower.contains("http error: 5")
        || matches_rate_limit(&lower)
}
