//! Transport configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use forkrpc_core::policy::{RetryConfig, RetryPolicy};

/// Invalid transport configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid RPC url `{0}`: expected an http:// or https:// URL")]
    InvalidUrl(String),

    #[error("batch max_size must be at least 1")]
    ZeroBatchSize,

    #[error("invalid header `{name}`: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Request coalescing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// How long a request may sit queued before a flush is forced.
    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,
    /// Most requests carried by one physical call. Reaching it flushes early.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
}

fn default_wait_ms() -> u64 { 10 }
fn default_max_size() -> usize { 100 }

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            wait_ms: default_wait_ms(),
            max_size: default_max_size(),
        }
    }
}

impl BatchConfig {
    pub fn new(wait: Duration, max_size: usize) -> Self {
        Self {
            wait_ms: wait.as_millis() as u64,
            max_size,
        }
    }

    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
}

/// Configuration for an [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// JSON-RPC endpoint.
    pub url: String,
    /// Deadline for each individual HTTP attempt.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries after the first attempt for transient failures.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Extra headers merged into every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Absent: one HTTP call per request. Present: auto-batching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchConfig>,
}

fn default_timeout_ms() -> u64 { 30_000 }
fn default_retry_count() -> u32 { 3 }
fn default_retry_delay_ms() -> u64 { 1_000 }

impl TransportConfig {
    /// Non-batching configuration with default timeout and retries.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: default_timeout_ms(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
            headers: HashMap::new(),
            batch: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_retries(mut self, retry_count: u32, retry_delay: Duration) -> Self {
        self.retry_count = retry_count;
        self.retry_delay_ms = retry_delay.as_millis() as u64;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_batch(mut self, batch: BatchConfig) -> Self {
        self.batch = Some(batch);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(RetryConfig::exponential(
            self.retry_count,
            Duration::from_millis(self.retry_delay_ms),
        ))
    }

    /// Check the invariants that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let host = self
            .url
            .strip_prefix("http://")
            .or_else(|| self.url.strip_prefix("https://"));
        if host.map_or(true, str::is_empty) {
            return Err(ConfigError::InvalidUrl(self.url.clone()));
        }
        if let Some(batch) = &self.batch {
            if batch.max_size == 0 {
                return Err(ConfigError::ZeroBatchSize);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = TransportConfig::new("https://rpc.example.com");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.retry_delay_ms, 1_000);
        assert!(config.batch.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserialize_fills_defaults() {
        let config: TransportConfig = serde_json::from_str(
            r#"{"url": "http://127.0.0.1:8545", "batch": {"max_size": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(
            config.batch,
            Some(BatchConfig {
                wait_ms: 10,
                max_size: 2
            })
        );
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = TransportConfig::new("https://rpc.example.com")
            .with_batch(BatchConfig::new(Duration::from_millis(5), 0));
        assert!(matches!(config.validate(), Err(ConfigError::ZeroBatchSize)));
    }

    #[test]
    fn non_http_url_is_rejected() {
        for url in ["", "wss://rpc.example.com", "rpc.example.com", "http://"] {
            let config = TransportConfig::new(url);
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidUrl(_))),
                "{url} accepted"
            );
        }
    }

    #[test]
    fn retry_policy_follows_config() {
        let policy = TransportConfig::new("https://rpc.example.com")
            .with_retries(2, Duration::from_millis(10))
            .retry_policy();
        let schedule: Vec<Duration> = policy.schedule().collect();
        assert_eq!(
            schedule,
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
    }
}
