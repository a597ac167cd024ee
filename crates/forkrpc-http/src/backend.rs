//! The physical HTTP POST, shared by the single-call and batching paths.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

use forkrpc_core::error::ErrorCause;

use crate::config::{ConfigError, TransportConfig};

/// One JSON body out, one JSON body back.
///
/// Implementations apply their own per-call timeout and map transport
/// failures onto [`ErrorCause`]; they never retry.
#[async_trait]
pub trait HttpBackend: Send + Sync + 'static {
    async fn post(&self, body: &Value) -> Result<Value, ErrorCause>;

    fn url(&self) -> &str;
}

/// `reqwest`-backed [`HttpBackend`].
pub struct ReqwestBackend {
    url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl ReqwestBackend {
    pub fn new(config: &TransportConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &config.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            headers.insert(header_name, header_value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            url: config.url.clone(),
            http,
            timeout: config.timeout(),
        })
    }

    async fn post_once(&self, body: &Value) -> Result<Value, ErrorCause> {
        let resp = self
            .http
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ErrorCause::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| self.map_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| ErrorCause::Decode(e.to_string()))
    }

    fn timed_out(&self) -> ErrorCause {
        ErrorCause::Timeout {
            ms: self.timeout.as_millis() as u64,
        }
    }

    fn map_error(&self, e: reqwest::Error) -> ErrorCause {
        if e.is_timeout() {
            self.timed_out()
        } else if e.is_connect() || e.is_request() {
            ErrorCause::Network(e.to_string())
        } else if e.is_decode() {
            ErrorCause::Decode(e.to_string())
        } else {
            ErrorCause::from_message(e.to_string())
        }
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn post(&self, body: &Value) -> Result<Value, ErrorCause> {
        // The deadline covers this one attempt, not the caller's retry loop.
        match tokio::time::timeout(self.timeout, self.post_once(body)).await {
            Ok(result) => result,
            Err(_) => Err(self.timed_out()),
        }
    }

    fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_header_names() {
        let config = TransportConfig::new("http://127.0.0.1:8545").with_header("bad header", "x");
        let err = ReqwestBackend::new(&config).err().unwrap();
        assert!(matches!(err, ConfigError::InvalidHeader { ref name, .. } if name == "bad header"));
    }

    #[test]
    fn accepts_custom_headers() {
        let config = TransportConfig::new("http://127.0.0.1:8545")
            .with_header("Authorization", "Bearer token123");
        let backend = ReqwestBackend::new(&config).unwrap();
        assert_eq!(backend.url(), "http://127.0.0.1:8545");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        // Port 9 (discard) on loopback is closed on CI machines.
        let config = TransportConfig::new("http://127.0.0.1:9").with_timeout(Duration::from_secs(5));
        let backend = ReqwestBackend::new(&config).unwrap();
        let err = backend.post(&serde_json::json!({})).await.unwrap_err();
        assert!(
            matches!(err, ErrorCause::Network(_) | ErrorCause::Timeout { .. }),
            "unexpected cause: {err:?}"
        );
    }

    #[tokio::test]
    async fn reqwest_timeouts_report_the_configured_deadline() {
        // Accepts the connection but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _silent = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let config = TransportConfig::new(format!("http://{addr}"))
            .with_timeout(Duration::from_millis(250));
        let backend = ReqwestBackend::new(&config).unwrap();
        let err = reqwest::Client::new()
            .post(backend.url())
            .timeout(Duration::from_millis(20))
            .send()
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        let cause = backend.map_error(err);
        assert_eq!(cause, ErrorCause::Timeout { ms: 250 });
        assert_eq!(cause.to_string(), "request timed out after 250ms");
    }
}
