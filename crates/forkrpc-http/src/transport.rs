//! `HttpTransport`: the one entry point regardless of batching mode.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use forkrpc_core::error::TransportError;
use forkrpc_core::transport::RpcTransport;

use crate::backend::{HttpBackend, ReqwestBackend};
use crate::batch::BatchDispatcher;
use crate::client::HttpRpcClient;
use crate::config::{ConfigError, TransportConfig};

enum Mode {
    Single(HttpRpcClient),
    Batched(BatchDispatcher),
}

/// HTTP JSON-RPC transport.
///
/// Without a [`BatchConfig`](crate::BatchConfig) every request is its own
/// POST. With one, requests are coalesced by a [`BatchDispatcher`]; call
/// [`HttpTransport::shutdown`] before dropping it to flush what is queued.
pub struct HttpTransport {
    url: String,
    mode: Mode,
}

impl HttpTransport {
    /// Build a `reqwest`-backed transport. Batching mode spawns a Tokio task,
    /// so this must run inside a runtime.
    pub fn new(config: TransportConfig) -> Result<Self, ConfigError> {
        let backend = Arc::new(ReqwestBackend::new(&config)?);
        Self::with_backend(backend, &config)
    }

    /// Build a transport over any [`HttpBackend`].
    pub fn with_backend(
        backend: Arc<dyn HttpBackend>,
        config: &TransportConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let retry = config.retry_policy();
        let mode = match config.batch {
            Some(batch) => {
                tracing::debug!(
                    url = %config.url,
                    wait_ms = batch.wait_ms,
                    max_size = batch.max_size,
                    "batching enabled"
                );
                Mode::Batched(BatchDispatcher::spawn(backend, retry, batch))
            }
            None => Mode::Single(HttpRpcClient::new(backend, retry)),
        };
        Ok(Self {
            url: config.url.clone(),
            mode,
        })
    }

    pub async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        match &self.mode {
            Mode::Single(client) => client.send(method, params).await,
            Mode::Batched(dispatcher) => dispatcher.request(method, params).await,
        }
    }

    pub fn is_batching(&self) -> bool {
        matches!(self.mode, Mode::Batched(_))
    }

    /// Flush queued requests and stop the batch worker. No-op without batching.
    pub async fn shutdown(&self) {
        if let Mode::Batched(dispatcher) = &self.mode {
            dispatcher.shutdown().await;
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        HttpTransport::request(self, method, params).await
    }

    fn url(&self) -> &str {
        &self.url
    }
}
