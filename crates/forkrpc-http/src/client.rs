//! Single-call HTTP JSON-RPC client: one POST per logical request.
//!
//! Features:
//! - Per-attempt timeout (applied by the backend)
//! - Automatic retry with exponential backoff for transient errors
//! - Catch-all RPC error codes retried, semantic RPC errors surfaced at once

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use forkrpc_core::error::{ErrorCause, TransportError};
use forkrpc_core::policy::RetryPolicy;
use forkrpc_core::request::{JsonRpcRequest, JsonRpcResponse};
use forkrpc_core::transport::RpcTransport;

use crate::backend::HttpBackend;

/// HTTP JSON-RPC client without batching.
pub struct HttpRpcClient {
    backend: Arc<dyn HttpBackend>,
    retry: RetryPolicy,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(backend: Arc<dyn HttpBackend>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            next_id: AtomicU64::new(1),
        }
    }

    /// Send one request on its own and return its `result`.
    pub async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_value(JsonRpcRequest::new(id, method, params))
            .map_err(|e| ErrorCause::Decode(e.to_string()).for_method(method))?;

        self.retry
            .run(method, || async {
                let raw = self.backend.post(&body).await?;
                decode_single(raw)
            })
            .await
            .map_err(|cause| {
                tracing::debug!(method, id, error = %cause, "request failed");
                cause.for_method(method)
            })
    }
}

fn decode_single(raw: Value) -> Result<Value, ErrorCause> {
    let resp: JsonRpcResponse =
        serde_json::from_value(raw).map_err(|e| ErrorCause::Decode(e.to_string()))?;
    resp.into_result().map_err(ErrorCause::Rpc)
}

#[async_trait]
impl RpcTransport for HttpRpcClient {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        self.send(method, params).await
    }

    fn url(&self) -> &str {
        self.backend.url()
    }
}
