//! The `RpcTransport` trait: the single entry point every consumer uses.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ErrorCause, TransportError};

/// The central async trait every RPC transport implements.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` for use across Tokio tasks.
///
/// # Object Safety
/// `request` and `url` are object-safe, so transports can be stored as
/// `Arc<dyn RpcTransport>`. [`RpcTransport::request_as`] is only available on
/// sized implementors.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Issue one logical JSON-RPC call and return its `result` value.
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError>;

    /// Return the transport's identifier (URL or name).
    fn url(&self) -> &str;

    /// Convenience: call a method and deserialize the result.
    async fn request_as<T>(&self, method: &str, params: Vec<Value>) -> Result<T, TransportError>
    where
        Self: Sized,
        T: DeserializeOwned + Send,
    {
        let value = self.request(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| ErrorCause::Decode(e.to_string()).for_method(method))
    }
}

#[async_trait]
impl<T: RpcTransport + ?Sized> RpcTransport for std::sync::Arc<T> {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, TransportError> {
        (**self).request(method, params).await
    }

    fn url(&self) -> &str {
        (**self).url()
    }
}
