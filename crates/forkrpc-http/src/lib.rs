//! forkrpc-http: HTTP JSON-RPC transport for forkrpc.
//!
//! - [`HttpTransport`]: the facade: one `request(method, params)` for both modes
//! - [`HttpRpcClient`]: one POST per request, with timeout and retry
//! - [`BatchDispatcher`]: queue + background worker that coalesces requests
//! - [`HttpBackend`] / [`ReqwestBackend`]: the physical POST
//! - [`TransportConfig`] / [`BatchConfig`]: configuration

pub mod backend;
pub mod batch;
pub mod client;
pub mod config;
pub mod transport;

#[cfg(test)]
mod mock;

pub use backend::{HttpBackend, ReqwestBackend};
pub use batch::{BatchDispatcher, ResponseHandle};
pub use client::HttpRpcClient;
pub use config::{BatchConfig, ConfigError, TransportConfig};
pub use transport::HttpTransport;
