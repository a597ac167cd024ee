//! forkrpc-core: foundation traits and types for forkrpc.
//!
//! # Overview
//!
//! forkrpc is the client-side JSON-RPC transport of a forking execution node.
//! The core crate defines:
//!
//! - [`RpcTransport`]: the single `request(method, params)` entry point
//! - [`JsonRpcRequest`] / [`JsonRpcResponse`]: wire types
//! - [`TransportError`] / [`ErrorCause`]: structured, cloneable errors
//! - [`policy`] module: transient-error classification and backoff
//! - [`ForkConfig`]: chain id + fork block fetched through any transport

pub mod codes;
pub mod error;
pub mod fork;
pub mod policy;
pub mod request;
pub mod transport;

pub use codes::RpcErrorCode;
pub use error::{ErrorCause, ErrorKind, TransportError};
pub use fork::{parse_hex_quantity, ForkConfig};
pub use policy::{RetryConfig, RetryPolicy};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId, RpcParam};
pub use transport::RpcTransport;
