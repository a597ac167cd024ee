//! Fork configuration read from a remote node.
//!
//! A forking node needs two facts before it can start: the remote chain id and
//! the block to fork from. Both come from one round of RPC calls, issued
//! concurrently so that a batching transport can coalesce them.

use futures::future;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorCause, TransportError};
use crate::transport::RpcTransport;

/// Chain id and fork block of a remote node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkConfig {
    pub chain_id: u64,
    pub block_number: u64,
}

impl ForkConfig {
    /// Fetch `eth_chainId` and `eth_blockNumber` in parallel.
    pub async fn from_rpc<T>(transport: &T) -> Result<Self, TransportError>
    where
        T: RpcTransport + ?Sized,
    {
        let (chain_id, block_number) = future::try_join(
            transport.request("eth_chainId", vec![]),
            transport.request("eth_blockNumber", vec![]),
        )
        .await?;

        let chain_id = parse_quantity_value(&chain_id).map_err(|e| {
            ErrorCause::Decode(format!("Failed to parse chain ID: {e}")).for_method("eth_chainId")
        })?;
        let block_number = parse_quantity_value(&block_number).map_err(|e| {
            ErrorCause::Decode(format!("Failed to parse block number: {e}"))
                .for_method("eth_blockNumber")
        })?;

        tracing::debug!(chain_id, block_number, url = transport.url(), "fork config loaded");
        Ok(Self {
            chain_id,
            block_number,
        })
    }
}

/// Parse a `0x`-prefixed hex quantity such as `"0x112a880"`.
pub fn parse_hex_quantity(s: &str) -> Result<u64, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| format!("`{s}` is not 0x-prefixed"))?;
    if digits.is_empty() {
        return Err(format!("`{s}` has no digits"));
    }
    u64::from_str_radix(digits, 16).map_err(|e| format!("`{s}`: {e}"))
}

fn parse_quantity_value(value: &Value) -> Result<u64, String> {
    match value {
        Value::String(s) => parse_hex_quantity(s),
        other => Err(format!("expected hex string, got {other}")),
    }
}
