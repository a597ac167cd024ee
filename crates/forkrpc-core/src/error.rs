//! Transport-level error types.
//!
//! Every failure a caller sees is a [`TransportError`]: the caller's own
//! method name plus an [`ErrorCause`]. Causes are `Clone` so that a single
//! batch-level fault can be handed to every request in the batch.

use thiserror::Error;

use crate::codes::RpcErrorCode;
use crate::request::JsonRpcError;

/// Coarse classification of an [`ErrorCause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection refused/reset, DNS failure.
    Network,
    /// The per-attempt deadline elapsed.
    Timeout,
    /// Non-2xx HTTP status other than 429.
    HttpStatus,
    /// HTTP 429 or explicit rate-limit text.
    RateLimited,
    /// The node answered with a JSON-RPC `error` object.
    Rpc,
    /// A batched response had no entry for one of our ids.
    Correlation,
    /// The transport is shutting down and refused new work.
    Shutdown,
    /// A body or result could not be decoded.
    Decode,
    /// Anything else.
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::HttpStatus => "http-status",
            Self::RateLimited => "rate-limited",
            Self::Rpc => "rpc",
            Self::Correlation => "correlation",
            Self::Shutdown => "shutdown",
            Self::Decode => "decode",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// The underlying reason a request failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorCause {
    /// Connection refused/reset, DNS lookup failure, broken socket.
    #[error("network error: {0}")]
    Network(String),

    /// The HTTP call did not complete within its deadline.
    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The server answered with a non-2xx status.
    #[error("HTTP error: {status} {reason}")]
    HttpStatus { status: u16, reason: String },

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// A batched response did not contain an entry for this request.
    #[error("No response found for request id {id}")]
    MissingResponse { id: u64 },

    /// The transport refused the request because teardown has begun.
    #[error("transport is shutting down")]
    ShuttingDown,

    /// A response body or result value could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// An unclassified error; retry decisions fall back to its message.
    #[error("{0}")]
    Other(String),
}

impl ErrorCause {
    /// Build a cause from free-form error text.
    ///
    /// Recognisable network, timeout and HTTP-status messages become typed
    /// variants; everything else is kept verbatim as [`ErrorCause::Other`].
    pub fn from_message(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        let lower = msg.to_ascii_lowercase();
        if matches_network(&lower) {
            Self::Network(msg)
        } else if matches_timeout(&lower) {
            Self::Timeout { ms: 0 }
        } else if let Some(status) = parse_http_status(&lower) {
            Self::HttpStatus {
                status,
                reason: msg,
            }
        } else {
            Self::Other(msg)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::HttpStatus { status: 429, .. } => ErrorKind::RateLimited,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::Rpc(_) => ErrorKind::Rpc,
            Self::MissingResponse { .. } => ErrorKind::Correlation,
            Self::ShuttingDown => ErrorKind::Shutdown,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// The JSON-RPC error code, if the node supplied one.
    pub fn rpc_code(&self) -> Option<RpcErrorCode> {
        match self {
            Self::Rpc(err) => Some(RpcErrorCode::from_code(err.code)),
            _ => None,
        }
    }

    /// Attach the logical method this cause belongs to.
    pub fn for_method(self, method: impl Into<String>) -> TransportError {
        TransportError::new(method, self)
    }
}

/// A failed logical request: which method failed and why.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("request `{method}` failed: {cause}")]
pub struct TransportError {
    /// The method of the logical call this error is reported to.
    pub method: String,
    #[source]
    pub cause: ErrorCause,
}

impl TransportError {
    pub fn new(method: impl Into<String>, cause: ErrorCause) -> Self {
        Self {
            method: method.into(),
            cause,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }

    /// Returns `true` if this is a node-side rejection (never retried).
    pub fn is_rpc_error(&self) -> bool {
        matches!(self.cause, ErrorCause::Rpc(_))
    }
}

pub(crate) const NETWORK_PATTERNS: &[&str] = &[
    "fetch failed",
    "network",
    "econnrefused",
    "econnreset",
    "etimedout",
    "enotfound",
    "socket hang up",
];

pub(crate) const TIMEOUT_PATTERNS: &[&str] = &["abort", "timeout", "timed out"];

pub(crate) const RATE_LIMIT_PATTERNS: &[&str] = &["429", "rate limit", "too many requests"];

pub(crate) fn matches_network(lower: &str) -> bool {
    NETWORK_PATTERNS.iter().any(|p| lower.contains(p))
}

pub(crate) fn matches_timeout(lower: &str) -> bool {
    TIMEOUT_PATTERNS.iter().any(|p| lower.contains(p))
}

pub(crate) fn matches_rate_limit(lower: &str) -> bool {
    RATE_LIMIT_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Extracts the status from text shaped like `http error: 503 ...`.
fn parse_http_status(lower: &str) -> Option<u16> {
    let rest = &lower[lower.find("http error: ")? + "http error: ".len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() != 3 {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_message_classifies_network_text() {
        let cause = ErrorCause::from_message("fetch failed: ECONNREFUSED");
        assert_eq!(cause.kind(), ErrorKind::Network);
    }

    #[test]
    fn from_message_classifies_abort_as_timeout() {
        assert_eq!(ErrorCause::from_message("aborted").kind(), ErrorKind::Timeout);
    }

    #[test]
    fn from_message_parses_http_status() {
        let cause = ErrorCause::from_message("HTTP error: 503 Service Unavailable");
        assert!(matches!(cause, ErrorCause::HttpStatus { status: 503, .. }));
        let cause = ErrorCause::from_message("HTTP error: 429 Too Many Requests");
        assert_eq!(cause.kind(), ErrorKind::RateLimited);
    }

    #[test]
    fn unknown_text_stays_other() {
        let cause = ErrorCause::from_message("insufficient funds for gas");
        assert_eq!(cause, ErrorCause::Other("insufficient funds for gas".into()));
    }

    #[test]
    fn transport_error_keeps_method_and_cause() {
        let err = ErrorCause::MissingResponse { id: 2 }.for_method("eth_blockNumber");
        assert_eq!(err.method, "eth_blockNumber");
        assert_eq!(err.kind(), ErrorKind::Correlation);
        assert!(err.to_string().contains("No response found for request id 2"));
    }

    #[test]
    fn http_status_display_matches_retry_pattern() {
        let cause = ErrorCause::HttpStatus {
            status: 500,
            reason: "Internal Server Error".into(),
        };
        assert!(cause.to_string().to_ascii_lowercase().starts_with("http error: 5"));
    }
}
