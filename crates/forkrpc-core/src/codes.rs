//! Well-known JSON-RPC error codes (EIP-1474 / EIP-1193).

/// A JSON-RPC error code, named where the code is standardised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcErrorCode {
    /// `-1`, used by clients for errors they cannot attribute.
    Unknown,
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    Internal,
    InvalidInput,
    ResourceNotFound,
    ResourceUnavailable,
    TransactionRejected,
    MethodNotSupported,
    LimitExceeded,
    VersionNotSupported,
    UserRejected,
    Unauthorized,
    UnsupportedMethod,
    Disconnected,
    ChainDisconnected,
    /// Any code not in the table above.
    Other(i64),
}

impl RpcErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            -1 => Self::Unknown,
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::Internal,
            -32000 => Self::InvalidInput,
            -32001 => Self::ResourceNotFound,
            -32002 => Self::ResourceUnavailable,
            -32003 => Self::TransactionRejected,
            -32004 => Self::MethodNotSupported,
            -32005 => Self::LimitExceeded,
            -32006 => Self::VersionNotSupported,
            4001 => Self::UserRejected,
            4100 => Self::Unauthorized,
            4200 => Self::UnsupportedMethod,
            4900 => Self::Disconnected,
            4901 => Self::ChainDisconnected,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Unknown => -1,
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::Internal => -32603,
            Self::InvalidInput => -32000,
            Self::ResourceNotFound => -32001,
            Self::ResourceUnavailable => -32002,
            Self::TransactionRejected => -32003,
            Self::MethodNotSupported => -32004,
            Self::LimitExceeded => -32005,
            Self::VersionNotSupported => -32006,
            Self::UserRejected => 4001,
            Self::Unauthorized => 4100,
            Self::UnsupportedMethod => 4200,
            Self::Disconnected => 4900,
            Self::ChainDisconnected => 4901,
            Self::Other(code) => code,
        }
    }

    /// Catch-all codes that say nothing about the request itself, so a
    /// resend may succeed.
    pub fn is_catch_all(self) -> bool {
        matches!(
            self,
            Self::Unknown | Self::MethodNotSupported | Self::LimitExceeded | Self::Internal
        )
    }
}

impl std::fmt::Display for RpcErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unknown => "unknown error",
            Self::ParseError => "parse error",
            Self::InvalidRequest => "invalid request",
            Self::MethodNotFound => "method not found",
            Self::InvalidParams => "invalid params",
            Self::Internal => "internal error",
            Self::InvalidInput => "invalid input",
            Self::ResourceNotFound => "resource not found",
            Self::ResourceUnavailable => "resource unavailable",
            Self::TransactionRejected => "transaction rejected",
            Self::MethodNotSupported => "method not supported",
            Self::LimitExceeded => "limit exceeded",
            Self::VersionNotSupported => "JSON-RPC version not supported",
            Self::UserRejected => "user rejected request",
            Self::Unauthorized => "unauthorized",
            Self::UnsupportedMethod => "unsupported method",
            Self::Disconnected => "disconnected",
            Self::ChainDisconnected => "chain disconnected",
            Self::Other(code) => return write!(f, "code {code}"),
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip_through_table() {
        for code in [-1, -32700, -32603, -32000, -32005, 4001, 4901, 12345] {
            assert_eq!(RpcErrorCode::from_code(code).code(), code);
        }
    }

    #[test]
    fn only_catch_all_codes_are_flagged() {
        assert!(RpcErrorCode::from_code(-32603).is_catch_all());
        assert!(RpcErrorCode::from_code(-32005).is_catch_all());
        assert!(RpcErrorCode::from_code(-32004).is_catch_all());
        assert!(RpcErrorCode::from_code(-1).is_catch_all());
        assert!(!RpcErrorCode::from_code(-32000).is_catch_all());
        assert!(!RpcErrorCode::from_code(-32600).is_catch_all());
        assert!(!RpcErrorCode::from_code(3).is_catch_all());
    }
}
