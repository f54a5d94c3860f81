//! Error types: per-attempt transport failures and caller-facing call errors.

use thiserror::Error;

use crate::request::JsonRpcError;

/// Errors produced by a single attempt against a single endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed before a response arrived (connection refused,
    /// reset, DNS, TLS).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The endpoint answered with a non-2xx status other than 429.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// The endpoint answered HTTP 429.
    #[error("Rate limit exceeded (provider: {provider})")]
    RateLimited { provider: String },

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

/// The last error observed for one endpoint during a failed call.
#[derive(Debug)]
pub struct EndpointFailure {
    pub endpoint: String,
    pub error: TransportError,
}

impl std::fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.error)
    }
}

/// Every public endpoint and every fallback tier failed.
#[derive(Debug, Error)]
#[error("all {} endpoint(s) failed for chain {chain_id}", .errors.len())]
pub struct AllEndpointsFailedError {
    pub chain_id: u64,
    pub errors: Vec<EndpointFailure>,
}

impl AllEndpointsFailedError {
    /// Endpoints that were attempted, in attempt order.
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.endpoint.as_str())
    }
}

/// Errors returned to callers of the client, registry and provider adapter.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Deterministic JSON-RPC error (e.g. execution reverted), surfaced unchanged.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    #[error(transparent)]
    AllEndpointsFailed(#[from] AllEndpointsFailedError),

    /// Failure of a direct, single-URL fetch that bypasses rotation.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("chain {0} has no known RPC endpoints")]
    UnsupportedChain(u64),

    #[error("unsupported provider operation: {0}")]
    UnsupportedOperation(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// The node answered but the result did not match the requested type.
    #[error("failed to decode result: {0}")]
    Decode(#[source] serde_json::Error),
}

impl RpcError {
    /// The JSON-RPC error object, when the failure carries one.
    pub fn rpc_error(&self) -> Option<&JsonRpcError> {
        match self {
            Self::Rpc(err) | Self::Transport(TransportError::Rpc(err)) => Some(err),
            _ => None,
        }
    }

    pub fn is_all_endpoints_failed(&self) -> bool {
        matches!(self, Self::AllEndpointsFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_failed_message_counts_endpoints() {
        let err = AllEndpointsFailedError {
            chain_id: 1,
            errors: vec![
                EndpointFailure {
                    endpoint: "https://a".into(),
                    error: TransportError::Timeout { ms: 10 },
                },
                EndpointFailure {
                    endpoint: "https://b".into(),
                    error: TransportError::Http("refused".into()),
                },
            ],
        };
        assert_eq!(err.to_string(), "all 2 endpoint(s) failed for chain 1");
        assert_eq!(err.endpoints().collect::<Vec<_>>(), ["https://a", "https://b"]);
    }

    #[test]
    fn rpc_error_exposes_json_rpc_object() {
        let err = RpcError::Rpc(JsonRpcError::new(3, "execution reverted"));
        assert_eq!(err.rpc_error().map(|e| e.code), Some(3));
        assert!(!err.is_all_endpoints_failed());
    }
}
