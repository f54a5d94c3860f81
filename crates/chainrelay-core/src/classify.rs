//! Failure classification.
//!
//! Every raw [`TransportError`] is normalized into a [`FailureKind`] once,
//! at the point where the attempt fails. The executor branches on the kind
//! only; message strings are never re-inspected downstream.

use crate::error::TransportError;
use crate::request::JsonRpcError;

/// JSON-RPC "server error" code used by geth-family nodes.
pub const SERVER_ERROR: i64 = -32000;
/// JSON-RPC "internal error" code.
pub const INTERNAL_ERROR: i64 = -32603;
/// Sentinel code for client-side synthetic failures (timeouts, aborted fetches).
pub const SYNTHETIC_ERROR: i64 = -1;

const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit",
    "rate-limit",
    "ratelimit",
    "too many requests",
    "request limit",
    "429",
];

/// Normalized outcome of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The attempt exceeded the configured timeout.
    Timeout,
    /// Connection-level failure, non-2xx status or unreadable body.
    Network,
    /// The endpoint is throttling us; rotate without retrying in place.
    RateLimited,
    /// Transient node-side failure (`-32000`, `-32603`, `-1`).
    ServerError(i64),
    /// Failure caused by the request itself; identical on every endpoint.
    Deterministic(i64),
}

impl FailureKind {
    pub fn classify(err: &TransportError) -> Self {
        match err {
            TransportError::Timeout { .. } => Self::Timeout,
            TransportError::RateLimited { .. } => Self::RateLimited,
            TransportError::Rpc(rpc) => Self::classify_rpc(rpc),
            TransportError::Http(_)
            | TransportError::HttpStatus { .. }
            | TransportError::Deserialization(_)
            | TransportError::Other(_) => Self::Network,
        }
    }

    /// Classify a JSON-RPC error object returned by a node.
    ///
    /// A message containing "revert" is deterministic whatever its code:
    /// geth reports a reverting `eth_estimateGas` as `-32000 execution reverted`.
    pub fn classify_rpc(err: &JsonRpcError) -> Self {
        let message = err.message.to_ascii_lowercase();
        if err.code == 429 || is_rate_limit_message(&message) {
            return Self::RateLimited;
        }
        // Reverts are deterministic even when reported as -32000.
        if message.contains("revert") {
            return Self::Deterministic(err.code);
        }
        match err.code {
            SERVER_ERROR | INTERNAL_ERROR | SYNTHETIC_ERROR => Self::ServerError(err.code),
            code => Self::Deterministic(code),
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Deterministic(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::RateLimited => "rate_limited",
            Self::ServerError(_) => "server_error",
            Self::Deterministic(_) => "deterministic",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServerError(code) | Self::Deterministic(code) => {
                write!(f, "{} ({code})", self.label())
            }
            _ => f.write_str(self.label()),
        }
    }
}

fn is_rate_limit_message(lowercase: &str) -> bool {
    RATE_LIMIT_PATTERNS.iter().any(|p| lowercase.contains(p))
}
