//! chainrelay-core — resilient JSON-RPC calls across a pool of public nodes.
//!
//! # Overview
//!
//! Given a chain id and a method, [`RpcClient`] returns a result even when
//! individual endpoints are rate-limited, slow or down. The core crate
//! defines:
//!
//! - [`RpcClient`]: rotation, per-endpoint retry, tiered fallback, batching
//! - [`ClientRegistry`]: one shared client per chain, plus [`rpc_fetch`]
//! - [`HealthTracker`] / [`Rotation`]: lazy circuit breaker and round-robin cursor
//! - [`FailureKind`]: normalized failure classification
//! - [`RpcTransport`] / [`Connector`]: the network seam
//! - [`TelemetryHooks`]: optional outcome callbacks
//! - `testing` (feature `testing`): scripted in-memory network for tests

pub mod batch;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod fallback;
pub mod health;
pub mod registry;
pub mod request;
pub mod retry;
pub mod rotation;
pub mod source;
pub mod telemetry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use classify::FailureKind;
pub use client::{ClientContext, RpcCallResult, RpcClient};
pub use config::{ClientConfig, ClientSettings};
pub use error::{AllEndpointsFailedError, EndpointFailure, RpcError, TransportError};
pub use health::{EndpointHealth, HealthState, HealthTracker};
pub use registry::{direct_rpc_fetch, rpc_fetch, ClientRegistry, FetchOptions};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcCall, RpcId};
pub use retry::{RetryConfig, RetryPolicy};
pub use rotation::Rotation;
pub use source::{ChainRegistry, EndpointSource, RemoteSettings, StaticEndpoints};
pub use telemetry::{
    ErrorEvent, FallbackEvent, FallbackTier, RateLimitEvent, SuccessEvent, TelemetryHooks,
};
pub use transport::{Connector, RpcTransport};
