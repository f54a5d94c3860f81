//! The `RpcTransport` and `Connector` traits: the seam between the
//! call algorithm and the network.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// A single JSON-RPC endpoint.
///
/// Implementations perform exactly one network exchange per call: no retry,
/// no health bookkeeping and no timeout of their own beyond what the
/// underlying client enforces. All of that lives in [`crate::RpcClient`].
///
/// # Thread Safety
/// Implementations must be `Send + Sync` for use across Tokio tasks.
///
/// # Object Safety
/// The trait is object-safe and can be stored as `Arc<dyn RpcTransport>`.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the response.
    ///
    /// A response carrying an `error` object is returned as `Ok`; the caller
    /// decides what a JSON-RPC error means.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Send a batch of JSON-RPC requests.
    ///
    /// Default implementation sends them sequentially; override for true batching.
    async fn send_batch(
        &self,
        reqs: Vec<JsonRpcRequest>,
    ) -> Result<Vec<JsonRpcResponse>, TransportError> {
        let mut responses = Vec::with_capacity(reqs.len());
        for req in reqs {
            responses.push(self.send(req).await?);
        }
        Ok(responses)
    }

    /// Return the transport's endpoint URL.
    fn url(&self) -> &str;
}

/// Builds transports for endpoint URLs.
///
/// The client asks for a transport the first time it contacts a URL and
/// caches it afterwards, so implementations may be relatively expensive.
pub trait Connector: Send + Sync + 'static {
    fn connect(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<Arc<dyn RpcTransport>, TransportError>;
}
