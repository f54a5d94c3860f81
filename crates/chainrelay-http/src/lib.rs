//! chainrelay-http — HTTP transport for chainrelay.
//!
//! [`HttpConnector`] plugs `reqwest` into [`chainrelay_core::RpcClient`];
//! [`direct_rpc_fetch`] sends one request to one URL.

pub mod client;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use chainrelay_core::error::RpcError;

pub use client::{HttpConnector, HttpTransport};

/// One JSON-RPC request to `url` over HTTP: no rotation, retries or health tracking.
pub async fn direct_rpc_fetch<T: DeserializeOwned>(
    url: &str,
    method: &str,
    params: Vec<Value>,
    timeout: Duration,
) -> Result<T, RpcError> {
    let connector = HttpConnector::new(timeout)?;
    chainrelay_core::direct_rpc_fetch(&connector, url, method, params, timeout).await
}
