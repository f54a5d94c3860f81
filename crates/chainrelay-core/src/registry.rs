//! Per-chain client cache and the convenience fetch functions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::{into_caller_error, ClientContext, RpcClient};
use crate::config::{ClientConfig, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{RpcError, TransportError};
use crate::request::JsonRpcRequest;
use crate::transport::Connector;

/// One [`RpcClient`] per chain id.
///
/// Keyed by chain id alone so that independent call sites share one health
/// view. Config is first-write-wins: once a chain has a client, later
/// configs for it are ignored.
pub struct ClientRegistry {
    context: ClientContext,
    clients: Mutex<HashMap<u64, Arc<RpcClient>>>,
}

impl ClientRegistry {
    pub fn new(context: ClientContext) -> Self {
        Self {
            context,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn context(&self) -> &ClientContext {
        &self.context
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<u64, Arc<RpcClient>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached client for `chain_id`, created from `config` (or defaults) on
    /// first use.
    pub fn get_client(&self, chain_id: u64, config: Option<ClientConfig>) -> Arc<RpcClient> {
        let mut clients = self.clients();
        if let Some(client) = clients.get(&chain_id) {
            if config.is_some() {
                tracing::debug!(chain_id, "client already cached, ignoring new config");
            }
            return client.clone();
        }
        let mut config = config.unwrap_or_default();
        config.chain_id = chain_id;
        let client = Arc::new(RpcClient::new(config, self.context.clone()));
        clients.insert(chain_id, client.clone());
        client
    }

    /// Whether `chain_id` has a known public pool or dedicated fallback.
    pub fn is_supported(&self, chain_id: u64) -> bool {
        self.context.endpoints.is_supported(chain_id)
    }

    /// Drop every cached client; the next `get_client` starts fresh.
    pub fn reset_all(&self) {
        self.clients().clear();
    }

    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients().is_empty()
    }
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chains: Vec<u64> = self.clients().keys().copied().collect();
        chains.sort_unstable();
        f.debug_struct("ClientRegistry")
            .field("chains", &chains)
            .finish()
    }
}

/// Options for [`rpc_fetch`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Contact exactly this URL, bypassing the registry and rotation.
    pub rpc_url: Option<String>,
    /// Timeout for the direct path (default 10 s).
    pub timeout: Option<Duration>,
    /// Config used if this call creates the chain's client.
    pub config: Option<ClientConfig>,
}

impl FetchOptions {
    pub fn direct(url: impl Into<String>) -> Self {
        Self {
            rpc_url: Some(url.into()),
            ..Default::default()
        }
    }
}

/// Call `method` on `chain_id` through the registry's shared client, or
/// straight at `options.rpc_url` when one is given.
pub async fn rpc_fetch<T: DeserializeOwned>(
    registry: &ClientRegistry,
    chain_id: u64,
    method: &str,
    params: Vec<Value>,
    options: FetchOptions,
) -> Result<T, RpcError> {
    if let Some(url) = options.rpc_url.as_deref() {
        let timeout = options.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        return direct_rpc_fetch(registry.context().connector.as_ref(), url, method, params, timeout)
            .await;
    }
    registry
        .get_client(chain_id, options.config)
        .call(method, params)
        .await
}

/// One request to one URL: no rotation, no retries, no health tracking.
pub async fn direct_rpc_fetch<T: DeserializeOwned>(
    connector: &dyn Connector,
    url: &str,
    method: &str,
    params: Vec<Value>,
    timeout: Duration,
) -> Result<T, RpcError> {
    let transport = connector.connect(url, &[])?;
    let req = JsonRpcRequest::new(1, method, params);
    let resp = tokio::time::timeout(timeout, transport.send(req))
        .await
        .map_err(|_| TransportError::Timeout {
            ms: timeout.as_millis() as u64,
        })??;
    let value = resp
        .into_result()
        .map_err(|err| into_caller_error(TransportError::Rpc(err)))?;
    serde_json::from_value(value).map_err(RpcError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticEndpoints;
    use crate::testing::MockNetwork;

    fn registry() -> ClientRegistry {
        let table = Arc::new(StaticEndpoints::new().with_public(1, ["https://a"]));
        ClientRegistry::new(ClientContext::new(table.clone(), table, Arc::new(MockNetwork::new())))
    }

    #[test]
    fn same_chain_same_instance() {
        let reg = registry();
        let first = reg.get_client(1, None);
        let second = reg.get_client(1, None);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn first_config_wins() {
        let reg = registry();
        let first = reg.get_client(1, Some(ClientConfig::default().with_endpoints(["https://x"])));
        let second = reg.get_client(1, Some(ClientConfig::default().with_endpoints(["https://y"])));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.endpoints(), ["https://x".to_string()]);
    }

    #[test]
    fn config_chain_id_follows_key() {
        let reg = registry();
        let client = reg.get_client(137, Some(ClientConfig::for_chain(1)));
        assert_eq!(client.chain_id(), 137);
    }

    #[test]
    fn reset_all_creates_fresh_instances() {
        let reg = registry();
        let before = reg.get_client(1, None);
        before.health().record_failure("https://a");
        before.health().record_failure("https://a");

        reg.reset_all();
        assert!(reg.is_empty());
        let after = reg.get_client(1, None);
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(after.health_snapshot()[0].is_healthy);
    }
}
