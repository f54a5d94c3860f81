//! ethers-style provider over a shared [`RpcClient`].

use std::sync::Arc;

use serde_json::{json, Value};

use chainrelay_core::client::RpcClient;
use chainrelay_core::config::ClientConfig;
use chainrelay_core::error::RpcError;
use chainrelay_core::registry::ClientRegistry;

use crate::perform::translate;
use crate::quantity::{parse_quantity_u128, parse_quantity_u64, BlockId};

/// Event callback accepted by [`ChainProvider::on`]. Never invoked.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Network identity as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub chain_id: u64,
    pub name: String,
}

/// Read/write helpers for one chain, routed through the resilient client.
///
/// Event subscription methods exist so that code written against an
/// ethers-like provider keeps compiling; they register nothing and no
/// event is ever delivered.
#[derive(Debug, Clone)]
pub struct ChainProvider {
    client: Arc<RpcClient>,
}

impl ChainProvider {
    /// Provider for `chain_id` using the registry's shared client.
    ///
    /// Fails with [`RpcError::UnsupportedChain`] when the chain has no
    /// catalog entry and `config` supplies no custom endpoints.
    pub fn new(
        registry: &ClientRegistry,
        chain_id: u64,
        config: Option<ClientConfig>,
    ) -> Result<Self, RpcError> {
        let has_custom = config
            .as_ref()
            .and_then(ClientConfig::custom_endpoints)
            .is_some_and(|urls| !urls.is_empty());
        if !has_custom && !registry.is_supported(chain_id) {
            return Err(RpcError::UnsupportedChain(chain_id));
        }
        Ok(Self::from_client(registry.get_client(chain_id, config)))
    }

    pub fn from_client(client: Arc<RpcClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<RpcClient> {
        &self.client
    }

    /// Configured chain id; no network round trip.
    pub fn chain_id(&self) -> u64 {
        self.client.chain_id()
    }

    /// Ask the node which chain it serves.
    pub async fn get_network(&self) -> Result<Network, RpcError> {
        let chain_id = parse_quantity_u64(&self.send("eth_chainId", vec![]).await?)?;
        if chain_id != self.chain_id() {
            tracing::warn!(
                expected = self.chain_id(),
                reported = chain_id,
                "node reports a different chain id"
            );
        }
        let name = chainrelay_endpoints::chain_name(chain_id)
            .unwrap_or("unknown")
            .to_string();
        Ok(Network { chain_id, name })
    }

    /// Raw JSON-RPC call.
    pub async fn send(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.client.call(method, params).await
    }

    /// ethers-style call: `method` is an ethers name such as `getBalance`,
    /// `params` its named-field object.
    pub async fn perform(&self, method: &str, params: &Value) -> Result<Value, RpcError> {
        let (rpc_method, rpc_params) = translate(method, params)?;
        tracing::debug!(method, rpc_method, "perform");
        self.send(rpc_method, rpc_params).await
    }

    pub async fn get_block_number(&self) -> Result<u64, RpcError> {
        parse_quantity_u64(&self.send("eth_blockNumber", vec![]).await?)
    }

    pub async fn get_gas_price(&self) -> Result<u128, RpcError> {
        parse_quantity_u128(&self.send("eth_gasPrice", vec![]).await?)
    }

    /// Balance in wei.
    pub async fn get_balance(&self, address: &str, block: BlockId) -> Result<u128, RpcError> {
        let value = self
            .send("eth_getBalance", vec![json!(address), block.to_param()])
            .await?;
        parse_quantity_u128(&value)
    }

    pub async fn get_transaction_count(
        &self,
        address: &str,
        block: BlockId,
    ) -> Result<u64, RpcError> {
        let value = self
            .send("eth_getTransactionCount", vec![json!(address), block.to_param()])
            .await?;
        parse_quantity_u64(&value)
    }

    /// Deployed bytecode, `0x` for an account without code.
    pub async fn get_code(&self, address: &str, block: BlockId) -> Result<String, RpcError> {
        self.client
            .call("eth_getCode", vec![json!(address), block.to_param()])
            .await
    }

    pub async fn get_storage_at(
        &self,
        address: &str,
        slot: &str,
        block: BlockId,
    ) -> Result<String, RpcError> {
        self.client
            .call(
                "eth_getStorageAt",
                vec![json!(address), json!(slot), block.to_param()],
            )
            .await
    }

    /// `eth_call`; a revert comes back as [`RpcError::Rpc`] without trying
    /// other endpoints.
    pub async fn call(&self, tx: &Value, block: BlockId) -> Result<String, RpcError> {
        self.client
            .call("eth_call", vec![tx.clone(), block.to_param()])
            .await
    }

    pub async fn estimate_gas(&self, tx: &Value) -> Result<u128, RpcError> {
        parse_quantity_u128(&self.send("eth_estimateGas", vec![tx.clone()]).await?)
    }

    /// Block by number, tag or hash; `None` if the node does not know it.
    pub async fn get_block(
        &self,
        block: BlockId,
        full_transactions: bool,
    ) -> Result<Option<Value>, RpcError> {
        let method = match block {
            BlockId::Hash(_) => "eth_getBlockByHash",
            _ => "eth_getBlockByNumber",
        };
        self.client
            .call(method, vec![block.to_param(), json!(full_transactions)])
            .await
    }

    pub async fn get_transaction(&self, hash: &str) -> Result<Option<Value>, RpcError> {
        self.client
            .call("eth_getTransactionByHash", vec![json!(hash)])
            .await
    }

    /// `None` while the transaction is pending or unknown.
    pub async fn get_transaction_receipt(&self, hash: &str) -> Result<Option<Value>, RpcError> {
        self.client
            .call("eth_getTransactionReceipt", vec![json!(hash)])
            .await
    }

    pub async fn get_logs(&self, filter: &Value) -> Result<Vec<Value>, RpcError> {
        self.client.call("eth_getLogs", vec![filter.clone()]).await
    }

    /// Broadcast a signed transaction; returns its hash.
    pub async fn send_raw_transaction(&self, signed: &str) -> Result<String, RpcError> {
        self.client
            .call("eth_sendRawTransaction", vec![json!(signed)])
            .await
    }

    // Event API: accepted and ignored.

    pub fn on(&self, event: &str, _listener: Listener) -> &Self {
        tracing::debug!(event, "event subscriptions are not supported; listener ignored");
        self
    }

    pub fn once(&self, event: &str, listener: Listener) -> &Self {
        self.on(event, listener)
    }

    pub fn off(&self, _event: &str, _listener: Option<Listener>) -> &Self {
        self
    }

    pub fn remove_all_listeners(&self, _event: Option<&str>) -> &Self {
        self
    }

    pub fn listener_count(&self, _event: Option<&str>) -> usize {
        0
    }

    pub fn listeners(&self, _event: Option<&str>) -> Vec<Listener> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainrelay_core::client::ClientContext;
    use chainrelay_core::source::StaticEndpoints;
    use chainrelay_core::testing::{MockNetwork, Reply};

    const A: &str = "https://a.example";

    fn provider(net: &MockNetwork) -> ChainProvider {
        let table = Arc::new(StaticEndpoints::new().with_public(1, [A]));
        let registry = ClientRegistry::new(ClientContext::new(
            table.clone(),
            table,
            Arc::new(net.clone()),
        ));
        ChainProvider::new(&registry, 1, None).unwrap()
    }

    #[tokio::test]
    async fn block_number_is_decoded() {
        let net = MockNetwork::new();
        net.always(A, Reply::result(json!("0x12d687")));
        assert_eq!(provider(&net).get_block_number().await.unwrap(), 1_234_567);
        assert_eq!(net.last_request().unwrap().method, "eth_blockNumber");
    }

    #[tokio::test]
    async fn balance_sends_address_and_tag() {
        let net = MockNetwork::new();
        net.always(A, Reply::result(json!("0x0de0b6b3a7640000")));
        let wei = provider(&net)
            .get_balance("0xabc", BlockId::Number(16))
            .await
            .unwrap();
        assert_eq!(wei, 1_000_000_000_000_000_000);
        assert_eq!(
            net.last_request().unwrap().params,
            vec![json!("0xabc"), json!("0x10")]
        );
    }

    #[tokio::test]
    async fn missing_receipt_is_none() {
        let net = MockNetwork::new();
        net.always(A, Reply::result(Value::Null));
        assert!(provider(&net)
            .get_transaction_receipt("0xh")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn block_by_hash_uses_hash_method() {
        let net = MockNetwork::new();
        net.always(A, Reply::result(json!({ "number": "0x1" })));
        let block = provider(&net)
            .get_block(BlockId::Hash("0xbeef".into()), false)
            .await
            .unwrap();
        assert!(block.is_some());
        let req = net.last_request().unwrap();
        assert_eq!(req.method, "eth_getBlockByHash");
        assert_eq!(req.params, vec![json!("0xbeef"), json!(false)]);
    }

    #[test]
    fn event_api_is_inert() {
        let net = MockNetwork::new();
        let p = provider(&net);
        let listener: Listener = Arc::new(|_| {});
        p.on("block", listener.clone()).off("block", Some(listener));
        assert_eq!(p.listener_count(Some("block")), 0);
        assert!(p.listeners(None).is_empty());
        assert!(net.contacted().is_empty());
    }
}
