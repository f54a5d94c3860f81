//! Provider adapter behavior through the public API.

use std::sync::Arc;

use serde_json::json;

use chainrelay_core::testing::{MockNetwork, Reply};
use chainrelay_core::{ClientConfig, ClientContext, ClientRegistry, RpcError, StaticEndpoints};
use chainrelay_provider::{BlockId, ChainProvider};

const A: &str = "https://a.example";
const B: &str = "https://b.example";

fn registry(net: &MockNetwork) -> ClientRegistry {
    let table = Arc::new(
        StaticEndpoints::new()
            .with_public(1, [A, B])
            .with_network_default(1, "https://default.example"),
    );
    ClientRegistry::new(ClientContext::new(table.clone(), table, Arc::new(net.clone())))
}

#[test]
fn unsupported_chain_fails_at_construction() {
    let net = MockNetwork::new();
    let reg = registry(&net);
    let err = ChainProvider::new(&reg, 777, None).unwrap_err();
    assert!(matches!(err, RpcError::UnsupportedChain(777)));
    assert!(reg.is_empty());
}

#[tokio::test]
async fn custom_endpoints_allow_unknown_chain() {
    let net = MockNetwork::new();
    net.always("https://custom.example", Reply::result(json!("0x309")));
    let reg = registry(&net);
    let provider = ChainProvider::new(
        &reg,
        777,
        Some(ClientConfig::default().with_endpoints(["https://custom.example"])),
    )
    .unwrap();
    assert_eq!(provider.chain_id(), 777);
    let network = provider.get_network().await.unwrap();
    assert_eq!(network.chain_id, 777);
    assert_eq!(network.name, "unknown");
}

#[tokio::test]
async fn perform_translates_and_sends() {
    let net = MockNetwork::new();
    net.always(A, Reply::result(json!("0x5")));
    net.always(B, Reply::result(json!("0x5")));
    let provider = ChainProvider::new(&registry(&net), 1, None).unwrap();

    let nonce = provider
        .perform("getTransactionCount", &json!({ "address": "0xabc", "blockTag": "pending" }))
        .await
        .unwrap();
    assert_eq!(nonce, json!("0x5"));

    let req = net.last_request().unwrap();
    assert_eq!(req.method, "eth_getTransactionCount");
    assert_eq!(req.params, vec![json!("0xabc"), json!("pending")]);
}

#[tokio::test]
async fn perform_rejects_unknown_method_without_network() {
    let net = MockNetwork::new();
    let provider = ChainProvider::new(&registry(&net), 1, None).unwrap();
    let err = provider.perform("lookupAddress", &json!({})).await.unwrap_err();
    assert!(matches!(err, RpcError::UnsupportedOperation(_)));
    assert!(net.contacted().is_empty());
}

#[tokio::test]
async fn revert_surfaces_unchanged_from_first_endpoint() {
    let net = MockNetwork::new();
    net.always(A, Reply::rpc_error(3, "execution reverted: not owner"));
    net.always(B, Reply::result(json!("0x")));
    let provider = ChainProvider::new(&registry(&net), 1, None).unwrap();

    let err = provider
        .call(&json!({ "to": "0xc0ffee", "data": "0x" }), BlockId::Latest)
        .await
        .unwrap_err();
    let rpc = err.rpc_error().expect("rpc error");
    assert_eq!(rpc.code, 3);
    assert!(rpc.message.contains("reverted"));
    assert_eq!(net.contacted(), vec![A.to_string()]);
}

#[tokio::test]
async fn estimate_gas_rotates_past_rate_limit() {
    let net = MockNetwork::new();
    net.always(A, Reply::rate_limited());
    net.always(B, Reply::result(json!("0x5208")));
    let provider = ChainProvider::new(&registry(&net), 1, None).unwrap();

    let gas = provider
        .estimate_gas(&json!({ "to": "0xc0ffee", "value": "0x1" }))
        .await
        .unwrap();
    assert_eq!(gas, 21_000);
    assert_eq!(net.contacted(), vec![A.to_string(), B.to_string()]);
}
