//! JSON-RPC batch construction and response reordering.
//!
//! Batch entries carry positional ids `1..=N`, independent of the client's
//! request counter. Servers may answer in any order, so responses are
//! sorted by id before results are extracted.

use serde_json::Value;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse, RpcCall};

/// Build the request array for `calls`.
pub fn build_batch(calls: &[RpcCall]) -> Vec<JsonRpcRequest> {
    calls
        .iter()
        .zip(1u64..)
        .map(|(call, id)| JsonRpcRequest::new(id, call.method.clone(), call.params.clone()))
        .collect()
}

/// Restore submission order and extract results.
///
/// Any item carrying an `error` fails the whole batch with that error.
/// A response that does not answer exactly ids `1..=expected` is treated
/// as a malformed reply from the endpoint.
pub fn order_batch_responses(
    mut responses: Vec<JsonRpcResponse>,
    expected: usize,
) -> Result<Vec<Value>, TransportError> {
    responses.sort_by_key(|r| r.id.as_u64().unwrap_or(u64::MAX));

    if let Some(err) = responses.iter().find_map(|r| r.error.clone()) {
        return Err(TransportError::Rpc(err));
    }

    let ids_match = responses.len() == expected
        && responses
            .iter()
            .zip(1u64..)
            .all(|(r, id)| r.id.as_u64() == Some(id));
    if !ids_match {
        return Err(TransportError::Other(format!(
            "batch response does not match request: expected {expected} items with ids 1..={expected}, got {}",
            responses.len()
        )));
    }

    Ok(responses
        .into_iter()
        .map(|r| r.result.unwrap_or(Value::Null))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{JsonRpcError, RpcId};
    use serde_json::json;

    #[test]
    fn positional_ids() {
        let reqs = build_batch(&[
            RpcCall::new("eth_blockNumber", vec![]),
            RpcCall::new("eth_gasPrice", vec![]),
        ]);
        let ids: Vec<_> = reqs.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, [RpcId::Number(1), RpcId::Number(2)]);
        assert_eq!(reqs[1].method, "eth_gasPrice");
    }

    #[test]
    fn reversed_responses_are_reordered() {
        let results = order_batch_responses(
            vec![
                JsonRpcResponse::success(2, json!("0x3b9aca00")),
                JsonRpcResponse::success(1, json!("0x10")),
            ],
            2,
        )
        .unwrap();
        assert_eq!(results, [json!("0x10"), json!("0x3b9aca00")]);
    }

    #[test]
    fn any_item_error_fails_batch() {
        let err = order_batch_responses(
            vec![
                JsonRpcResponse::success(1, json!("0x1")),
                JsonRpcResponse::failure(2, JsonRpcError::new(-32602, "invalid params")),
            ],
            2,
        )
        .unwrap_err();
        assert!(matches!(err, TransportError::Rpc(e) if e.code == -32602));
    }

    #[test]
    fn missing_items_are_malformed() {
        let err =
            order_batch_responses(vec![JsonRpcResponse::success(1, json!("0x1"))], 2).unwrap_err();
        assert!(matches!(err, TransportError::Other(_)));
    }
}
