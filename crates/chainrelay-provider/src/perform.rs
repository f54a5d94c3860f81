//! Translation of ethers-style `perform(method, params)` calls.
//!
//! ethers passes one named-field object per call (`{ address, blockTag }`);
//! JSON-RPC wants a positional array. [`translate`] maps one to the other.

use serde_json::{Map, Value};

use chainrelay_core::error::RpcError;

use crate::quantity::to_quantity;

/// Transaction fields that JSON-RPC expects as hex quantities.
const QUANTITY_FIELDS: &[&str] = &[
    "gas",
    "gasPrice",
    "maxFeePerGas",
    "maxPriorityFeePerGas",
    "value",
    "nonce",
    "type",
    "chainId",
];

/// ethers method names accepted by `perform`.
pub const SUPPORTED_METHODS: &[&str] = &[
    "getBlockNumber",
    "getGasPrice",
    "getBalance",
    "getTransactionCount",
    "getCode",
    "getStorageAt",
    "sendTransaction",
    "getBlock",
    "getTransaction",
    "getTransactionReceipt",
    "call",
    "estimateGas",
    "getLogs",
    "getChainId",
];

/// Map an ethers method and its parameter object to a JSON-RPC method and
/// positional params.
pub fn translate(method: &str, params: &Value) -> Result<(&'static str, Vec<Value>), RpcError> {
    let translated = match method {
        "getBlockNumber" => ("eth_blockNumber", vec![]),
        "getGasPrice" => ("eth_gasPrice", vec![]),
        "getChainId" => ("eth_chainId", vec![]),
        "getBalance" => (
            "eth_getBalance",
            vec![required(params, method, "address")?, block_tag(params)],
        ),
        "getTransactionCount" => (
            "eth_getTransactionCount",
            vec![required(params, method, "address")?, block_tag(params)],
        ),
        "getCode" => (
            "eth_getCode",
            vec![required(params, method, "address")?, block_tag(params)],
        ),
        "getStorageAt" => (
            "eth_getStorageAt",
            vec![
                required(params, method, "address")?,
                position(required(params, method, "position")?),
                block_tag(params),
            ],
        ),
        "sendTransaction" => (
            "eth_sendRawTransaction",
            vec![required(params, method, "signedTransaction")?],
        ),
        "getBlock" => {
            let full = Value::Bool(
                params
                    .get("includeTransactions")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            );
            match params.get("blockHash").filter(|v| !v.is_null()) {
                Some(hash) => ("eth_getBlockByHash", vec![hash.clone(), full]),
                None => ("eth_getBlockByNumber", vec![block_tag(params), full]),
            }
        }
        "getTransaction" => (
            "eth_getTransactionByHash",
            vec![required(params, method, "transactionHash")?],
        ),
        "getTransactionReceipt" => (
            "eth_getTransactionReceipt",
            vec![required(params, method, "transactionHash")?],
        ),
        "call" => (
            "eth_call",
            vec![
                transaction(required(params, method, "transaction")?)?,
                block_tag(params),
            ],
        ),
        "estimateGas" => (
            "eth_estimateGas",
            vec![transaction(required(params, method, "transaction")?)?],
        ),
        "getLogs" => ("eth_getLogs", vec![filter(required(params, method, "filter")?)?]),
        other => return Err(RpcError::UnsupportedOperation(other.to_string())),
    };
    Ok(translated)
}

fn required(params: &Value, method: &str, field: &str) -> Result<Value, RpcError> {
    params
        .get(field)
        .filter(|v| !v.is_null())
        .cloned()
        .ok_or_else(|| RpcError::InvalidParams(format!("{method} requires `{field}`")))
}

/// `blockTag` as a tag string or hex number; `latest` when absent.
fn block_tag(params: &Value) -> Value {
    match params.get("blockTag") {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(n) => Value::from(to_quantity(n)),
            None => Value::Number(n.clone()),
        },
        Some(Value::String(s)) => Value::from(s.as_str()),
        _ => Value::from("latest"),
    }
}

fn position(value: Value) -> Value {
    match value.as_u64() {
        Some(n) => Value::from(to_quantity(n)),
        None => value,
    }
}

/// ethers transaction request → JSON-RPC transaction object: `gasLimit`
/// becomes `gas`, numeric quantities become hex strings, nulls are dropped.
fn transaction(tx: Value) -> Result<Value, RpcError> {
    let Value::Object(fields) = tx else {
        return Err(RpcError::InvalidParams("transaction must be an object".into()));
    };
    let mut out = Map::with_capacity(fields.len());
    for (key, value) in fields {
        if value.is_null() {
            continue;
        }
        let key = if key == "gasLimit" { "gas".to_string() } else { key };
        let value = match value.as_u64() {
            Some(n) if QUANTITY_FIELDS.contains(&key.as_str()) => Value::from(to_quantity(n)),
            _ => value,
        };
        out.insert(key, value);
    }
    Ok(Value::Object(out))
}

/// Log filter: numeric block bounds become hex.
fn filter(filter: Value) -> Result<Value, RpcError> {
    let Value::Object(mut fields) = filter else {
        return Err(RpcError::InvalidParams("filter must be an object".into()));
    };
    for key in ["fromBlock", "toBlock"] {
        if let Some(n) = fields.get(key).and_then(Value::as_u64) {
            fields.insert(key.to_string(), Value::from(to_quantity(n)));
        }
    }
    Ok(Value::Object(fields))
}
