//! `0x`-prefixed hex quantities and block tags.

use serde::de::Error as _;
use serde_json::Value;

use chainrelay_core::error::RpcError;

/// Encode `n` as a JSON-RPC quantity (`0x0`, `0x1a`, no leading zeros).
pub fn to_quantity(n: u64) -> String {
    format!("{n:#x}")
}

fn quantity_digits(value: &Value) -> Result<&str, RpcError> {
    let s = value
        .as_str()
        .ok_or_else(|| decode_error(format!("expected hex quantity string, got {value}")))?;
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| decode_error(format!("quantity {s:?} is missing the 0x prefix")))?;
    if digits.is_empty() {
        return Err(decode_error(format!("quantity {s:?} has no digits")));
    }
    Ok(digits)
}

/// Decode a quantity into `u64` (block numbers, nonces, chain ids).
pub fn parse_quantity_u64(value: &Value) -> Result<u64, RpcError> {
    let digits = quantity_digits(value)?;
    u64::from_str_radix(digits, 16).map_err(|e| decode_error(format!("quantity {value}: {e}")))
}

/// Decode a quantity into `u128` (balances, gas, gas prices).
pub fn parse_quantity_u128(value: &Value) -> Result<u128, RpcError> {
    let digits = quantity_digits(value)?;
    u128::from_str_radix(digits, 16).map_err(|e| decode_error(format!("quantity {value}: {e}")))
}

fn decode_error(msg: String) -> RpcError {
    RpcError::Decode(serde_json::Error::custom(msg))
}

/// Block selector for state queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BlockId {
    #[default]
    Latest,
    Pending,
    Earliest,
    Safe,
    Finalized,
    Number(u64),
    Hash(String),
}

impl BlockId {
    /// Positional-param form: a tag string or hex number. A hash is passed as-is.
    pub fn to_param(&self) -> Value {
        match self {
            Self::Latest => Value::from("latest"),
            Self::Pending => Value::from("pending"),
            Self::Earliest => Value::from("earliest"),
            Self::Safe => Value::from("safe"),
            Self::Finalized => Value::from("finalized"),
            Self::Number(n) => Value::from(to_quantity(*n)),
            Self::Hash(h) => Value::from(h.as_str()),
        }
    }
}

impl From<u64> for BlockId {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quantities() {
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(255), "0xff");
        assert_eq!(parse_quantity_u64(&json!("0x10")).unwrap(), 16);
        assert_eq!(
            parse_quantity_u128(&json!("0xde0b6b3a7640000")).unwrap(),
            1_000_000_000_000_000_000
        );
    }

    #[test]
    fn malformed_quantities_are_decode_errors() {
        for bad in [json!("10"), json!("0x"), json!(16), json!("0xzz")] {
            assert!(matches!(parse_quantity_u64(&bad), Err(RpcError::Decode(_))), "{bad}");
        }
    }

    #[test]
    fn block_params() {
        assert_eq!(BlockId::default().to_param(), json!("latest"));
        assert_eq!(BlockId::from(17).to_param(), json!("0x11"));
        assert_eq!(BlockId::Finalized.to_param(), json!("finalized"));
    }
}
