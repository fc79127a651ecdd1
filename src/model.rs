//! Persisted data model and hex-string discipline (spec §3).

use bigdecimal::BigDecimal;
use num_bigint::BigUint;
use num_traits::Num;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{IndexerError, IndexerResult};

/// `value`/`gas_price`/`gas_limit`/`gas_used`/`difficulty`/`total_difficulty`
/// are on-chain arbitrary-precision unsigned integers; the store binds them
/// to `NUMERIC` columns (spec §3/§9), so every insert/read crosses this
/// boundary exactly once.
pub fn biguint_to_decimal(value: &BigUint) -> BigDecimal {
    BigDecimal::from_str(&value.to_string()).expect("BigUint digits are valid decimal digits")
}

pub fn decimal_to_biguint(value: &BigDecimal) -> IndexerResult<BigUint> {
    BigUint::from_str(&value.to_string())
        .map_err(|e| IndexerError::StoreError(sqlx::Error::Decode(Box::new(e))))
}

fn strip_0x(value: &str) -> IndexerResult<&str> {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| IndexerError::RpcProtocol(format!("missing 0x prefix: {value}")))
}

/// Validate and canonicalize a `0x`-prefixed hex string to a fixed byte length.
///
/// `expected_len` is the number of hex *characters* after `0x` (66-2=64 for a
/// 32-byte hash, 42-2=40 for a 20-byte address). The decode-then-re-encode
/// round trip both validates hex-ness and guarantees lowercase output.
pub fn validate_hex_fixed(value: &str, expected_len: usize) -> IndexerResult<String> {
    let body = strip_0x(value)?;
    if body.len() != expected_len {
        return Err(IndexerError::RpcProtocol(format!(
            "expected {expected_len} hex chars, got {value}"
        )));
    }
    let bytes = hex::decode(body)
        .map_err(|e| IndexerError::RpcProtocol(format!("malformed hex in {value}: {e}")))?;
    Ok(format!("0x{}", hex::encode(bytes)))
}

/// Validate an arbitrary-length (even) hex blob, e.g. `input` or log `data`.
pub fn validate_hex_blob(value: &str) -> IndexerResult<String> {
    let body = strip_0x(value)?;
    let bytes = hex::decode(body)
        .map_err(|e| IndexerError::RpcProtocol(format!("malformed hex blob {value}: {e}")))?;
    Ok(format!("0x{}", hex::encode(bytes)))
}

pub fn hash32(value: &str) -> IndexerResult<String> {
    validate_hex_fixed(value, 64)
}

pub fn address20(value: &str) -> IndexerResult<String> {
    validate_hex_fixed(value, 40)
}

/// Parse a `0x`-prefixed hex integer into an arbitrary-precision unsigned integer.
pub fn parse_hex_biguint(value: &str) -> IndexerResult<BigUint> {
    let body = strip_0x(value)?;
    let body = if body.is_empty() { "0" } else { body };
    BigUint::from_str_radix(body, 16)
        .map_err(|e| IndexerError::RpcProtocol(format!("malformed hex integer {value}: {e}")))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp: u64,
    pub miner: String,
    pub difficulty: BigUint,
    pub total_difficulty: BigUint,
    pub size: u32,
    pub extra_data: String,
    pub gas_limit: BigUint,
    pub gas_used: BigUint,
    pub base_fee_per_gas: Option<BigUint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub nonce: u64,
    pub block_hash: String,
    pub block_number: u64,
    pub transaction_index: u32,
    pub from_address: String,
    pub to_address: Option<String>,
    pub value: BigUint,
    pub gas_price: BigUint,
    pub gas: BigUint,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub log_index: u32,
    pub transaction_hash: String,
    pub address: String,
    pub data: String,
    pub topics: Vec<String>,
    pub block_number: u64,
    pub block_hash: String,
}

/// The unit of work handed from a fetch-and-validate call to the Prefetch
/// Buffer and finally to the Sync Engine's commit step.
#[derive(Debug, Clone)]
pub struct BlockPayload {
    pub block: Block,
    pub transactions: Vec<Transaction>,
    pub logs: Vec<Log>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_and_lowercases_hash() {
        let out = hash32("0xABCDEF0000000000000000000000000000000000000000000000000000ABCD").unwrap();
        assert_eq!(out, out.to_lowercase());
        assert!(out.starts_with("0x"));
        assert_eq!(out.len(), 66);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(hash32("0xabcd").is_err());
        assert!(address20("0xabcdef").is_err());
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(hash32("abcdef").is_err());
    }

    #[test]
    fn parses_hex_integer() {
        assert_eq!(parse_hex_biguint("0x0").unwrap(), BigUint::from(0u32));
        assert_eq!(parse_hex_biguint("0x10").unwrap(), BigUint::from(16u32));
    }

    #[test]
    fn blob_must_be_even_length() {
        assert!(validate_hex_blob("0xabc").is_err());
        assert!(validate_hex_blob("0xabcd").is_ok());
        assert_eq!(validate_hex_blob("0x").unwrap(), "0x");
    }
}
