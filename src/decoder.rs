//! ERC-20 `Transfer` log decoder (spec §1, §4.9) — out of the core's scope,
//! carried forward as a pure, store-independent domain helper.
//!
//! Grounded on original_source's `src/domain/decoder.py`
//! (`ERC20_TRANSFER_ABI`, `TRANSFER_EVENT_TOPIC`).

use num_bigint::BigUint;

use crate::model::{self, Log};

pub const TRANSFER_EVENT_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub transaction_hash: String,
    pub log_index: u32,
    pub from: String,
    pub to: String,
    pub value: BigUint,
}

/// `None` unless the log has exactly three topics and the first one is the
/// `Transfer` event signature.
pub fn decode_transfer(log: &Log) -> Option<TransferEvent> {
    if log.topics.len() != 3 || log.topics[0] != TRANSFER_EVENT_TOPIC {
        return None;
    }
    let from = topic_to_address(&log.topics[1])?;
    let to = topic_to_address(&log.topics[2])?;
    let value = model::parse_hex_biguint(&log.data).ok()?;

    Some(TransferEvent {
        transaction_hash: log.transaction_hash.clone(),
        log_index: log.log_index,
        from,
        to,
        value,
    })
}

pub fn decode_batch(logs: &[Log]) -> Vec<TransferEvent> {
    logs.iter().filter_map(decode_transfer).collect()
}

/// A topic is a 32-byte word; an address occupies its low 20 bytes.
fn topic_to_address(topic: &str) -> Option<String> {
    let body = topic.strip_prefix("0x")?;
    if body.len() != 64 {
        return None;
    }
    model::address20(&format!("0x{}", &body[24..])).ok()
}
