//! Fetch-and-validate sub-operation (spec §4.5), shared by the Sync
//! Engine's synchronous path and the background prefetch workers.

use crate::chain_client::{ChainClient, RawBlock, RawLog, RawTransaction};
use crate::error::{IndexerError, IndexerResult};
use crate::model::{self, Block, BlockPayload, Log, Transaction};

pub async fn fetch_and_validate(client: &ChainClient, height: u64) -> IndexerResult<BlockPayload> {
    let (raw_block, raw_logs) =
        tokio::try_join!(client.fetch_block(height, true), client.fetch_logs(height, height))?;

    let block = validate_block(height, &raw_block)?;
    let transactions = validate_transactions(height, &raw_block.transactions)?;
    let logs = validate_logs(raw_logs);

    Ok(BlockPayload {
        block,
        transactions,
        logs,
    })
}

fn validation_error(height: u64, reason: impl Into<String>) -> IndexerError {
    IndexerError::ValidationFailed {
        height,
        reason: reason.into(),
    }
}

fn validate_block(height: u64, raw: &RawBlock) -> IndexerResult<Block> {
    let number = parse_hex_u64(&raw.number).map_err(|e| validation_error(height, e))?;
    if number != height {
        return Err(validation_error(
            height,
            format!("rpc returned block {number}, expected {height}"),
        ));
    }
    Ok(Block {
        number,
        hash: model::hash32(&raw.hash).map_err(|e| validation_error(height, e.to_string()))?,
        parent_hash: model::hash32(&raw.parent_hash)
            .map_err(|e| validation_error(height, e.to_string()))?,
        timestamp: parse_hex_u64(&raw.timestamp).map_err(|e| validation_error(height, e))?,
        miner: model::address20(&raw.miner).map_err(|e| validation_error(height, e.to_string()))?,
        difficulty: model::parse_hex_biguint(&raw.difficulty)
            .map_err(|e| validation_error(height, e.to_string()))?,
        total_difficulty: raw
            .total_difficulty
            .as_deref()
            .map(model::parse_hex_biguint)
            .transpose()
            .map_err(|e| validation_error(height, e.to_string()))?
            .unwrap_or_default(),
        size: raw
            .size
            .as_deref()
            .map(parse_hex_u64)
            .transpose()
            .map_err(|e| validation_error(height, e))?
            .unwrap_or(0) as u32,
        extra_data: raw
            .extra_data
            .as_deref()
            .map(model::validate_hex_blob)
            .transpose()
            .map_err(|e| validation_error(height, e.to_string()))?
            .unwrap_or_else(|| "0x".to_string()),
        gas_limit: model::parse_hex_biguint(&raw.gas_limit)
            .map_err(|e| validation_error(height, e.to_string()))?,
        gas_used: model::parse_hex_biguint(&raw.gas_used)
            .map_err(|e| validation_error(height, e.to_string()))?,
        base_fee_per_gas: raw
            .base_fee_per_gas
            .as_deref()
            .map(model::parse_hex_biguint)
            .transpose()
            .map_err(|e| validation_error(height, e.to_string()))?,
    })
}

/// A malformed transaction aborts the whole block: a block with a corrupt
/// transaction is treated as corrupt (spec §4.5 step 4).
fn validate_transactions(height: u64, raw: &[RawTransaction]) -> IndexerResult<Vec<Transaction>> {
    raw.iter()
        .map(|tx| {
            Ok(Transaction {
                hash: model::hash32(&tx.hash).map_err(|e| validation_error(height, e.to_string()))?,
                nonce: parse_hex_u64(&tx.nonce).map_err(|e| validation_error(height, e))?,
                block_hash: model::hash32(&tx.block_hash)
                    .map_err(|e| validation_error(height, e.to_string()))?,
                block_number: parse_hex_u64(&tx.block_number)
                    .map_err(|e| validation_error(height, e))?,
                transaction_index: parse_hex_u64(&tx.transaction_index)
                    .map_err(|e| validation_error(height, e))? as u32,
                from_address: model::address20(&tx.from)
                    .map_err(|e| validation_error(height, e.to_string()))?,
                to_address: tx
                    .to
                    .as_deref()
                    .map(model::address20)
                    .transpose()
                    .map_err(|e| validation_error(height, e.to_string()))?,
                value: model::parse_hex_biguint(&tx.value)
                    .map_err(|e| validation_error(height, e.to_string()))?,
                gas_price: tx
                    .gas_price
                    .as_deref()
                    .map(model::parse_hex_biguint)
                    .transpose()
                    .map_err(|e| validation_error(height, e.to_string()))?
                    .unwrap_or_default(),
                gas: model::parse_hex_biguint(&tx.gas)
                    .map_err(|e| validation_error(height, e.to_string()))?,
                input: model::validate_hex_blob(&tx.input)
                    .map_err(|e| validation_error(height, e.to_string()))?,
            })
        })
        .collect()
}

/// Unlike transactions, a single unvalidatable log is silently dropped —
/// logs are not structurally load-bearing for the chain (spec §4.5 step 5).
fn validate_logs(raw: Vec<RawLog>) -> Vec<Log> {
    raw.into_iter().filter_map(validate_log).collect()
}

fn validate_log(raw: RawLog) -> Option<Log> {
    let topics = raw
        .topics
        .iter()
        .map(|t| model::hash32(t))
        .collect::<IndexerResult<Vec<_>>>()
        .ok()?;
    Some(Log {
        log_index: parse_hex_u64(&raw.log_index).ok()? as u32,
        transaction_hash: model::hash32(&raw.transaction_hash).ok()?,
        address: model::address20(&raw.address).ok()?,
        data: model::validate_hex_blob(&raw.data).ok()?,
        topics,
        block_number: parse_hex_u64(&raw.block_number).ok()?,
        block_hash: model::hash32(&raw.block_hash).ok()?,
    })
}

fn parse_hex_u64(value: &str) -> Result<u64, String> {
    let body = value.strip_prefix("0x").unwrap_or(value);
    u64::from_str_radix(body, 16).map_err(|e| format!("malformed hex u64 {value}: {e}"))
}
