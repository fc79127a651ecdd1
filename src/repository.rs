//! Persistence gateway over the relational store (spec §4.2).
//!
//! Every method here takes the caller's already-open executor (a pool for
//! reads, a transaction for writes) rather than owning one itself — the
//! Repository never begins or commits; the Sync Engine does.

use sqlx::{PgConnection, PgExecutor, Row};

use crate::error::IndexerResult;
use crate::model::{biguint_to_decimal, decimal_to_biguint, Block, Log, Transaction};

/// Idempotent bulk insert: on a primary-key conflict the row is silently
/// skipped (spec §4.2, invariant 4 — idempotence of ingest).
///
/// Takes a concrete `&mut PgConnection` (always the caller's open
/// transaction — see module docs) rather than a generic `PgExecutor`,
/// because each iteration re-executes against the same connection and
/// `&mut PgConnection` is the one executor type the language lets us
/// reborrow (`&mut *executor`) without requiring `Copy`.
pub async fn insert_blocks(executor: &mut PgConnection, blocks: &[Block]) -> IndexerResult<()> {
    for block in blocks {
        sqlx::query(
            "INSERT INTO blocks
                (number, hash, parent_hash, timestamp, miner, difficulty, total_difficulty,
                 size, extra_data, gas_limit, gas_used, base_fee_per_gas)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             ON CONFLICT (number) DO NOTHING",
        )
        .bind(block.number as i64)
        .bind(&block.hash)
        .bind(&block.parent_hash)
        .bind(block.timestamp as i64)
        .bind(&block.miner)
        .bind(biguint_to_decimal(&block.difficulty))
        .bind(biguint_to_decimal(&block.total_difficulty))
        .bind(block.size as i32)
        .bind(&block.extra_data)
        .bind(biguint_to_decimal(&block.gas_limit))
        .bind(biguint_to_decimal(&block.gas_used))
        .bind(block.base_fee_per_gas.as_ref().map(biguint_to_decimal))
        .execute(&mut *executor)
        .await?;
    }
    Ok(())
}

pub async fn insert_transactions(
    executor: &mut PgConnection,
    transactions: &[Transaction],
) -> IndexerResult<()> {
    for tx in transactions {
        sqlx::query(
            "INSERT INTO transactions
                (hash, nonce, block_hash, block_number, transaction_index, from_address,
                 to_address, value, gas_price, gas, input)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (hash) DO NOTHING",
        )
        .bind(&tx.hash)
        .bind(tx.nonce as i64)
        .bind(&tx.block_hash)
        .bind(tx.block_number as i64)
        .bind(tx.transaction_index as i32)
        .bind(&tx.from_address)
        .bind(&tx.to_address)
        .bind(biguint_to_decimal(&tx.value))
        .bind(biguint_to_decimal(&tx.gas_price))
        .bind(biguint_to_decimal(&tx.gas))
        .bind(&tx.input)
        .execute(&mut *executor)
        .await?;
    }
    Ok(())
}

/// Topics are serialized as a JSON array in the store (spec §4.2).
pub async fn insert_logs(executor: &mut PgConnection, logs: &[Log]) -> IndexerResult<()> {
    for log in logs {
        let topics = serde_json::to_value(&log.topics).expect("Vec<String> always serializes");
        sqlx::query(
            "INSERT INTO logs
                (log_index, transaction_hash, address, data, topics, block_number, block_hash)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (block_number, log_index) DO NOTHING",
        )
        .bind(log.log_index as i32)
        .bind(&log.transaction_hash)
        .bind(&log.address)
        .bind(&log.data)
        .bind(topics)
        .bind(log.block_number as i64)
        .bind(&log.block_hash)
        .execute(&mut *executor)
        .await?;
    }
    Ok(())
}

pub async fn latest_block<'e, E>(executor: E) -> IndexerResult<Option<Block>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query(
        "SELECT number, hash, parent_hash, timestamp, miner, difficulty, total_difficulty,
                size, extra_data, gas_limit, gas_used, base_fee_per_gas
         FROM blocks ORDER BY number DESC LIMIT 1",
    )
    .fetch_optional(executor)
    .await?;
    row.map(row_to_block).transpose()
}

pub async fn block_at<'e, E>(executor: E, height: u64) -> IndexerResult<Option<Block>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query(
        "SELECT number, hash, parent_hash, timestamp, miner, difficulty, total_difficulty,
                size, extra_data, gas_limit, gas_used, base_fee_per_gas
         FROM blocks WHERE number = $1",
    )
    .bind(height as i64)
    .fetch_optional(executor)
    .await?;
    row.map(row_to_block).transpose()
}

fn row_to_block(row: sqlx::postgres::PgRow) -> IndexerResult<Block> {
    Ok(Block {
        number: row.try_get::<i64, _>("number")? as u64,
        hash: row.try_get("hash")?,
        parent_hash: row.try_get("parent_hash")?,
        timestamp: row.try_get::<i64, _>("timestamp")? as u64,
        miner: row.try_get("miner")?,
        difficulty: decimal_to_biguint(&row.try_get("difficulty")?)?,
        total_difficulty: decimal_to_biguint(&row.try_get("total_difficulty")?)?,
        size: row.try_get::<i32, _>("size")? as u32,
        extra_data: row.try_get("extra_data")?,
        gas_limit: decimal_to_biguint(&row.try_get("gas_limit")?)?,
        gas_used: decimal_to_biguint(&row.try_get("gas_used")?)?,
        base_fee_per_gas: row
            .try_get::<Option<_>, _>("base_fee_per_gas")?
            .as_ref()
            .map(decimal_to_biguint)
            .transpose()?,
    })
}

/// Deletes all logs, then all transactions, then all blocks with
/// `number >= height`, in that order to respect foreign-key direction
/// (spec §4.2). Safe to call repeatedly with the same height (scenario 3).
pub async fn delete_from(executor: &mut PgConnection, height: u64) -> IndexerResult<()> {
    sqlx::query("DELETE FROM logs WHERE block_number >= $1")
        .bind(height as i64)
        .execute(&mut *executor)
        .await?;
    sqlx::query("DELETE FROM transactions WHERE block_number >= $1")
        .bind(height as i64)
        .execute(&mut *executor)
        .await?;
    sqlx::query("DELETE FROM blocks WHERE number >= $1")
        .bind(height as i64)
        .execute(&mut *executor)
        .await?;
    Ok(())
}
