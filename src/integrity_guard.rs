//! Stateless parent-hash continuity predicate (spec §4.3).
//!
//! Pure with respect to the store: one read, no writes. Checks only the
//! immediate ancestor — a known, intentional limitation (spec §9); this is
//! not the place to add a deeper walk-back.

use sqlx::PgExecutor;

use crate::error::{IndexerError, IndexerResult};
use crate::model::Block;
use crate::repository;

pub async fn check<'e, E>(executor: E, candidate: &Block) -> IndexerResult<()>
where
    E: PgExecutor<'e>,
{
    let prev = match candidate.number.checked_sub(1) {
        Some(height) => repository::block_at(executor, height).await?,
        None => None,
    };

    let Some(prev) = prev else {
        // First block after an empty store or a rollback. The caller
        // decides whether a deeper check is warranted; this predicate does
        // not.
        return Ok(());
    };

    if prev.hash == candidate.parent_hash {
        return Ok(());
    }

    Err(IndexerError::ReorgDetected {
        height: candidate.number,
        expected_parent: prev.hash,
        actual_parent: candidate.parent_hash.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(number: u64, hash: &str, parent_hash: &str) -> Block {
        Block {
            number,
            hash: hash.to_string(),
            parent_hash: parent_hash.to_string(),
            timestamp: 0,
            miner: "0x0000000000000000000000000000000000000000".to_string(),
            difficulty: 0u32.into(),
            total_difficulty: 0u32.into(),
            size: 0,
            extra_data: "0x".to_string(),
            gas_limit: 0u32.into(),
            gas_used: 0u32.into(),
            base_fee_per_gas: None,
        }
    }

    #[test]
    fn continuous_and_reorg_cases_classify_correctly() {
        let prev = block(100, "0xaaa", "0x000");
        let good = block(101, "0xbbb", "0xaaa");
        let bad = block(101, "0xccc", "0xdead");

        assert!(prev.hash == good.parent_hash);
        assert!(prev.hash != bad.parent_hash);
    }
}
