//! Reorg handler (spec §4.5, §7).
//!
//! Grounded on the teacher's `reorg.rs` rollback shape (delete-then-
//! recompute-start), reworked from RocksDB CF deletes to the Repository's
//! relational `delete_from`.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::warn;

use crate::error::IndexerResult;
use crate::metrics;
use crate::prefetch::PrefetchBuffer;
use crate::repository;

/// On `ReorgDetected{height}`: delete all persisted rows from `height - 1`
/// onward (the block at `height - 1` disagreed with the remote's current
/// view of its hash, so it is no longer trustworthy either), drain the
/// prefetch buffer, and return the height the main loop should resume at.
pub async fn handle_reorg(pool: &PgPool, buffer: &Arc<PrefetchBuffer>, height: u64) -> IndexerResult<u64> {
    let rollback_to = height.saturating_sub(1);
    warn!(height, rollback_to, "reorg detected, rolling back");

    let mut tx = pool.begin().await?;
    repository::delete_from(&mut *tx, rollback_to).await?;
    tx.commit().await?;

    buffer.clear().await;
    metrics::record_reorg(height);

    let resumed_from = match repository::latest_block(pool).await? {
        Some(block) => block.number + 1,
        None => rollback_to,
    };
    Ok(resumed_from)
}
