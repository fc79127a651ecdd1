//! End-to-end scenario tests against a real Postgres store (spec §8).
//!
//! Mirrors the teacher's own `batch_writer_tests.rs`: a real backend
//! (tempfile-backed RocksDB there, a live Postgres here) rather than a
//! mock, because the properties under test — contiguity, parent-hash
//! linkage, cascade delete, `ON CONFLICT DO NOTHING` idempotence — are
//! store-level guarantees a fake store can't actually exercise.
//!
//! Requires `DATABASE_URL` to point at a reachable, migratable Postgres
//! instance; every test is `#[ignore]`d so a plain `cargo test` run
//! without one still passes. Every test truncates the shared schema on
//! entry, so run with `cargo test -- --ignored --test-threads=1` against a
//! scratch database.

use evm_sync_indexer::error::IndexerError;
use evm_sync_indexer::integrity_guard;
use evm_sync_indexer::model::{Block, Log, Transaction};
use evm_sync_indexer::repository;
use num_bigint::BigUint;
use sqlx::PgPool;

async fn test_pool() -> PgPool {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set to run the ignored integration tests");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("failed to connect to the test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");
    // Tests share one database; each starts from a clean slate.
    delete_from_pool(&pool, 0).await;
    pool
}

/// `repository::delete_from` takes the caller's open transaction (spec
/// §4.2); tests that aren't already inside one open and commit their own.
async fn delete_from_pool(pool: &PgPool, height: u64) {
    let mut tx = pool.begin().await.unwrap();
    repository::delete_from(&mut tx, height).await.unwrap();
    tx.commit().await.unwrap();
}

fn hash_for(height: u64) -> String {
    format!("0x{height:064x}")
}

fn block(number: u64, parent_hash: &str) -> Block {
    Block {
        number,
        hash: hash_for(number),
        parent_hash: parent_hash.to_string(),
        timestamp: 1_700_000_000 + number,
        miner: format!("0x{:040x}", 0u64),
        difficulty: BigUint::from(0u32),
        total_difficulty: BigUint::from(number),
        size: 512,
        extra_data: "0x".to_string(),
        gas_limit: BigUint::from(30_000_000u64),
        gas_used: BigUint::from(21_000u64),
        base_fee_per_gas: Some(BigUint::from(1_000_000_000u64)),
    }
}

fn genesis_parent() -> String {
    format!("0x{:064x}", 0u64)
}

fn transaction_for(block: &Block, index: u32) -> Transaction {
    Transaction {
        hash: format!("0x{:01$x}", block.number * 1000 + index as u64, 64),
        nonce: index as u64,
        block_hash: block.hash.clone(),
        block_number: block.number,
        transaction_index: index,
        from_address: format!("0x{:040x}", 0xaaau64),
        to_address: Some(format!("0x{:040x}", 0xbbbu64)),
        value: BigUint::from(1_000_000_000_000_000_000u64),
        gas_price: BigUint::from(20_000_000_000u64),
        gas: BigUint::from(21_000u64),
        input: "0x".to_string(),
    }
}

fn log_for(tx: &Transaction, index: u32) -> Log {
    Log {
        log_index: index,
        transaction_hash: tx.hash.clone(),
        address: format!("0x{:040x}", 0xcccu64),
        data: "0x".to_string(),
        topics: vec![format!("0x{:064x}", 0xdddu64)],
        block_number: tx.block_number,
        block_hash: tx.block_hash.clone(),
    }
}

/// Scenario 1: empty start, three contiguous blocks.
#[tokio::test]
#[ignore]
async fn scenario_empty_start_three_contiguous_blocks() {
    let pool = test_pool().await;

    let b100 = block(100, &genesis_parent());
    let b101 = block(101, &b100.hash);
    let b102 = block(102, &b101.hash);

    for b in [&b100, &b101, &b102] {
        let mut tx = pool.begin().await.unwrap();
        repository::insert_blocks(&mut *tx, std::slice::from_ref(b))
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    let latest = repository::latest_block(&pool).await.unwrap().unwrap();
    assert_eq!(latest.number, 102);
    assert_eq!(repository::block_at(&pool, 100).await.unwrap().unwrap().hash, b100.hash);
    assert_eq!(repository::block_at(&pool, 101).await.unwrap().unwrap().hash, b101.hash);
}

/// Scenario 2: reorg at the tip.
#[tokio::test]
#[ignore]
async fn scenario_reorg_at_the_tip() {
    let pool = test_pool().await;

    let b100 = block(100, &genesis_parent());
    let b101 = block(101, &b100.hash);
    let b102 = block(102, &b101.hash);
    let mut tx = pool.begin().await.unwrap();
    repository::insert_blocks(&mut *tx, &[b100.clone(), b101.clone(), b102.clone()])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    // Remote's view of 103 no longer builds on the persisted 102.
    let mut b103 = block(103, &format!("0x{:064x}", 0xbbu64));

    let err = integrity_guard::check(&pool, &b103).await.unwrap_err();
    let IndexerError::ReorgDetected { height, expected_parent, actual_parent } = err else {
        panic!("expected ReorgDetected, got {err:?}");
    };
    assert_eq!(height, 103);
    assert_eq!(expected_parent, b102.hash);
    assert_eq!(actual_parent, b103.parent_hash);

    // Reorg handler: delete from height - 1 onward.
    let mut tx = pool.begin().await.unwrap();
    repository::delete_from(&mut *tx, height - 1).await.unwrap();
    tx.commit().await.unwrap();

    let latest = repository::latest_block(&pool).await.unwrap().unwrap();
    assert_eq!(latest.number, 101);
    assert!(repository::block_at(&pool, 102).await.unwrap().is_none());

    // Resuming: the corrected 102 now has the parent the guard expects.
    b103.parent_hash = hash_for(102);
    let corrected_102 = block(102, &b101.hash);
    let mut tx = pool.begin().await.unwrap();
    repository::insert_blocks(&mut *tx, std::slice::from_ref(&corrected_102))
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert!(integrity_guard::check(&pool, &b103).await.is_ok());
}

/// Scenario 3: idempotent rollback — deleting beyond the tip is a no-op.
#[tokio::test]
#[ignore]
async fn scenario_idempotent_rollback_past_tip() {
    let pool = test_pool().await;
    let b100 = block(100, &genesis_parent());
    let mut tx = pool.begin().await.unwrap();
    repository::insert_blocks(&mut *tx, std::slice::from_ref(&b100))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    delete_from_pool(&pool, 200).await;

    let latest = repository::latest_block(&pool).await.unwrap().unwrap();
    assert_eq!(latest.number, 100);
}

/// Scenario 5: a malformed log is dropped but the transaction and block survive.
/// (Validation itself is covered in `fetch.rs`'s unit tests; this checks the
/// store-level invariant that persisting a block with zero logs is legal.)
#[tokio::test]
#[ignore]
async fn scenario_block_with_transaction_but_no_logs_persists() {
    let pool = test_pool().await;
    let b100 = block(100, &genesis_parent());
    let tx_record = transaction_for(&b100, 0);

    let mut tx = pool.begin().await.unwrap();
    repository::insert_blocks(&mut *tx, std::slice::from_ref(&b100))
        .await
        .unwrap();
    repository::insert_transactions(&mut *tx, std::slice::from_ref(&tx_record))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let row: (i64,) = sqlx::query_as("SELECT count(*) FROM logs WHERE block_number = $1")
        .bind(100i64)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, 0);
    let row: (i64,) = sqlx::query_as("SELECT count(*) FROM transactions WHERE block_number = $1")
        .bind(100i64)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, 1);
}

/// Idempotence of ingest: re-inserting the same height twice is a no-op.
#[tokio::test]
#[ignore]
async fn reingesting_same_height_is_idempotent() {
    let pool = test_pool().await;
    let b100 = block(100, &genesis_parent());
    let tx_record = transaction_for(&b100, 0);
    let log_record = log_for(&tx_record, 0);

    for _ in 0..2 {
        let mut tx = pool.begin().await.unwrap();
        repository::insert_blocks(&mut *tx, std::slice::from_ref(&b100))
            .await
            .unwrap();
        repository::insert_transactions(&mut *tx, std::slice::from_ref(&tx_record))
            .await
            .unwrap();
        repository::insert_logs(&mut *tx, std::slice::from_ref(&log_record))
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    let row: (i64,) = sqlx::query_as("SELECT count(*) FROM blocks")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, 1);
    let row: (i64,) = sqlx::query_as("SELECT count(*) FROM transactions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, 1);
    let row: (i64,) = sqlx::query_as("SELECT count(*) FROM logs")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, 1);
}

/// After `delete_from(H)`, no row in any table references a block number >= H.
#[tokio::test]
#[ignore]
async fn delete_from_leaves_no_dangling_references() {
    let pool = test_pool().await;
    let b100 = block(100, &genesis_parent());
    let b101 = block(101, &b100.hash);
    let tx100 = transaction_for(&b100, 0);
    let tx101 = transaction_for(&b101, 0);
    let log100 = log_for(&tx100, 0);
    let log101 = log_for(&tx101, 0);

    let mut tx = pool.begin().await.unwrap();
    repository::insert_blocks(&mut *tx, &[b100.clone(), b101.clone()]).await.unwrap();
    repository::insert_transactions(&mut *tx, &[tx100, tx101]).await.unwrap();
    repository::insert_logs(&mut *tx, &[log100, log101]).await.unwrap();
    tx.commit().await.unwrap();

    delete_from_pool(&pool, 101).await;

    let row: (i64,) = sqlx::query_as("SELECT count(*) FROM blocks WHERE number >= 101")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, 0);
    let row: (i64,) = sqlx::query_as("SELECT count(*) FROM transactions WHERE block_number >= 101")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, 0);
    let row: (i64,) = sqlx::query_as("SELECT count(*) FROM logs WHERE block_number >= 101")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, 0);
    let latest = repository::latest_block(&pool).await.unwrap().unwrap();
    assert_eq!(latest.number, 100);
}
