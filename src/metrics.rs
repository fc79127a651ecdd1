//! Prometheus instrumentation, narrowed to what the sync pipeline's
//! ambient stack needs (spec §4.7).
//!
//! Registry/lazy_static pattern kept from the teacher's `metrics.rs`
//! near-verbatim; the 45-metric PIVX catalog is replaced by the handful
//! this indexer actually emits.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::model::BlockPayload;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref BLOCKS_PROCESSED: IntCounter = IntCounter::new(
        "indexer_blocks_processed_total",
        "Total blocks committed to the store"
    ).unwrap();

    pub static ref TRANSACTIONS_PROCESSED: IntCounter = IntCounter::new(
        "indexer_transactions_processed_total",
        "Total transactions committed to the store"
    ).unwrap();

    pub static ref LOGS_PROCESSED: IntCounter = IntCounter::new(
        "indexer_logs_processed_total",
        "Total logs committed to the store"
    ).unwrap();

    pub static ref REORGS_DETECTED: IntCounterVec = IntCounterVec::new(
        Opts::new("indexer_reorgs_detected_total", "Reorgs detected, labeled by the height they were detected at"),
        &["height"]
    ).unwrap();

    pub static ref RPC_RETRIES: IntCounter = IntCounter::new(
        "indexer_rpc_retries_total",
        "Total RPC call retry attempts"
    ).unwrap();

    pub static ref INDEXED_HEIGHT: IntGauge = IntGauge::new(
        "indexer_indexed_height",
        "Highest block height committed to the store"
    ).unwrap();

    pub static ref CHAIN_TIP_HEIGHT: IntGauge = IntGauge::new(
        "indexer_chain_tip_height",
        "Highest block height last observed from the RPC endpoint"
    ).unwrap();
}

pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    REGISTRY.register(Box::new(BLOCKS_PROCESSED.clone()))?;
    REGISTRY.register(Box::new(TRANSACTIONS_PROCESSED.clone()))?;
    REGISTRY.register(Box::new(LOGS_PROCESSED.clone()))?;
    REGISTRY.register(Box::new(REORGS_DETECTED.clone()))?;
    REGISTRY.register(Box::new(RPC_RETRIES.clone()))?;
    REGISTRY.register(Box::new(INDEXED_HEIGHT.clone()))?;
    REGISTRY.register(Box::new(CHAIN_TIP_HEIGHT.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_block_committed(payload: &BlockPayload) {
    BLOCKS_PROCESSED.inc();
    TRANSACTIONS_PROCESSED.inc_by(payload.transactions.len() as u64);
    LOGS_PROCESSED.inc_by(payload.logs.len() as u64);
}

pub fn record_reorg(height: u64) {
    REORGS_DETECTED.with_label_values(&[&height.to_string()]).inc();
}

pub fn record_rpc_retry() {
    RPC_RETRIES.inc();
}

pub fn set_indexed_height(height: u64) {
    INDEXED_HEIGHT.set(height as i64);
}

pub fn set_chain_tip(height: u64) {
    CHAIN_TIP_HEIGHT.set(height as i64);
}
