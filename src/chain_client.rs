//! Thin RPC accessor over the upstream JSON-RPC endpoint (spec §4.1).
//!
//! Owns only the retry/backoff wrapper and the translation from the
//! underlying client's errors into the three kinds the rest of the system
//! understands (`RpcUnavailable`, `NotFound`, `RpcProtocol`). Type decoding
//! (hex strings in, native values out) happens one layer up, in the
//! fetch-and-validate sub-operation, against the raw shapes defined here.

use std::time::Duration;

use alloy::rpc::client::RpcClient;
use serde::Deserialize;
use tracing::warn;

use crate::error::{IndexerError, IndexerResult};
use crate::metrics;

/// A block exactly as the RPC returns it: numeric fields still hex strings.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    pub number: String,
    pub hash: String,
    #[serde(rename = "parentHash")]
    pub parent_hash: String,
    pub timestamp: String,
    pub miner: String,
    pub difficulty: String,
    #[serde(rename = "totalDifficulty", default)]
    pub total_difficulty: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(rename = "extraData", default)]
    pub extra_data: Option<String>,
    #[serde(rename = "gasLimit")]
    pub gas_limit: String,
    #[serde(rename = "gasUsed")]
    pub gas_used: String,
    #[serde(rename = "baseFeePerGas", default)]
    pub base_fee_per_gas: Option<String>,
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTransaction {
    pub hash: String,
    pub nonce: String,
    #[serde(rename = "blockHash")]
    pub block_hash: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "transactionIndex")]
    pub transaction_index: String,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    #[serde(rename = "gasPrice", default)]
    pub gas_price: Option<String>,
    pub gas: String,
    pub input: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLog {
    #[serde(rename = "logIndex")]
    pub log_index: String,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    pub address: String,
    pub data: String,
    pub topics: Vec<String>,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "blockHash")]
    pub block_hash: String,
}

pub struct ChainClient {
    rpc: RpcClient,
    retry_max_attempts: u32,
}

impl ChainClient {
    pub fn new(rpc_url: &str, retry_max_attempts: u32) -> IndexerResult<Self> {
        let url = rpc_url
            .parse()
            .map_err(|e| IndexerError::Config(format!("invalid RPC_URL {rpc_url}: {e}")))?;
        let rpc = RpcClient::new_http(url);
        Ok(Self {
            rpc,
            retry_max_attempts,
        })
    }

    /// Exponential backoff: first wait 2s, doubling, capped at 10s. Applied
    /// uniformly to transport and remote-reported errors (spec §4.1).
    async fn with_retry<T, F, Fut>(&self, op_name: &str, mut f: F) -> IndexerResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = IndexerResult<T>>,
    {
        let mut wait = Duration::from_secs(2);
        let mut last_err = None;
        for attempt in 1..=self.retry_max_attempts {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(op = op_name, attempt, error = %err, "rpc call failed, retrying");
                    metrics::record_rpc_retry();
                    last_err = Some(err);
                    if attempt < self.retry_max_attempts {
                        tokio::time::sleep(wait).await;
                        wait = (wait * 2).min(Duration::from_secs(10));
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            IndexerError::RpcUnavailable(format!("{op_name}: exhausted retries"))
        }))
    }

    pub async fn fetch_head(&self) -> IndexerResult<u64> {
        self.with_retry("eth_blockNumber", || async {
            let hex: String = self
                .rpc
                .request("eth_blockNumber", ())
                .await
                .map_err(|e| IndexerError::RpcUnavailable(e.to_string()))?;
            let body = hex.trim_start_matches("0x");
            u64::from_str_radix(body, 16)
                .map_err(|e| IndexerError::RpcProtocol(format!("bad block number {hex}: {e}")))
        })
        .await
    }

    pub async fn fetch_block(&self, height: u64, include_transactions: bool) -> IndexerResult<RawBlock> {
        self.with_retry("eth_getBlockByNumber", || async {
            let tag = format!("0x{height:x}");
            let raw: Option<RawBlock> = self
                .rpc
                .request("eth_getBlockByNumber", (tag.clone(), include_transactions))
                .await
                .map_err(|e| IndexerError::RpcUnavailable(e.to_string()))?;
            raw.ok_or(IndexerError::NotFound(height))
        })
        .await
    }

    pub async fn fetch_logs(&self, from_height: u64, to_height: u64) -> IndexerResult<Vec<RawLog>> {
        self.with_retry("eth_getLogs", || async {
            let filter = serde_json::json!({
                "fromBlock": format!("0x{from_height:x}"),
                "toBlock": format!("0x{to_height:x}"),
            });
            let raw: Vec<RawLog> = self
                .rpc
                .request("eth_getLogs", (filter.clone(),))
                .await
                .map_err(|e| IndexerError::RpcUnavailable(e.to_string()))?;
            Ok(raw)
        })
        .await
    }
}
