//! Closed error taxonomy for the sync pipeline (see spec §7).

use thiserror::Error;

/// Every failure mode the Sync Engine's loop body can encounter.
///
/// Each variant carries enough context for `tracing` to log a useful record
/// without the caller having to downcast. `ReorgDetected` is never converted
/// from anything else; it is raised directly by the Integrity Guard.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("rpc unavailable: {0}")]
    RpcUnavailable(String),

    #[error("rpc returned a malformed response: {0}")]
    RpcProtocol(String),

    #[error("no block found at height {0}")]
    NotFound(u64),

    #[error("validation failed at height {height}: {reason}")]
    ValidationFailed { height: u64, reason: String },

    #[error("reorg detected at height {height}: expected parent {expected_parent}, got {actual_parent}")]
    ReorgDetected {
        height: u64,
        expected_parent: String,
        actual_parent: String,
    },

    #[error("store error: {0}")]
    StoreError(#[from] sqlx::Error),

    #[error("shutdown requested")]
    ShutdownRequested,

    #[error("configuration error: {0}")]
    Config(String),
}

pub type IndexerResult<T> = Result<T, IndexerError>;
