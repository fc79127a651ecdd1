//! Library crate for the EVM sync pipeline and reorganization handler.
//!
//! The binary (`src/main.rs`) wires these modules into a running process;
//! integration tests exercise `repository`/`integrity_guard`/`sync` directly
//! against a real store without going through the process bootstrap.

pub mod chain_client;
pub mod decoder;
pub mod error;
pub mod fetch;
pub mod integrity_guard;
pub mod metrics;
pub mod model;
pub mod prefetch;
pub mod query_api;
pub mod repository;
pub mod settings;
pub mod sync;
pub mod telemetry;
pub mod wei;
