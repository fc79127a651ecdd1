//! Read-only HTTP query surface (spec §4.8) — out of the core's scope, but
//! bounded by its data model.
//!
//! Grounded on the teacher's `api.rs::status_v2` axum handler shape
//! (`Extension<Arc<_>> -> Json<T>`) and original_source's
//! `src/api/router.py` (`/health`, `/blocks/latest`).

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;

use crate::metrics;
use crate::model::Block;
use crate::repository;

pub fn router(pool: PgPool) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/blocks/latest", get(latest_block))
        .route("/metrics", get(metrics_endpoint))
        .layer(CorsLayer::permissive())
        .with_state(pool)
}

/// Liveness: succeeds once the store connection pool is reachable,
/// independent of sync progress.
async fn health(State(pool): State<PgPool>) -> StatusCode {
    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[derive(Serialize)]
struct BlockResponse {
    number: u64,
    hash: String,
    parent_hash: String,
    timestamp: u64,
}

impl From<Block> for BlockResponse {
    fn from(block: Block) -> Self {
        Self {
            number: block.number,
            hash: block.hash,
            parent_hash: block.parent_hash,
            timestamp: block.timestamp,
        }
    }
}

async fn latest_block(State(pool): State<PgPool>) -> Result<Json<BlockResponse>, StatusCode> {
    match repository::latest_block(&pool).await {
        Ok(Some(block)) => Ok(Json(block.into())),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

async fn metrics_endpoint() -> String {
    metrics::gather_metrics()
}
