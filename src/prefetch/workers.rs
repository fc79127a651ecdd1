//! Background prefetch worker pool (spec §4.5 step d, §5).
//!
//! Grounded on the teacher's `parallel.rs` semaphore-bounded dispatch
//! pattern: a fixed number of permits admission-controls concurrent RPC
//! fetches, and every task's result (success or failure) is joined before
//! the refill call returns.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::chain_client::ChainClient;
use crate::fetch::fetch_and_validate;
use crate::prefetch::buffer::PrefetchBuffer;

/// Dispatches a fetch-and-validate call for every height in
/// `[from..=to]` that isn't already buffered or in flight, bounded to at
/// most `max_concurrent` simultaneous fetches. Successfully validated
/// payloads are pushed into the buffer as they complete; failures are
/// logged and simply skipped (the engine will fetch them synchronously if
/// it reaches them before the next refill).
pub async fn refill(
    client: Arc<ChainClient>,
    buffer: Arc<PrefetchBuffer>,
    from: u64,
    to: u64,
    max_concurrent: usize,
) {
    if from > to {
        return;
    }

    let already_buffered = buffer.peek_heights().await;
    let semaphore = Arc::new(Semaphore::new(max_concurrent));

    let tasks = (from..=to)
        .filter(|h| !already_buffered.contains(h))
        .map(|height| {
            let sem = semaphore.clone();
            let client = client.clone();
            let buffer = buffer.clone();
            async move {
                let _permit = sem
                    .acquire()
                    .await
                    .expect("semaphore is never closed while workers run");
                match fetch_and_validate(&client, height).await {
                    Ok(payload) => buffer.put(height, payload).await,
                    Err(err) => warn!(height, error = %err, "prefetch worker failed to fetch height"),
                }
            }
        });

    join_all(tasks).await;
}
