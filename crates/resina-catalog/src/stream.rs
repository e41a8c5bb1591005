//! Restartable snapshot streams.
//!
//! Each stream emits one snapshot immediately and a fresh one after every
//! catalog mutation, driven by a shared revision `watch` channel. Dropping a
//! stream simply stops emissions; resubscribing starts over with a fresh
//! snapshot.

use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio::sync::watch;
use tokio::task;

use resina_store::{Result, StoreError};

/// Build a stream that runs `query` once up front and again after every
/// revision bump. The stream ends only if the revision channel is closed
/// (i.e. the service was dropped).
///
/// Queries hit `RocksDB` synchronously, so each one runs on the blocking
/// thread pool rather than stalling the async executor.
pub(crate) fn snapshot_stream<T, F>(
    rx: watch::Receiver<u64>,
    query: F,
) -> impl Stream<Item = Result<T>>
where
    F: Fn() -> Result<T> + Send + Sync + 'static,
    T: Send + 'static,
{
    let query = Arc::new(query);
    stream::unfold((rx, query, true), |(mut rx, query, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let run = Arc::clone(&query);
        let item = match task::spawn_blocking(move || run()).await {
            Ok(item) => item,
            Err(e) => Err(StoreError::Database(format!("snapshot query failed: {e}"))),
        };
        Some((item, (rx, query, false)))
    })
}
