//! Concurrency strategies for `start_all`.
//!
//! Both run on the caller's task: futures are polled in insertion order, so a
//! transport sees calls in that order. Completion order is unspecified.

use futures::stream::{self, StreamExt};
use std::future::Future;

use crate::task::TaskId;

/// Fixed chunks of `width`; each chunk settles completely before the next is
/// dispatched. A task finishing early does not pull work forward.
pub(super) async fn run_chunked<F, Fut>(ids: Vec<TaskId>, width: usize, run: F)
where
    F: Fn(TaskId) -> Fut,
    Fut: Future<Output = ()>,
{
    let chunk_count = ids.len().div_ceil(width);
    for (n, chunk) in ids.chunks(width).enumerate() {
        tracing::debug!(chunk = n + 1, of = chunk_count, size = chunk.len(), "dispatching chunk");
        futures::future::join_all(chunk.iter().cloned().map(&run)).await;
    }
}

/// At most `width` in flight; the next id starts as soon as any settles.
pub(super) async fn run_pooled<F, Fut>(ids: Vec<TaskId>, width: usize, run: F)
where
    F: Fn(TaskId) -> Fut,
    Fut: Future<Output = ()>,
{
    stream::iter(ids)
        .for_each_concurrent(width, |id| run(id))
        .await;
}
