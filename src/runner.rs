//! Bounded fan-out over a batch of rows.
//!
//! [`run`] drives at most `max_workers` worker futures at a time with
//! `buffer_unordered`. Workers return `Option<R>`: `None` means the row
//! produced nothing (the fetcher already logged why) and is only counted.
//! Results come back to the caller, which merges them into the store once
//! every worker is done.

use std::future::Future;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument};

/// Outcome of one [`run`].
#[derive(Debug)]
pub struct RunReport<R> {
    /// Worker results, in completion order.
    pub results: Vec<R>,
    /// Rows the skip policy filtered out.
    pub skipped: usize,
    /// Rows whose worker returned nothing.
    pub empty: usize,
}

impl<R> RunReport<R> {
    pub fn attempted(&self) -> usize {
        self.results.len() + self.empty
    }
}

/// Apply `worker` to every row not rejected by `skip`, with at most
/// `max_workers` in flight. A `max_workers` of zero is treated as one.
#[instrument(level = "info", skip_all, fields(rows = rows.len(), max_workers = max_workers))]
pub async fn run<T, R, S, W, Fut>(rows: Vec<T>, max_workers: usize, mut skip: S, worker: W) -> RunReport<R>
where
    S: FnMut(&T) -> bool,
    W: Fn(T) -> Fut,
    Fut: Future<Output = Option<R>>,
{
    let total = rows.len();
    let mut skipped = 0usize;
    let pending: Vec<T> = rows
        .into_iter()
        .filter(|row| {
            let skip_it = skip(row);
            if skip_it {
                skipped += 1;
            }
            !skip_it
        })
        .collect();

    debug!(total, skipped, pending = pending.len(), "Starting fan-out");

    let outcomes: Vec<Option<R>> = stream::iter(pending)
        .map(&worker)
        .buffer_unordered(max_workers.max(1))
        .collect()
        .await;

    let attempted = outcomes.len();
    let results: Vec<R> = outcomes.into_iter().flatten().collect();
    let empty = attempted - results.len();

    info!(
        total,
        skipped,
        succeeded = results.len(),
        empty,
        "Fan-out complete"
    );
    RunReport {
        results,
        skipped,
        empty,
    }
}
