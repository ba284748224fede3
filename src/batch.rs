//! Fan-out of independent jobs over a fixed pool of scoped worker threads.
//!
//! Jobs are queued on a crossbeam channel; each worker pulls the next job,
//! checks the cancellation flag, runs it and sends the keyed result back.
//! Jobs never started because of cancellation are reported as pending.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::unbounded;

use crate::error::Result;

/// Shared flag that asks running batches to stop picking up new work.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct BatchOutcome<K, T> {
    /// Finished jobs, successful or not
    pub results: BTreeMap<K, Result<T>>,
    /// Jobs that were never started, in key order
    pub pending: Vec<K>,
    pub cancelled: bool,
}

impl<K, T> BatchOutcome<K, T> {
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Run `work` on every item using up to `workers` threads.
pub fn run_batch<K, I, T, F>(
    items: Vec<(K, I)>,
    workers: usize,
    cancel: &CancellationToken,
    work: F,
) -> BatchOutcome<K, T>
where
    K: Ord + Clone + Send,
    I: Send,
    T: Send,
    F: Fn(&K, I) -> Result<T> + Sync,
{
    let keys: Vec<K> = items.iter().map(|(k, _)| k.clone()).collect();
    let workers = workers.clamp(1, keys.len().max(1));

    let (job_tx, job_rx) = unbounded();
    for item in items {
        // receiver is alive, send cannot fail
        let _ = job_tx.send(item);
    }
    drop(job_tx);

    let (result_tx, result_rx) = unbounded();
    let mut results = BTreeMap::new();

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let work = &work;
            scope.spawn(move || {
                while let Ok((key, item)) = job_rx.recv() {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let outcome = work(&key, item);
                    if result_tx.send((key, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        for (key, outcome) in result_rx.iter() {
            results.insert(key, outcome);
        }
    });

    let mut pending: Vec<K> = keys
        .into_iter()
        .filter(|k| !results.contains_key(k))
        .collect();
    pending.sort();
    pending.dedup();

    let cancelled = cancel.is_cancelled();
    if cancelled {
        log::info!(
            "Batch cancelled: {} finished, {} pending",
            results.len(),
            pending.len()
        );
    }

    BatchOutcome {
        results,
        pending,
        cancelled,
    }
}
