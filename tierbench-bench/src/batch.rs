//! Bounded batch execution.
//!
//! Items are processed in fixed-size batches: every operation in a batch is
//! started together and awaited with a join barrier, and batch `k + 1` does
//! not start until batch `k` has fully completed. Peak concurrency is
//! therefore capped at the batch size regardless of how many items there are.

use std::future::Future;
use std::ops::ControlFlow;

use futures_util::future::join_all;
use tracing::trace;

/// Runs operations over a slice in sequential, internally concurrent batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchExecutor {
    batch_size: usize,
}

impl BatchExecutor {
    /// Create an executor. A batch size of zero is treated as one.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches needed for `total` items.
    pub fn batch_count(&self, total: usize) -> usize {
        total.div_ceil(self.batch_size)
    }

    /// Apply `op` to every item, batch by batch.
    ///
    /// After each join barrier the batch's results, in item order, are handed
    /// to `on_batch`. Returning `ControlFlow::Break` stops before the next
    /// batch starts. Returns the number of batches that ran.
    pub async fn run<'a, T, R, F, Fut, B>(&self, items: &'a [T], op: F, mut on_batch: B) -> usize
    where
        F: Fn(&'a T) -> Fut,
        Fut: Future<Output = R>,
        B: FnMut(Vec<R>) -> ControlFlow<()>,
    {
        let mut completed = 0;
        for (index, chunk) in items.chunks(self.batch_size).enumerate() {
            let results = join_all(chunk.iter().map(&op)).await;
            completed += 1;
            trace!(batch = index, size = chunk.len(), "Batch joined");

            if on_batch(results).is_break() {
                break;
            }
        }
        completed
    }

    /// Apply `op` to every item and collect all results in item order.
    pub async fn collect<'a, T, R, F, Fut>(&self, items: &'a [T], op: F) -> Vec<R>
    where
        F: Fn(&'a T) -> Fut,
        Fut: Future<Output = R>,
    {
        let mut out = Vec::with_capacity(items.len());
        self.run(items, op, |batch| {
            out.extend(batch);
            ControlFlow::Continue(())
        })
        .await;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Tracker {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        order: Mutex<Vec<(usize, &'static str)>>,
    }

    impl Tracker {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                order: Mutex::new(Vec::new()),
            }
        }

        async fn op(&self, item: usize) -> usize {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.order.lock().unwrap().push((item, "start"));
            tokio::task::yield_now().await;
            self.order.lock().unwrap().push((item, "end"));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            item * 2
        }
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        assert_eq!(BatchExecutor::new(0).batch_size(), 1);
    }

    #[test]
    fn test_batch_count() {
        let exec = BatchExecutor::new(4);
        assert_eq!(exec.batch_count(0), 0);
        assert_eq!(exec.batch_count(4), 1);
        assert_eq!(exec.batch_count(9), 3);
    }

    #[tokio::test]
    async fn test_collect_preserves_item_order() {
        let tracker = Tracker::new();
        let items: Vec<usize> = (0..10).collect();
        let out = BatchExecutor::new(3)
            .collect(&items, |i| tracker.op(*i))
            .await;
        assert_eq!(out, (0..10).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_peak_concurrency_equals_batch_size() {
        let tracker = Tracker::new();
        let items: Vec<usize> = (0..25).collect();
        BatchExecutor::new(5)
            .collect(&items, |i| tracker.op(*i))
            .await;
        assert_eq!(tracker.peak.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_batches_do_not_overlap() {
        let tracker = Tracker::new();
        let items: Vec<usize> = (0..6).collect();
        BatchExecutor::new(3)
            .collect(&items, |i| tracker.op(*i))
            .await;

        let order = tracker.order.lock().unwrap().clone();
        let last_end_of_first = order
            .iter()
            .rposition(|(i, ev)| *i < 3 && *ev == "end")
            .unwrap();
        let first_start_of_second = order
            .iter()
            .position(|(i, ev)| *i >= 3 && *ev == "start")
            .unwrap();
        assert!(last_end_of_first < first_start_of_second);
    }

    #[tokio::test]
    async fn test_break_stops_remaining_batches() {
        let tracker = Tracker::new();
        let items: Vec<usize> = (0..10).collect();
        let mut seen = 0;
        let ran = BatchExecutor::new(2)
            .run(&items, |i| tracker.op(*i), |batch| {
                seen += batch.len();
                if seen >= 4 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .await;

        assert_eq!(ran, 2);
        assert_eq!(seen, 4);
        assert_eq!(tracker.order.lock().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_empty_input_runs_nothing() {
        let tracker = Tracker::new();
        let items: Vec<usize> = Vec::new();
        let ran = BatchExecutor::new(8)
            .run(&items, |i| tracker.op(*i), |_| ControlFlow::Continue(()))
            .await;
        assert_eq!(ran, 0);
    }
}
