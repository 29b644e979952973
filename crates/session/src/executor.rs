// Rust guideline compliant 2026-10-16

//! Strategy for issuing one external call per batch item.

use std::time::Duration;

use tokio::sync::watch;

/// Results of one executed batch.
#[derive(Debug)]
pub struct BatchRun<R> {
    /// One result per attempted task, in task order.
    pub results: Vec<R>,
    /// The shutdown signal stopped the batch before every task was attempted.
    pub interrupted: bool,
}

/// Hexagonal seam: how a batch of per-item calls is driven.
///
/// Implementations must attempt tasks in input order and must not start a
/// new task once `shutdown` reads `true`.
#[expect(
    async_fn_in_trait,
    reason = "no dyn dispatch needed; internal workspace only"
)]
pub trait BatchExecutor {
    /// Run `op` over `tasks` and collect its results.
    async fn execute<T, R, F, Fut>(
        &self,
        tasks: Vec<T>,
        shutdown: &watch::Receiver<bool>,
        op: F,
    ) -> BatchRun<R>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = R>;
}

/// Concurrency 1 with a fixed pause between consecutive tasks.
#[derive(Debug, Clone, Copy)]
pub struct SequentialExecutor {
    pacing: Duration,
}

impl SequentialExecutor {
    /// Create an executor pausing `pacing` between tasks.
    #[must_use]
    pub fn new(pacing: Duration) -> Self {
        Self { pacing }
    }

    /// The configured pause.
    #[must_use]
    pub fn pacing(&self) -> Duration {
        self.pacing
    }
}

impl BatchExecutor for SequentialExecutor {
    async fn execute<T, R, F, Fut>(
        &self,
        tasks: Vec<T>,
        shutdown: &watch::Receiver<bool>,
        mut op: F,
    ) -> BatchRun<R>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = R>,
    {
        let total = tasks.len();
        let mut results = Vec::with_capacity(total);
        for (idx, task) in tasks.into_iter().enumerate() {
            if idx > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            if *shutdown.borrow() {
                tracing::warn!(attempted = idx, total, "executor.batch.interrupted");
                return BatchRun { results, interrupted: true };
            }
            results.push(op(task).await);
        }
        BatchRun { results, interrupted: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[tokio::test]
    async fn runs_every_task_in_order() {
        let (_tx, rx) = watch::channel(false);
        let seen = RefCell::new(vec![]);
        let run = SequentialExecutor::new(Duration::ZERO)
            .execute(vec![3, 1, 2], &rx, |n| {
                seen.borrow_mut().push(n);
                async move { n * 10 }
            })
            .await;
        assert_eq!(run.results, vec![30, 10, 20]);
        assert_eq!(*seen.borrow(), vec![3, 1, 2]);
        assert!(!run.interrupted);
    }

    #[tokio::test]
    async fn empty_batch_is_not_interrupted() {
        let (_tx, rx) = watch::channel(true);
        let run = SequentialExecutor::new(Duration::ZERO)
            .execute(Vec::<u8>::new(), &rx, |n| async move { n })
            .await;
        assert!(run.results.is_empty());
        assert!(!run.interrupted);
    }

    #[tokio::test]
    async fn raised_signal_stops_before_next_task() {
        let (tx, rx) = watch::channel(false);
        let run = SequentialExecutor::new(Duration::ZERO)
            .execute(vec![1, 2, 3, 4], &rx, |n| {
                if n == 2 {
                    tx.send_replace(true);
                }
                async move { n }
            })
            .await;
        // Task 2 was already started when the signal flipped; it completes.
        assert_eq!(run.results, vec![1, 2]);
        assert!(run.interrupted);
    }

    #[tokio::test]
    async fn pacing_separates_consecutive_tasks() {
        let (_tx, rx) = watch::channel(false);
        let pacing = Duration::from_millis(5);
        let started = tokio::time::Instant::now();
        let run = SequentialExecutor::new(pacing)
            .execute(vec![(); 3], &rx, |()| async {})
            .await;
        assert_eq!(run.results.len(), 3);
        // Two pauses: none before the first task.
        assert!(started.elapsed() >= pacing * 2);
    }
}
