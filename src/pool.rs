//! Bounded worker pool for parallel processing.
//!
//! Jobs flow to a fixed set of scoped worker threads over a bounded kanal
//! channel. Each worker runs one job to completion before taking the next,
//! and results come back over a second channel in the order they finish.

use crate::error::Result;
use std::thread;

/// A fixed-size set of worker threads.
///
/// Threads only live for the duration of one [`run`](WorkerPool::run) call.
/// Nested pools are independent: a pool of M workers whose jobs each run a
/// pool of N workers can have up to M×N threads busy at once.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: String,
    workers: usize,
}

impl WorkerPool {
    /// Create a pool with `workers` threads (at least one).
    pub fn new(name: impl Into<String>, workers: usize) -> Self {
        Self {
            name: name.into(),
            workers: workers.max(1),
        }
    }

    /// Get the number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Get the pool name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `work` over every job and collect results in completion order.
    ///
    /// `jobs` is drained lazily on the calling thread; at most `workers`
    /// jobs wait in the queue at any time. Blocks until every submitted job
    /// has finished. A panic inside `work` resumes on the caller once all
    /// workers have stopped.
    pub fn run<I, J, R, F>(&self, jobs: I, work: F) -> Result<Vec<R>>
    where
        I: IntoIterator<Item = J>,
        J: Send,
        R: Send,
        F: Fn(J) -> R + Sync,
    {
        thread::scope(|scope| -> Result<Vec<R>> {
            let (job_tx, job_rx) = kanal::bounded::<J>(self.workers);
            let (done_tx, done_rx) = kanal::unbounded::<R>();
            let work = &work;

            for id in 0..self.workers {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                thread::Builder::new()
                    .name(format!("{}-worker-{}", self.name, id))
                    .spawn_scoped(scope, move || {
                        while let Ok(job) = job_rx.recv() {
                            if done_tx.send(work(job)).is_err() {
                                break;
                            }
                        }
                    })?;
            }
            drop(job_rx);
            drop(done_tx);
            tracing::debug!(pool = %self.name, workers = self.workers, "worker pool started");

            let mut submitted = 0usize;
            for job in jobs {
                if job_tx.send(job).is_err() {
                    break;
                }
                submitted += 1;
            }
            drop(job_tx);

            let mut results = Vec::with_capacity(submitted);
            while let Ok(result) = done_rx.recv() {
                results.push(result);
            }
            tracing::debug!(pool = %self.name, completed = results.len(), "worker pool drained");
            Ok(results)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_runs_every_job() {
        let pool = WorkerPool::new("test", 4);
        let mut results = pool.run(0..100u32, |x| x * 2).unwrap();
        results.sort_unstable();
        assert_eq!(results, (0..100u32).map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_workers_clamped() {
        let pool = WorkerPool::new("test", 0);
        assert_eq!(pool.workers(), 1);
        assert_eq!(pool.run(vec![1, 2, 3], |x| x).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_concurrency_bounded_by_workers() {
        let pool = WorkerPool::new("bounded", 3);
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        pool.run(0..30, |_| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
            active.fetch_sub(1, Ordering::SeqCst);
        })
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn test_results_in_completion_order() {
        let pool = WorkerPool::new("order", 2);
        // The first job finishes last.
        let results = pool
            .run(vec![60u64, 0], |ms| {
                thread::sleep(Duration::from_millis(ms));
                ms
            })
            .unwrap();
        assert_eq!(results, vec![0, 60]);
    }

    #[test]
    fn test_empty_jobs() {
        let pool = WorkerPool::new("empty", 2);
        let results: Vec<u8> = pool.run(Vec::<u8>::new(), |x| x).unwrap();
        assert!(results.is_empty());
    }
}
