//! Bounded worker pool for building commit records.

use crate::error::{Error, Result};
use crossbeam::channel::{Receiver, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Longest time a dropped pool waits for in-flight jobs.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Runs jobs on a rayon pool and hands back results in completion order.
///
/// At most `capacity` jobs are in flight; callers check [`has_capacity`](Self::has_capacity)
/// before submitting.
pub struct WorkerPool<T: Send + 'static> {
    pool: rayon::ThreadPool,
    sender: Sender<Result<T>>,
    receiver: Receiver<Result<T>>,
    in_flight: usize,
    capacity: usize,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("histmine-worker-{i}"))
            .build()
            .map_err(|e| Error::Config(format!("Could not start worker pool: {e}")))?;
        let (sender, receiver) = crossbeam::channel::unbounded();
        debug!(workers, "Started worker pool");

        Ok(Self {
            pool,
            sender,
            receiver,
            in_flight: 0,
            capacity: workers * 2,
        })
    }

    pub fn has_capacity(&self) -> bool {
        self.in_flight < self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Queue a job. A panicking job reports an error instead of a value.
    pub fn submit<F>(&mut self, job: F)
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let sender = self.sender.clone();
        self.in_flight += 1;
        self.pool.spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(job))
                .unwrap_or_else(|_| Err(Error::Other(anyhow::anyhow!("worker job panicked"))));
            // The receiver only goes away when the pool is dropped.
            let _ = sender.send(outcome);
        });
    }

    /// Block until the next job completes; `None` when nothing is in flight.
    pub fn next_completed(&mut self) -> Option<Result<T>> {
        if self.in_flight == 0 {
            return None;
        }
        let outcome = self.receiver.recv().ok()?;
        self.in_flight -= 1;
        Some(outcome)
    }
}

impl<T: Send + 'static> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        let deadline = Instant::now() + SHUTDOWN_TIMEOUT;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(_) => self.in_flight -= 1,
                Err(_) => {
                    warn!(
                        in_flight = self.in_flight,
                        "Worker pool shutdown timed out"
                    );
                    break;
                }
            }
        }
        debug!("Worker pool shut down");
    }
}
