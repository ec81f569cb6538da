//! Bounded worker pool used to drive one batch of synthetic requests.

use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;

use tracing::{error, warn};

use crate::error::ConfigError;
use crate::types::RequestId;

/// A fixed number of worker threads pulling request ids from a shared cursor.
///
/// Threads are scoped to one [`execute`](WorkerPool::execute) call, so a
/// batch cannot return before every task it submitted has finished.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: NonZeroUsize,
}

impl WorkerPool {
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroConcurrency`] if `workers` is zero.
    pub fn new(workers: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(workers)
            .map(|workers| Self { workers })
            .ok_or(ConfigError::ZeroConcurrency)
    }

    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    /// Runs `task` once for every id in `0..tasks` and blocks until all of
    /// them have finished.
    ///
    /// A task that panics is logged and counted, and the worker moves on to
    /// the next id. If no worker thread can be spawned at all, the calling
    /// thread drains the remaining ids itself.
    ///
    /// Returns the number of tasks that panicked.
    pub fn execute<F>(&self, tasks: u64, task: F) -> usize
    where
        F: Fn(RequestId) + Sync,
    {
        let cursor = AtomicU64::new(0);
        let failed = AtomicUsize::new(0);
        let workers = (self.workers.get() as u64).min(tasks) as usize;

        let (cursor, failed_ref, task) = (&cursor, &failed, &task);

        thread::scope(|scope| {
            let mut spawned = 0;
            for worker in 0..workers {
                let run = move || drain(worker, tasks, cursor, failed_ref, task);
                match thread::Builder::new()
                    .name(format!("load-worker-{worker}"))
                    .spawn_scoped(scope, run)
                {
                    Ok(_) => spawned += 1,
                    Err(e) => warn!(worker, error = %e, "failed to spawn load worker"),
                }
            }

            if spawned == 0 && workers > 0 {
                warn!("no load worker could be spawned, running batch on the caller thread");
                drain(workers, tasks, cursor, failed_ref, task);
            }
        });

        failed.into_inner()
    }
}

fn drain<F>(worker: usize, tasks: u64, cursor: &AtomicU64, failed: &AtomicUsize, task: &F)
where
    F: Fn(RequestId) + Sync,
{
    loop {
        let id = cursor.fetch_add(1, Ordering::Relaxed);
        if id >= tasks {
            break;
        }

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task(id))) {
            failed.fetch_add(1, Ordering::Relaxed);
            error!(
                worker,
                request = id,
                reason = panic_message(payload.as_ref()),
                "request task panicked"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    #[test]
    fn test_zero_workers_rejected() {
        assert_eq!(WorkerPool::new(0).unwrap_err(), ConfigError::ZeroConcurrency);
    }

    #[test]
    fn test_every_task_runs_exactly_once() {
        let pool = WorkerPool::new(4).unwrap();
        let seen = Mutex::new(Vec::new());

        let failed = pool.execute(1000, |id| seen.lock().push(id));

        assert_eq!(failed, 0);
        let seen = seen.into_inner();
        assert_eq!(seen.len(), 1000);
        let unique: HashSet<_> = seen.into_iter().collect();
        assert_eq!(unique.len(), 1000);
        assert!(unique.iter().all(|id| *id < 1000));
    }

    #[test]
    fn test_panicking_tasks_are_counted_not_fatal() {
        let pool = WorkerPool::new(3).unwrap();
        let completed = AtomicUsize::new(0);

        let failed = pool.execute(100, |id| {
            if id % 10 == 0 {
                panic!("synthetic failure for request {id}");
            }
            completed.fetch_add(1, Ordering::Relaxed);
        });

        assert_eq!(failed, 10);
        assert_eq!(completed.into_inner(), 90);
    }

    #[test]
    fn test_more_workers_than_tasks() {
        let pool = WorkerPool::new(16).unwrap();
        let count = AtomicUsize::new(0);

        assert_eq!(pool.execute(3, |_| {
            count.fetch_add(1, Ordering::Relaxed);
        }), 0);
        assert_eq!(count.into_inner(), 3);

        assert_eq!(pool.execute(0, |_| unreachable!()), 0);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
