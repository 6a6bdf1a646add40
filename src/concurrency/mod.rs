//! Bounded worker-pool concurrency primitive (§5).
//!
//! A process-wide thread pool with worker count = hardware parallelism
//! (fallback 1), exposing an explicit `submit`/future contract rather than
//! wrapping `rayon`'s work-stealing pool — matching
//! `examples/original_source/headers/bha/utils/parallel.hpp`'s own
//! hand-rolled `ThreadPool` (mutex + condition variable + queue), because
//! the spec's shutdown-draining and post-shutdown-submit-errors contract
//! needs a concrete, inspectable queue rather than an opaque scheduler.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Queue and shutdown flag live under one mutex so a worker's "is there work,
/// or are we shutting down" check is atomic with the wait on the condvar —
/// otherwise a shutdown requested between the check and the wait is missed.
struct PoolState {
    queue: VecDeque<Job>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<PoolState>,
    condvar: Condvar,
}

/// A bounded-queue worker pool. Tasks are enqueued under a mutex and a
/// condition variable; workers block-wait until work is available or
/// shutdown is requested, at which point they drain whatever they already
/// dequeued and ignore the rest of the queue.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

/// A handle to a task's eventual result. `.join()` blocks until the task
/// completes (or the pool drops its sender without running it, in which
/// case `join` returns `Err`).
pub struct TaskFuture<T> {
    receiver: crossbeam::channel::Receiver<T>,
}

impl<T> TaskFuture<T> {
    pub fn join(self) -> crate::error::Result<T> {
        self.receiver
            .recv()
            .map_err(|_| crate::error::Error::internal("task was dropped before completion"))
    }
}

impl ThreadPool {
    /// Creates a pool with `num_threads` workers, defaulting to
    /// `num_cpus::get()` (fallback 1) when `num_threads == 0`.
    pub fn new(num_threads: usize) -> Self {
        let num_threads = if num_threads == 0 {
            num_cpus::get().max(1)
        } else {
            num_threads
        };

        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState { queue: VecDeque::new(), shutdown: false }),
            condvar: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(num_threads);
        for _ in 0..num_threads {
            let shared = Arc::clone(&shared);
            workers.push(std::thread::spawn(move || worker_loop(shared)));
        }

        ThreadPool { shared, workers }
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Submits a task, returning a future for its result. Returns an error
    /// if the pool has already been asked to shut down.
    pub fn submit<F, T>(&self, f: F) -> crate::error::Result<TaskFuture<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = crossbeam::channel::bounded(1);
        let job: Job = Box::new(move || {
            let result = f();
            let _ = tx.send(result);
        });

        {
            let mut state = self.shared.state.lock().unwrap();
            if state.shutdown {
                return Err(crate::error::Error::invalid_argument(
                    "cannot submit to a stopped thread pool",
                ));
            }
            state.queue.push_back(job);
        }
        self.shared.condvar.notify_one();

        Ok(TaskFuture { receiver: rx })
    }

    /// Submits one task per item, awaits all, and propagates the first
    /// error encountered (§5: `parallel_for_each` throws on any task error).
    pub fn parallel_for_each<T, F>(&self, items: Vec<T>, f: F) -> crate::error::Result<()>
    where
        T: Send + 'static,
        F: Fn(T) -> crate::error::Result<()> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let futures: Vec<_> = items
            .into_iter()
            .map(|item| {
                let f = Arc::clone(&f);
                self.submit(move || f(item))
            })
            .collect::<crate::error::Result<Vec<_>>>()?;

        for future in futures {
            future.join()??;
        }
        Ok(())
    }

    /// Maps `f` over `items` in parallel; results are returned in *input*
    /// order even though completion order is unspecified.
    pub fn parallel_map<T, R, F>(&self, items: Vec<T>, f: F) -> crate::error::Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let futures: Vec<_> = items
            .into_iter()
            .map(|item| {
                let f = Arc::clone(&f);
                self.submit(move || f(item))
            })
            .collect::<crate::error::Result<Vec<_>>>()?;

        futures.into_iter().map(TaskFuture::join).collect()
    }

    /// Filters `items` in parallel, preserving input order among survivors.
    pub fn parallel_filter<T, F>(&self, items: Vec<T>, f: F) -> crate::error::Result<Vec<T>>
    where
        T: Send + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let futures: Vec<_> = items
            .into_iter()
            .map(|item| {
                let f = Arc::clone(&f);
                self.submit(move || {
                    let keep = f(&item);
                    (item, keep)
                })
            })
            .collect::<crate::error::Result<Vec<_>>>()?;

        let mut out = Vec::new();
        for future in futures {
            let (item, keep) = future.join()?;
            if keep {
                out.push(item);
            }
        }
        Ok(out)
    }

    /// Chunked, associative parallel reduce: splits `items` into
    /// `num_workers()` chunks, folds each chunk with `fold`, then combines
    /// the per-chunk partial results with `combine`.
    pub fn parallel_reduce<T, R, Fold, Combine>(
        &self,
        items: Vec<T>,
        identity: R,
        fold: Fold,
        combine: Combine,
    ) -> crate::error::Result<R>
    where
        T: Send + 'static,
        R: Clone + Send + 'static,
        Fold: Fn(R, T) -> R + Send + Sync + 'static,
        Combine: Fn(R, R) -> R,
    {
        let chunk_count = self.num_workers().max(1);
        let chunk_size = items.len().div_ceil(chunk_count).max(1);
        let fold = Arc::new(fold);

        let mut chunks = Vec::new();
        let mut remaining = items;
        while !remaining.is_empty() {
            let split_at = chunk_size.min(remaining.len());
            let tail = remaining.split_off(split_at);
            chunks.push(remaining);
            remaining = tail;
        }

        let partials = self.parallel_map(chunks, {
            let fold = Arc::clone(&fold);
            let identity = identity.clone();
            move |chunk: Vec<T>| chunk.into_iter().fold(identity.clone(), |acc, x| fold(acc, x))
        })?;

        Ok(partials.into_iter().fold(identity, combine))
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.shutdown = true;
        }
        self.shared.condvar.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut state = shared.state.lock().unwrap();
            loop {
                if let Some(job) = state.queue.pop_front() {
                    break Some(job);
                }
                if state.shutdown {
                    break None;
                }
                state = shared.condvar.wait(state).unwrap();
            }
        };

        match job {
            Some(job) => job(),
            None => return,
        }
    }
}

/// Single, lazily-initialized process-wide pool, mirroring the teacher's
/// `once_cell`-backed global caches and registries.
static GLOBAL_POOL: once_cell::sync::Lazy<ThreadPool> =
    once_cell::sync::Lazy::new(|| ThreadPool::new(0));

pub fn global_pool() -> &'static ThreadPool {
    &GLOBAL_POOL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallel_map_preserves_input_order() {
        let pool = ThreadPool::new(4);
        let items: Vec<i32> = (0..50).collect();
        let results = pool.parallel_map(items.clone(), |x| x * 2).unwrap();
        let expected: Vec<i32> = items.iter().map(|x| x * 2).collect();
        assert_eq!(results, expected);
    }

    #[test]
    fn parallel_for_each_propagates_error() {
        let pool = ThreadPool::new(2);
        let items = vec![1, 2, 3];
        let result = pool.parallel_for_each(items, |x| {
            if x == 2 {
                Err(crate::error::Error::internal("boom"))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn parallel_reduce_sums_all_items() {
        let pool = ThreadPool::new(4);
        let items: Vec<u64> = (1..=100).collect();
        let total = pool
            .parallel_reduce(items, 0u64, |acc, x| acc + x, |a, b| a + b)
            .unwrap();
        assert_eq!(total, 5050);
    }

    #[test]
    fn submit_returns_error_once_shutdown_flag_is_set() {
        let pool = ThreadPool::new(1);
        pool.shared.state.lock().unwrap().shutdown = true;
        let result = pool.submit(|| 1);
        assert!(result.is_err());
        pool.shared.state.lock().unwrap().shutdown = false;
    }
}
