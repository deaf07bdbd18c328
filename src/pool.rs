//! A fixed-size worker pool draining a FIFO job queue, and the small
//! "wait for a batch of blocks to finish" primitive built on top of it
//! (spec §4.2, §4.5). Grounded in `threadpool.cpp`/`threadpool.h`.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Job>>,
    cond: Condvar,
    accepting: Mutex<bool>,
}

/// A process-wide pool of `2 * hardware_concurrency` worker threads.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    num_workers: usize,
}

impl WorkerPool {
    /// Spawn a pool sized to twice the detected CPU count.
    pub fn new() -> Self {
        Self::with_workers(2 * num_cpus::get())
    }

    /// Spawn a pool with an explicit worker count (mainly useful for tests).
    pub fn with_workers(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        log::debug!("constructing worker pool with {num_workers} threads");

        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
            accepting: Mutex::new(true),
        });

        let workers = (0..num_workers)
            .map(|id| {
                let shared = Arc::clone(&shared);
                std::thread::Builder::new()
                    .name(format!("wordle-worker-{id}"))
                    .spawn(move || worker_loop(shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self {
            shared,
            workers: Mutex::new(workers),
            num_workers,
        }
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Place a closure on the FIFO queue and wake one worker.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        let mut queue = self.shared.queue.lock().unwrap();
        queue.push_back(Box::new(job));
        drop(queue);
        self.shared.cond.notify_one();
    }

    /// Stop accepting new jobs, wake every worker, and join them all.
    /// Workers drain whatever is left in the queue before exiting.
    pub fn shutdown(&self) {
        {
            let mut accepting = self.shared.accepting.lock().unwrap();
            *accepting = false;
        }
        self.shared.cond.notify_all();

        let mut workers = self.workers.lock().unwrap();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
        log::debug!("worker pool shut down");
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if let Some(job) = queue.pop_front() {
                    break Some(job);
                }
                if !*shared.accepting.lock().unwrap() {
                    break None;
                }
                queue = shared.cond.wait(queue).unwrap();
            }
        };
        match job {
            Some(job) => job(),
            None => return,
        }
    }
}

/// The parallel-batch primitive from spec §4.5: partition work into
/// `pool.num_workers()` blocks, submit each, and block the caller
/// until every block has reported done. Used by both the H and H₂
/// passes in the entropy pipeline.
///
/// `block` receives the block index and must itself push its results
/// into the shared `Mutex<Vec<T>>`-like structure before returning;
/// this function only handles the submit/wait choreography.
pub fn run_batch<F>(pool: &WorkerPool, num_blocks: usize, block: F)
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let block = Arc::new(block);
    let done = Arc::new((Mutex::new(0usize), Condvar::new()));

    for i in 0..num_blocks {
        let block = Arc::clone(&block);
        let done = Arc::clone(&done);
        pool.submit(move || {
            block(i);
            let (lock, cond) = &*done;
            let mut n = lock.lock().unwrap();
            *n += 1;
            cond.notify_all();
        });
    }

    let (lock, cond) = &*done;
    let mut n = lock.lock().unwrap();
    while *n < num_blocks {
        n = cond.wait(n).unwrap();
    }
}
