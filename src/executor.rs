//! Worker pool glue.
//!
//! The runtime consumes its executor through the narrowest possible
//! contract: submit a unit of work. [`ThreadPool`] is the default
//! implementation, a fixed-size set of OS threads draining a shared job
//! queue, but anything that can run a closure somewhere can stand in via
//! the [`Executor`] trait.

use crate::queue::Queue;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// A unit of work submitted to the pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run a submitted unit of work. The runtime makes no
/// further assumptions about ordering or placement across jobs.
pub trait Executor: Send + Sync + 'static {
    fn execute(&self, job: Job);
}

enum WorkerCommand {
    Run(Job),
    Shutdown,
}

/// Fixed-size pool of worker threads draining a shared job queue.
pub struct ThreadPool {
    jobs: Arc<Queue<WorkerCommand>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
    size: usize,
}

impl ThreadPool {
    /// Spawn a pool with `size` workers (at least one).
    ///
    /// # Panics
    ///
    /// Panics if the operating system refuses to spawn a worker thread.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let jobs: Arc<Queue<WorkerCommand>> = Arc::new(Queue::unbounded());
        let mut workers = Vec::with_capacity(size);
        for n in 0..size {
            let jobs = Arc::clone(&jobs);
            let handle = thread::Builder::new()
                .name(format!("actor-worker-{n}"))
                .spawn(move || worker_loop(jobs))
                .expect("failed to spawn pool worker thread");
            workers.push(handle);
        }
        debug!(workers = size, "thread pool started");
        Self {
            jobs,
            workers: Mutex::new(workers),
            running: AtomicBool::new(true),
            size,
        }
    }

    /// Spawn a pool sized to the machine's available parallelism.
    pub fn with_default_size() -> Self {
        Self::new(default_worker_count())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of jobs waiting for a worker.
    pub fn queued_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Stop accepting jobs and join the workers. Jobs already queued still
    /// run before their worker exits. Idempotent.
    pub fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            for _ in 0..self.size {
                self.jobs.push(WorkerCommand::Shutdown);
            }
        }
        let current = thread::current().id();
        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            // A worker can end up dropping the last pool handle itself;
            // joining the current thread would deadlock, and the sentinel
            // already makes that worker exit.
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }
    }
}

impl Executor for ThreadPool {
    fn execute(&self, job: Job) {
        if !self.running.load(Ordering::SeqCst) {
            warn!("job submitted to a shut-down pool, dropping");
            return;
        }
        self.jobs.push(WorkerCommand::Run(job));
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("size", &self.size)
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}

fn worker_loop(jobs: Arc<Queue<WorkerCommand>>) {
    loop {
        match jobs.pop() {
            WorkerCommand::Run(job) => {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    warn!("pool job panicked, worker continues");
                }
            }
            WorkerCommand::Shutdown => break,
        }
    }
}

pub(crate) fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}
