use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, bounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use relight_lighting::Instance;

use crate::RuntimeError;
use crate::job::{Job, JobData, reject_job, run_job};

/// Marks `instance` dirty once its final step has been reported.
#[inline]
pub fn notify_instance(instance: &Instance, step: u32, step_count: u32) {
    if step == step_count {
        instance.mark_dirty();
    }
}

/// Executes bake jobs. `push` never blocks; `wait` returns once every job
/// pushed so far has finished.
pub trait Worker: Send + Sync {
    fn push(&self, job: Job, data: JobData);

    fn wait(&self);

    fn notify(&self, instance: &Instance, step: u32, step_count: u32) {
        notify_instance(instance, step, step_count);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    Inline,
    Thread,
    #[default]
    Pooled,
}

impl WorkerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerKind::Inline => "inline",
            WorkerKind::Thread => "thread",
            WorkerKind::Pooled => "pooled",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inline" => Ok(WorkerKind::Inline),
            "thread" => Ok(WorkerKind::Thread),
            "pooled" => Ok(WorkerKind::Pooled),
            _ => Err(format!("unknown worker kind '{s}'")),
        }
    }
}

/// Runs each job on the calling thread inside `push`.
#[derive(Debug, Default)]
pub struct InlineWorker;

impl Worker for InlineWorker {
    fn push(&self, job: Job, data: JobData) {
        run_job(job, data);
    }

    fn wait(&self) {}
}

/// Spawns a dedicated OS thread per pushed job.
#[derive(Debug, Default)]
pub struct ThreadWorker {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadWorker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Worker for ThreadWorker {
    fn push(&self, job: Job, data: JobData) {
        let id = job.id;
        let targets = job.targets.clone();
        let op = job.op;
        let results = data.results.clone();
        let spawned = thread::Builder::new()
            .name(format!("relight-job-{id}"))
            .spawn(move || run_job(job, data));
        match spawned {
            Ok(handle) => self
                .handles
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(handle),
            Err(e) => {
                log::error!("job {id}: could not spawn bake thread: {e}");
                reject_job(Job { id, op, targets }, &results, &e.to_string());
            }
        }
    }

    fn wait(&self) {
        let handles: Vec<_> = self
            .handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for h in handles {
            if h.join().is_err() {
                log::error!("bake thread panicked");
            }
        }
    }
}

/// Submits jobs to a shared rayon pool; each job reports completion on its
/// own bounded channel.
pub struct PooledWorker {
    pool: Arc<ThreadPool>,
    pending: Mutex<Vec<Receiver<()>>>,
}

impl PooledWorker {
    pub fn new(threads: usize) -> Result<Self, RuntimeError> {
        Ok(Self::with_pool(Self::build_pool(threads)?))
    }

    pub fn with_pool(pool: Arc<ThreadPool>) -> Self {
        Self {
            pool,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn build_pool(threads: usize) -> Result<Arc<ThreadPool>, RuntimeError> {
        if threads == 0 {
            return Err(RuntimeError::NoWorkers);
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("relight-bake-{i}"))
            .panic_handler(|_| log::error!("bake job panicked"))
            .build()?;
        Ok(Arc::new(pool))
    }

    pub fn pool(&self) -> &Arc<ThreadPool> {
        &self.pool
    }
}

impl fmt::Debug for PooledWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledWorker")
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl Worker for PooledWorker {
    fn push(&self, job: Job, data: JobData) {
        let (done_tx, done_rx) = bounded::<()>(1);
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(done_rx);
        self.pool.spawn(move || {
            run_job(job, data);
            let _ = done_tx.send(());
        });
    }

    fn wait(&self) {
        let pending: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for rx in pending {
            // The panic handler keeps the pool alive; a panicked job drops its sender.
            let _ = rx.recv();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_kinds_parse() {
        for kind in [WorkerKind::Inline, WorkerKind::Thread, WorkerKind::Pooled] {
            assert_eq!(kind.as_str().parse::<WorkerKind>(), Ok(kind));
        }
        assert!("fibers".parse::<WorkerKind>().is_err());
        assert_eq!(WorkerKind::default(), WorkerKind::Pooled);
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert!(matches!(PooledWorker::new(0), Err(RuntimeError::NoWorkers)));
    }

    #[test]
    fn panicking_pool_task_releases_its_waiter() {
        let worker = PooledWorker::new(1).unwrap();
        let (done_tx, done_rx) = bounded::<()>(1);
        worker.pending.lock().unwrap().push(done_rx);
        worker.pool().spawn(move || {
            let _keep = done_tx;
            panic!("lumel exploded");
        });
        worker.wait();
        // The pool survives and still runs work.
        let (tx, rx) = bounded::<u32>(1);
        worker.pool().spawn(move || {
            let _ = tx.send(5);
        });
        assert_eq!(rx.recv(), Ok(5));
    }

    #[test]
    fn waiting_with_nothing_pushed_returns() {
        ThreadWorker::new().wait();
        PooledWorker::new(1).unwrap().wait();
        InlineWorker.wait();
    }
}
