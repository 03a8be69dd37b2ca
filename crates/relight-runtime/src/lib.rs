//! Bake job queues and worker orchestration.
//!
//! A [`BakeSession`] splits a scene's instances into one [`Job`] per worker,
//! hands them to [`Worker`]s and gathers their [`JobOut`] records.
#![forbid(unsafe_code)]

mod job;
mod session;
mod worker;

pub use job::{BakeOp, Job, JobData, JobOut, run_job};
pub use relight_lighting::CancelToken;
pub use session::{BakeSession, SessionReport, partition};
pub use worker::{InlineWorker, PooledWorker, ThreadWorker, Worker, WorkerKind, notify_instance};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to start bake pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("worker count must be at least 1")]
    NoWorkers,
}
