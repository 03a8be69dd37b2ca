use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::unbounded;
use hashbrown::HashMap;
use relight_lighting::{
    BakeError, BakeReport, BakeSettings, BakeStats, CancelToken, InstanceId, PhotonStats,
    Progress, Scene, emit_photons,
};

use crate::RuntimeError;
use crate::job::{BakeOp, Job, JobData, JobOut};
use crate::worker::{InlineWorker, PooledWorker, ThreadWorker, Worker, WorkerKind};

/// Splits `ids` into at most `workers` contiguous chunks of near-equal size.
pub fn partition(ids: &[InstanceId], workers: usize) -> Vec<Vec<InstanceId>> {
    if ids.is_empty() || workers == 0 {
        return Vec::new();
    }
    let chunk = ids.len().div_ceil(workers);
    ids.chunks(chunk).map(<[InstanceId]>::to_vec).collect()
}

/// A fixed set of workers baking whole scenes, one job per worker per run.
pub struct BakeSession {
    workers: Vec<Arc<dyn Worker>>,
    cancel: CancelToken,
    progress: Option<Arc<dyn Progress + Send>>,
    next_job: u64,
}

impl BakeSession {
    pub fn new(kind: WorkerKind, count: usize) -> Result<Self, RuntimeError> {
        if count == 0 {
            return Err(RuntimeError::NoWorkers);
        }
        let workers: Vec<Arc<dyn Worker>> = match kind {
            WorkerKind::Inline => (0..count)
                .map(|_| Arc::new(InlineWorker) as Arc<dyn Worker>)
                .collect(),
            WorkerKind::Thread => (0..count)
                .map(|_| Arc::new(ThreadWorker::new()) as Arc<dyn Worker>)
                .collect(),
            WorkerKind::Pooled => {
                let pool = PooledWorker::build_pool(count)?;
                (0..count)
                    .map(|_| {
                        Arc::new(PooledWorker::with_pool(Arc::clone(&pool))) as Arc<dyn Worker>
                    })
                    .collect()
            }
        };
        log::info!("bake session: {count} {kind} worker(s)");
        Self::from_workers(workers)
    }

    pub fn from_workers(workers: Vec<Arc<dyn Worker>>) -> Result<Self, RuntimeError> {
        if workers.is_empty() {
            return Err(RuntimeError::NoWorkers);
        }
        Ok(Self {
            workers,
            cancel: CancelToken::new(),
            progress: None,
            next_job: 0,
        })
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress + Send>) -> Self {
        self.progress = Some(progress);
        self
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Token shared with every job this session starts.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Bakes every instance of `scene` with `op` and blocks until all jobs are done.
    pub fn run(
        &mut self,
        scene: &Arc<Scene>,
        op: BakeOp,
        settings: &BakeSettings,
    ) -> SessionReport {
        let t0 = Instant::now();
        let photons = op.needs_photons().then(|| emit_photons(scene, settings));

        let ids: Vec<InstanceId> = scene.ids().collect();
        let chunks = partition(&ids, self.workers.len());
        let (res_tx, res_rx) = unbounded::<JobOut>();
        let settings = Arc::new(*settings);

        for (worker, targets) in self.workers.iter().zip(chunks) {
            let job = Job {
                id: self.next_job,
                op,
                targets,
            };
            self.next_job += 1;
            log::debug!("job {} ({op}): {} instance(s)", job.id, job.targets.len());
            let data = JobData {
                worker: Arc::clone(worker),
                scene: Arc::clone(scene),
                settings: Arc::clone(&settings),
                cancel: self.cancel.clone(),
                progress: self.progress.clone(),
                results: res_tx.clone(),
            };
            worker.push(job, data);
        }
        drop(res_tx);
        for worker in &self.workers {
            worker.wait();
        }

        let mut jobs: Vec<JobOut> = res_rx.try_iter().collect();
        jobs.sort_by_key(|j| j.job_id);
        let report = SessionReport {
            op,
            photons,
            jobs,
            t_total_ms: t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32,
        };
        log::info!(
            "{op} bake: {} instance(s) baked, {} failed, {} job(s) in {}ms",
            report.baked().count(),
            report.failed().count(),
            report.jobs.len(),
            report.t_total_ms
        );
        report
    }
}

#[derive(Debug)]
pub struct SessionReport {
    pub op: BakeOp,
    pub photons: Option<PhotonStats>,
    /// Ordered by job id.
    pub jobs: Vec<JobOut>,
    pub t_total_ms: u32,
}

impl SessionReport {
    pub fn baked(&self) -> impl Iterator<Item = &BakeStats> + '_ {
        self.jobs.iter().flat_map(|j| j.report.baked.iter())
    }

    pub fn failed(&self) -> impl Iterator<Item = &(InstanceId, BakeError)> + '_ {
        self.jobs.iter().flat_map(|j| j.report.failed.iter())
    }

    pub fn is_complete(&self) -> bool {
        self.jobs.iter().all(|j| j.report.is_complete())
    }

    /// Job that baked each instance.
    pub fn owners(&self) -> HashMap<InstanceId, u64> {
        let mut out = HashMap::new();
        for job in &self.jobs {
            for stats in &job.report.baked {
                out.insert(stats.instance, job.job_id);
            }
        }
        out
    }

    pub fn into_report(self) -> BakeReport {
        let mut report = BakeReport::default();
        for job in self.jobs {
            report.merge(job.report);
        }
        report
    }
}
