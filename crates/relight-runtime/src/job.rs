use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::Sender;
use relight_lighting::{
    AmbientOcclusionBaker, BakeError, BakeReport, BakeSettings, CancelToken, DirectLightBaker,
    InstanceId, IndirectLightBaker, LumelBaker, Progress, Scene, bake_instance,
};

use crate::worker::Worker;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BakeOp {
    #[default]
    Direct,
    Indirect,
    DirectAndIndirect,
    AmbientOcclusion,
}

impl BakeOp {
    pub const ALL: [BakeOp; 4] = [
        BakeOp::Direct,
        BakeOp::Indirect,
        BakeOp::DirectAndIndirect,
        BakeOp::AmbientOcclusion,
    ];

    /// Whether photon maps must be filled before the op runs.
    #[inline]
    pub fn needs_photons(self) -> bool {
        matches!(self, BakeOp::Indirect | BakeOp::DirectAndIndirect)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BakeOp::Direct => "direct",
            BakeOp::Indirect => "indirect",
            BakeOp::DirectAndIndirect => "direct-and-indirect",
            BakeOp::AmbientOcclusion => "ambient-occlusion",
        }
    }

    /// Lumel passes in the order they run.
    pub fn passes(self, settings: &BakeSettings) -> Vec<Box<dyn LumelBaker>> {
        match self {
            BakeOp::Direct => vec![Box::new(DirectLightBaker::new(settings))],
            BakeOp::Indirect => vec![Box::new(IndirectLightBaker::new(settings))],
            BakeOp::DirectAndIndirect => vec![
                Box::new(DirectLightBaker::new(settings)),
                Box::new(IndirectLightBaker::new(settings)),
            ],
            BakeOp::AmbientOcclusion => vec![Box::new(AmbientOcclusionBaker::new(settings))],
        }
    }
}

impl fmt::Display for BakeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BakeOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BakeOp::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown bake op '{s}'"))
    }
}

/// One unit of work: an op over a fixed set of instances.
#[derive(Clone, Debug)]
pub struct Job {
    pub id: u64,
    pub op: BakeOp,
    pub targets: Vec<InstanceId>,
}

/// Everything a job needs besides its own description.
#[derive(Clone)]
pub struct JobData {
    /// Worker the job was pushed to; receives the per-instance `notify` calls.
    pub worker: Arc<dyn Worker>,
    pub scene: Arc<Scene>,
    pub settings: Arc<BakeSettings>,
    pub cancel: CancelToken,
    pub progress: Option<Arc<dyn Progress + Send>>,
    pub results: Sender<JobOut>,
}

#[derive(Debug)]
pub struct JobOut {
    pub job_id: u64,
    pub op: BakeOp,
    pub targets: Vec<InstanceId>,
    pub thread: Option<String>,
    pub report: BakeReport,
    pub t_total_ms: u32,
    pub t_bake_ms: u32,
}

struct JobProgress<'a> {
    worker: &'a dyn Worker,
    scene: &'a Scene,
    sink: Option<&'a (dyn Progress + Send)>,
}

impl Progress for JobProgress<'_> {
    fn report(&self, instance: InstanceId, step: u32, total: u32) {
        if let Some(inst) = self.scene.instance(instance) {
            self.worker.notify(inst, step, total);
        }
        if let Some(sink) = self.sink {
            sink.report(instance, step, total);
        }
    }
}

#[inline]
fn ms_since(t0: Instant) -> u32 {
    t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32
}

/// Bakes every target of `job` in order and sends one [`JobOut`].
pub fn run_job(job: Job, data: JobData) {
    let t_job_start = Instant::now();
    let Job { id, op, targets } = job;
    let boxed = op.passes(&data.settings);
    let passes: Vec<&dyn LumelBaker> = boxed.iter().map(|p| p.as_ref()).collect();
    let progress = JobProgress {
        worker: data.worker.as_ref(),
        scene: &data.scene,
        sink: data.progress.as_deref(),
    };

    let t0 = Instant::now();
    let mut report = BakeReport::default();
    for &target in &targets {
        match bake_instance(
            &data.scene,
            target,
            &passes,
            &data.settings,
            &progress,
            &data.cancel,
        ) {
            Ok(stats) => report.baked.push(stats),
            Err(e) => {
                log::warn!("job {id}: instance {target} not baked: {e}");
                report.failed.push((target, e));
            }
        }
    }
    let t_bake_ms = ms_since(t0);

    log::debug!(
        "job {id} ({op}): {} baked, {} failed in {t_bake_ms}ms",
        report.baked.len(),
        report.failed.len()
    );
    let _ = data.results.send(JobOut {
        job_id: id,
        op,
        targets,
        thread: thread::current().name().map(str::to_owned),
        report,
        t_total_ms: ms_since(t_job_start),
        t_bake_ms,
    });
}

/// Reports a job that never ran: every target is recorded as failed.
pub(crate) fn reject_job(job: Job, results: &Sender<JobOut>, reason: &str) {
    let Job { id, op, targets } = job;
    let failed = targets
        .iter()
        .map(|&t| (t, BakeError::InvalidCall(format!("job {id} not started: {reason}"))))
        .collect();
    let _ = results.send(JobOut {
        job_id: id,
        op,
        targets,
        thread: None,
        report: BakeReport {
            baked: Vec::new(),
            failed,
        },
        t_total_ms: 0,
        t_bake_ms: 0,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_round_trip_through_their_names() {
        for op in BakeOp::ALL {
            assert_eq!(op.as_str().parse::<BakeOp>(), Ok(op));
        }
        assert!("radiosity".parse::<BakeOp>().is_err());
    }

    #[test]
    fn only_indirect_ops_need_photons() {
        let needs: Vec<_> = BakeOp::ALL.iter().map(|op| op.needs_photons()).collect();
        assert_eq!(needs, [false, true, true, false]);
        let s = BakeSettings::default();
        assert_eq!(BakeOp::DirectAndIndirect.passes(&s).len(), 2);
        assert_eq!(BakeOp::DirectAndIndirect.passes(&s)[1].name(), "indirect");
    }

    #[test]
    fn rejected_jobs_fail_every_target() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let job = Job {
            id: 7,
            op: BakeOp::Direct,
            targets: vec![InstanceId(1), InstanceId(4)],
        };
        reject_job(job, &tx, "no thread");
        let out = rx.try_recv().unwrap();
        assert_eq!(out.job_id, 7);
        assert!(out.report.baked.is_empty());
        let failed: Vec<_> = out.report.failed.iter().map(|(id, _)| *id).collect();
        assert_eq!(failed, [InstanceId(1), InstanceId(4)]);
        assert!(matches!(out.report.failed[0].1, BakeError::InvalidCall(_)));
    }
}
