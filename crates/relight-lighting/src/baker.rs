//! Lumel bakers and the per-instance bake driver.
//!
//! A bake runs one or more [`LumelBaker`] passes over an instance's lightmap
//! into a scratch buffer. Only a bake that finishes every pass is written back
//! and published; a cancelled bake leaves the lightmap as it was.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::Rng;
use rand::rngs::SmallRng;
use relight_geom::{Ray, Rgb};

use crate::BakeError;
use crate::lightmap::{Lightmap, Lumel};
use crate::sampling::{cosine_hemisphere, stream_rng};
use crate::scene::{Instance, InstanceId, Scene};
use crate::settings::{BakeSettings, Traversal};

/// Receives bake progress. `step == total` is reported exactly once per
/// instance, after its lightmap has been published.
pub trait Progress: Sync {
    fn report(&self, instance: InstanceId, step: u32, total: u32);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&self, _instance: InstanceId, _step: u32, _total: u32) {}
}

impl<F> Progress for F
where
    F: Fn(InstanceId, u32, u32) + Sync,
{
    fn report(&self, instance: InstanceId, step: u32, total: u32) {
        self(instance, step, total)
    }
}

/// Shared cooperative cancellation flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub trait LumelBaker: Send + Sync {
    fn name(&self) -> &'static str;

    /// Adds to the colour left by earlier passes instead of replacing it.
    fn accumulates(&self) -> bool {
        false
    }

    fn bake_lumel(&self, scene: &Scene, instance: &Instance, lumel: &Lumel, rng: &mut SmallRng)
    -> Rgb;
}

/// Ambient term plus every light that reaches the lumel unoccluded.
#[derive(Clone, Copy, Debug)]
pub struct DirectLightBaker {
    pub ambient: Rgb,
    pub bias: f32,
}

impl DirectLightBaker {
    pub fn new(settings: &BakeSettings) -> Self {
        Self {
            ambient: settings.indirect.ambient,
            bias: settings.bias,
        }
    }
}

impl LumelBaker for DirectLightBaker {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn bake_lumel(
        &self,
        scene: &Scene,
        _instance: &Instance,
        lumel: &Lumel,
        _rng: &mut SmallRng,
    ) -> Rgb {
        let mut color = self.ambient;
        let origin = lumel.position + lumel.normal * self.bias;
        for light in scene.lights() {
            let Some(inc) = light.incident(lumel.position) else {
                continue;
            };
            let ndl = lumel.normal.dot(inc.dir);
            if ndl <= 0.0 {
                continue;
            }
            if !scene.occluded(origin, inc.dir, inc.distance - self.bias) {
                color += inc.radiance * ndl;
            }
        }
        color
    }
}

/// Final gather against the photon maps; rays leaving the scene see the sky.
#[derive(Clone, Copy, Debug)]
pub struct IndirectLightBaker {
    pub sky: Rgb,
    /// Irradiance assumed on surfaces without a photon map.
    pub ambient: Rgb,
    pub samples: u32,
    pub bias: f32,
}

impl IndirectLightBaker {
    pub fn new(settings: &BakeSettings) -> Self {
        Self {
            sky: settings.indirect.sky,
            ambient: settings.indirect.ambient,
            samples: settings.indirect.samples.max(1),
            bias: settings.bias,
        }
    }
}

impl LumelBaker for IndirectLightBaker {
    fn name(&self) -> &'static str {
        "indirect"
    }

    fn accumulates(&self) -> bool {
        true
    }

    fn bake_lumel(
        &self,
        scene: &Scene,
        _instance: &Instance,
        lumel: &Lumel,
        rng: &mut SmallRng,
    ) -> Rgb {
        let origin = lumel.position + lumel.normal * self.bias;
        let mut sum = Rgb::BLACK;
        for _ in 0..self.samples {
            let dir = cosine_hemisphere(lumel.normal, rng.random(), rng.random());
            let ray = Ray::new(origin, dir);
            let Some(hit) = scene.raycast(&ray, f32::INFINITY) else {
                sum += self.sky;
                continue;
            };
            let Some(other) = scene.instance(hit.instance) else {
                continue;
            };
            let albedo = other.albedo_at(hit.face, &hit.bary);
            let irradiance = match other.photonmap() {
                Some(pm) => pm.sample(other.lightmap_uv(hit.face, &hit.bary)),
                None => self.ambient,
            };
            sum += albedo * irradiance;
        }
        sum / self.samples as f32
    }
}

/// Fraction of hemisphere rays that escape within `distance`, as grey.
#[derive(Clone, Copy, Debug)]
pub struct AmbientOcclusionBaker {
    pub samples: u32,
    pub distance: f32,
    pub bias: f32,
}

impl AmbientOcclusionBaker {
    pub fn new(settings: &BakeSettings) -> Self {
        Self {
            samples: settings.ao_samples.max(1),
            distance: settings.ao_distance,
            bias: settings.bias,
        }
    }
}

impl LumelBaker for AmbientOcclusionBaker {
    fn name(&self) -> &'static str {
        "ambient-occlusion"
    }

    fn bake_lumel(
        &self,
        scene: &Scene,
        _instance: &Instance,
        lumel: &Lumel,
        rng: &mut SmallRng,
    ) -> Rgb {
        let origin = lumel.position + lumel.normal * self.bias;
        let open = (0..self.samples)
            .filter(|_| {
                let dir = cosine_hemisphere(lumel.normal, rng.random(), rng.random());
                !scene.occluded(origin, dir, self.distance)
            })
            .count();
        Rgb::gray(open as f32 / self.samples as f32)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BakeStats {
    pub instance: InstanceId,
    pub lumels: usize,
    pub steps: u32,
    pub revision: u64,
    pub elapsed: Duration,
}

/// Outcome of [`bake_scene`]; failures do not stop the remaining instances.
#[derive(Debug, Default)]
pub struct BakeReport {
    pub baked: Vec<BakeStats>,
    pub failed: Vec<(InstanceId, BakeError)>,
}

impl BakeReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn merge(&mut self, other: BakeReport) {
        self.baked.extend(other.baked);
        self.failed.extend(other.failed);
    }
}

/// Runs `passes` in order over one instance and publishes the result.
pub fn bake_instance(
    scene: &Scene,
    id: InstanceId,
    passes: &[&dyn LumelBaker],
    settings: &BakeSettings,
    progress: &dyn Progress,
    cancel: &CancelToken,
) -> Result<BakeStats, BakeError> {
    let start = Instant::now();
    let inst = scene
        .instance(id)
        .ok_or_else(|| BakeError::InvalidCall(format!("unknown instance {id}")))?;
    if !inst.has_lightmap() {
        return Err(BakeError::InvalidCall(format!(
            "instance '{}' has no lightmap",
            inst.name()
        )));
    }
    if passes.is_empty() {
        return Err(BakeError::InvalidCall("no bake passes given".into()));
    }
    if !inst.begin_bake() {
        return Err(BakeError::InvalidCall(format!(
            "instance '{}' is already baking",
            inst.name()
        )));
    }

    let baked = {
        let Some(lightmap) = inst.lightmap() else {
            inst.abort_bake();
            return Err(BakeError::InvalidCall(format!(
                "instance '{}' has no lightmap",
                inst.name()
            )));
        };
        run_passes(scene, inst, &lightmap, passes, settings, progress, cancel)
    };
    let (colors, lumels, total) = match baked {
        Ok(out) => out,
        Err(e) => {
            inst.abort_bake();
            log::info!("bake of '{}' stopped: {}", inst.name(), e);
            return Err(e);
        }
    };

    if let Some(mut lightmap) = inst.lightmap_mut() {
        lightmap.set_colors(&colors);
        if settings.expand > 0 {
            lightmap.expand(settings.expand);
        }
    }
    let revision = inst.publish();
    progress.report(id, total, total);

    let elapsed = start.elapsed();
    log::debug!(
        "baked '{}' ({}) in {}ms: {} lumels, rev {}",
        inst.name(),
        passes.iter().map(|p| p.name()).collect::<Vec<_>>().join("+"),
        elapsed.as_millis(),
        lumels,
        revision
    );
    Ok(BakeStats {
        instance: id,
        lumels,
        steps: total,
        revision,
        elapsed,
    })
}

fn run_passes(
    scene: &Scene,
    inst: &Instance,
    lightmap: &Lightmap,
    passes: &[&dyn LumelBaker],
    settings: &BakeSettings,
    progress: &dyn Progress,
    cancel: &CancelToken,
) -> Result<(Vec<Rgb>, usize, u32), BakeError> {
    let keep = passes[0].accumulates();
    let mut colors: Vec<Rgb> = lightmap
        .lumels()
        .iter()
        .map(|l| if keep && l.valid { l.color } else { Rgb::BLACK })
        .collect();

    let per_pass = match settings.traversal {
        Traversal::PerLumel => lightmap.height(),
        Traversal::PerFace => inst.mesh().face_count() as u32,
    };
    let total = per_pass * passes.len() as u32;
    let mut step = 0u32;
    let mut lumels = 0usize;
    let id = inst.id();

    let tick = |step: &mut u32| {
        *step += 1;
        if *step < total {
            progress.report(id, *step, total);
        }
    };

    for (pi, pass) in passes.iter().enumerate() {
        let seed = settings.seed.wrapping_add(pi as u64);
        let mut bake_at = |idx: usize, lumel: &Lumel| {
            let mut rng = stream_rng(seed, u64::from(id.0), idx as u64);
            let c = pass.bake_lumel(scene, inst, lumel, &mut rng);
            colors[idx] = if pass.accumulates() { colors[idx] + c } else { c };
        };
        match settings.traversal {
            Traversal::PerLumel => {
                for y in 0..lightmap.height() {
                    if cancel.is_cancelled() {
                        return Err(BakeError::Cancelled);
                    }
                    for x in 0..lightmap.width() {
                        let idx = lightmap.index(x, y);
                        let lumel = &lightmap.lumels()[idx];
                        if lumel.valid {
                            bake_at(idx, lumel);
                            lumels += 1;
                        }
                    }
                    tick(&mut step);
                }
            }
            Traversal::PerFace => {
                for face in inst.mesh().faces() {
                    if cancel.is_cancelled() {
                        return Err(BakeError::Cancelled);
                    }
                    let (xs, ys) = lightmap.texel_range(&face);
                    for y in ys {
                        for x in xs.clone() {
                            let idx = lightmap.index(x, y);
                            let lumel = &lightmap.lumels()[idx];
                            if lumel.valid && lumel.face as usize == face.index() {
                                bake_at(idx, lumel);
                                lumels += 1;
                            }
                        }
                    }
                    tick(&mut step);
                }
            }
        }
    }
    Ok((colors, lumels / passes.len(), total))
}

/// Bakes every instance in turn, recording failures instead of stopping.
pub fn bake_scene(
    scene: &Scene,
    passes: &[&dyn LumelBaker],
    settings: &BakeSettings,
    progress: &dyn Progress,
    cancel: &CancelToken,
) -> BakeReport {
    let mut report = BakeReport::default();
    for id in scene.ids() {
        match bake_instance(scene, id, passes, settings, progress, cancel) {
            Ok(stats) => report.baked.push(stats),
            Err(e) => {
                log::warn!("instance {id} not baked: {e}");
                report.failed.push((id, e));
            }
        }
    }
    report
}
