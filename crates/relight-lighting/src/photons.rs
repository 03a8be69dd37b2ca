//! Single-threaded photon emission into the scene's photon maps.

use std::f32::consts::PI;
use std::time::{Duration, Instant};

use rand::Rng;
use rand::rngs::SmallRng;
use relight_geom::{Ray, Rgb, Vec3};

use crate::light::Light;
use crate::sampling::{cosine_hemisphere, stream_rng, uniform_disc, uniform_sphere};
use crate::scene::Scene;
use crate::settings::BakeSettings;

/// Stream id separating photon random numbers from lumel sampling.
const PHOTON_STREAM: u64 = 0x5048_4f54;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhotonStats {
    pub emitted: u64,
    pub deposited: u64,
    pub elapsed: Duration,
}

/// Clears every photon map, traces `photons_per_light` photons from each
/// light and runs the gather pass. Deterministic for a given seed.
pub fn emit_photons(scene: &Scene, settings: &BakeSettings) -> PhotonStats {
    let start = Instant::now();
    let ind = &settings.indirect;
    for inst in scene.instances() {
        if let Some(mut pm) = inst.photonmap_mut() {
            pm.clear();
        }
    }

    let bounds = scene.bounds();
    let centre = bounds.min + bounds.extent() * 0.5;
    let radius = (bounds.extent().length() * 0.5).max(1e-3);

    let mut stats = PhotonStats::default();
    let count = ind.photons_per_light;
    if count > 0 && !bounds.is_empty() {
        for (li, light) in scene.lights().iter().enumerate() {
            let mut rng = stream_rng(settings.seed, PHOTON_STREAM, li as u64);
            for _ in 0..count {
                let (ray, power, range) = match *light {
                    Light::Point(l) => (
                        Ray::new(l.position, uniform_sphere(rng.random(), rng.random())),
                        // Matches the direct term at half range.
                        l.color * (l.intensity * PI * l.range * l.range / count as f32),
                        Some(l.range),
                    ),
                    Light::Directional(l) => {
                        let dir = l.direction.normalized();
                        let (t, b) = dir.orthonormal_basis();
                        let (dx, dy) = uniform_disc(rng.random(), rng.random());
                        let origin = centre - dir * (2.0 * radius) + (t * dx + b * dy) * radius;
                        (
                            Ray::new(origin, dir),
                            l.color * (l.intensity * PI * radius * radius / count as f32),
                            None,
                        )
                    }
                };
                stats.emitted += 1;
                stats.deposited += trace(scene, ray, power, range, settings, &mut rng);
            }
        }
    }

    for inst in scene.instances() {
        let valid = inst.lightmap().map_or(0, |lm| lm.valid_count());
        if let Some(mut pm) = inst.photonmap_mut() {
            let texel_area = inst.area() / valid.max(1) as f32;
            pm.gather(ind.gather_radius, texel_area);
        }
    }

    stats.elapsed = start.elapsed();
    log::info!(
        "photons: {} emitted, {} deposited in {}ms",
        stats.emitted,
        stats.deposited,
        stats.elapsed.as_millis()
    );
    stats
}

/// Follows one photon through diffuse bounces; returns the number of deposits.
fn trace(
    scene: &Scene,
    mut ray: Ray,
    mut energy: Rgb,
    range: Option<f32>,
    settings: &BakeSettings,
    rng: &mut SmallRng,
) -> u64 {
    let ind = &settings.indirect;
    let mut deposits = 0;
    for depth in 0..=ind.max_bounces {
        let Some(hit) = scene.raycast(&ray, f32::INFINITY) else {
            break;
        };
        if depth == 0 {
            if let Some(r) = range {
                energy = energy * (1.0 - hit.t / r).max(0.0);
            }
        }
        if energy.max_component() < ind.energy_threshold {
            break;
        }
        let Some(inst) = scene.instance(hit.instance) else {
            break;
        };
        if let Some(mut pm) = inst.photonmap_mut() {
            pm.deposit(inst.lightmap_uv(hit.face, &hit.bary), energy);
            deposits += 1;
        }
        if depth == ind.max_bounces {
            break;
        }
        energy = energy * inst.albedo_at(hit.face, &hit.bary);
        let dir: Vec3 = cosine_hemisphere(hit.normal, rng.random(), rng.random());
        ray = Ray::new(hit.position + hit.normal * settings.bias, dir);
    }
    deposits
}
