//! Immutable bake scene: lights plus instances with their lumel grids.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use relight_geom::{Aabb, Mat4, Ray, Rgb, Vec2, Vec3};
use relight_mesh::{Barycentric, TriMesh, UvLayer};

use crate::SceneError;
use crate::light::Light;
use crate::lightmap::Lightmap;
use crate::material::Material;
use crate::photonmap::Photonmap;
use crate::settings::LightmapSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u32);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BakeState {
    Unbaked = 0,
    Baking = 1,
    Baked = 2,
}

impl BakeState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => BakeState::Baking,
            2 => BakeState::Baked,
            _ => BakeState::Unbaked,
        }
    }
}

/// World-space triangles cached for ray casts.
#[derive(Clone, Debug, Default)]
struct WorldGeometry {
    triangles: Vec<[Vec3; 3]>,
    bounds: Aabb,
    area: f32,
}

impl WorldGeometry {
    fn build(mesh: &TriMesh, transform: &Mat4) -> Self {
        let triangles: Vec<[Vec3; 3]> = mesh
            .faces()
            .map(|f| f.positions().map(|p| transform.transform_point(p)))
            .collect();
        let bounds = Aabb::from_points(triangles.iter().flatten().copied());
        let area = triangles
            .iter()
            .map(|[a, b, c]| (*b - *a).cross(*c - *a).length() * 0.5)
            .sum();
        Self {
            triangles,
            bounds,
            area,
        }
    }
}

pub struct Instance {
    id: InstanceId,
    name: String,
    mesh: Arc<TriMesh>,
    transform: Mat4,
    material: Arc<Material>,
    is_static: bool,
    world: WorldGeometry,
    lightmap: Option<RwLock<Lightmap>>,
    photonmap: Option<RwLock<Photonmap>>,
    dirty: AtomicBool,
    state: AtomicU8,
    rev: AtomicU64,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("faces", &self.mesh.face_count())
            .field("static", &self.is_static)
            .field("state", &self.state())
            .field("rev", &self.revision())
            .finish()
    }
}

impl Instance {
    #[inline]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn mesh(&self) -> &TriMesh {
        &self.mesh
    }

    #[inline]
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    #[inline]
    pub fn material(&self) -> &Material {
        &self.material
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.world.bounds
    }

    /// Surface area in world space.
    #[inline]
    pub fn area(&self) -> f32 {
        self.world.area
    }

    #[inline]
    pub fn has_lightmap(&self) -> bool {
        self.lightmap.is_some()
    }

    pub fn lightmap(&self) -> Option<RwLockReadGuard<'_, Lightmap>> {
        self.lightmap
            .as_ref()
            .map(|l| l.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub(crate) fn lightmap_mut(&self) -> Option<RwLockWriteGuard<'_, Lightmap>> {
        self.lightmap
            .as_ref()
            .map(|l| l.write().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn photonmap(&self) -> Option<RwLockReadGuard<'_, Photonmap>> {
        self.photonmap
            .as_ref()
            .map(|p| p.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub(crate) fn photonmap_mut(&self) -> Option<RwLockWriteGuard<'_, Photonmap>> {
        self.photonmap
            .as_ref()
            .map(|p| p.write().unwrap_or_else(|e| e.into_inner()))
    }

    /// Diffuse-layer coordinate of a surface point given by face and barycentric.
    pub fn diffuse_uv(&self, face: u32, bary: &Barycentric) -> Vec2 {
        bary.interpolate_vec2(self.mesh.face(face as usize).uvs(UvLayer::Diffuse))
    }

    pub fn lightmap_uv(&self, face: u32, bary: &Barycentric) -> Vec2 {
        bary.interpolate_vec2(self.mesh.face(face as usize).uvs(UvLayer::Lightmap))
    }

    pub fn albedo_at(&self, face: u32, bary: &Barycentric) -> Rgb {
        self.material.albedo(self.diffuse_uv(face, bary))
    }

    pub fn state(&self) -> BakeState {
        BakeState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves `Unbaked`/`Baked` to `Baking`; false when a bake is already running.
    pub(crate) fn begin_bake(&self) -> bool {
        let mut cur = self.state.load(Ordering::Acquire);
        loop {
            if cur == BakeState::Baking as u8 {
                return false;
            }
            match self.state.compare_exchange_weak(
                cur,
                BakeState::Baking as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => cur = actual,
            }
        }
    }

    pub(crate) fn abort_bake(&self) {
        self.state.store(BakeState::Unbaked as u8, Ordering::Release);
    }

    /// Marks a finished bake visible: bumps the revision, sets `Baked` and raises dirty.
    pub(crate) fn publish(&self) -> u64 {
        let rev = self.rev.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.store(BakeState::Baked as u8, Ordering::Release);
        self.dirty.store(true, Ordering::Release);
        rev
    }

    /// Raises dirty for an instance whose bake has been published.
    pub fn mark_dirty(&self) {
        if self.state() == BakeState::Baked {
            self.dirty.store(true, Ordering::Release);
        }
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Consumer side: returns true once per published bake and clears the flag.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Number of bakes published so far.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.rev.load(Ordering::Acquire)
    }
}

/// Closest intersection found by [`Scene::raycast`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub instance: InstanceId,
    pub face: u32,
    pub t: f32,
    pub position: Vec3,
    /// Unit geometric normal facing the incoming ray.
    pub normal: Vec3,
    pub bary: Barycentric,
}

struct PendingInstance {
    name: String,
    mesh: Arc<TriMesh>,
    transform: Mat4,
    material: Arc<Material>,
    is_static: bool,
}

/// Collects lights and instances; [`SceneBuilder::end`] seals them into a [`Scene`].
pub struct SceneBuilder {
    settings: LightmapSettings,
    lights: Vec<Light>,
    pending: Vec<PendingInstance>,
}

impl SceneBuilder {
    pub fn begin(settings: LightmapSettings) -> Self {
        Self {
            settings,
            lights: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn add_light(&mut self, light: Light) -> &mut Self {
        self.lights.push(light);
        self
    }

    /// Static instances get a lightmap sized from their world area; the mesh
    /// must already carry lightmap UVs. Dynamic instances only occlude.
    pub fn add_instance(
        &mut self,
        name: impl Into<String>,
        mesh: Arc<TriMesh>,
        transform: Mat4,
        material: Arc<Material>,
        is_static: bool,
    ) -> InstanceId {
        let id = InstanceId(self.pending.len() as u32);
        self.pending.push(PendingInstance {
            name: name.into(),
            mesh,
            transform,
            material,
            is_static,
        });
        id
    }

    fn check_names(&self) -> Result<(), SceneError> {
        let mut seen = hashbrown::HashSet::with_capacity(self.pending.len());
        for p in &self.pending {
            if !seen.insert(p.name.as_str()) {
                return Err(SceneError::DuplicateName(p.name.clone()));
            }
        }
        Ok(())
    }

    pub fn end(self) -> Result<Scene, SceneError> {
        self.check_names()?;
        for p in &self.pending {
            if p.mesh.face_count() == 0 {
                return Err(SceneError::InvalidInstance {
                    name: p.name.clone(),
                    reason: "mesh has no faces".into(),
                });
            }
            let finite = p.transform.m.iter().flatten().all(|v| v.is_finite());
            if !finite {
                return Err(SceneError::InvalidInstance {
                    name: p.name.clone(),
                    reason: "transform is not finite".into(),
                });
            }
        }

        let worlds: Vec<WorldGeometry> = self
            .pending
            .iter()
            .map(|p| WorldGeometry::build(&p.mesh, &p.transform))
            .collect();
        let reference = self.settings.reference_area.unwrap_or_else(|| {
            self.pending
                .iter()
                .zip(&worlds)
                .filter(|(p, _)| p.is_static)
                .map(|(_, w)| w.area)
                .fold(0.0, f32::max)
        });

        let mut bounds = Aabb::EMPTY;
        let mut instances = Vec::with_capacity(self.pending.len());
        for (i, (p, world)) in self.pending.into_iter().zip(worlds).enumerate() {
            bounds = bounds.union(world.bounds);
            let (lightmap, photonmap) = if p.is_static {
                let size = self.settings.size_for_area(world.area, reference);
                let mut lm = Lightmap::new(size, size);
                let claimed = lm.add_mesh(&p.mesh, &p.transform);
                log::debug!(
                    "instance '{}': area {:.3}, lightmap {}x{}, {} lumels",
                    p.name,
                    world.area,
                    size,
                    size,
                    claimed
                );
                (
                    Some(RwLock::new(lm)),
                    Some(RwLock::new(Photonmap::new(size, size))),
                )
            } else {
                (None, None)
            };
            instances.push(Instance {
                id: InstanceId(i as u32),
                name: p.name,
                mesh: p.mesh,
                transform: p.transform,
                material: p.material,
                is_static: p.is_static,
                world,
                lightmap,
                photonmap,
                dirty: AtomicBool::new(false),
                state: AtomicU8::new(BakeState::Unbaked as u8),
                rev: AtomicU64::new(0),
            });
        }

        log::info!(
            "scene sealed: {} instances ({} static), {} lights",
            instances.len(),
            instances.iter().filter(|i| i.is_static).count(),
            self.lights.len()
        );
        Ok(Scene {
            lights: self.lights,
            instances,
            bounds,
        })
    }
}

#[derive(Debug)]
pub struct Scene {
    lights: Vec<Light>,
    instances: Vec<Instance>,
    bounds: Aabb,
}

impl Scene {
    #[inline]
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    #[inline]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id.0 as usize)
    }

    pub fn find(&self, name: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.name == name)
    }

    pub fn ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.instances.iter().map(|i| i.id)
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Closest hit along `ray` within `max_t`.
    pub fn raycast(&self, ray: &Ray, max_t: f32) -> Option<Hit> {
        let mut best: Option<(f32, usize, usize, f32, f32)> = None;
        for (ii, inst) in self.instances.iter().enumerate() {
            let limit = best.map_or(max_t, |b| b.0);
            if inst.world.bounds.intersect_ray(ray, limit).is_none() {
                continue;
            }
            for (fi, [a, b, c]) in inst.world.triangles.iter().enumerate() {
                if let Some((t, u, v)) = ray.intersect_triangle(*a, *b, *c) {
                    if t < best.map_or(max_t, |b| b.0) {
                        best = Some((t, ii, fi, u, v));
                    }
                }
            }
        }
        let (t, ii, fi, u, v) = best?;
        let inst = &self.instances[ii];
        let [a, b, c] = inst.world.triangles[fi];
        let mut normal = (b - a).cross(c - a).normalized();
        if normal.dot(ray.dir) > 0.0 {
            normal = -normal;
        }
        Some(Hit {
            instance: inst.id,
            face: fi as u32,
            t,
            position: ray.at(t),
            normal,
            bary: Barycentric {
                w: [1.0 - u - v, u, v],
            },
        })
    }

    /// True when anything blocks the segment `[origin, origin + dir * max_t)`.
    pub fn occluded(&self, origin: Vec3, dir: Vec3, max_t: f32) -> bool {
        let ray = Ray::new(origin, dir);
        self.instances.iter().any(|inst| {
            inst.world.bounds.intersect_ray(&ray, max_t).is_some()
                && inst.world.triangles.iter().any(|[a, b, c]| {
                    ray.intersect_triangle(*a, *b, *c)
                        .is_some_and(|(t, _, _)| t < max_t)
                })
        })
    }
}
