//! TOML scene descriptions: primitive objects and lights.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use hashbrown::HashMap;
use relight_geom::{Mat4, Quat, Rgb, Vec3};
use relight_lighting::{InstanceId, Light, Material, Scene, SceneBuilder};
use relight_mesh::{TriMesh, UvGenParams, generate, primitives};
use serde::Deserialize;

use crate::config::RelightConfig;
use crate::texture_cache::TextureLoader;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SceneDesc {
    #[serde(default, rename = "object")] pub objects: Vec<ObjectDesc>,
    #[serde(default, rename = "light")] pub lights: Vec<LightDesc>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum Shape {
    Cube {
        #[serde(default = "one")] size: f32,
    },
    Plane {
        #[serde(default = "one")] size: f32,
        #[serde(default = "default_cells")] cells: u32,
    },
    Quad {
        #[serde(default = "one")] width: f32,
        #[serde(default = "one")] height: f32,
    },
    Cylinder {
        #[serde(default = "half")] radius: f32,
        #[serde(default = "one")] height: f32,
        #[serde(default = "default_segments")] segments: u32,
    },
}

fn one() -> f32 { 1.0 }
fn half() -> f32 { 0.5 }
fn default_cells() -> u32 { 1 }
fn default_segments() -> u32 { 16 }
fn zero3() -> [f32; 3] { [0.0; 3] }
fn one3() -> [f32; 3] { [1.0; 3] }
fn white() -> [f32; 3] { [1.0; 3] }
fn default_static() -> bool { true }

impl Shape {
    pub fn mesh(&self) -> TriMesh {
        match *self {
            Shape::Cube { size } => primitives::cube(size),
            Shape::Plane { size, cells } => primitives::plane(size, cells.max(1)),
            Shape::Quad { width, height } => primitives::quad(width, height),
            Shape::Cylinder { radius, height, segments } => {
                primitives::cylinder(radius, height, segments.max(3))
            }
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ObjectDesc {
    pub name: String,
    #[serde(flatten)] pub shape: Shape,
    #[serde(default = "zero3")] pub position: [f32; 3],
    /// Pitch, yaw, roll in degrees.
    #[serde(default = "zero3")] pub rotation: [f32; 3],
    #[serde(default = "one3")] pub scale: [f32; 3],
    #[serde(default = "white")] pub color: [f32; 3],
    /// Image file relative to the scene file.
    #[serde(default)] pub texture: Option<String>,
    #[serde(default = "default_static", rename = "static")] pub is_static: bool,
}

impl ObjectDesc {
    pub fn transform(&self) -> Mat4 {
        let [p, y, r] = self.rotation;
        Mat4::affine(
            Vec3::from(self.position),
            Quat::from_euler_degrees(p, y, r),
            Vec3::from(self.scale),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LightDesc {
    Point {
        position: [f32; 3],
        range: f32,
        #[serde(default = "white")] color: [f32; 3],
        #[serde(default = "one")] intensity: f32,
    },
    Directional {
        direction: [f32; 3],
        #[serde(default = "white")] color: [f32; 3],
        #[serde(default = "one")] intensity: f32,
    },
}

impl LightDesc {
    pub fn light(&self) -> Light {
        match *self {
            LightDesc::Point { position, range, color, intensity } => {
                Light::point(Vec3::from(position), range, Rgb::from_array(color), intensity)
            }
            LightDesc::Directional { direction, color, intensity } => {
                Light::directional(Vec3::from(direction), Rgb::from_array(color), intensity)
            }
        }
    }
}

/// Object name to scene instance, in file order.
#[derive(Clone, Debug, Default)]
pub struct InstanceTable {
    order: Vec<(String, InstanceId)>,
    by_name: HashMap<String, InstanceId>,
}

impl InstanceTable {
    fn insert(&mut self, name: &str, id: InstanceId) {
        self.order.push((name.to_owned(), id));
        self.by_name.insert(name.to_owned(), id);
    }

    pub fn get(&self, name: &str) -> Option<InstanceId> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: InstanceId) -> Option<&str> {
        self.order.iter().find(|(_, i)| *i == id).map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, InstanceId)> + '_ {
        self.order.iter().map(|(n, id)| (n.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}

pub struct LoadedScene {
    pub scene: Arc<Scene>,
    pub instances: InstanceTable,
}

impl SceneDesc {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let desc: SceneDesc = toml::from_str(s).context("parse scene")?;
        for obj in &desc.objects {
            if obj.name.trim().is_empty() {
                bail!("scene object without a name");
            }
        }
        Ok(desc)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read scene {}", path.display()))?;
        Self::from_toml_str(&s).with_context(|| format!("in {}", path.display()))
    }

    /// Generates lightmap UVs for static objects and seals the scene.
    /// Texture paths resolve against `base_dir`.
    pub fn build(
        &self,
        base_dir: &Path,
        cfg: &RelightConfig,
        textures: &mut TextureLoader,
    ) -> Result<LoadedScene> {
        let params = cfg.uv_params();
        let mut builder = SceneBuilder::begin(cfg.lightmap_settings());
        for l in &self.lights {
            builder.add_light(l.light());
        }

        let mut names = Vec::with_capacity(self.objects.len());
        for obj in &self.objects {
            let mut material = Material::new(Rgb::from_array(obj.color));
            if let Some(rel) = &obj.texture {
                let tex = textures
                    .load(&base_dir.join(rel))
                    .with_context(|| format!("object '{}'", obj.name))?;
                material = material.with_texture(tex);
            }
            let (mesh, is_static) = object_mesh(obj, &params);
            let id = builder.add_instance(
                obj.name.clone(),
                Arc::new(mesh),
                obj.transform(),
                Arc::new(material),
                is_static,
            );
            names.push((obj.name.as_str(), id));
        }

        let scene = builder.end().context("build scene")?;
        let mut instances = InstanceTable::default();
        for (name, id) in names {
            instances.insert(name, id);
        }
        log::info!(
            "scene: {} object(s), {} light(s), {} texture(s)",
            instances.len(),
            self.lights.len(),
            textures.len()
        );
        Ok(LoadedScene {
            scene: Arc::new(scene),
            instances,
        })
    }
}

/// Static objects get generated lightmap UVs; an object whose atlas cannot
/// be built is kept as a dynamic occluder.
fn object_mesh(obj: &ObjectDesc, params: &UvGenParams) -> (TriMesh, bool) {
    let mesh = obj.shape.mesh();
    if !obj.is_static {
        return (mesh, false);
    }
    match generate(&mesh, params) {
        Ok(atlas) => {
            log::debug!(
                "'{}': {} chart(s) in a {}x{} atlas",
                obj.name,
                atlas.chart_count,
                atlas.width,
                atlas.height
            );
            (atlas.lightmap_mesh, true)
        }
        Err(e) => {
            log::error!("'{}': no lightmap UVs ({e}); baking it as dynamic", obj.name);
            (mesh, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOM: &str = r#"
        [[object]]
        name = "floor"
        shape = "plane"
        size = 6.0
        cells = 3
        color = [0.8, 0.8, 0.8]

        [[object]]
        name = "pillar"
        shape = "cylinder"
        radius = 0.4
        height = 2.0
        position = [1.0, 1.0, 0.0]
        rotation = [0.0, 45.0, 0.0]

        [[object]]
        name = "crate"
        shape = "cube"
        static = false
        position = [-1.0, 0.5, 0.0]

        [[light]]
        kind = "point"
        position = [0.0, 3.0, 0.0]
        range = 8.0
        intensity = 2.0

        [[light]]
        kind = "directional"
        direction = [0.2, -1.0, 0.1]
    "#;

    #[test]
    fn parses_objects_and_lights() {
        let desc = SceneDesc::from_toml_str(ROOM).unwrap();
        assert_eq!(desc.objects.len(), 3);
        assert_eq!(desc.objects[0].shape, Shape::Plane { size: 6.0, cells: 3 });
        assert!(desc.objects[1].is_static);
        assert!(!desc.objects[2].is_static);
        assert_eq!(desc.objects[2].shape, Shape::Cube { size: 1.0 });
        assert_eq!(desc.lights.len(), 2);
        assert!(matches!(
            desc.lights[1],
            LightDesc::Directional { intensity, .. } if intensity == 1.0
        ));
    }

    #[test]
    fn builds_instance_table_in_file_order() {
        let desc = SceneDesc::from_toml_str(ROOM).unwrap();
        let loaded = desc
            .build(Path::new("."), &RelightConfig::default(), &mut TextureLoader::new())
            .unwrap();
        let names: Vec<_> = loaded.instances.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["floor", "pillar", "crate"]);
        let scene = &loaded.scene;
        let floor = scene.instance(loaded.instances.get("floor").unwrap()).unwrap();
        assert!(floor.has_lightmap());
        let crate_ = scene.instance(loaded.instances.get("crate").unwrap()).unwrap();
        assert!(!crate_.has_lightmap());
        assert_eq!(scene.lights().len(), 2);
        assert!(loaded.instances.get("missing").is_none());
        let pillar = loaded.instances.get("pillar").unwrap();
        assert_eq!(loaded.instances.name_of(pillar), Some("pillar"));
    }

    #[test]
    fn shipped_scene_builds() {
        let desc = SceneDesc::from_toml_str(include_str!("../assets/scenes/courtyard.toml")).unwrap();
        let loaded = desc
            .build(Path::new("."), &RelightConfig::default(), &mut TextureLoader::new())
            .unwrap();
        let lit = loaded.scene.instances().iter().filter(|i| i.has_lightmap()).count();
        assert_eq!(lit, 5);
        assert_eq!(loaded.instances.len(), 6);
    }

    #[test]
    fn duplicate_names_fail_the_build() {
        let desc = SceneDesc::from_toml_str(
            r#"
            [[object]]
            name = "a"
            shape = "quad"
            [[object]]
            name = "a"
            shape = "cube"
            "#,
        )
        .unwrap();
        let err = desc
            .build(Path::new("."), &RelightConfig::default(), &mut TextureLoader::new())
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("duplicate"));
    }

    #[test]
    fn unknown_shapes_and_missing_textures_are_errors() {
        assert!(SceneDesc::from_toml_str("[[object]]\nname = \"x\"\nshape = \"torus\"").is_err());
        assert!(SceneDesc::from_toml_str("[[object]]\nname = \" \"\nshape = \"cube\"").is_err());
        let desc = SceneDesc::from_toml_str(
            "[[object]]\nname = \"x\"\nshape = \"cube\"\ntexture = \"no/such.png\"",
        )
        .unwrap();
        assert!(
            desc.build(Path::new("."), &RelightConfig::default(), &mut TextureLoader::new())
                .is_err()
        );
    }

    #[test]
    fn oversized_atlas_demotes_to_dynamic() {
        let desc = SceneDesc::from_toml_str(
            "[[object]]\nname = \"big\"\nshape = \"plane\"\nsize = 40.0",
        )
        .unwrap();
        let mut cfg = RelightConfig::default();
        cfg.uv.max_atlas_size = 8;
        let loaded = desc.build(Path::new("."), &cfg, &mut TextureLoader::new()).unwrap();
        let id = loaded.instances.get("big").unwrap();
        assert!(!loaded.scene.instance(id).unwrap().has_lightmap());
    }
}
