use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use relight_geom::Rgb;
use relight_lighting::settings::{DEFAULT_MAX_LIGHTMAP_SIZE, DEFAULT_MIN_LIGHTMAP_SIZE};
use relight_lighting::{
    BakeSettings, DEFAULT_AMBIENT, IndirectLightSettings, LightmapSettings, SKY_BLUE, Traversal,
};
use relight_mesh::UvGenParams;
use relight_mesh::chart::DEFAULT_MAX_ANGLE_DEGREES;
use relight_mesh::uv_gen::DEFAULT_MAX_ATLAS_SIZE;
use relight_runtime::{BakeOp, WorkerKind};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RelightConfig {
    #[serde(default)] pub lightmap: LightmapSection,
    #[serde(default)] pub workers: WorkersSection,
    #[serde(default)] pub indirect: IndirectSection,
    #[serde(default)] pub bake: BakeSection,
    #[serde(default)] pub uv: UvSection,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LightmapSection {
    #[serde(default = "default_min_size")] pub min_size: u32,
    #[serde(default = "default_max_size")] pub max_size: u32,
    #[serde(default)] pub reference_area: Option<f32>,
}
fn default_min_size() -> u32 { DEFAULT_MIN_LIGHTMAP_SIZE }
fn default_max_size() -> u32 { DEFAULT_MAX_LIGHTMAP_SIZE }
impl Default for LightmapSection { fn default() -> Self { Self { min_size: default_min_size(), max_size: default_max_size(), reference_area: None } } }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WorkerChoice { Inline, Thread, #[default] Pooled }

impl From<WorkerChoice> for WorkerKind {
    fn from(c: WorkerChoice) -> Self {
        match c {
            WorkerChoice::Inline => WorkerKind::Inline,
            WorkerChoice::Thread => WorkerKind::Thread,
            WorkerChoice::Pooled => WorkerKind::Pooled,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WorkersSection {
    /// Zero means one worker per available core.
    #[serde(default)] pub count: usize,
    #[serde(default)] pub kind: WorkerChoice,
}

impl WorkersSection {
    pub fn resolved_count(&self) -> usize {
        if self.count > 0 {
            return self.count;
        }
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Preset { #[default] Fast, Quality }

/// Preset plus optional per-field overrides.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct IndirectSection {
    #[serde(default)] pub preset: Preset,
    #[serde(default)] pub sky: Option<[f32; 3]>,
    #[serde(default)] pub ambient: Option<[f32; 3]>,
    #[serde(default)] pub photons_per_light: Option<u32>,
    #[serde(default)] pub max_bounces: Option<u32>,
    #[serde(default)] pub energy_threshold: Option<f32>,
    #[serde(default)] pub gather_radius: Option<u32>,
    #[serde(default)] pub samples: Option<u32>,
}

impl IndirectSection {
    pub fn settings(&self) -> IndirectLightSettings {
        let sky = self.sky.map_or(SKY_BLUE, Rgb::from_array);
        let ambient = self.ambient.map_or(DEFAULT_AMBIENT, Rgb::from_array);
        let mut s = match self.preset {
            Preset::Fast => IndirectLightSettings::fast(sky, ambient),
            Preset::Quality => IndirectLightSettings::quality(sky, ambient),
        };
        if let Some(v) = self.photons_per_light { s.photons_per_light = v; }
        if let Some(v) = self.max_bounces { s.max_bounces = v; }
        if let Some(v) = self.energy_threshold { s.energy_threshold = v; }
        if let Some(v) = self.gather_radius { s.gather_radius = v; }
        if let Some(v) = self.samples { s.samples = v; }
        s
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OpChoice { Direct, Indirect, #[default] DirectAndIndirect, AmbientOcclusion }

impl From<OpChoice> for BakeOp {
    fn from(c: OpChoice) -> Self {
        match c {
            OpChoice::Direct => BakeOp::Direct,
            OpChoice::Indirect => BakeOp::Indirect,
            OpChoice::DirectAndIndirect => BakeOp::DirectAndIndirect,
            OpChoice::AmbientOcclusion => BakeOp::AmbientOcclusion,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TraversalChoice { #[default] PerLumel, PerFace }

impl From<TraversalChoice> for Traversal {
    fn from(c: TraversalChoice) -> Self {
        match c {
            TraversalChoice::PerLumel => Traversal::PerLumel,
            TraversalChoice::PerFace => Traversal::PerFace,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct BakeSection {
    #[serde(default)] pub op: OpChoice,
    #[serde(default)] pub traversal: TraversalChoice,
    #[serde(default = "default_seed")] pub seed: u64,
    #[serde(default = "default_bias")] pub bias: f32,
    #[serde(default = "default_expand")] pub expand: u32,
    #[serde(default = "default_ao_samples")] pub ao_samples: u32,
    #[serde(default = "default_ao_distance")] pub ao_distance: f32,
}
fn default_seed() -> u64 { BakeSettings::default().seed }
fn default_bias() -> f32 { BakeSettings::default().bias }
fn default_expand() -> u32 { BakeSettings::default().expand }
fn default_ao_samples() -> u32 { BakeSettings::default().ao_samples }
fn default_ao_distance() -> f32 { BakeSettings::default().ao_distance }
impl Default for BakeSection { fn default() -> Self { Self { op: OpChoice::default(), traversal: TraversalChoice::default(), seed: default_seed(), bias: default_bias(), expand: default_expand(), ao_samples: default_ao_samples(), ao_distance: default_ao_distance() } } }

#[derive(Clone, Debug, Deserialize)]
pub struct UvSection {
    #[serde(default = "default_max_angle")] pub max_angle_degrees: f32,
    #[serde(default = "default_max_atlas")] pub max_atlas_size: u32,
    #[serde(default)] pub padding: f32,
}
fn default_max_angle() -> f32 { DEFAULT_MAX_ANGLE_DEGREES }
fn default_max_atlas() -> u32 { DEFAULT_MAX_ATLAS_SIZE }
impl Default for UvSection { fn default() -> Self { Self { max_angle_degrees: default_max_angle(), max_atlas_size: default_max_atlas(), padding: 0.0 } } }

impl RelightConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: RelightConfig = toml::from_str(s).context("parse config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml_str(&s).with_context(|| format!("in {}", path.display()))
    }

    /// Loads `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let lm = &self.lightmap;
        if lm.min_size == 0 || lm.min_size > lm.max_size {
            bail!(
                "lightmap sizes must satisfy 0 < min_size <= max_size (got {}..{})",
                lm.min_size,
                lm.max_size
            );
        }
        if !lm.min_size.is_power_of_two() || !lm.max_size.is_power_of_two() {
            bail!("lightmap sizes must be powers of two");
        }
        if lm.reference_area.is_some_and(|a| a.is_nan() || a <= 0.0) {
            bail!("lightmap.reference_area must be positive");
        }
        if self.uv.max_atlas_size == 0 {
            bail!("uv.max_atlas_size must be at least 1");
        }
        if self.uv.padding.is_nan() || self.uv.padding < 0.0 {
            bail!("uv.padding must be non-negative");
        }
        Ok(())
    }

    pub fn lightmap_settings(&self) -> LightmapSettings {
        LightmapSettings {
            min_size: self.lightmap.min_size,
            max_size: self.lightmap.max_size,
            reference_area: self.lightmap.reference_area,
        }
    }

    pub fn bake_settings(&self) -> BakeSettings {
        let b = &self.bake;
        BakeSettings {
            traversal: b.traversal.into(),
            seed: b.seed,
            bias: b.bias,
            indirect: self.indirect.settings(),
            ao_samples: b.ao_samples,
            ao_distance: b.ao_distance,
            expand: b.expand,
        }
    }

    pub fn uv_params(&self) -> UvGenParams {
        UvGenParams {
            max_angle_degrees: self.uv.max_angle_degrees,
            max_atlas_size: self.uv.max_atlas_size,
            padding: self.uv.padding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = RelightConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.lightmap_settings(), LightmapSettings::default());
        assert_eq!(cfg.bake_settings().seed, BakeSettings::default().seed);
        assert_eq!(cfg.bake.op, OpChoice::DirectAndIndirect);
        assert_eq!(cfg.workers.kind, WorkerChoice::Pooled);
        assert!(cfg.workers.resolved_count() >= 1);
        assert_eq!(cfg.uv_params().max_atlas_size, 4096);
    }

    #[test]
    fn sections_and_overrides_parse() {
        let cfg = RelightConfig::from_toml_str(
            r#"
            [lightmap]
            min_size = 32
            max_size = 256

            [workers]
            count = 3
            kind = "thread"

            [indirect]
            preset = "quality"
            samples = 8
            sky = [0.0, 0.0, 0.0]

            [bake]
            op = "ambient-occlusion"
            traversal = "per-face"
            expand = 0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.lightmap_settings().max_size, 256);
        assert_eq!(cfg.workers.resolved_count(), 3);
        assert_eq!(WorkerKind::from(cfg.workers.kind), WorkerKind::Thread);
        let s = cfg.bake_settings();
        assert_eq!(s.indirect.samples, 8);
        assert_eq!(s.indirect.photons_per_light, 200_000);
        assert_eq!(s.indirect.sky, Rgb::BLACK);
        assert_eq!(s.traversal, Traversal::PerFace);
        assert_eq!(s.expand, 0);
        assert_eq!(BakeOp::from(cfg.bake.op), BakeOp::AmbientOcclusion);
    }

    #[test]
    fn shipped_config_is_valid() {
        let cfg = RelightConfig::from_toml_str(include_str!("../assets/relight.toml")).unwrap();
        assert_eq!(cfg.bake_settings().seed, 24301);
        assert_eq!(cfg.workers.kind, WorkerChoice::Pooled);
    }

    #[test]
    fn bad_sizes_are_rejected() {
        assert!(RelightConfig::from_toml_str("[lightmap]\nmin_size = 64\nmax_size = 32").is_err());
        assert!(RelightConfig::from_toml_str("[lightmap]\nmin_size = 24").is_err());
        assert!(RelightConfig::from_toml_str("[workers]\nkind = \"fibers\"").is_err());
    }
}
