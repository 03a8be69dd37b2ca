//! Lumel grids, photon maps and the bakers that fill them.
//!
//! A bake starts from a [`SceneBuilder`]: static instances are given a
//! lightmap sized from their world surface area, then [`emit_photons`]
//! seeds the photon maps and [`bake_instance`] or [`bake_scene`] runs
//! [`LumelBaker`] passes over each lightmap.
#![forbid(unsafe_code)]

pub mod baker;
pub mod light;
pub mod lightmap;
pub mod material;
pub mod photonmap;
pub mod photons;
pub mod sampling;
pub mod scene;
pub mod settings;

pub use baker::{
    AmbientOcclusionBaker, BakeReport, BakeStats, CancelToken, DirectLightBaker,
    IndirectLightBaker, LumelBaker, NoProgress, Progress, bake_instance, bake_scene,
};
pub use light::{DirectionalLight, Incident, Light, PointLight};
pub use lightmap::{Lightmap, Lumel};
pub use material::{AssetId, Material, Texture, TextureCache};
pub use photonmap::Photonmap;
pub use photons::{PhotonStats, emit_photons};
pub use scene::{BakeState, Hit, Instance, InstanceId, Scene, SceneBuilder};
pub use settings::{
    BakeSettings, DEFAULT_AMBIENT, IndirectLightSettings, LightmapSettings, SKY_BLUE, Traversal,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BakeError {
    #[error("invalid call: {0}")]
    InvalidCall(String),
    #[error("bake cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    #[error("duplicate object name '{0}'")]
    DuplicateName(String),
    #[error("object '{name}': {reason}")]
    InvalidInstance { name: String, reason: String },
    #[error("invalid texture: {0}")]
    InvalidTexture(String),
}

#[cfg(test)]
mod tests;
