//! Surface materials and the textures they sample.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use relight_geom::{Rgb, Vec2};

use crate::SceneError;

/// Stable identity of a texture asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

impl AssetId {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    /// FNV-1a over the asset bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut h = Self::FNV_OFFSET;
        for &b in bytes {
            h ^= u64::from(b);
            h = h.wrapping_mul(Self::FNV_PRIME);
        }
        AssetId(h)
    }

    pub fn from_name(name: &str) -> Self {
        Self::from_bytes(name.as_bytes())
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Linear RGB texture sampled with wrapping nearest-texel lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    width: u32,
    height: u32,
    texels: Vec<Rgb>,
}

impl Texture {
    pub fn new(width: u32, height: u32, texels: Vec<Rgb>) -> Result<Self, SceneError> {
        if width == 0 || height == 0 || texels.len() != (width as usize) * (height as usize) {
            return Err(SceneError::InvalidTexture(format!(
                "{} texels for a {}x{} texture",
                texels.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// Packed 8-bit RGB rows, top row first.
    pub fn from_rgb8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, SceneError> {
        let texels = bytes
            .chunks_exact(3)
            .map(|c| Rgb::from_rgb8([c[0], c[1], c[2]]))
            .collect();
        Self::new(width, height, texels)
    }

    pub fn solid(color: Rgb) -> Self {
        Self {
            width: 1,
            height: 1,
            texels: vec![color],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_at(&self, uv: Vec2) -> Rgb {
        let wrap = |t: f32, n: u32| -> usize {
            let f = t - t.floor();
            ((f * n as f32) as usize).min(n as usize - 1)
        };
        let x = wrap(uv.x, self.width);
        let y = wrap(uv.y, self.height);
        self.texels[y * self.width as usize + x]
    }
}

#[derive(Clone, Debug)]
pub struct Material {
    pub color: Rgb,
    pub texture: Option<Arc<Texture>>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Rgb::WHITE,
            texture: None,
        }
    }
}

impl Material {
    pub fn new(color: Rgb) -> Self {
        Self {
            color,
            texture: None,
        }
    }

    pub fn with_texture(mut self, texture: Arc<Texture>) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Diffuse reflectance at a diffuse-layer coordinate.
    pub fn albedo(&self, uv: Vec2) -> Rgb {
        match &self.texture {
            Some(tex) => self.color * tex.color_at(uv),
            None => self.color,
        }
    }
}

/// Shared textures keyed by [`AssetId`].
#[derive(Default)]
pub struct TextureCache {
    map: HashMap<AssetId, Arc<Texture>>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: AssetId) -> Option<Arc<Texture>> {
        self.map.get(&id).cloned()
    }

    pub fn insert(&mut self, id: AssetId, tex: Texture) -> Arc<Texture> {
        let tex = Arc::new(tex);
        self.map.insert(id, tex.clone());
        tex
    }

    /// Returns the cached texture or runs `load` once to fill the slot.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        id: AssetId,
        load: impl FnOnce() -> Result<Texture, E>,
    ) -> Result<Arc<Texture>, E> {
        if let Some(tex) = self.map.get(&id) {
            return Ok(tex.clone());
        }
        let tex = load()?;
        Ok(self.insert(id, tex))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_matches_reference_values() {
        assert_eq!(AssetId::from_bytes(b"").0, 0xcbf2_9ce4_8422_2325);
        assert_eq!(AssetId::from_bytes(b"a").0, 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn texture_wraps_coordinates() {
        let tex = Texture::new(2, 1, vec![Rgb::BLACK, Rgb::WHITE]).unwrap();
        assert_eq!(tex.color_at(Vec2::new(0.25, 0.0)), Rgb::BLACK);
        assert_eq!(tex.color_at(Vec2::new(0.75, 0.0)), Rgb::WHITE);
        assert_eq!(tex.color_at(Vec2::new(1.25, 3.5)), Rgb::BLACK);
        assert_eq!(tex.color_at(Vec2::new(-0.25, 0.0)), Rgb::WHITE);
    }

    #[test]
    fn albedo_modulates_texture() {
        let tex = Arc::new(Texture::solid(Rgb::new(0.5, 0.5, 0.5)));
        let m = Material::new(Rgb::new(1.0, 0.0, 0.5)).with_texture(tex);
        assert_eq!(m.albedo(Vec2::ZERO), Rgb::new(0.5, 0.0, 0.25));
    }

    #[test]
    fn cache_loads_once() {
        let mut cache = TextureCache::new();
        let id = AssetId::from_name("white.png");
        let mut loads = 0;
        for _ in 0..3 {
            let t = cache
                .get_or_try_insert_with(id, || {
                    loads += 1;
                    Ok::<_, SceneError>(Texture::solid(Rgb::WHITE))
                })
                .unwrap();
            assert_eq!(t.width(), 1);
        }
        assert_eq!(loads, 1);
        assert_eq!(cache.len(), 1);
        assert!(Texture::new(2, 2, vec![Rgb::BLACK]).is_err());
    }
}
