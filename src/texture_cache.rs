use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use hashbrown::HashMap;
use relight_lighting::{AssetId, Texture, TextureCache};

/// Loads image files into a [`TextureCache`]. Textures are keyed by a hash
/// of the file bytes, so identical files share one decoded copy.
#[derive(Default)]
pub struct TextureLoader {
    cache: TextureCache,
    by_path: HashMap<PathBuf, AssetId>,
}

impl TextureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: &Path) -> Result<Arc<Texture>> {
        if let Some(tex) = self.by_path.get(path).and_then(|&id| self.cache.get(id)) {
            return Ok(tex);
        }
        let bytes =
            std::fs::read(path).with_context(|| format!("read texture {}", path.display()))?;
        let id = AssetId::from_bytes(&bytes);
        let tex = self.cache.get_or_try_insert_with(id, || decode(&bytes, path))?;
        self.by_path.insert(path.to_path_buf(), id);
        log::debug!("texture {} -> {id}", path.display());
        Ok(tex)
    }

    /// Distinct decoded textures.
    pub fn len(&self) -> usize {
        self.cache.len()
    }
}

fn decode(bytes: &[u8], path: &Path) -> Result<Texture> {
    let img = image::load_from_memory(bytes)
        .with_context(|| format!("decode texture {}", path.display()))?
        .to_rgb8();
    let (w, h) = img.dimensions();
    Texture::from_rgb8(w, h, img.as_raw()).with_context(|| format!("texture {}", path.display()))
}
