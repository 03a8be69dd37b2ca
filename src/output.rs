//! Writing baked lightmaps and atlas previews to disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use image::RgbImage;
use relight_geom::{Mat4, Rgb};
use relight_lighting::Lightmap;
use relight_mesh::UvAtlas;

/// Clamped 8-bit view of a lightmap, row 0 on top.
pub fn lightmap_image(lm: &Lightmap) -> RgbImage {
    RgbImage::from_fn(lm.width(), lm.height(), |x, y| {
        image::Rgb(lm.lumel(x, y).color.to_rgb8())
    })
}

/// Raw little-endian `f32` triples, row-major.
pub fn rgb32f_bytes(lm: &Lightmap) -> Vec<u8> {
    lm.to_rgb32f()
        .into_iter()
        .flat_map(f32::to_le_bytes)
        .collect()
}

/// Writes `<name>.png` and `<name>.rgb32f` into `dir`; returns the PNG path.
pub fn write_lightmap(lm: &Lightmap, dir: &Path, name: &str) -> Result<PathBuf> {
    let png = dir.join(format!("{name}.png"));
    lightmap_image(lm)
        .save(&png)
        .with_context(|| format!("write {}", png.display()))?;
    let raw = dir.join(format!("{name}.rgb32f"));
    std::fs::write(&raw, rgb32f_bytes(lm)).with_context(|| format!("write {}", raw.display()))?;
    Ok(png)
}

/// Rasterises the atlas at `texels_per_unit`, colouring each texel by the
/// absolute world normal of the face that covers it.
pub fn atlas_image(atlas: &UvAtlas, texels_per_unit: u32) -> Result<RgbImage> {
    let s = texels_per_unit.max(1);
    let (Some(w), Some(h)) = (atlas.width.checked_mul(s), atlas.height.checked_mul(s)) else {
        bail!(
            "atlas preview of {}x{} units at {s} texels per unit is too large",
            atlas.width,
            atlas.height
        );
    };
    let mut lm = Lightmap::new(w, h);
    lm.add_mesh(&atlas.lightmap_mesh, &Mat4::IDENTITY);
    Ok(RgbImage::from_fn(lm.width(), lm.height(), |x, y| {
        let l = lm.lumel(x, y);
        let c = if l.valid {
            let n = l.normal.abs();
            Rgb::new(n.x, n.y, n.z)
        } else {
            Rgb::BLACK
        };
        image::Rgb(c.to_rgb8())
    }))
}

pub fn write_atlas(
    atlas: &UvAtlas,
    texels_per_unit: u32,
    dir: &Path,
    name: &str,
) -> Result<PathBuf> {
    let png = dir.join(format!("{name}_atlas.png"));
    atlas_image(atlas, texels_per_unit)?
        .save(&png)
        .with_context(|| format!("write {}", png.display()))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relight_mesh::{UvGenParams, generate, primitives};

    #[test]
    fn lightmap_pixels_are_clamped() {
        let mut lm = Lightmap::new(2, 1);
        lm.set_colors(&[Rgb::new(2.0, 0.5, -1.0), Rgb::BLACK]);
        let img = lightmap_image(&lm);
        assert_eq!(img.get_pixel(0, 0).0, [255, 128, 0]);
        let raw = rgb32f_bytes(&lm);
        assert_eq!(raw.len(), 2 * 3 * 4);
        assert_eq!(raw[0..4], 2.0f32.to_le_bytes());
    }

    #[test]
    fn cube_atlas_is_fully_covered() {
        let atlas = generate(&primitives::cube(1.0), &UvGenParams::default()).unwrap();
        let img = atlas_image(&atlas, 8).unwrap();
        assert_eq!(img.dimensions(), (atlas.width * 8, atlas.height * 8));
        assert!(img.pixels().all(|p| p.0 != [0, 0, 0]));
    }

    #[test]
    fn oversized_preview_is_an_error() {
        let atlas = generate(&primitives::cube(1.0), &UvGenParams::default()).unwrap();
        let err = atlas_image(&atlas, u32::MAX / 2).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn writes_both_files() {
        let dir = std::env::temp_dir().join(format!("relight-out-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let png = write_lightmap(&Lightmap::new(4, 4), &dir, "floor").unwrap();
        assert!(png.exists());
        assert_eq!(std::fs::metadata(dir.join("floor.rgb32f")).unwrap().len(), 4 * 4 * 12);
        std::fs::remove_dir_all(dir).ok();
    }
}
