//! Lightmap sizing and bake tuning.

use relight_geom::Rgb;

pub const DEFAULT_MIN_LIGHTMAP_SIZE: u32 = 16;
pub const DEFAULT_MAX_LIGHTMAP_SIZE: u32 = 128;

pub const SKY_BLUE: Rgb = Rgb::new(0.527, 0.805, 0.918);
pub const DEFAULT_AMBIENT: Rgb = Rgb::new(0.34, 0.34, 0.34);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightmapSettings {
    pub min_size: u32,
    pub max_size: u32,
    /// Surface area that maps to `max_size`; the largest static instance when `None`.
    pub reference_area: Option<f32>,
}

impl Default for LightmapSettings {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_LIGHTMAP_SIZE,
            max_size: DEFAULT_MAX_LIGHTMAP_SIZE,
            reference_area: None,
        }
    }
}

impl LightmapSettings {
    /// Power-of-two edge length for an instance with world surface `area`.
    pub fn size_for_area(&self, area: f32, reference: f32) -> u32 {
        let lo = self.min_size.max(1);
        let hi = self.max_size.max(lo);
        let ratio = if reference > 0.0 { area / reference } else { 1.0 };
        let raw = (lo as f32 + (hi - lo) as f32 * ratio).ceil();
        let clamped = if raw.is_finite() {
            (raw as u32).clamp(lo, hi)
        } else {
            hi
        };
        clamped.next_power_of_two()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndirectLightSettings {
    /// Radiance returned by gather rays that leave the scene.
    pub sky: Rgb,
    /// Constant term added by the direct bake.
    pub ambient: Rgb,
    pub photons_per_light: u32,
    pub max_bounces: u32,
    /// Photons whose strongest channel drops below this are terminated.
    pub energy_threshold: f32,
    /// Box radius in texels for the photon gather pass.
    pub gather_radius: u32,
    /// Final-gather rays per lumel.
    pub samples: u32,
}

impl IndirectLightSettings {
    pub fn fast(sky: Rgb, ambient: Rgb) -> Self {
        Self {
            sky,
            ambient,
            photons_per_light: 20_000,
            max_bounces: 2,
            energy_threshold: 1e-3,
            gather_radius: 1,
            samples: 16,
        }
    }

    pub fn quality(sky: Rgb, ambient: Rgb) -> Self {
        Self {
            sky,
            ambient,
            photons_per_light: 200_000,
            max_bounces: 4,
            energy_threshold: 1e-4,
            gather_radius: 2,
            samples: 128,
        }
    }
}

impl Default for IndirectLightSettings {
    fn default() -> Self {
        Self::fast(SKY_BLUE, DEFAULT_AMBIENT)
    }
}

/// Order in which a baker visits lumels. Both produce identical lightmaps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Traversal {
    #[default]
    PerLumel,
    PerFace,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BakeSettings {
    pub traversal: Traversal,
    pub seed: u64,
    /// Offset along the surface normal for secondary rays.
    pub bias: f32,
    pub indirect: IndirectLightSettings,
    pub ao_samples: u32,
    pub ao_distance: f32,
    /// Dilation passes run after a successful bake.
    pub expand: u32,
}

impl Default for BakeSettings {
    fn default() -> Self {
        Self {
            traversal: Traversal::PerLumel,
            seed: 0x5EED,
            bias: 1e-3,
            indirect: IndirectLightSettings::default(),
            ao_samples: 32,
            ao_distance: 1.0,
            expand: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_clamped_powers_of_two() {
        let s = LightmapSettings::default();
        assert_eq!(s.size_for_area(0.0, 10.0), 16);
        assert_eq!(s.size_for_area(10.0, 10.0), 128);
        assert_eq!(s.size_for_area(100.0, 10.0), 128);
        // 16 + 112 * 0.25 = 44 -> 64
        assert_eq!(s.size_for_area(2.5, 10.0), 64);
        assert_eq!(s.size_for_area(1.0, 0.0), 128);
    }
}
