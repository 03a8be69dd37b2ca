use std::f32::consts::{PI, TAU};

use rand::SeedableRng;
use rand::rngs::SmallRng;
use relight_geom::Vec3;

/// Deterministic generator for one (seed, stream, index) triple, so results
/// do not depend on traversal order or on which thread bakes a lumel.
pub fn stream_rng(seed: u64, stream: u64, index: u64) -> SmallRng {
    let mut h = splitmix64(seed);
    h = splitmix64(h ^ stream);
    h = splitmix64(h ^ index);
    SmallRng::seed_from_u64(h)
}

#[inline]
fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Cosine-weighted direction around unit normal `n` from two uniforms in `[0, 1)`.
pub fn cosine_hemisphere(n: Vec3, u1: f32, u2: f32) -> Vec3 {
    let r = u1.sqrt();
    let phi = TAU * u2;
    let (t, b) = n.orthonormal_basis();
    let z = (1.0 - u1).max(0.0).sqrt();
    (t * (r * phi.cos()) + b * (r * phi.sin()) + n * z).normalized()
}

pub fn uniform_sphere(u1: f32, u2: f32) -> Vec3 {
    let z = 1.0 - 2.0 * u1;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = TAU * u2;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Point on the unit disc as `(x, y)`.
pub fn uniform_disc(u1: f32, u2: f32) -> (f32, f32) {
    let r = u1.sqrt();
    let phi = 2.0 * PI * u2;
    (r * phi.cos(), r * phi.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn streams_are_reproducible() {
        let a: f32 = stream_rng(7, 3, 11).random();
        let b: f32 = stream_rng(7, 3, 11).random();
        let c: f32 = stream_rng(7, 3, 12).random();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hemisphere_samples_stay_above_the_surface() {
        let n = Vec3::new(0.3, -0.8, 0.5).normalized();
        let mut rng = stream_rng(1, 2, 3);
        for _ in 0..256 {
            let d = cosine_hemisphere(n, rng.random(), rng.random());
            assert!(d.dot(n) >= -1e-5);
            assert!((d.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn sphere_samples_are_unit() {
        let mut rng = stream_rng(9, 9, 9);
        for _ in 0..64 {
            let d = uniform_sphere(rng.random(), rng.random());
            assert!((d.length() - 1.0).abs() < 1e-4);
        }
    }
}
