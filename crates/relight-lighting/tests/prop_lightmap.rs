use proptest::prelude::*;
use relight_geom::{Mat4, Vec2, Vec3};
use relight_lighting::{Lightmap, LightmapSettings};
use relight_mesh::{TriMesh, UvLayer, Vertex};

fn uv_triangle(uvs: [Vec2; 3]) -> TriMesh {
    let v = uvs
        .iter()
        .map(|&uv| {
            Vertex::new(Vec3::new(uv.x, 0.0, uv.y), Vec3::UP).with_uv(UvLayer::Lightmap, uv)
        })
        .collect();
    TriMesh::new(v, vec![0, 1, 2]).unwrap()
}

fn uv() -> impl Strategy<Value = Vec2> {
    (0.0f32..1.0, 0.0f32..1.0).prop_map(|(x, y)| Vec2::new(x, y))
}

proptest! {
    #[test]
    fn valid_lumels_sit_inside_their_face(a in uv(), b in uv(), c in uv(), size in 4u32..40) {
        let mesh = uv_triangle([a, b, c]);
        let mut lm = Lightmap::new(size, size);
        let claimed = lm.add_mesh(&mesh, &Mat4::IDENTITY);
        prop_assert_eq!(claimed, lm.valid_count());
        let face = mesh.face(0);
        for y in 0..size {
            for x in 0..size {
                let l = lm.lumel(x, y);
                let centre = lm.texel_center(x, y);
                let inside = face.uv_barycentric(centre, UvLayer::Lightmap).is_some()
                    && !face.is_degenerate();
                prop_assert_eq!(l.valid, inside);
                if l.valid {
                    // World position follows the uv layout of this mesh.
                    prop_assert!((l.position.x - centre.x).abs() < 1e-3);
                    prop_assert!((l.position.z - centre.y).abs() < 1e-3);
                }
            }
        }
    }

    #[test]
    fn lightmap_sizes_are_powers_of_two_in_range(area in 0.0f32..1000.0, reference in 0.1f32..500.0) {
        let s = LightmapSettings::default();
        let size = s.size_for_area(area, reference);
        prop_assert!(size.is_power_of_two());
        prop_assert!((s.min_size..=s.max_size).contains(&size));
    }
}

#[test]
fn half_covered_16x16() {
    let mesh = uv_triangle([Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)]);
    let mut lm = Lightmap::new(16, 16);
    lm.add_mesh(&mesh, &Mat4::IDENTITY);
    assert_eq!(lm.valid_count(), 136);
    let px = lm.to_rgb32f();
    assert_eq!(px.len(), 16 * 16 * 3);
}
