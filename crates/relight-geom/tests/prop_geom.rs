use proptest::num::f32::NORMAL;
use proptest::prelude::*;
use proptest::strategy::Strategy;
use relight_geom::{Aabb, Mat4, Quat, Ray, Vec2, Vec3};

fn approx_abs_rel(a: f32, b: f32, atol: f32, rtol: f32) -> bool {
    let diff = (a - b).abs();
    let scale = a.abs().max(b.abs());
    diff <= atol + rtol * scale
}

fn vapprox_abs_rel(a: Vec3, b: Vec3, atol: f32, rtol: f32) -> bool {
    approx_abs_rel(a.x, b.x, atol, rtol)
        && approx_abs_rel(a.y, b.y, atol, rtol)
        && approx_abs_rel(a.z, b.z, atol, rtol)
}

fn bounded_f32() -> impl Strategy<Value = f32> {
    NORMAL.prop_filter("bounded", |v| v.is_finite() && v.abs() <= 1e3)
}

fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (bounded_f32(), bounded_f32(), bounded_f32()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn unit_vec3() -> impl Strategy<Value = Vec3> {
    arb_vec3()
        .prop_filter("not tiny", |v| v.length() > 1e-2)
        .prop_map(|v| v.normalized())
}

proptest! {
    // Cross product is perpendicular to both inputs
    #[test]
    fn cross_is_perpendicular(a in unit_vec3(), b in unit_vec3()) {
        let c = a.cross(b);
        prop_assert!(c.dot(a).abs() <= 1e-4);
        prop_assert!(c.dot(b).abs() <= 1e-4);
    }

    // Orthonormal basis vectors are unit length and mutually perpendicular
    #[test]
    fn orthonormal_basis_is_orthonormal(n in unit_vec3()) {
        let (t, b) = n.orthonormal_basis();
        prop_assert!((t.length() - 1.0).abs() < 1e-4);
        prop_assert!((b.length() - 1.0).abs() < 1e-4);
        prop_assert!(t.dot(n).abs() < 1e-4);
        prop_assert!(b.dot(n).abs() < 1e-4);
        prop_assert!(t.dot(b).abs() < 1e-4);
    }

    // perp_dot is antisymmetric
    #[test]
    fn perp_dot_antisymmetric(ax in bounded_f32(), ay in bounded_f32(), bx in bounded_f32(), by in bounded_f32()) {
        let a = Vec2::new(ax, ay);
        let b = Vec2::new(bx, by);
        prop_assert!(approx_abs_rel(a.perp_dot(b), -b.perp_dot(a), 1e-3, 1e-5));
    }

    // Every extended point lies inside the resulting box
    #[test]
    fn aabb_from_points_contains_points(points in prop::collection::vec(arb_vec3(), 1..16)) {
        let bb = Aabb::from_points(points.iter().copied());
        prop_assert!(!bb.is_empty());
        for p in points {
            prop_assert!(p.x >= bb.min.x && p.y >= bb.min.y && p.z >= bb.min.z);
            prop_assert!(p.x <= bb.max.x && p.y <= bb.max.y && p.z <= bb.max.z);
        }
    }

    // A ray aimed at the box centre from outside always hits it
    #[test]
    fn ray_towards_box_centre_hits(center in arb_vec3(), offset in unit_vec3()) {
        let bb = Aabb::new(center - Vec3::ONE, center + Vec3::ONE);
        let origin = center + offset * 10.0;
        let ray = Ray::new(origin, center - origin);
        prop_assert!(bb.intersect_ray(&ray, 100.0).is_some());
    }

    // Triangle hit point reconstructs from barycentrics
    #[test]
    fn triangle_hit_matches_barycentric(u in 0.05f32..0.45, v in 0.05f32..0.45, h in 0.5f32..5.0) {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(2.0, 0.0, 0.0);
        let c = Vec3::new(0.0, 0.0, 2.0);
        let target = a + (b - a) * u + (c - a) * v;
        let ray = Ray::new(target + Vec3::new(0.0, h, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let (t, hu, hv) = ray.intersect_triangle(a, b, c).expect("hit");
        prop_assert!(approx_abs_rel(t, h, 1e-4, 1e-4));
        prop_assert!(approx_abs_rel(hu, u, 1e-4, 1e-4));
        prop_assert!(approx_abs_rel(hv, v, 1e-4, 1e-4));
    }

    // Rotations preserve length
    #[test]
    fn rotation_preserves_length(v in arb_vec3(), axis in unit_vec3(), angle in -6.3f32..6.3) {
        let m = Mat4::rotation(Quat::from_axis_angle(axis, angle));
        let r = m.transform_vector(v);
        prop_assert!(approx_abs_rel(r.length(), v.length(), 1e-3, 1e-4));
    }

    // Translation moves points but not vectors
    #[test]
    fn translation_ignores_vectors(v in arb_vec3(), t in arb_vec3()) {
        let m = Mat4::translation(t);
        prop_assert!(vapprox_abs_rel(m.transform_point(v), v + t, 1e-4, 1e-5));
        prop_assert_eq!(m.transform_vector(v), v);
    }
}
