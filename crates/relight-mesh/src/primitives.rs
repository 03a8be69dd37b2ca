//! Procedural meshes for scene descriptions, tests and benches.
//! All faces wind counter-clockwise seen from outside.

use std::f32::consts::TAU;

use relight_geom::{Vec2, Vec3};

use crate::indexer::MeshIndexer;
use crate::mesh::TriMesh;
use crate::vertex::{UvLayer, Vertex};

/// Outward axis plus an in-plane basis with `u x v == n`.
const CUBE_SIDES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
    (Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 0.0)),
    (Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0)),
    (Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
    (Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
    (Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
];

const QUAD_UV: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
];

fn cube_corners(n: Vec3, u: Vec3, v: Vec3, h: f32) -> [Vec3; 4] {
    let c = n * h;
    [
        c - u * h - v * h,
        c + u * h - v * h,
        c + u * h + v * h,
        c - u * h + v * h,
    ]
}

fn push_quad(ix: &mut MeshIndexer, q: [Vertex; 4]) {
    ix.push_triangle([q[0], q[1], q[2]]);
    ix.push_triangle([q[0], q[2], q[3]]);
}

/// Axis-aligned cube centred on the origin; 24 vertices with flat normals.
pub fn cube(size: f32) -> TriMesh {
    let h = size * 0.5;
    let mut ix = MeshIndexer::with_capacity(36);
    for (n, u, v) in CUBE_SIDES {
        let p = cube_corners(n, u, v, h);
        push_quad(
            &mut ix,
            [0, 1, 2, 3].map(|k| Vertex::new(p[k], n).with_uv(UvLayer::Diffuse, QUAD_UV[k])),
        );
    }
    ix.finish_triangles()
}

/// Cube sharing its 8 corners between sides (smoothed corner normals, no UVs).
pub fn cube_shared(size: f32) -> TriMesh {
    let h = size * 0.5;
    let mut ix = MeshIndexer::with_capacity(36);
    for (n, u, v) in CUBE_SIDES {
        let p = cube_corners(n, u, v, h);
        push_quad(&mut ix, p.map(|c| Vertex::new(c, c.normalized())));
    }
    ix.finish_triangles()
}

/// Horizontal square of side `size` facing +Y, split into `cells` x `cells` quads.
pub fn plane(size: f32, cells: u32) -> TriMesh {
    let cells = cells.max(1);
    let step = size / cells as f32;
    let h = size * 0.5;
    let vert = |i: u32, j: u32| {
        let x = -h + i as f32 * step;
        let z = -h + j as f32 * step;
        let uv = Vec2::new(i as f32 / cells as f32, j as f32 / cells as f32);
        Vertex::new(Vec3::new(x, 0.0, z), Vec3::UP).with_uv(UvLayer::Diffuse, uv)
    };
    let mut ix = MeshIndexer::with_capacity((cells * cells * 6) as usize);
    for j in 0..cells {
        for i in 0..cells {
            let (a, b, c, d) = (vert(i, j), vert(i + 1, j), vert(i + 1, j + 1), vert(i, j + 1));
            ix.push_triangle([a, c, b]);
            ix.push_triangle([a, d, c]);
        }
    }
    ix.finish_triangles()
}

/// Upright `width` x `height` rectangle in the XY plane facing +Z.
pub fn quad(width: f32, height: f32) -> TriMesh {
    let (hw, hh) = (width * 0.5, height * 0.5);
    let n = Vec3::new(0.0, 0.0, 1.0);
    let p = [
        Vec3::new(-hw, -hh, 0.0),
        Vec3::new(hw, -hh, 0.0),
        Vec3::new(hw, hh, 0.0),
        Vec3::new(-hw, hh, 0.0),
    ];
    let mut ix = MeshIndexer::with_capacity(6);
    push_quad(
        &mut ix,
        [0, 1, 2, 3].map(|k| Vertex::new(p[k], n).with_uv(UvLayer::Diffuse, QUAD_UV[k])),
    );
    ix.finish_triangles()
}

/// Capped cylinder along +Y centred on the origin.
pub fn cylinder(radius: f32, height: f32, segments: u32) -> TriMesh {
    let segments = segments.max(3);
    let hh = height * 0.5;
    let ring = |i: u32| {
        let a = TAU * (i % segments) as f32 / segments as f32;
        Vec3::new(a.cos(), 0.0, a.sin())
    };
    let mut ix = MeshIndexer::with_capacity((segments * 12) as usize);

    for i in 0..segments {
        let (d0, d1) = (ring(i), ring(i + 1));
        let (u0, u1) = (i as f32 / segments as f32, (i + 1) as f32 / segments as f32);
        let side = |d: Vec3, u: f32, top: bool| {
            let y = if top { hh } else { -hh };
            Vertex::new(d * radius + Vec3::new(0.0, y, 0.0), d)
                .with_uv(UvLayer::Diffuse, Vec2::new(u, if top { 1.0 } else { 0.0 }))
        };
        let (a0, a1, t0, t1) = (
            side(d0, u0, false),
            side(d1, u1, false),
            side(d0, u0, true),
            side(d1, u1, true),
        );
        ix.push_triangle([a0, t0, a1]);
        ix.push_triangle([a1, t0, t1]);

        let cap = |d: Vec3, y: f32, n: Vec3| {
            Vertex::new(d * radius + Vec3::new(0.0, y, 0.0), n)
                .with_uv(UvLayer::Diffuse, Vec2::new(0.5 + 0.5 * d.x, 0.5 + 0.5 * d.z))
        };
        let up = Vec3::UP;
        let down = -Vec3::UP;
        ix.push_triangle([
            cap(Vec3::ZERO, hh, up),
            cap(d1, hh, up),
            cap(d0, hh, up),
        ]);
        ix.push_triangle([
            cap(Vec3::ZERO, -hh, down),
            cap(d0, -hh, down),
            cap(d1, -hh, down),
        ]);
    }
    ix.finish_triangles()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dcel::Dcel;

    fn outward(mesh: &TriMesh) -> bool {
        let centre = mesh.bounds().min + mesh.bounds().extent() * 0.5;
        mesh.faces().all(|f| {
            let [a, b, c] = f.positions();
            let mid = (a + b + c) / 3.0;
            f.normal().dot(mid - centre) > 0.0
        })
    }

    #[test]
    fn cube_counts_and_winding() {
        let c = cube(1.0);
        assert_eq!(c.vertex_count(), 24);
        assert_eq!(c.face_count(), 12);
        assert!((c.area() - 6.0).abs() < 1e-5);
        assert!(outward(&c));
    }

    #[test]
    fn shared_cube_is_closed() {
        let c = cube_shared(1.0);
        assert_eq!(c.vertex_count(), 8);
        assert!(outward(&c));
        assert_eq!(Dcel::build(&c).boundary_edges().count(), 0);
    }

    #[test]
    fn plane_faces_up() {
        let p = plane(2.0, 4);
        assert_eq!(p.face_count(), 32);
        assert_eq!(p.vertex_count(), 25);
        assert!(p.faces().all(|f| f.normal().y > 0.99));
        assert!((p.area() - 4.0).abs() < 1e-4);
    }

    #[test]
    fn quad_faces_positive_z() {
        let q = quad(2.0, 1.0);
        assert!(q.faces().all(|f| f.normal().z > 0.99));
        assert!((q.area() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn cylinder_is_outward() {
        let c = cylinder(0.5, 1.0, 16);
        assert_eq!(c.face_count(), 64);
        assert!(outward(&c));
    }
}
