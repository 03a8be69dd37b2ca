use relight_geom::{Aabb, Mat4, Vec2, Vec3};

use crate::MeshError;
use crate::axis::Axis;
use crate::vertex::{UvLayer, Vertex};

const DEGENERATE_AREA: f32 = 1e-12;
const UV_INSIDE_EPS: f32 = 1e-6;

/// Indexed triangle list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriMesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl TriMesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self, MeshError> {
        if indices.len() % 3 != 0 {
            return Err(MeshError::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(MeshError::InvalidMesh(format!(
                "index {} out of range for {} vertices",
                bad,
                vertices.len()
            )));
        }
        Ok(Self { vertices, indices })
    }

    /// For builders that produce indices by construction.
    pub(crate) fn from_raw(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        debug_assert!(indices.len() % 3 == 0);
        debug_assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
        Self { vertices, indices }
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn face(&self, index: usize) -> Face<'_> {
        debug_assert!(index < self.face_count());
        Face { mesh: self, index }
    }

    pub fn faces(&self) -> impl Iterator<Item = Face<'_>> + '_ {
        (0..self.face_count()).map(move |i| self.face(i))
    }

    /// Surface area in object space.
    pub fn area(&self) -> f32 {
        self.faces().map(|f| f.area()).sum()
    }

    /// Surface area after applying `transform`.
    pub fn transformed_area(&self, transform: &Mat4) -> f32 {
        self.faces()
            .map(|f| {
                let [a, b, c] = f.positions().map(|p| transform.transform_point(p));
                (b - a).cross(c - a).length() * 0.5
            })
            .sum()
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().map(|v| v.position))
    }

    pub fn into_parts(self) -> (Vec<Vertex>, Vec<u32>) {
        (self.vertices, self.indices)
    }
}

/// Barycentric weights for the three corners of a face.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Barycentric {
    pub w: [f32; 3],
}

impl Barycentric {
    #[inline]
    pub fn interpolate_vec3(&self, v: [Vec3; 3]) -> Vec3 {
        v[0] * self.w[0] + v[1] * self.w[1] + v[2] * self.w[2]
    }

    #[inline]
    pub fn interpolate_vec2(&self, v: [Vec2; 3]) -> Vec2 {
        v[0] * self.w[0] + v[1] * self.w[1] + v[2] * self.w[2]
    }
}

/// Borrowed view of one triangle.
#[derive(Clone, Copy, Debug)]
pub struct Face<'a> {
    mesh: &'a TriMesh,
    index: usize,
}

impl<'a> Face<'a> {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn vertex_indices(&self) -> [u32; 3] {
        let base = self.index * 3;
        let idx = &self.mesh.indices;
        [idx[base], idx[base + 1], idx[base + 2]]
    }

    #[inline]
    pub fn vertex(&self, k: usize) -> &'a Vertex {
        &self.mesh.vertices[self.mesh.indices[self.index * 3 + k] as usize]
    }

    #[inline]
    pub fn positions(&self) -> [Vec3; 3] {
        [0, 1, 2].map(|k| self.vertex(k).position)
    }

    #[inline]
    pub fn normals(&self) -> [Vec3; 3] {
        [0, 1, 2].map(|k| self.vertex(k).normal)
    }

    #[inline]
    pub fn uvs(&self, layer: UvLayer) -> [Vec2; 3] {
        [0, 1, 2].map(|k| self.vertex(k).uv(layer))
    }

    /// Unnormalized geometric normal; its length is twice the area.
    #[inline]
    fn cross(&self) -> Vec3 {
        let [a, b, c] = self.positions();
        (b - a).cross(c - a)
    }

    /// Unit geometric normal, or zero for a degenerate face.
    pub fn normal(&self) -> Vec3 {
        if self.is_degenerate() {
            Vec3::ZERO
        } else {
            self.cross().normalized()
        }
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.cross().length() * 0.5
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.area() <= DEGENERATE_AREA
    }

    /// Projects the three corners onto the plane perpendicular to `axis`.
    pub fn flatten(&self, axis: Axis) -> [Vec2; 3] {
        self.positions().map(|p| axis.project(p))
    }

    pub fn uv_rect(&self, layer: UvLayer) -> (Vec2, Vec2) {
        let [a, b, c] = self.uvs(layer);
        (a.min(b).min(c), a.max(b).max(c))
    }

    /// Containment test of `uv` against this face in the given UV layer.
    /// Points on an edge count as inside; degenerate UV triangles contain nothing.
    pub fn uv_barycentric(&self, uv: Vec2, layer: UvLayer) -> Option<Barycentric> {
        let [a, b, c] = self.uvs(layer);
        let denom = (b - a).perp_dot(c - a);
        if denom.abs() <= DEGENERATE_AREA {
            return None;
        }
        let wb = (uv - a).perp_dot(c - a) / denom;
        let wc = (b - a).perp_dot(uv - a) / denom;
        let wa = 1.0 - wb - wc;
        if wa < -UV_INSIDE_EPS || wb < -UV_INSIDE_EPS || wc < -UV_INSIDE_EPS {
            return None;
        }
        Some(Barycentric { w: [wa, wb, wc] })
    }
}
