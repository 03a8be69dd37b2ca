use std::collections::HashMap;

use crate::MeshError;
use crate::mesh::TriMesh;
use crate::vertex::{Vertex, VertexKey};

/// Builds a deduplicated vertex buffer from a stream of triangle corners.
#[derive(Default)]
pub struct MeshIndexer {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    lookup: HashMap<VertexKey, u32>,
}

impl MeshIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(corners: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(corners),
            indices: Vec::with_capacity(corners),
            lookup: HashMap::with_capacity(corners),
        }
    }

    /// Appends one corner, reusing an existing vertex when all fields match exactly.
    pub fn push(&mut self, v: Vertex) -> u32 {
        let next = self.vertices.len() as u32;
        let idx = *self.lookup.entry(v.key()).or_insert_with(|| {
            self.vertices.push(v);
            next
        });
        self.indices.push(idx);
        idx
    }

    #[inline]
    pub fn vertex_buffer(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn index_buffer(&self) -> &[u32] {
        &self.indices
    }

    pub fn finish(self) -> Result<TriMesh, MeshError> {
        TriMesh::new(self.vertices, self.indices)
    }

    /// Like [`MeshIndexer::finish`] for callers that only ever push whole triangles.
    pub(crate) fn finish_triangles(self) -> TriMesh {
        TriMesh::from_raw(self.vertices, self.indices)
    }

    pub(crate) fn push_triangle(&mut self, tri: [Vertex; 3]) {
        for v in tri {
            self.push(v);
        }
    }
}

/// Re-indexes a mesh so that exactly-equal vertices share one slot.
pub fn reindex(mesh: &TriMesh) -> Result<TriMesh, MeshError> {
    let mut indexer = MeshIndexer::with_capacity(mesh.indices().len());
    for &i in mesh.indices() {
        indexer.push(mesh.vertices()[i as usize]);
    }
    indexer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relight_geom::{Vec2, Vec3};

    use crate::vertex::UvLayer;

    #[test]
    fn negative_zero_collapses_with_zero() {
        let mut ix = MeshIndexer::new();
        let a = ix.push(Vertex::new(Vec3::new(0.0, 1.0, 2.0), Vec3::UP));
        let b = ix.push(Vertex::new(Vec3::new(-0.0, 1.0, 2.0), Vec3::UP));
        assert_eq!(a, b);
        assert_eq!(ix.vertex_buffer().len(), 1);
    }

    #[test]
    fn differing_lightmap_uv_keeps_vertices_apart() {
        let mut ix = MeshIndexer::new();
        let base = Vertex::new(Vec3::ZERO, Vec3::UP);
        ix.push(base);
        ix.push(base.with_uv(UvLayer::Lightmap, Vec2::new(0.5, 0.0)));
        ix.push(base);
        assert_eq!(ix.vertex_buffer().len(), 2);
        assert_eq!(ix.index_buffer(), &[0, 1, 0]);
    }
}
