//! Half-edge adjacency over an indexed triangle list.
//!
//! Edges live in an arena: face `f` owns edges `3f..3f+3`, so `next` and the
//! owning face are implicit in the index. Twins are matched by vertex index
//! only; vertices split by the indexer (UV seams) produce boundary edges.

use std::collections::HashMap;

use crate::mesh::TriMesh;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    /// Origin vertex index.
    pub vertex: u32,
    pub next: u32,
    pub face: u32,
    pub twin: Option<u32>,
}

impl Edge {
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.twin.is_none()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Dcel {
    edges: Vec<Edge>,
}

impl Dcel {
    pub fn build(mesh: &TriMesh) -> Self {
        let face_count = mesh.face_count();
        let mut edges = Vec::with_capacity(face_count * 3);
        let mut by_pair: HashMap<(u32, u32), Vec<u32>> = HashMap::with_capacity(face_count * 3);

        for f in 0..face_count {
            let tri = mesh.face(f).vertex_indices();
            let base = (f * 3) as u32;
            for k in 0..3u32 {
                let from = tri[k as usize];
                let to = tri[((k + 1) % 3) as usize];
                let id = base + k;
                edges.push(Edge {
                    vertex: from,
                    next: base + (k + 1) % 3,
                    face: f as u32,
                    twin: None,
                });
                by_pair.entry((from.min(to), from.max(to))).or_default().push(id);
            }
        }

        let mut dcel = Self { edges };
        for candidates in by_pair.values() {
            for (i, &e) in candidates.iter().enumerate() {
                if dcel.edges[e as usize].twin.is_some() {
                    continue;
                }
                let (from, to) = dcel.endpoints(e);
                let mate = candidates[i + 1..].iter().copied().find(|&o| {
                    dcel.edges[o as usize].twin.is_none() && dcel.endpoints(o) == (to, from)
                });
                if let Some(o) = mate {
                    dcel.edges[e as usize].twin = Some(o);
                    dcel.edges[o as usize].twin = Some(e);
                }
            }
        }
        dcel
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn edge(&self, id: u32) -> &Edge {
        &self.edges[id as usize]
    }

    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// `(origin, destination)` vertex indices.
    #[inline]
    pub fn endpoints(&self, id: u32) -> (u32, u32) {
        let e = &self.edges[id as usize];
        (e.vertex, self.edges[e.next as usize].vertex)
    }

    pub fn boundary_edges(&self) -> impl Iterator<Item = u32> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_boundary())
            .map(|(i, _)| i as u32)
    }

    #[inline]
    pub fn face_edges(&self, face: u32) -> [u32; 3] {
        let base = face * 3;
        [base, base + 1, base + 2]
    }

    /// Faces sharing an edge with `face`.
    pub fn neighbors(&self, face: u32) -> impl Iterator<Item = u32> + '_ {
        self.face_edges(face)
            .into_iter()
            .filter_map(move |e| self.edges[e as usize].twin)
            .map(move |t| self.edges[t as usize].face)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::Vertex;
    use relight_geom::Vec3;

    fn quad() -> TriMesh {
        let v = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0),
        ]
        .map(|p| Vertex::new(p, Vec3::UP))
        .to_vec();
        TriMesh::new(v, vec![0, 2, 1, 0, 3, 2]).unwrap()
    }

    #[test]
    fn quad_has_one_interior_edge_pair() {
        let dcel = Dcel::build(&quad());
        assert_eq!(dcel.edge_count(), 6);
        assert_eq!(dcel.boundary_edges().count(), 4);
        assert_eq!(dcel.neighbors(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(dcel.neighbors(1).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn next_walks_the_face_loop() {
        let dcel = Dcel::build(&quad());
        for f in 0..2u32 {
            let [a, _, _] = dcel.face_edges(f);
            let b = dcel.edge(a).next;
            let c = dcel.edge(b).next;
            assert_eq!(dcel.edge(c).next, a);
            assert!(dcel.face_edges(f).iter().all(|&e| dcel.edge(e).face == f));
        }
    }

    #[test]
    fn same_direction_edges_do_not_pair() {
        // Second triangle repeats the winding of the shared edge (inconsistent orientation).
        let v = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
        ]
        .map(|p| Vertex::new(p, Vec3::UP))
        .to_vec();
        let mesh = TriMesh::new(v, vec![0, 1, 2, 0, 1, 3]).unwrap();
        let dcel = Dcel::build(&mesh);
        assert_eq!(dcel.boundary_edges().count(), 6);
    }
}
