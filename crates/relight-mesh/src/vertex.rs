use relight_geom::{Vec2, Vec3};

/// UV channels carried by every vertex.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum UvLayer {
    /// Material/texture coordinates; also holds per-chart local coordinates after UV generation.
    Diffuse = 0,
    /// Lightmap atlas coordinates in `[0, 1]`.
    Lightmap = 1,
}

impl UvLayer {
    pub const COUNT: usize = 2;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: [Vec2; UvLayer::COUNT],
}

impl Vertex {
    #[inline]
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position,
            normal,
            uv: [Vec2::ZERO; UvLayer::COUNT],
        }
    }

    #[inline]
    pub fn with_uv(mut self, layer: UvLayer, uv: Vec2) -> Self {
        self.uv[layer.index()] = uv;
        self
    }

    #[inline]
    pub fn uv(&self, layer: UvLayer) -> Vec2 {
        self.uv[layer.index()]
    }

    /// Hashable identity with float equality semantics (`-0.0` and `0.0` collapse).
    pub(crate) fn key(&self) -> VertexKey {
        #[inline]
        fn bits(v: f32) -> u32 {
            if v == 0.0 { 0 } else { v.to_bits() }
        }
        let p = self.position;
        let n = self.normal;
        let [a, b] = self.uv;
        VertexKey([
            bits(p.x),
            bits(p.y),
            bits(p.z),
            bits(n.x),
            bits(n.y),
            bits(n.z),
            bits(a.x),
            bits(a.y),
            bits(b.x),
            bits(b.y),
        ])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct VertexKey([u32; 10]);
