//! Per-instance lumel grid addressed by lightmap UVs.

use std::ops::RangeInclusive;

use relight_geom::{Mat4, Rgb, Vec2, Vec3};
use relight_mesh::{Barycentric, Face, TriMesh, UvLayer};

/// One lightmap texel and the surface sample it stands for.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Lumel {
    pub valid: bool,
    pub position: Vec3,
    pub normal: Vec3,
    /// Interpolated diffuse-layer coordinate, for material lookups.
    pub uv: Vec2,
    pub face: u32,
    pub bary: Barycentric,
    pub color: Rgb,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Lightmap {
    width: u32,
    height: u32,
    lumels: Vec<Lumel>,
}

impl Lightmap {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            lumels: vec![Lumel::default(); (width as usize) * (height as usize)],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn lumel(&self, x: u32, y: u32) -> &Lumel {
        &self.lumels[self.index(x, y)]
    }

    #[inline]
    pub fn lumel_mut(&mut self, x: u32, y: u32) -> &mut Lumel {
        let i = self.index(x, y);
        &mut self.lumels[i]
    }

    #[inline]
    pub fn lumels(&self) -> &[Lumel] {
        &self.lumels
    }

    pub fn row(&self, y: u32) -> &[Lumel] {
        let start = self.index(0, y);
        &self.lumels[start..start + self.width as usize]
    }

    /// Lightmap-space coordinate of a texel centre.
    #[inline]
    pub fn texel_center(&self, x: u32, y: u32) -> Vec2 {
        Vec2::new(
            (x as f32 + 0.5) / self.width as f32,
            (y as f32 + 0.5) / self.height as f32,
        )
    }

    /// Texels whose centres can fall inside `face` in the lightmap layer.
    /// Empty ranges come back as `1..=0`.
    pub fn texel_range(&self, face: &Face<'_>) -> (RangeInclusive<u32>, RangeInclusive<u32>) {
        let (lo, hi) = face.uv_rect(UvLayer::Lightmap);
        (
            axis_range(lo.x, hi.x, self.width),
            axis_range(lo.y, hi.y, self.height),
        )
    }

    /// Rasterises every non-degenerate face of `mesh` in lightmap space.
    /// A texel already claimed by an earlier face is left alone.
    /// Returns the number of texels claimed.
    pub fn add_mesh(&mut self, mesh: &TriMesh, transform: &Mat4) -> usize {
        let mut claimed = 0;
        for face in mesh.faces() {
            if face.is_degenerate() {
                continue;
            }
            let (xs, ys) = self.texel_range(&face);
            let world_normal = transform.transform_normal(face.normal());
            for y in ys {
                for x in xs.clone() {
                    let i = self.index(x, y);
                    if self.lumels[i].valid {
                        continue;
                    }
                    let Some(bary) = face.uv_barycentric(self.texel_center(x, y), UvLayer::Lightmap)
                    else {
                        continue;
                    };
                    let shading = bary.interpolate_vec3(face.normals());
                    let normal = if shading.length_squared() > 0.0 {
                        transform.transform_normal(shading)
                    } else {
                        world_normal
                    };
                    self.lumels[i] = Lumel {
                        valid: true,
                        position: transform.transform_point(bary.interpolate_vec3(face.positions())),
                        normal,
                        uv: bary.interpolate_vec2(face.uvs(UvLayer::Diffuse)),
                        face: face.index() as u32,
                        bary,
                        color: Rgb::BLACK,
                    };
                    claimed += 1;
                }
            }
        }
        claimed
    }

    pub fn valid_count(&self) -> usize {
        self.lumels.iter().filter(|l| l.valid).count()
    }

    pub fn clear_colors(&mut self) {
        for l in &mut self.lumels {
            l.color = Rgb::BLACK;
        }
    }

    /// Writes baked colours back in lumel order; `colors` must match the grid.
    pub fn set_colors(&mut self, colors: &[Rgb]) {
        debug_assert_eq!(colors.len(), self.lumels.len());
        for (l, &c) in self.lumels.iter_mut().zip(colors) {
            l.color = c;
        }
    }

    /// Row-major RGB32F pixels.
    pub fn to_rgb32f(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.lumels.len() * 3);
        for l in &self.lumels {
            out.extend_from_slice(&l.color.to_array());
        }
        out
    }

    /// Bleeds colours into invalid texels around valid ones, `passes` rings deep.
    /// Filled texels keep `valid == false`. Returns the number of texels filled.
    pub fn expand(&mut self, passes: u32) -> usize {
        const RING: [(i64, i64); 8] = [
            (-1, 0),
            (1, 0),
            (0, -1),
            (0, 1),
            (-1, -1),
            (1, -1),
            (-1, 1),
            (1, 1),
        ];
        let (w, h) = (self.width as i64, self.height as i64);
        let mut filled: Vec<bool> = self.lumels.iter().map(|l| l.valid).collect();
        let mut total = 0;
        for _ in 0..passes {
            let mut updates = Vec::new();
            for y in 0..h {
                for x in 0..w {
                    let i = (y * w + x) as usize;
                    if filled[i] {
                        continue;
                    }
                    let mut sum = Rgb::BLACK;
                    let mut n = 0u32;
                    for (dx, dy) in RING {
                        let (nx, ny) = (x + dx, y + dy);
                        if nx < 0 || ny < 0 || nx >= w || ny >= h {
                            continue;
                        }
                        let j = (ny * w + nx) as usize;
                        if filled[j] {
                            sum += self.lumels[j].color;
                            n += 1;
                        }
                    }
                    if n > 0 {
                        updates.push((i, sum / n as f32));
                    }
                }
            }
            if updates.is_empty() {
                break;
            }
            total += updates.len();
            for (i, c) in updates {
                self.lumels[i].color = c;
                filled[i] = true;
            }
        }
        total
    }
}

fn axis_range(lo: f32, hi: f32, n: u32) -> RangeInclusive<u32> {
    let first = (lo * n as f32 - 0.5).floor().max(0.0);
    let last = (hi * n as f32 - 0.5).ceil().min(n as f32 - 1.0);
    if last < first {
        return RangeInclusive::new(1, 0);
    }
    first as u32..=last as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use relight_mesh::Vertex;

    fn half_triangle() -> TriMesh {
        let corners = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
        let v = corners
            .iter()
            .map(|&uv| {
                Vertex::new(Vec3::new(uv.x, 0.0, uv.y), Vec3::UP)
                    .with_uv(UvLayer::Lightmap, uv)
                    .with_uv(UvLayer::Diffuse, uv)
            })
            .collect();
        TriMesh::new(v, vec![0, 2, 1]).unwrap()
    }

    #[test]
    fn half_triangle_covers_136_of_256() {
        let mut lm = Lightmap::new(16, 16);
        let claimed = lm.add_mesh(&half_triangle(), &Mat4::IDENTITY);
        assert_eq!(claimed, 136);
        assert_eq!(lm.valid_count(), 136);
        let l = lm.lumel(0, 0);
        assert!(l.valid);
        assert!((l.position.x - 0.5 / 16.0).abs() < 1e-5);
        assert!((l.uv.y - 0.5 / 16.0).abs() < 1e-5);
        assert!(!lm.lumel(15, 15).valid);
    }

    #[test]
    fn first_face_keeps_the_texel() {
        let mut lm = Lightmap::new(4, 4);
        let tri = half_triangle();
        lm.add_mesh(&tri, &Mat4::IDENTITY);
        let moved = Mat4::translation(Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(lm.add_mesh(&tri, &moved), 0);
        assert!(lm.lumel(0, 0).position.x < 1.0);
    }

    #[test]
    fn transform_moves_positions_and_normals() {
        let mut lm = Lightmap::new(8, 8);
        let flip = Mat4::scale(Vec3::new(1.0, -1.0, 1.0));
        lm.add_mesh(&half_triangle(), &flip);
        let l = lm.lumel(0, 0);
        assert!(l.normal.y < -0.99);
    }

    #[test]
    fn expand_fills_the_border_ring() {
        let mut lm = Lightmap::new(3, 3);
        {
            let c = lm.lumel_mut(1, 1);
            c.valid = true;
            c.color = Rgb::WHITE;
        }
        assert_eq!(lm.expand(0), 0);
        assert_eq!(lm.lumel(0, 0).color, Rgb::BLACK);
        assert_eq!(lm.expand(3), 8);
        assert!(lm.lumels().iter().all(|l| l.color == Rgb::WHITE));
        assert_eq!(lm.valid_count(), 1);
        let px = lm.to_rgb32f();
        assert_eq!(px.len(), 27);
        assert!(px.iter().all(|&v| v == 1.0));
    }
}
