//! Lightmap UV generation: charting, packing and atlas layout.
//!
//! The pipeline runs in four strictly ordered stages:
//!
//! 1. axis charts over the input mesh; every chart is flattened and its
//!    corners written to [`UvLayer::Diffuse`] relative to the chart box, then
//!    the mesh is re-indexed with chart borders as seams;
//! 2. angle charts over the re-indexed mesh, one packer rectangle each;
//! 3. the packer growth loop fixes the atlas size;
//! 4. every chart is copied into its rectangle, producing a flat layout mesh
//!    and a lightmap-ready copy of the input with normalised atlas UVs.
//!
//! Face order is preserved by every stage, so face `i` of each output
//! corresponds to face `i` of the input.

use relight_geom::{Vec2, Vec3};

use crate::MeshError;
use crate::chart::{AngleChartBuilder, AxisChartBuilder, ChartBuilder, DEFAULT_MAX_ANGLE_DEGREES};
use crate::indexer::MeshIndexer;
use crate::mesh::TriMesh;
use crate::packer::{Rect, RectPacker};
use crate::vertex::{UvLayer, Vertex};

pub const DEFAULT_MAX_ATLAS_SIZE: u32 = 4096;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvGenParams {
    pub max_angle_degrees: f32,
    pub max_atlas_size: u32,
    pub padding: f32,
}

impl Default for UvGenParams {
    fn default() -> Self {
        Self {
            max_angle_degrees: DEFAULT_MAX_ANGLE_DEGREES,
            max_atlas_size: DEFAULT_MAX_ATLAS_SIZE,
            padding: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct UvAtlas {
    /// Flattened layout: positions are `(u, 0, v)` in atlas units.
    pub layout: TriMesh,
    /// Input geometry with [`UvLayer::Lightmap`] set to normalised atlas coordinates.
    pub lightmap_mesh: TriMesh,
    pub width: u32,
    pub height: u32,
    pub chart_count: usize,
    pub rects: Vec<Rect>,
}

pub fn generate(mesh: &TriMesh, params: &UvGenParams) -> Result<UvAtlas, MeshError> {
    if mesh.face_count() == 0 {
        return Err(MeshError::DegenerateGeometry("mesh has no faces".into()));
    }
    if mesh.faces().all(|f| f.is_degenerate()) {
        return Err(MeshError::DegenerateGeometry(format!(
            "all {} faces have zero area",
            mesh.face_count()
        )));
    }

    let local = axis_local_uvs(mesh)?;

    let charts = AngleChartBuilder::new(params.max_angle_degrees).build(&local);
    let mut packer = RectPacker::with_padding(params.padding);
    let mut frames = Vec::with_capacity(charts.len());
    for chart in charts.iter() {
        let (lo, hi) = chart.uv_rect(&local, UvLayer::Diffuse);
        let size = hi - lo;
        let rotated = size.x < size.y;
        let (long, short) = if rotated {
            (size.y, size.x)
        } else {
            (size.x, size.y)
        };
        packer.add(long, short);
        frames.push(ChartFrame {
            min: lo,
            size,
            rotated,
        });
    }

    let (width, height) = packer.pack(params.max_atlas_size)?;
    let inv = Vec2::new(1.0 / width as f32, 1.0 / height as f32);
    let inset = params.padding.max(0.0) * 0.5;

    // Walk corners in face order so both outputs line up with the input.
    let corners = mesh.indices().len();
    let mut layout = MeshIndexer::with_capacity(corners);
    let mut lightmap = MeshIndexer::with_capacity(corners);
    for f in 0..mesh.face_count() {
        let chart = charts.chart_of(f);
        let rect = packer.rect(chart);
        let src = mesh.face(f);
        let flat = local.face(f);
        for k in 0..3 {
            let local_v = *flat.vertex(k);
            let p = frames[chart].place(local_v.uv(UvLayer::Diffuse), &rect, inset);
            let atlas_uv = Vec2::new(p.x * inv.x, p.y * inv.y);
            // Layout keeps the chart-local UV0 and the real normal; only the position moves.
            layout.push(Vertex {
                position: Vec3::new(p.x, 0.0, p.y),
                ..local_v.with_uv(UvLayer::Lightmap, atlas_uv)
            });
            lightmap.push(src.vertex(k).with_uv(UvLayer::Lightmap, atlas_uv));
        }
    }

    log::info!(
        "uv atlas: {} faces, {} charts, {}x{} units",
        mesh.face_count(),
        charts.len(),
        width,
        height
    );

    Ok(UvAtlas {
        layout: layout.finish()?,
        lightmap_mesh: lightmap.finish()?,
        width,
        height,
        chart_count: charts.len(),
        rects: packer.rects().to_vec(),
    })
}

/// Stage 1: per axis chart, chart-local flattened coordinates in the diffuse layer.
fn axis_local_uvs(mesh: &TriMesh) -> Result<TriMesh, MeshError> {
    let charts = AxisChartBuilder.build(mesh);
    let mut out = vec![Vertex::default(); mesh.indices().len()];
    for (ci, chart) in charts.iter().enumerate() {
        let (lo, hi) = chart.flat_rect(mesh);
        // The lightmap layer carries the chart id so corners never merge across charts.
        let tag = Vec2::new(ci as f32, 0.0);
        let size = hi - lo;
        let swap = size.y > size.x;
        for (i, &f) in chart.faces().iter().enumerate() {
            let flat = chart.flatten(mesh, i);
            let face = mesh.face(f as usize);
            for k in 0..3 {
                let mut uv = flat[k] - lo;
                if swap {
                    uv = uv.swapped();
                }
                out[f as usize * 3 + k] = face
                    .vertex(k)
                    .with_uv(UvLayer::Diffuse, uv)
                    .with_uv(UvLayer::Lightmap, tag);
            }
        }
    }
    let mut indexer = MeshIndexer::with_capacity(out.len());
    for v in out {
        indexer.push(v);
    }
    indexer.finish()
}

struct ChartFrame {
    min: Vec2,
    size: Vec2,
    rotated: bool,
}

impl ChartFrame {
    /// Maps a chart UV into atlas units; tall charts are turned a quarter turn.
    fn place(&self, uv: Vec2, rect: &Rect, inset: f32) -> Vec2 {
        let l = uv - self.min;
        let l = if self.rotated {
            Vec2::new(l.y, self.size.x - l.x)
        } else {
            l
        };
        Vec2::new(rect.x + inset + l.x, rect.y + inset + l.y)
    }
}
