//! Partitioning of mesh faces into flattenable charts.

use std::collections::VecDeque;

use relight_geom::{Vec2, Vec3};

use crate::axis::Axis;
use crate::dcel::Dcel;
use crate::mesh::TriMesh;
use crate::vertex::UvLayer;

pub const DEFAULT_MAX_ANGLE_DEGREES: f32 = 45.0;

/// A set of faces flattened along one axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Chart {
    axis: Axis,
    normal: Vec3,
    faces: Vec<u32>,
}

impl Chart {
    #[inline]
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Representative unit normal.
    #[inline]
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    #[inline]
    pub fn faces(&self) -> &[u32] {
        &self.faces
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Corners of the chart's `i`-th face projected onto the chart axis.
    pub fn flatten(&self, mesh: &TriMesh, i: usize) -> [Vec2; 3] {
        mesh.face(self.faces[i] as usize).flatten(self.axis)
    }

    /// Bounding rectangle `(min, max)` of the flattened faces.
    pub fn flat_rect(&self, mesh: &TriMesh) -> (Vec2, Vec2) {
        bounds(
            (0..self.faces.len()).flat_map(|i| self.flatten(mesh, i)),
        )
    }

    /// Bounding rectangle `(min, max)` of the faces' coordinates in `layer`.
    pub fn uv_rect(&self, mesh: &TriMesh, layer: UvLayer) -> (Vec2, Vec2) {
        bounds(
            self.faces
                .iter()
                .flat_map(|&f| mesh.face(f as usize).uvs(layer)),
        )
    }
}

fn bounds(points: impl Iterator<Item = Vec2>) -> (Vec2, Vec2) {
    let mut lo = Vec2::new(f32::INFINITY, f32::INFINITY);
    let mut hi = Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
    for p in points {
        lo = lo.min(p);
        hi = hi.max(p);
    }
    if lo.x > hi.x {
        (Vec2::ZERO, Vec2::ZERO)
    } else {
        (lo, hi)
    }
}

/// Result of a chart builder: every face belongs to exactly one non-empty chart.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Charts {
    charts: Vec<Chart>,
    face_chart: Vec<u32>,
}

impl Charts {
    #[inline]
    pub fn len(&self) -> usize {
        self.charts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    #[inline]
    pub fn chart(&self, i: usize) -> &Chart {
        &self.charts[i]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chart> + '_ {
        self.charts.iter()
    }

    /// Index of the chart owning `face`.
    #[inline]
    pub fn chart_of(&self, face: usize) -> usize {
        self.face_chart[face] as usize
    }

    pub fn face_count(&self) -> usize {
        self.face_chart.len()
    }
}

pub trait ChartBuilder {
    fn build(&self, mesh: &TriMesh) -> Charts;
}

/// Buckets faces by the signed dominant axis of their normal, ignoring adjacency.
#[derive(Clone, Copy, Debug, Default)]
pub struct AxisChartBuilder;

impl ChartBuilder for AxisChartBuilder {
    fn build(&self, mesh: &TriMesh) -> Charts {
        let mut buckets: [Vec<u32>; 6] = Default::default();
        for face in mesh.faces() {
            let axis = Axis::dominant(face.normal());
            buckets[axis.index()].push(face.index() as u32);
        }

        let mut face_chart = vec![0u32; mesh.face_count()];
        let mut charts = Vec::new();
        for (axis, faces) in Axis::ALL.into_iter().zip(buckets) {
            if faces.is_empty() {
                continue;
            }
            for &f in &faces {
                face_chart[f as usize] = charts.len() as u32;
            }
            charts.push(Chart {
                axis,
                normal: axis.normal(),
                faces,
            });
        }
        log::debug!(
            "axis charts: {} faces -> {} charts",
            mesh.face_count(),
            charts.len()
        );
        Charts { charts, face_chart }
    }
}

/// Grows charts over edge adjacency while face normals stay within
/// `max_angle_degrees` of the chart's area-weighted average normal.
#[derive(Clone, Copy, Debug)]
pub struct AngleChartBuilder {
    pub max_angle_degrees: f32,
}

impl Default for AngleChartBuilder {
    fn default() -> Self {
        Self {
            max_angle_degrees: DEFAULT_MAX_ANGLE_DEGREES,
        }
    }
}

impl AngleChartBuilder {
    pub fn new(max_angle_degrees: f32) -> Self {
        Self { max_angle_degrees }
    }
}

const UNASSIGNED: u32 = u32::MAX;

impl ChartBuilder for AngleChartBuilder {
    fn build(&self, mesh: &TriMesh) -> Charts {
        let dcel = Dcel::build(mesh);
        let cos_max = self.max_angle_degrees.to_radians().cos();
        let face_count = mesh.face_count();

        let mut face_chart = vec![UNASSIGNED; face_count];
        let mut charts = Vec::new();
        let mut queue = VecDeque::new();

        for seed in 0..face_count {
            if face_chart[seed] != UNASSIGNED {
                continue;
            }
            let id = charts.len() as u32;
            let mut faces = vec![seed as u32];
            // Sum of normal * area over non-degenerate members.
            let mut weighted = area_weighted_normal(mesh, seed);
            face_chart[seed] = id;
            queue.clear();
            queue.push_back(seed as u32);

            while let Some(f) = queue.pop_front() {
                for n in dcel.neighbors(f) {
                    if face_chart[n as usize] != UNASSIGNED {
                        continue;
                    }
                    let face = mesh.face(n as usize);
                    let accept = face.is_degenerate()
                        || weighted.length_squared() == 0.0
                        || face.normal().dot(weighted.normalized()) >= cos_max;
                    if accept {
                        face_chart[n as usize] = id;
                        weighted += area_weighted_normal(mesh, n as usize);
                        faces.push(n);
                        queue.push_back(n);
                    }
                }
            }

            let normal = if weighted.length_squared() > 0.0 {
                weighted.normalized()
            } else {
                Vec3::UP
            };
            charts.push(Chart {
                axis: Axis::dominant(normal),
                normal,
                faces,
            });
        }

        log::debug!(
            "angle charts ({}deg): {} faces -> {} charts",
            self.max_angle_degrees,
            face_count,
            charts.len()
        );
        Charts { charts, face_chart }
    }
}

fn area_weighted_normal(mesh: &TriMesh, face: usize) -> Vec3 {
    let f = mesh.face(face);
    if f.is_degenerate() {
        Vec3::ZERO
    } else {
        f.normal() * f.area()
    }
}
