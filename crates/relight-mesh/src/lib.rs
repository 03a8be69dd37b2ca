//! Triangle meshes and lightmap UV generation.
//!
//! [`uv_gen::generate`] is the entry point: it charts a mesh, packs the charts
//! into an atlas and returns both a flat layout mesh and a copy of the input
//! carrying normalised lightmap coordinates in [`UvLayer::Lightmap`].
#![forbid(unsafe_code)]

pub mod axis;
pub mod chart;
pub mod dcel;
pub mod indexer;
pub mod mesh;
pub mod packer;
pub mod primitives;
pub mod uv_gen;
pub mod vertex;

pub use axis::Axis;
pub use chart::{AngleChartBuilder, AxisChartBuilder, Chart, ChartBuilder, Charts};
pub use dcel::{Dcel, Edge};
pub use indexer::{MeshIndexer, reindex};
pub use mesh::{Barycentric, Face, TriMesh};
pub use packer::{Rect, RectPacker};
pub use uv_gen::{UvAtlas, UvGenParams, generate};
pub use vertex::{UvLayer, Vertex};

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
    #[error("atlas grew to {width}x{height}, beyond the {max} unit limit")]
    SizingFailure { width: u32, height: u32, max: u32 },
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
}
