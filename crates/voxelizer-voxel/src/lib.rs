//! Mesh voxelization for the voxelizer workspace.
//!
//! The pipeline per pass:
//! 1. Triangles are mapped into grid space and rasterized conservatively along
//!    their dominant axis (or a tessellated / three-axis variant).
//! 2. In solid mode, z-crossings are gathered per column in a k-buffer, peeled
//!    in bounded passes, and cells between crossing pairs are filled.
//! 3. The base level replaces the previous one and the mip pyramid is rebuilt.

pub mod grid;
pub mod kbuffer;
pub mod projection;
pub mod raster;
pub mod raycast;
pub mod voxelizer;

pub use grid::{downsample_level_2x, GridLevel, GridStore};
pub use kbuffer::KBuffer;
pub use projection::{dominant_axis, TriangleProjection};
pub use raycast::{raycast, RayHit};
pub use voxelizer::{
    Normalization, ProjectionMethod, VoxelizationReport, Voxelizer, VoxelizerConfig,
    VoxelizeMode,
};
