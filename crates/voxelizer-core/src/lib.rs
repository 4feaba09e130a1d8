//! Core types, math, and mesh input for the voxelizer.
//!
//! This crate provides the foundational types used throughout the workspace:
//! - Occupancy codes and projection axes
//! - Grid cell coordinates
//! - Mesh input (vertices, indices, bounding sphere) and procedural meshes
//! - Math utilities and error types

pub mod coords;
pub mod error;
pub mod math;
pub mod mesh;
pub mod types;

pub use coords::CellPos;
pub use error::{Error, Result};
pub use mesh::{BoundingSphere, Mesh, Vertex};
pub use types::{Axis, Occupancy};

/// Workspace-wide constants
pub mod constants {
    /// Default grid resolution per axis
    pub const DEFAULT_GRID_SIZE: u32 = 128;
    /// Largest accepted grid resolution per axis (1024^3 bytes = 1 GiB base level)
    pub const MAX_GRID_SIZE: u32 = 1024;
    /// Default k-buffer slots per column
    pub const DEFAULT_KBUFFER_SLOTS: usize = 8;
    /// Default upper bound on depth-peel passes
    pub const DEFAULT_MAX_PEEL_PASSES: u32 = 8;
    /// Extent of the normalized voxelization cube [-1, 1] per axis
    pub const NORMALIZED_EXTENT: f32 = 2.0;
}
