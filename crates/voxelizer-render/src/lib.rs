//! Visualization of voxel grids.
//!
//! This crate provides:
//! - The box-array instance stream (one cube per occupied cell of a level)
//! - Orbit camera and view management
//! - CPU raycast previews of a grid level
//! - PNG screenshot output

pub mod box_array;
pub mod camera;
pub mod preview;
pub mod screenshot;

pub use box_array::{BoxArray, BoxInstance, CUBE_INDICES, CUBE_VERTICES};
pub use camera::Camera;
pub use preview::{render_preview, PreviewConfig};
pub use screenshot::{output_path, save_png, RenderError};
