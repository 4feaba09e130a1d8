//! Camera and view management.

use glam::{Mat4, Vec3, Vec4};
use voxelizer_core::math::Ray;

/// Perspective camera looking at the normalized voxel cube.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.5),
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    /// Create a new camera.
    pub fn new(position: Vec3, target: Vec3, up: Vec3, fov: f32, aspect: f32) -> Self {
        Self {
            position,
            direction: (target - position).normalize(),
            up,
            fov,
            aspect,
            ..Default::default()
        }
    }

    /// Camera circling `target` at `distance`.
    ///
    /// `yaw` turns around the Y axis starting from +Z, `pitch` raises the camera
    /// above the XZ plane. Both are in radians.
    pub fn orbit(target: Vec3, distance: f32, yaw: f32, pitch: f32, aspect: f32) -> Self {
        let offset = Vec3::new(
            pitch.cos() * yaw.sin(),
            pitch.sin(),
            pitch.cos() * yaw.cos(),
        ) * distance;
        Self::new(
            target + offset,
            target,
            Vec3::Y,
            std::f32::consts::FRAC_PI_4,
            aspect,
        )
    }

    /// Set the aspect ratio.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.direction, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    /// Get the view-projection matrix.
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space ray through the center of pixel `(x, y)` of a `width x height` image.
    ///
    /// Pixel rows run top to bottom.
    pub fn primary_ray(&self, x: u32, y: u32, width: u32, height: u32) -> Ray {
        let ndc_x = (x as f32 + 0.5) / width as f32 * 2.0 - 1.0;
        let ndc_y = 1.0 - (y as f32 + 0.5) / height as f32 * 2.0;
        let inverse = self.view_projection().inverse();
        let far = inverse * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let target = far.truncate() / far.w;
        Ray::new(self.position, target - self.position)
    }
}
