//! CPU raycast previews of a grid level.

use glam::Vec3;
use image::RgbaImage;
use rayon::prelude::*;
use voxelizer_core::Occupancy;
use voxelizer_voxel::{raycast, GridStore};

use crate::camera::Camera;
use crate::screenshot::RenderError;

/// Preview image settings.
#[derive(Clone, Debug)]
pub struct PreviewConfig {
    pub width: u32,
    pub height: u32,
    /// Mip level to draw; 0 is the base grid.
    pub level: usize,
    pub camera: Camera,
    pub surface_color: [u8; 3],
    pub interior_color: [u8; 3],
    pub background: [u8; 4],
    /// Direction towards the light.
    pub light_dir: Vec3,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            level: 0,
            camera: Camera::orbit(Vec3::ZERO, 3.5, 0.6, 0.45, 1.0),
            surface_color: [220, 180, 120],
            interior_color: [120, 160, 220],
            background: [24, 24, 32, 255],
            light_dir: Vec3::new(0.4, 0.8, 0.45),
        }
    }
}

impl PreviewConfig {
    pub fn new(width: u32, height: u32) -> Self {
        let mut config = Self {
            width,
            height,
            ..Default::default()
        };
        config.camera.set_aspect(width as f32 / height.max(1) as f32);
        config
    }

    pub fn with_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }
}

/// Render one level of `grid` with Lambert shading.
#[cfg_attr(feature = "profiling-tracy", tracing::instrument(level = "trace", skip_all))]
pub fn render_preview(grid: &GridStore, config: &PreviewConfig) -> Result<RgbaImage, RenderError> {
    let level = grid.level(config.level).ok_or(RenderError::InvalidLevel {
        level: config.level,
        levels: grid.level_count(),
    })?;
    let (width, height) = (config.width, config.height);
    let light = config.light_dir.normalize_or_zero();
    let row_bytes = width as usize * 4;

    let mut pixels = vec![0u8; row_bytes * height as usize];
    if row_bytes > 0 {
        pixels
            .par_chunks_mut(row_bytes)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                    let ray = config.camera.primary_ray(x as u32, y as u32, width, height);
                    let color = match raycast(&level, &ray) {
                        Some(hit) => {
                            let base = match hit.occupancy {
                                Occupancy::Interior => config.interior_color,
                                _ => config.surface_color,
                            };
                            shade(base, hit.normal, light)
                        }
                        None => config.background,
                    };
                    pixel.copy_from_slice(&color);
                }
            });
    }

    tracing::debug!(width, height, level = config.level, "rendered preview");
    RgbaImage::from_raw(width, height, pixels).ok_or(RenderError::InvalidImageData)
}

fn shade(color: [u8; 3], normal: Vec3, light: Vec3) -> [u8; 4] {
    let lambert = if normal == Vec3::ZERO {
        1.0
    } else {
        0.25 + 0.75 * normal.dot(light).max(0.0)
    };
    let [r, g, b] = color.map(|c| (f32::from(c) * lambert).round().clamp(0.0, 255.0) as u8);
    [r, g, b, 255]
}
