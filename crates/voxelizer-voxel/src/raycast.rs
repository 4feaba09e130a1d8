//! Ray queries against a grid level.
//!
//! Rays live in normalized space, where a level covers `[-1, 1]^3` regardless
//! of its side. Traversal is a 3D DDA (Amanatides & Woo).

use glam::{IVec3, Vec3};
use voxelizer_core::constants::NORMALIZED_EXTENT;
use voxelizer_core::math::{Aabb, Ray};
use voxelizer_core::{CellPos, Occupancy};

use crate::grid::GridLevel;

/// First occupied cell along a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Distance along the ray to the cell entry point.
    pub t: f32,
    /// Cell that was hit.
    pub cell: CellPos,
    /// Its classification.
    pub occupancy: Occupancy,
    /// Normal of the entered face, or zero when the ray starts inside the cell.
    pub normal: Vec3,
}

/// March `ray` through `level` and return the first occupied cell.
#[cfg_attr(feature = "profiling-tracy", tracing::instrument(level = "trace", skip_all))]
pub fn raycast(level: &GridLevel<'_>, ray: &Ray) -> Option<RayHit> {
    let (t_enter, t_exit) = Aabb::normalized_cube().intersect_ray(ray)?;
    let side = level.side() as i32;
    let cell_size = NORMALIZED_EXTENT / side as f32;

    let to_grid = |p: Vec3| (p + Vec3::ONE) / cell_size;
    let entry = to_grid(ray.at(t_enter));
    let mut cell = entry.floor().as_ivec3().clamp(IVec3::ZERO, IVec3::splat(side - 1));

    let dir = ray.direction;
    let step = IVec3::new(
        if dir.x >= 0.0 { 1 } else { -1 },
        if dir.y >= 0.0 { 1 } else { -1 },
        if dir.z >= 0.0 { 1 } else { -1 },
    );
    let inv = Vec3::ONE / dir;
    let t_delta = (inv * cell_size).abs();

    let next_boundary = (cell + step.max(IVec3::ZERO)).as_vec3() * cell_size - Vec3::ONE;
    let mut t_max = Vec3::new(
        axis_t(next_boundary.x, ray.origin.x, inv.x),
        axis_t(next_boundary.y, ray.origin.y, inv.y),
        axis_t(next_boundary.z, ray.origin.z, inv.z),
    );

    let mut t = t_enter;
    let mut normal = entry_normal(ray, t_enter);

    loop {
        let pos = CellPos::new(cell.x as u32, cell.y as u32, cell.z as u32);
        let occupancy = level.get(pos);
        if occupancy.is_occupied() {
            return Some(RayHit {
                t,
                cell: pos,
                occupancy,
                normal,
            });
        }

        let axis = if t_max.x < t_max.y && t_max.x < t_max.z {
            0
        } else if t_max.y < t_max.z {
            1
        } else {
            2
        };
        t = t_max[axis];
        if t > t_exit {
            return None;
        }
        cell[axis] += step[axis];
        if cell[axis] < 0 || cell[axis] >= side {
            return None;
        }
        t_max[axis] += t_delta[axis];
        normal = Vec3::ZERO;
        normal[axis] = -step[axis] as f32;
    }
}

#[inline]
fn axis_t(boundary: f32, origin: f32, inv: f32) -> f32 {
    if inv.is_finite() {
        (boundary - origin) * inv
    } else {
        f32::INFINITY
    }
}

/// Face of the normalized cube the ray enters through, or zero from inside.
fn entry_normal(ray: &Ray, t_enter: f32) -> Vec3 {
    if t_enter <= 0.0 {
        return Vec3::ZERO;
    }
    let p = ray.at(t_enter);
    let distance = Vec3::ONE - p.abs();
    let axis = if distance.x <= distance.y && distance.x <= distance.z {
        0
    } else if distance.y <= distance.z {
        1
    } else {
        2
    };
    let mut normal = Vec3::ZERO;
    normal[axis] = if p[axis] > 0.0 { 1.0 } else { -1.0 };
    normal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridStore;
    use approx::assert_relative_eq;

    fn grid_with(side: u32, cells: &[CellPos]) -> GridStore {
        let mut grid = GridStore::new(side).unwrap();
        let indices: Vec<usize> = cells.iter().map(|c| c.to_index(side)).collect();
        grid.replace_base(|i| {
            if indices.contains(&i) {
                Occupancy::Surface
            } else {
                Occupancy::Empty
            }
        });
        grid
    }

    #[test]
    fn hits_the_entry_face_of_a_full_grid() {
        let mut grid = GridStore::new(4).unwrap();
        grid.replace_base(|_| Occupancy::Interior);
        let ray = Ray::new(Vec3::new(-3.0, 0.1, 0.1), Vec3::X);
        let hit = raycast(&grid.base(), &ray).unwrap();
        assert_eq!(hit.cell, CellPos::new(0, 2, 2));
        assert_relative_eq!(hit.t, 2.0, epsilon = 1e-5);
        assert_eq!(hit.normal, Vec3::NEG_X);
        assert_eq!(hit.occupancy, Occupancy::Interior);
    }

    #[test]
    fn marches_to_a_distant_cell() {
        let grid = grid_with(8, &[CellPos::new(6, 1, 3)]);
        let target = CellPos::new(6, 1, 3).normalized_center(8);
        let origin = Vec3::new(target.x, target.y, 5.0);
        let ray = Ray::new(origin, Vec3::NEG_Z);
        let hit = raycast(&grid.base(), &ray).unwrap();
        assert_eq!(hit.cell, CellPos::new(6, 1, 3));
        assert_eq!(hit.normal, Vec3::Z);
        // Cell 3 spans z in [-0.25, 0.0]; its top face is at z = 0.
        assert_relative_eq!(hit.t, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn misses_empty_grids_and_the_cube() {
        let grid = GridStore::new(8).unwrap();
        let through = Ray::new(Vec3::new(-2.0, 0.3, -0.2), Vec3::new(1.0, 0.1, 0.05));
        assert!(raycast(&grid.base(), &through).is_none());

        let full = grid_with(2, &[CellPos::new(0, 0, 0)]);
        let away = Ray::new(Vec3::new(-2.0, 0.0, 0.0), Vec3::NEG_X);
        assert!(raycast(&full.base(), &away).is_none());
    }

    #[test]
    fn starts_inside_the_grid() {
        let grid = grid_with(4, &[CellPos::new(3, 1, 1)]);
        let ray = Ray::new(Vec3::new(-0.1, -0.3, -0.3), Vec3::X);
        let hit = raycast(&grid.base(), &ray).unwrap();
        assert_eq!(hit.cell, CellPos::new(3, 1, 1));
        assert_eq!(hit.normal, Vec3::NEG_X);
        assert_relative_eq!(hit.t, 0.6, epsilon = 1e-5);
    }
}
