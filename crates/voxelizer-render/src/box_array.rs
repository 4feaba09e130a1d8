//! Box-array visualization: one cube instance per occupied cell.

use glam::{Mat4, Quat, Vec3};
use rayon::prelude::*;
use voxelizer_core::constants::NORMALIZED_EXTENT;
use voxelizer_core::{BoundingSphere, CellPos, Mesh, Result};
use voxelizer_voxel::{GridLevel, Normalization};

/// Corners of a unit cube centered at the origin. Corner `i` sits at
/// `(i & 1, (i >> 1) & 1, (i >> 2) & 1) - 0.5`.
pub const CUBE_VERTICES: [[f32; 3]; 8] = [
    [-0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5],
    [-0.5, 0.5, -0.5],
    [0.5, 0.5, -0.5],
    [-0.5, -0.5, 0.5],
    [0.5, -0.5, 0.5],
    [-0.5, 0.5, 0.5],
    [0.5, 0.5, 0.5],
];

/// Outward-facing, counter-clockwise triangles of [`CUBE_VERTICES`].
pub const CUBE_INDICES: [u16; 36] = [
    0, 2, 1, 1, 2, 3, // -z
    4, 5, 6, 5, 7, 6, // +z
    0, 4, 2, 2, 4, 6, // -x
    1, 3, 5, 3, 7, 5, // +x
    0, 1, 4, 1, 5, 4, // -y
    2, 6, 3, 3, 6, 7, // +y
];

/// Per-instance data: a cube at `center` with side `extent`, in normalized space.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BoxInstance {
    pub center: [f32; 3],
    pub extent: f32,
}

impl BoxInstance {
    /// Instance covering `pos` in a level of the given side.
    pub fn for_cell(pos: CellPos, side: u32) -> Self {
        Self {
            center: pos.normalized_center(side).to_array(),
            extent: NORMALIZED_EXTENT / side as f32,
        }
    }
}

/// Instance stream for one grid level.
#[derive(Clone, Debug, Default)]
pub struct BoxArray {
    side: u32,
    instances: Vec<BoxInstance>,
}

impl BoxArray {
    /// Collect one instance per occupied cell, in storage order.
    #[cfg_attr(feature = "profiling-tracy", tracing::instrument(level = "trace", skip_all))]
    pub fn from_level(level: &GridLevel<'_>) -> Self {
        let side = level.side();
        let instances: Vec<BoxInstance> = level
            .cells()
            .par_iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_occupied())
            .map(|(index, _)| BoxInstance::for_cell(CellPos::from_index(index, side), side))
            .collect();
        debug_assert_eq!(instances.len(), level.occupied_count());
        tracing::debug!(side, instances = instances.len(), "built box array");
        Self { side, instances }
    }

    /// Side of the level the instances were built from.
    pub const fn side(&self) -> u32 {
        self.side
    }

    pub fn instances(&self) -> &[BoxInstance] {
        &self.instances
    }

    /// Number of instances to draw.
    pub fn instance_count(&self) -> u32 {
        self.instances.len() as u32
    }

    /// Raw instance bytes for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }

    /// Matrix mapping normalized space back onto the mesh's own space.
    pub fn world_transform(bounds: BoundingSphere, normalization: Normalization) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(normalization.extent(bounds.radius)),
            Quat::IDENTITY,
            bounds.center,
        )
    }

    /// Expand the instances into a flat triangle mesh (8 vertices, 12 triangles per box).
    pub fn to_trimesh(&self) -> Result<Mesh> {
        let mut positions = Vec::with_capacity(self.instances.len() * CUBE_VERTICES.len());
        let mut indices = Vec::with_capacity(self.instances.len() * CUBE_INDICES.len());
        for instance in &self.instances {
            let base = positions.len() as u32;
            let center = Vec3::from(instance.center);
            positions.extend(
                CUBE_VERTICES
                    .iter()
                    .map(|&corner| center + Vec3::from(corner) * instance.extent),
            );
            indices.extend(CUBE_INDICES.iter().map(|&i| base + u32::from(i)));
        }
        Mesh::from_positions(&positions, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use voxelizer_core::Occupancy;
    use voxelizer_voxel::{GridStore, VoxelizeMode, Voxelizer, VoxelizerConfig};

    #[test]
    fn instance_layout() {
        assert_eq!(std::mem::size_of::<BoxInstance>(), 16);
    }

    #[test]
    fn cube_faces_point_outward() {
        for tri in CUBE_INDICES.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|k| Vec3::from(CUBE_VERTICES[tri[k] as usize]));
            let normal = (b - a).cross(c - a);
            assert!(normal.dot(a + b + c) > 0.0, "{tri:?}");
        }
    }

    #[test]
    fn instances_match_occupied_cells() {
        let mut grid = GridStore::new(4).unwrap();
        let targets = [CellPos::new(0, 0, 0), CellPos::new(3, 1, 2)];
        let indices = targets.map(|c| c.to_index(4));
        grid.replace_base(|i| {
            if indices.contains(&i) {
                Occupancy::Surface
            } else {
                Occupancy::Empty
            }
        });

        let boxes = BoxArray::from_level(&grid.base());
        assert_eq!(boxes.instance_count(), 2);
        assert_eq!(boxes.side(), 4);
        let first = boxes.instances()[0];
        assert_eq!(first.center, [-0.75, -0.75, -0.75]);
        assert_relative_eq!(first.extent, 0.5);
        assert_eq!(boxes.instances()[1].center, [0.75, -0.25, 0.25]);
        assert_eq!(boxes.as_bytes().len(), 32);

        let coarse = BoxArray::from_level(&grid.level(1).unwrap());
        assert_eq!(coarse.instance_count(), 2);
        assert_relative_eq!(coarse.instances()[0].extent, 1.0);
    }

    #[test]
    fn empty_level_emits_nothing() {
        let grid = GridStore::new(8).unwrap();
        let boxes = BoxArray::from_level(&grid.base());
        assert_eq!(boxes.instance_count(), 0);
        assert!(boxes.to_trimesh().unwrap().is_empty());
    }

    #[test]
    fn degenerate_meshes_voxelize_to_no_boxes() {
        let flat = [Vec3::ZERO, Vec3::ONE, Vec3::splat(2.0)];
        let meshes = [
            Mesh::from_positions(&[], Vec::new()).unwrap(),
            Mesh::from_positions(&flat, vec![0, 1, 2]).unwrap(),
        ];
        let config = VoxelizerConfig::new(16).with_mode(VoxelizeMode::Solid);
        for mesh in &meshes {
            let mut voxelizer = Voxelizer::new(config.clone()).unwrap();
            voxelizer.voxelize(mesh);
            let grid = voxelizer.grid();
            assert_eq!(BoxArray::from_level(&grid.base()).instance_count(), 0);
            for level in 0..grid.level_count() {
                let boxes = BoxArray::from_level(&grid.level(level).unwrap());
                assert_eq!(boxes.instance_count(), 0, "level {level}");
            }
        }
    }

    #[test]
    fn trimesh_encloses_the_boxes() {
        let mut grid = GridStore::new(2).unwrap();
        grid.replace_base(|i| {
            if i % 2 == 0 {
                Occupancy::Interior
            } else {
                Occupancy::Empty
            }
        });
        let boxes = BoxArray::from_level(&grid.base());
        let mesh = boxes.to_trimesh().unwrap();
        assert_eq!(mesh.triangle_count(), 12 * 4);
        assert_eq!(mesh.vertices().len(), 8 * 4);

        let volume: f32 = (0..mesh.triangle_count())
            .map(|t| {
                let [a, b, c] = mesh.triangle(t);
                a.dot(b.cross(c)) / 6.0
            })
            .sum();
        assert_relative_eq!(volume, 4.0, epsilon = 1e-4);
    }

    #[test]
    fn world_transform_restores_mesh_space() {
        let bounds = BoundingSphere::new(Vec3::new(1.0, 2.0, 3.0), 2.0);
        let m = BoxArray::world_transform(bounds, Normalization::BoundingSphere);
        let p = m.transform_point3(Vec3::new(1.0, 0.0, -1.0));
        assert_relative_eq!(p.x, 3.0);
        assert_relative_eq!(p.y, 2.0);
        assert_relative_eq!(p.z, 1.0);

        let inscribed = BoxArray::world_transform(bounds, Normalization::InscribedCube);
        let q = inscribed.transform_point3(Vec3::X);
        assert_relative_eq!(q.x, 1.0 + 2.0 / 3.0_f32.sqrt(), epsilon = 1e-6);
    }
}
