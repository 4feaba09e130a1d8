//! Mesh sources for the viewer.

use std::path::Path;

use anyhow::Context;
use glam::Vec3;
use obj::{Obj, ObjData};
use tracing::info;
use voxelizer_core::Mesh;

use crate::args::{MeshKind, MeshSource};

/// Build or load the mesh to voxelize.
pub fn load_mesh(source: &MeshSource) -> anyhow::Result<Mesh> {
    let mesh = match source {
        MeshSource::Builtin(kind) => builtin(*kind),
        MeshSource::Obj(path) => load_obj(path)?,
    };
    info!(
        "Mesh: {} vertices, {} triangles, bounding radius {:.3}",
        mesh.vertices().len(),
        mesh.triangle_count(),
        mesh.bounds().radius
    );
    Ok(mesh)
}

fn builtin(kind: MeshKind) -> Mesh {
    match kind {
        MeshKind::Cube => Mesh::cube(1.0),
        MeshKind::Sphere => Mesh::uv_sphere(1.0, 48, 24),
        MeshKind::Torus => Mesh::torus(1.0, 0.35, 64, 32),
        MeshKind::Tetrahedron => Mesh::tetrahedron(1.0),
    }
}

/// Load a Wavefront OBJ file, fan-triangulating its polygons.
pub fn load_obj(path: &Path) -> anyhow::Result<Mesh> {
    let Obj {
        data: ObjData {
            position, objects, ..
        },
        ..
    } = Obj::load(path).with_context(|| format!("failed to load {}", path.display()))?;

    let positions: Vec<Vec3> = position.iter().copied().map(Vec3::from).collect();
    let mut indices = Vec::new();
    for poly in objects
        .iter()
        .flat_map(|object| &object.groups)
        .flat_map(|group| &group.polys)
    {
        let corners = poly
            .0
            .iter()
            .map(|tuple| u32::try_from(tuple.0))
            .collect::<Result<Vec<u32>, _>>()
            .context("vertex index does not fit in 32 bits")?;
        indices.extend(fan_triangulate(&corners));
    }

    info!("Loaded {}", path.display());
    Ok(Mesh::from_positions(&positions, indices)?)
}

/// Split a convex polygon into triangles sharing its first corner.
fn fan_triangulate(corners: &[u32]) -> Vec<u32> {
    let Some((&first, rest)) = corners.split_first() else {
        return Vec::new();
    };
    rest.windows(2)
        .flat_map(|pair| [first, pair[0], pair[1]])
        .collect()
}
