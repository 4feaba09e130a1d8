//! Triangle mesh input.
//!
//! The voxelizer never parses a file format: a loader (or one of the
//! procedural builders below) hands over vertices, triangle indices and a
//! bounding sphere used to place the mesh in the normalized voxelization cube.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::error::{Error, Result};
use crate::math::Aabb;

/// Interleaved vertex as laid out in the vertex buffer (24 byte stride).
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    /// Create a vertex from glam vectors
    #[inline]
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }

    /// Position as a glam vector
    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// Bounding sphere used to normalize mesh coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Create a new bounding sphere
    #[inline]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Sphere centered on the points' bounding box, reaching the farthest point.
    pub fn from_points(points: impl IntoIterator<Item = Vec3> + Clone) -> Self {
        let mut aabb = Aabb::empty();
        let mut any = false;
        for p in points.clone() {
            aabb.expand_to_include(p);
            any = true;
        }
        if !any {
            return Self::default();
        }

        let center = aabb.center();
        let radius = points
            .into_iter()
            .map(|p| p.distance(center))
            .fold(0.0_f32, f32::max);
        Self { center, radius }
    }
}

/// Indexed triangle mesh with a bounding sphere.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    bounds: BoundingSphere,
}

impl Mesh {
    /// Create a mesh from loader output.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>, bounds: BoundingSphere) -> Result<Self> {
        let mesh = Self {
            vertices,
            indices,
            bounds,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Create a mesh from bare positions, deriving normals and the bounding sphere.
    pub fn from_positions(positions: &[Vec3], indices: Vec<u32>) -> Result<Self> {
        let bounds = BoundingSphere::from_points(positions.iter().copied());
        let vertices = positions
            .iter()
            .map(|&p| Vertex::new(p, Vec3::ZERO))
            .collect();
        let mut mesh = Self::new(vertices, indices, bounds)?;
        mesh.recompute_normals();
        Ok(mesh)
    }

    /// Replace the bounding sphere (loaders may supply a looser one).
    #[must_use]
    pub fn with_bounds(mut self, bounds: BoundingSphere) -> Self {
        self.bounds = bounds;
        self
    }

    /// Check index ranges and the bounding sphere.
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        if let Some(&bad) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.vertices.len())
        {
            return Err(Error::InvalidMesh(format!(
                "index {bad} out of range for {} vertices",
                self.vertices.len()
            )));
        }
        if !self.bounds.radius.is_finite() || self.bounds.radius < 0.0 {
            return Err(Error::InvalidMesh(format!(
                "bounding radius {} is not a finite non-negative number",
                self.bounds.radius
            )));
        }
        if !self.bounds.center.is_finite() {
            return Err(Error::InvalidMesh("bounding center is not finite".into()));
        }
        Ok(())
    }

    /// Vertex buffer contents
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Index buffer contents
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Bounding sphere
    pub const fn bounds(&self) -> BoundingSphere {
        self.bounds
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Returns true if the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Corner positions of triangle `t`.
    #[inline]
    pub fn triangle(&self, t: usize) -> [Vec3; 3] {
        let base = t * 3;
        [
            self.vertices[self.indices[base] as usize].position(),
            self.vertices[self.indices[base + 1] as usize].position(),
            self.vertices[self.indices[base + 2] as usize].position(),
        ]
    }

    /// Recompute smooth vertex normals by area-weighted face normal accumulation.
    pub fn recompute_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertices.len()];
        for t in 0..self.triangle_count() {
            let [a, b, c] = self.triangle(t);
            let face = (b - a).cross(c - a);
            for k in 0..3 {
                accum[self.indices[t * 3 + k] as usize] += face;
            }
        }
        for (vertex, n) in self.vertices.iter_mut().zip(accum) {
            vertex.normal = n.normalize_or_zero().to_array();
        }
    }

    /// Axis-aligned cube centered at the origin (24 vertices, 12 triangles).
    ///
    /// The bounding sphere is the circumscribed sphere `half_extent * sqrt(3)`.
    pub fn cube(half_extent: f32) -> Self {
        let h = half_extent;
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for axis in crate::types::Axis::ALL {
            let (u, v) = axis.plane_axes();
            let w = axis.index();
            for sign in [1.0_f32, -1.0] {
                let mut normal = Vec3::ZERO;
                normal[w] = sign;
                let mut corners = [(-h, -h), (h, -h), (h, h), (-h, h)];
                if sign < 0.0 {
                    corners.reverse();
                }

                let base = vertices.len() as u32;
                for (cu, cv) in corners {
                    let mut p = Vec3::ZERO;
                    p[u] = cu;
                    p[v] = cv;
                    p[w] = sign * h;
                    vertices.push(Vertex::new(p, normal));
                }
                indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
            }
        }

        Self {
            vertices,
            indices,
            bounds: BoundingSphere::new(Vec3::ZERO, h * 3.0_f32.sqrt()),
        }
    }

    /// Closed UV sphere with shared seam and pole vertices.
    pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        vertices.push(Vertex::new(Vec3::Y * radius, Vec3::Y));
        for r in 1..rings {
            let theta = std::f32::consts::PI * r as f32 / rings as f32;
            for s in 0..segments {
                let phi = std::f32::consts::TAU * s as f32 / segments as f32;
                let n = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                vertices.push(Vertex::new(n * radius, n));
            }
        }
        let south = vertices.len() as u32;
        vertices.push(Vertex::new(Vec3::NEG_Y * radius, Vec3::NEG_Y));

        let ring = |r: u32, s: u32| 1 + (r - 1) * segments + (s % segments);
        for s in 0..segments {
            indices.extend_from_slice(&[0, ring(1, s + 1), ring(1, s)]);
        }
        for r in 1..rings - 1 {
            for s in 0..segments {
                let (a, b) = (ring(r, s), ring(r, s + 1));
                let (c, d) = (ring(r + 1, s), ring(r + 1, s + 1));
                indices.extend_from_slice(&[a, b, d, a, d, c]);
            }
        }
        for s in 0..segments {
            indices.extend_from_slice(&[ring(rings - 1, s), ring(rings - 1, s + 1), south]);
        }

        Self {
            vertices,
            indices,
            bounds: BoundingSphere::new(Vec3::ZERO, radius),
        }
    }

    /// Closed torus around the Y axis.
    pub fn torus(major_radius: f32, minor_radius: f32, segments: u32, sides: u32) -> Self {
        let segments = segments.max(3);
        let sides = sides.max(3);
        let mut vertices = Vec::with_capacity((segments * sides) as usize);
        let mut indices = Vec::with_capacity((segments * sides * 6) as usize);

        for i in 0..segments {
            let u = std::f32::consts::TAU * i as f32 / segments as f32;
            let ring_center = Vec3::new(u.cos(), 0.0, u.sin()) * major_radius;
            for j in 0..sides {
                let v = std::f32::consts::TAU * j as f32 / sides as f32;
                let n = Vec3::new(v.cos() * u.cos(), v.sin(), v.cos() * u.sin());
                vertices.push(Vertex::new(ring_center + n * minor_radius, n));
            }
        }

        let index = |i: u32, j: u32| (i % segments) * sides + (j % sides);
        for i in 0..segments {
            for j in 0..sides {
                let a = index(i, j);
                let b = index(i + 1, j);
                let c = index(i + 1, j + 1);
                let d = index(i, j + 1);
                indices.extend_from_slice(&[a, c, b, a, d, c]);
            }
        }

        Self {
            vertices,
            indices,
            bounds: BoundingSphere::new(Vec3::ZERO, major_radius + minor_radius),
        }
    }

    /// Regular tetrahedron inscribed in a sphere of the given radius.
    pub fn tetrahedron(radius: f32) -> Self {
        let s = radius / 3.0_f32.sqrt();
        let corners = [
            Vec3::new(s, s, s),
            Vec3::new(s, -s, -s),
            Vec3::new(-s, s, -s),
            Vec3::new(-s, -s, s),
        ];
        let mut vertices = Vec::with_capacity(12);
        let mut indices = Vec::with_capacity(12);
        for (a, b, c) in [(0, 1, 2), (0, 3, 1), (0, 2, 3), (1, 3, 2)] {
            let (pa, mut pb, mut pc) = (corners[a], corners[b], corners[c]);
            let mut normal = (pb - pa).cross(pc - pa);
            if normal.dot(pa + pb + pc) < 0.0 {
                std::mem::swap(&mut pb, &mut pc);
                normal = -normal;
            }
            let normal = normal.normalize();
            let base = vertices.len() as u32;
            vertices.extend([pa, pb, pc].map(|p| Vertex::new(p, normal)));
            indices.extend_from_slice(&[base, base + 1, base + 2]);
        }

        Self {
            vertices,
            indices,
            bounds: BoundingSphere::new(Vec3::ZERO, radius),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn signed_volume(mesh: &Mesh) -> f32 {
        (0..mesh.triangle_count())
            .map(|t| {
                let [a, b, c] = mesh.triangle(t);
                a.dot(b.cross(c)) / 6.0
            })
            .sum()
    }

    #[test]
    fn vertex_stride_matches_buffer_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
    }

    #[test]
    fn cube_is_closed_and_outward() {
        let cube = Mesh::cube(1.0);
        assert_eq!(cube.triangle_count(), 12);
        assert_relative_eq!(cube.bounds().radius, 3.0_f32.sqrt());
        assert_relative_eq!(signed_volume(&cube), 8.0, epsilon = 1e-4);
        cube.validate().unwrap();
    }

    #[test]
    fn procedural_meshes_have_positive_volume() {
        let sphere = Mesh::uv_sphere(1.0, 24, 12);
        assert!(signed_volume(&sphere) > 3.5);
        let torus = Mesh::torus(0.6, 0.25, 24, 12);
        assert!(signed_volume(&torus) > 0.0);
        let tetra = Mesh::tetrahedron(1.0);
        assert!(signed_volume(&tetra) > 0.0);
    }

    #[test]
    fn bounding_sphere_from_points() {
        let sphere = BoundingSphere::from_points([Vec3::new(-1.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)]);
        assert_eq!(sphere.center, Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(sphere.radius, 2.0);
        assert_eq!(BoundingSphere::from_points(Vec::<Vec3>::new()).radius, 0.0);
    }

    #[test]
    fn from_positions_derives_normals() {
        let mesh = Mesh::from_positions(&[Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]).unwrap();
        assert_eq!(mesh.vertices()[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn invalid_indices_are_rejected() {
        let vertices = vec![Vertex::default(); 3];
        let err = Mesh::new(vertices.clone(), vec![0, 1], BoundingSphere::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidMesh(_)));
        let err = Mesh::new(vertices, vec![0, 1, 3], BoundingSphere::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidMesh(_)));
    }

    #[test]
    fn negative_radius_is_rejected() {
        let bounds = BoundingSphere::new(Vec3::ZERO, -1.0);
        assert!(Mesh::new(Vec::new(), Vec::new(), bounds).is_err());
    }
}
