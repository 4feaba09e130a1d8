//! Triangle projection onto axis-aligned grid planes.
//!
//! A triangle is projected along one principal axis `w` onto the `(u, v)`
//! plane spanned by the other two. Coverage tests work on grid-space
//! coordinates where cell `i` spans `[i, i + 1]`.

use glam::{Vec2, Vec3};
use voxelizer_core::Axis;

/// Axis along which a triangle with this normal has the largest projected area.
///
/// Ties prefer Z, then Y.
#[inline]
pub fn dominant_axis(normal: Vec3) -> Axis {
    let n = normal.abs();
    if n.z >= n.x && n.z >= n.y {
        Axis::Z
    } else if n.y >= n.x {
        Axis::Y
    } else {
        Axis::X
    }
}

/// Unnormalized geometric normal `(v1 - v0) x (v2 - v0)`.
#[inline]
pub fn triangle_normal(triangle: &[Vec3; 3]) -> Vec3 {
    (triangle[1] - triangle[0]).cross(triangle[2] - triangle[0])
}

/// Cells whose closed extent `[i, i + 1]` intersects `[lo, hi]`, clamped to `[0, side)`.
///
/// A bound lying exactly on a cell boundary selects both neighbours.
pub fn cell_span(lo: f32, hi: f32, side: u32) -> Option<(u32, u32)> {
    let extent = side as f32;
    if lo.is_nan() || hi.is_nan() || lo > hi || hi < 0.0 || lo > extent {
        return None;
    }
    let first = (lo.ceil() - 1.0).max(0.0) as u32;
    let last = hi.floor().min(extent - 1.0) as u32;
    (first <= last).then_some((first, last))
}

/// Inclusive rectangle of cells in a projection plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRect {
    pub min: [u32; 2],
    pub max: [u32; 2],
}

impl CellRect {
    /// Cells in row-major `(u, v)` order.
    pub fn cells(self) -> impl Iterator<Item = (u32, u32)> {
        (self.min[1]..=self.max[1])
            .flat_map(move |v| (self.min[0]..=self.max[0]).map(move |u| (u, v)))
    }
}

#[derive(Clone, Copy, Debug)]
struct Edge {
    normal: Vec2,
    offset: f32,
    /// Half the support of a unit cell square along `normal`.
    dilation: f32,
}

impl Edge {
    fn new(from: Vec2, to: Vec2) -> Self {
        let d = to - from;
        let normal = Vec2::new(-d.y, d.x);
        Self {
            normal,
            offset: -normal.dot(from),
            dilation: 0.5 * (normal.x.abs() + normal.y.abs()),
        }
    }

    #[inline]
    fn eval(&self, p: Vec2) -> f32 {
        self.normal.dot(p) + self.offset
    }
}

/// A non-degenerate triangle projected along one axis.
///
/// Corners are stored counter-clockwise in `(u, v)`, so the interior lies
/// left of each edge.
#[derive(Clone, Copy, Debug)]
pub struct TriangleProjection {
    axis: Axis,
    corners: [Vec2; 3],
    edges: [Edge; 3],
    origin: Vec3,
    slope: Vec2,
    depth_bounds: (f32, f32),
    uv_min: Vec2,
    uv_max: Vec2,
}

impl TriangleProjection {
    /// Project a grid-space triangle along `axis`.
    ///
    /// Returns `None` when the triangle has no area seen along `axis`.
    pub fn new(triangle: [Vec3; 3], axis: Axis) -> Option<Self> {
        let normal = triangle_normal(&triangle);
        let w = axis.index();
        let (u, v) = axis.plane_axes();
        let n_w = normal[w];
        if n_w == 0.0 || !n_w.is_finite() {
            return None;
        }

        let to_uvw = |p: Vec3| Vec3::new(p[u], p[v], p[w]);
        let mut points = triangle.map(to_uvw);
        // In a right-handed (u, v, w) frame n_w is twice the signed projected area.
        if n_w < 0.0 {
            points.swap(1, 2);
        }
        let corners = points.map(|p| p.truncate());
        let edges = [
            Edge::new(corners[0], corners[1]),
            Edge::new(corners[1], corners[2]),
            Edge::new(corners[2], corners[0]),
        ];

        let slope = Vec2::new(-normal[u] / n_w, -normal[v] / n_w);
        let depths = points.map(|p| p.z);
        let depth_bounds = (
            depths[0].min(depths[1]).min(depths[2]),
            depths[0].max(depths[1]).max(depths[2]),
        );

        Some(Self {
            axis,
            corners,
            edges,
            origin: points[0],
            slope,
            depth_bounds,
            uv_min: corners[0].min(corners[1]).min(corners[2]),
            uv_max: corners[0].max(corners[1]).max(corners[2]),
        })
    }

    /// Project along the triangle's dominant axis.
    pub fn dominant(triangle: [Vec3; 3]) -> Option<Self> {
        Self::new(triangle, dominant_axis(triangle_normal(&triangle)))
    }

    /// Projection axis.
    #[inline]
    pub const fn axis(&self) -> Axis {
        self.axis
    }

    /// Cells of a `side x side` plane touched by the projected bounding box.
    pub fn footprint(&self, side: u32) -> Option<CellRect> {
        let (u0, u1) = cell_span(self.uv_min.x, self.uv_max.x, side)?;
        let (v0, v1) = cell_span(self.uv_min.y, self.uv_max.y, side)?;
        Some(CellRect {
            min: [u0, v0],
            max: [u1, v1],
        })
    }

    /// Whether the closed cell square `[u, u + 1] x [v, v + 1]` overlaps the projected triangle.
    pub fn covers_cell(&self, u: u32, v: u32) -> bool {
        let lo = Vec2::new(u as f32, v as f32);
        let hi = lo + Vec2::ONE;
        if self.uv_max.cmplt(lo).any() || self.uv_min.cmpgt(hi).any() {
            return false;
        }
        let center = lo + Vec2::splat(0.5);
        self.edges
            .iter()
            .all(|edge| edge.eval(center) + edge.dilation >= 0.0)
    }

    /// Whether `p` lies inside or on the projected triangle.
    pub fn contains_point(&self, p: Vec2) -> bool {
        self.edges.iter().all(|edge| edge.eval(p) >= 0.0)
    }

    /// Depth of the triangle's plane at a projected point.
    #[inline]
    pub fn depth_at(&self, p: Vec2) -> f32 {
        self.origin.z + self.slope.dot(p - self.origin.truncate())
    }

    /// Depth of the triangle nearest to the center of cell `(u, v)`.
    ///
    /// The plane depth at the center, clamped to the triangle's own depth
    /// bounds for cells covered only through the dilated edges.
    pub fn nearest_depth(&self, u: u32, v: u32) -> f32 {
        let center = Vec2::new(u as f32 + 0.5, v as f32 + 0.5);
        let (min, max) = self.depth_bounds;
        self.depth_at(center).clamp(min, max)
    }
}
