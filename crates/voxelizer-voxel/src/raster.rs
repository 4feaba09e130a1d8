//! Triangle rasterization into the base grid.
//!
//! Surface marking runs one logical worker per triangle and writes through
//! idempotent atomic `fetch_max`, so concurrent marks of the same cell never
//! conflict. Interior resolution runs one worker per column and only touches
//! that column's cells.

use std::sync::atomic::{AtomicU8, Ordering};

use glam::{Vec2, Vec3};
use rayon::prelude::*;
use voxelizer_core::error::try_alloc_with;
use voxelizer_core::{Axis, CellPos, Occupancy, Result};

use crate::kbuffer::{crossing_key, key_depth, KBuffer};
use crate::projection::{cell_span, triangle_normal, TriangleProjection};

/// Upper bound on recursive splits of a single triangle.
pub const MAX_TESSELLATION_DEPTH: u32 = 20;

/// Maps mesh-space points into grid space, where the normalized cube
/// `[-1, 1]^3` becomes `[0, resolution]^3`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridTransform {
    center: Vec3,
    scale: f32,
    half: f32,
}

impl GridTransform {
    /// Map the cube of half-size `extent` around `center` onto a grid of `resolution` cells.
    ///
    /// Returns `None` for a zero, negative or non-finite extent.
    pub fn new(center: Vec3, extent: f32, resolution: u32) -> Option<Self> {
        if !extent.is_finite() || extent <= 0.0 || !center.is_finite() {
            return None;
        }
        let half = resolution as f32 * 0.5;
        Some(Self {
            center,
            scale: half / extent,
            half,
        })
    }

    /// Grid-space position of a mesh-space point.
    #[inline]
    pub fn apply(&self, p: Vec3) -> Vec3 {
        (p - self.center) * self.scale + Vec3::splat(self.half)
    }

    /// Grid-space corners of a mesh-space triangle.
    #[inline]
    pub fn triangle(&self, triangle: [Vec3; 3]) -> [Vec3; 3] {
        triangle.map(|p| self.apply(p))
    }

    /// Grid cells per mesh-space unit.
    #[inline]
    pub const fn scale(&self) -> f32 {
        self.scale
    }
}

/// Base-level scratch written concurrently during a pass.
pub struct ScratchGrid {
    side: u32,
    cells: Vec<AtomicU8>,
}

impl ScratchGrid {
    /// Allocate an empty scratch level.
    pub fn new(side: u32) -> Result<Self> {
        let len = (side as usize).pow(3);
        let cells = try_alloc_with("base scratch", len, || AtomicU8::new(0))?;
        Ok(Self { side, cells })
    }

    #[inline]
    pub const fn side(&self) -> u32 {
        self.side
    }

    /// Reset every cell to `Empty`.
    pub fn clear(&mut self) {
        self.cells
            .par_iter_mut()
            .for_each(|cell| *cell.get_mut() = Occupancy::Empty.code());
    }

    /// Raise a cell to at least `occupancy`. Never downgrades `Surface`.
    #[inline]
    pub fn mark(&self, pos: CellPos, occupancy: Occupancy) {
        self.cells[pos.to_index(self.side)].fetch_max(occupancy.code(), Ordering::Relaxed);
    }

    /// Current classification of a flat index.
    #[inline]
    pub fn get(&self, index: usize) -> Occupancy {
        Occupancy::from_code(self.cells[index].load(Ordering::Relaxed))
    }

    /// Mark cells of column `(x, y)` whose centers lie in `[start, end)` as interior.
    pub fn fill_span(&self, x: u32, y: u32, start: f32, end: f32) {
        let first = (start - 0.5).ceil().max(0.0);
        let past = (end - 0.5).ceil().min(self.side as f32);
        if first >= past {
            return;
        }
        for z in first as u32..past as u32 {
            self.mark(CellPos::new(x, y, z), Occupancy::Interior);
        }
    }
}

impl std::fmt::Debug for ScratchGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchGrid")
            .field("side", &self.side)
            .finish_non_exhaustive()
    }
}

/// Cell at plane coordinates `(u, v)` and depth `w` for a projection axis.
#[inline]
fn cell_on_axis(axis: Axis, u: u32, v: u32, w: u32) -> CellPos {
    let mut coords = [0u32; 3];
    let (ua, va) = axis.plane_axes();
    coords[ua] = u;
    coords[va] = v;
    coords[axis.index()] = w;
    CellPos::new(coords[0], coords[1], coords[2])
}

/// Conservatively rasterize one projected triangle as surface cells.
///
/// Every cell whose square overlaps the projected triangle is marked at the
/// depth layer nearest the triangle. A depth exactly on a layer boundary marks
/// both neighbouring layers.
pub fn rasterize_surface(projection: &TriangleProjection, grid: &ScratchGrid) {
    let side = grid.side();
    let Some(rect) = projection.footprint(side) else {
        return;
    };
    for (u, v) in rect.cells() {
        if !projection.covers_cell(u, v) {
            continue;
        }
        let depth = projection.nearest_depth(u, v);
        if let Some((w0, w1)) = cell_span(depth, depth, side) {
            for w in w0..=w1 {
                grid.mark(cell_on_axis(projection.axis(), u, v, w), Occupancy::Surface);
            }
        }
    }
}

/// Scan-convert a triangle along all three axes with center sampling and mark the union.
///
/// Returns `false` when the triangle has no area along any axis.
pub fn rasterize_union(triangle: [Vec3; 3], grid: &ScratchGrid) -> bool {
    let side = grid.side();
    let mut any = false;
    for axis in Axis::ALL {
        let Some(projection) = TriangleProjection::new(triangle, axis) else {
            continue;
        };
        any = true;
        let Some(rect) = projection.footprint(side) else {
            continue;
        };
        for (u, v) in rect.cells() {
            let center = Vec2::new(u as f32 + 0.5, v as f32 + 0.5);
            if !projection.contains_point(center) {
                continue;
            }
            let depth = projection.depth_at(center);
            if let Some((w0, w1)) = cell_span(depth, depth, side) {
                for w in w0..=w1 {
                    grid.mark(cell_on_axis(axis, u, v, w), Occupancy::Surface);
                }
            }
        }
    }
    any
}

/// Split a triangle at the midpoint of its longest edge until every edge is at most `max_edge`.
pub fn tessellate(triangle: [Vec3; 3], max_edge: f32, out: &mut Vec<[Vec3; 3]>) {
    let mut stack = vec![(triangle, 0u32)];
    while let Some((tri, depth)) = stack.pop() {
        let lengths = [
            tri[0].distance_squared(tri[1]),
            tri[1].distance_squared(tri[2]),
            tri[2].distance_squared(tri[0]),
        ];
        let (longest, &length) = lengths
            .iter()
            .enumerate()
            .fold((0, &lengths[0]), |best, cur| if cur.1 > best.1 { cur } else { best });

        if length <= max_edge * max_edge || depth >= MAX_TESSELLATION_DEPTH {
            out.push(tri);
            continue;
        }

        let a = tri[longest];
        let b = tri[(longest + 1) % 3];
        let c = tri[(longest + 2) % 3];
        let mid = (a + b) * 0.5;
        stack.push(([a, mid, c], depth + 1));
        stack.push(([mid, b, c], depth + 1));
    }
}

/// `(b - a) x (p - a)`, evaluated from the lexicographically smaller endpoint.
///
/// Swapping `a` and `b` negates the result exactly, so an edge shared by two
/// triangles classifies every point identically for both.
#[inline]
fn edge_function(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    let cross = |from: Vec2, to: Vec2| {
        let d = to - from;
        let q = p - from;
        d.x * q.y - d.y * q.x
    };
    if a.x < b.x || (a.x == b.x && a.y <= b.y) {
        cross(a, b)
    } else {
        -cross(b, a)
    }
}

/// Top-left fill rule for a counter-clockwise edge with `y` up.
#[inline]
fn is_top_left(a: Vec2, b: Vec2) -> bool {
    let d = b - a;
    d.y < 0.0 || (d.y == 0.0 && d.x < 0.0)
}

/// Visit every column whose center the triangle crosses along z, with the crossing depth.
///
/// Column centers on a shared edge or vertex are claimed by exactly one of the
/// triangles meeting there, so a closed surface yields paired crossings.
/// Triangles seen edge-on from z produce no crossings.
pub fn crossing_columns(triangle: &[Vec3; 3], side: u32, mut visit: impl FnMut(u32, u32, f32)) {
    let normal = triangle_normal(triangle);
    if normal.z == 0.0 || !normal.z.is_finite() {
        return;
    }

    let mut corners = triangle.map(|p| p.truncate());
    if normal.z < 0.0 {
        corners.swap(1, 2);
    }
    let edges = [
        (corners[0], corners[1]),
        (corners[1], corners[2]),
        (corners[2], corners[0]),
    ];
    let top_left = edges.map(|(a, b)| is_top_left(a, b));
    let slope = Vec2::new(-normal.x / normal.z, -normal.y / normal.z);
    let origin = triangle[0];

    let min = corners[0].min(corners[1]).min(corners[2]) - Vec2::splat(0.5);
    let max = corners[0].max(corners[1]).max(corners[2]) - Vec2::splat(0.5);
    let last = side as f32 - 1.0;
    let (x0, x1) = (min.x.ceil().max(0.0), max.x.floor().min(last));
    let (y0, y1) = (min.y.ceil().max(0.0), max.y.floor().min(last));
    if x0 > x1 || y0 > y1 {
        return;
    }

    for y in y0 as u32..=y1 as u32 {
        for x in x0 as u32..=x1 as u32 {
            let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let inside = edges.iter().zip(top_left).all(|(&(a, b), top_left)| {
                let e = edge_function(a, b, center);
                e > 0.0 || (e == 0.0 && top_left)
            });
            if inside {
                let depth = origin.z + slope.dot(center - origin.truncate());
                visit(x, y, depth);
            }
        }
    }
}

/// Parity walk of one column, carried across depth-peel passes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColumnParity {
    /// Largest key consumed so far; later passes only accept larger keys.
    pub consumed: Option<u64>,
    /// Depth of an unmatched entry crossing.
    pub inside_from: Option<f32>,
    /// Crossings consumed so far.
    pub crossings: u32,
    /// Whether the column still has crossings the k-buffer could not hold.
    pub pending: bool,
}

impl ColumnParity {
    /// Fresh state for a new voxelization.
    pub const fn new() -> Self {
        Self {
            consumed: None,
            inside_from: None,
            crossings: 0,
            pending: true,
        }
    }

    /// Whether a key has not been consumed by an earlier pass.
    #[inline]
    pub fn accepts(&self, key: u64) -> bool {
        self.pending && self.consumed.map_or(true, |consumed| key > consumed)
    }

    /// Whether the column ended with an odd number of crossings.
    #[inline]
    pub const fn is_unpaired(&self) -> bool {
        self.inside_from.is_some()
    }
}

/// Insert a triangle's crossings into the k-buffer for columns still accepting keys.
///
/// Returns the number of keys offered.
pub fn record_crossings(
    triangle_index: u32,
    triangle: &[Vec3; 3],
    kbuffer: &KBuffer,
    columns: &[ColumnParity],
) -> usize {
    let mut offered = 0;
    crossing_columns(triangle, kbuffer.side(), |x, y, depth| {
        let column = kbuffer.column_index(x, y);
        let key = crossing_key(depth, triangle_index);
        if columns[column].accepts(key) {
            kbuffer.insert(column, key);
            offered += 1;
        }
    });
    offered
}

/// Consume the crossings currently held for `column` and fill the spans between pairs.
///
/// Cells whose centers lie between an entry and the following exit crossing
/// become interior unless already marked surface.
pub fn resolve_interior(
    column: usize,
    state: &mut ColumnParity,
    kbuffer: &KBuffer,
    grid: &ScratchGrid,
) {
    if !state.pending {
        return;
    }
    let side = kbuffer.side() as usize;
    let (x, y) = ((column % side) as u32, (column / side) as u32);

    for key in kbuffer.column(column) {
        let depth = key_depth(key);
        state.crossings += 1;
        state.consumed = Some(key);
        match state.inside_from.take() {
            None => state.inside_from = Some(depth),
            Some(start) => grid.fill_span(x, y, start, depth),
        }
    }
    state.pending = kbuffer.column_overflowed(column);
}
