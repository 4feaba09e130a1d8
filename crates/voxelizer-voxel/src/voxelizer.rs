//! Voxelization pass orchestration.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use glam::{Mat4, Vec3};
use rayon::prelude::*;
use tracing::{debug, info, trace, warn};
use voxelizer_core::constants::{DEFAULT_GRID_SIZE, DEFAULT_KBUFFER_SLOTS, DEFAULT_MAX_PEEL_PASSES};
use voxelizer_core::error::try_alloc;
use voxelizer_core::{Error, Mesh, Occupancy, Result};

use crate::grid::GridStore;
use crate::kbuffer::KBuffer;
use crate::projection::TriangleProjection;
use crate::raster::{
    rasterize_surface, rasterize_union, record_crossings, resolve_interior, tessellate,
    ColumnParity, GridTransform, ScratchGrid,
};

/// Surface-only shell or filled solid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VoxelizeMode {
    #[default]
    Surface,
    Solid,
}

impl VoxelizeMode {
    /// The other mode.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Surface => Self::Solid,
            Self::Solid => Self::Surface,
        }
    }
}

impl fmt::Display for VoxelizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Surface => "surface",
            Self::Solid => "solid",
        })
    }
}

/// How triangles are projected for surface rasterization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProjectionMethod {
    /// One conservative pass along each triangle's dominant axis.
    #[default]
    DominantAxis,
    /// Large triangles are split first; each piece uses its own dominant axis.
    Tessellated,
    /// Center-sampled scan conversion along all three axes, unioned.
    AxisUnion,
}

impl ProjectionMethod {
    pub const ALL: [Self; 3] = [Self::DominantAxis, Self::Tessellated, Self::AxisUnion];

    /// Human-readable description.
    pub const fn label(self) -> &'static str {
        match self {
            Self::DominantAxis => "Axis-aligned projection of max projected area",
            Self::Tessellated => {
                "Tessellation for axis-aligned projection view of max projected area"
            }
            Self::AxisUnion => "Union of 3 axis-aligned projection views",
        }
    }

    /// Next method in cycling order.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::DominantAxis => Self::Tessellated,
            Self::Tessellated => Self::AxisUnion,
            Self::AxisUnion => Self::DominantAxis,
        }
    }
}

impl FromStr for ProjectionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dominant" | "dominant-axis" => Ok(Self::DominantAxis),
            "tessellated" | "tess" => Ok(Self::Tessellated),
            "union" | "axis-union" => Ok(Self::AxisUnion),
            other => Err(Error::InvalidConfig(format!(
                "unknown projection method '{other}' (expected dominant, tessellated or union)"
            ))),
        }
    }
}

/// How the bounding sphere maps mesh space onto the normalized cube `[-1, 1]^3`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Normalization {
    /// `(p - center) / radius`: the whole sphere fits in the grid.
    #[default]
    BoundingSphere,
    /// `(p - center) * sqrt(3) / radius`: the cube inscribed in the sphere fills the grid.
    InscribedCube,
}

impl Normalization {
    /// Mesh-space half-size of the region mapped onto the grid.
    pub fn extent(self, radius: f32) -> f32 {
        match self {
            Self::BoundingSphere => radius,
            Self::InscribedCube => radius / 3.0_f32.sqrt(),
        }
    }
}

impl FromStr for Normalization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sphere" => Ok(Self::BoundingSphere),
            "cube" => Ok(Self::InscribedCube),
            other => Err(Error::InvalidConfig(format!(
                "unknown normalization '{other}' (expected sphere or cube)"
            ))),
        }
    }
}

/// Voxelizer configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelizerConfig {
    /// Base grid side, a power of two.
    pub resolution: u32,
    /// Surface-only or solid.
    pub mode: VoxelizeMode,
    /// Surface rasterization variant.
    pub method: ProjectionMethod,
    /// Crossing slots per k-buffer column.
    pub kbuffer_slots: usize,
    /// Depth-peel passes before unresolved columns are given up on.
    pub max_peel_passes: u32,
    /// Longest edge, in cells, left unsplit by [`ProjectionMethod::Tessellated`].
    pub tessellation_edge: f32,
    /// Mesh-to-grid mapping.
    pub normalization: Normalization,
}

impl Default for VoxelizerConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_GRID_SIZE,
            mode: VoxelizeMode::default(),
            method: ProjectionMethod::default(),
            kbuffer_slots: DEFAULT_KBUFFER_SLOTS,
            max_peel_passes: DEFAULT_MAX_PEEL_PASSES,
            tessellation_edge: 2.0,
            normalization: Normalization::default(),
        }
    }
}

impl VoxelizerConfig {
    /// Create a config for the given resolution.
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution,
            ..Default::default()
        }
    }

    /// Set the voxelization mode.
    #[must_use]
    pub fn with_mode(mut self, mode: VoxelizeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the projection method.
    #[must_use]
    pub fn with_method(mut self, method: ProjectionMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the k-buffer slots per column.
    #[must_use]
    pub fn with_kbuffer_slots(mut self, slots: usize) -> Self {
        self.kbuffer_slots = slots;
        self
    }

    /// Set the depth-peel pass limit.
    #[must_use]
    pub fn with_max_peel_passes(mut self, passes: u32) -> Self {
        self.max_peel_passes = passes;
        self
    }

    /// Set the tessellation edge limit in cells.
    #[must_use]
    pub fn with_tessellation_edge(mut self, edge: f32) -> Self {
        self.tessellation_edge = edge;
        self
    }

    /// Set the normalization.
    #[must_use]
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Reject values no pass could run with.
    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 || !self.resolution.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "resolution must be a power of two, got {}",
                self.resolution
            )));
        }
        if self.resolution > voxelizer_core::constants::MAX_GRID_SIZE {
            return Err(Error::InvalidConfig(format!(
                "resolution {} exceeds the maximum of {}",
                self.resolution,
                voxelizer_core::constants::MAX_GRID_SIZE
            )));
        }
        if self.kbuffer_slots == 0 {
            return Err(Error::InvalidConfig("k-buffer slots must be at least 1".into()));
        }
        if self.max_peel_passes == 0 {
            return Err(Error::InvalidConfig("max peel passes must be at least 1".into()));
        }
        if !self.tessellation_edge.is_finite() || self.tessellation_edge <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "tessellation edge must be positive, got {}",
                self.tessellation_edge
            )));
        }
        Ok(())
    }
}

/// Statistics and quality warnings from one pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoxelizationReport {
    /// Triangles in the input mesh.
    pub triangles: usize,
    /// Zero-area triangles skipped by surface rasterization.
    pub skipped_triangles: usize,
    /// Base-level surface cells.
    pub surface_cells: usize,
    /// Base-level interior cells (solid mode).
    pub interior_cells: usize,
    /// Crossings consumed by interior resolution.
    pub crossings: u64,
    /// Depth-peel passes run (0 in surface mode).
    pub peel_passes: u32,
    /// Columns still overflowing when the pass limit was hit.
    pub unresolved_columns: usize,
    /// Columns with an odd crossing count, left unfilled past the last crossing.
    pub unpaired_columns: usize,
}

impl VoxelizationReport {
    /// Occupied base-level cells.
    pub const fn occupied_cells(&self) -> usize {
        self.surface_cells + self.interior_cells
    }

    /// Whether some columns may have an incorrect interior fill.
    pub const fn is_degraded(&self) -> bool {
        self.unresolved_columns > 0 || self.unpaired_columns > 0
    }
}

/// Owns the grid pyramid, k-buffer and scratch for one resolution.
///
/// Everything is allocated up front by [`Voxelizer::new`]; a pass never allocates
/// grid-sized memory.
#[derive(Debug)]
pub struct Voxelizer {
    config: VoxelizerConfig,
    grid: GridStore,
    scratch: ScratchGrid,
    kbuffer: KBuffer,
    columns: Vec<ColumnParity>,
    crossings: u64,
}

impl Voxelizer {
    /// Validate the config and allocate every buffer.
    pub fn new(config: VoxelizerConfig) -> Result<Self> {
        config.validate()?;
        let resolution = config.resolution;

        let grid = GridStore::new(resolution)?;
        let scratch = ScratchGrid::new(resolution)?;
        let kbuffer = KBuffer::new(resolution, config.kbuffer_slots)?;
        let columns = try_alloc("column parity", kbuffer.column_count(), ColumnParity::new())?;

        info!(
            resolution,
            levels = grid.level_count(),
            grid_bytes = grid.size_bytes(),
            kbuffer_slots = kbuffer.slots(),
            "allocated voxelizer"
        );

        Ok(Self {
            config,
            grid,
            scratch,
            kbuffer,
            columns,
            crossings: 0,
        })
    }

    /// Active configuration.
    pub const fn config(&self) -> &VoxelizerConfig {
        &self.config
    }

    /// Switch between surface and solid; takes effect on the next pass.
    pub fn set_mode(&mut self, mode: VoxelizeMode) {
        self.config.mode = mode;
    }

    /// Switch the projection method; takes effect on the next pass.
    pub fn set_method(&mut self, method: ProjectionMethod) {
        self.config.method = method;
    }

    /// Result of the last pass.
    pub const fn grid(&self) -> &GridStore {
        &self.grid
    }

    /// Crossings consumed by the last solid pass (0 after a surface pass).
    pub const fn kbuffer_crossings(&self) -> u64 {
        self.crossings
    }

    /// Crossings consumed in column `(x, y)` by the last solid pass.
    pub fn column_crossings(&self, x: u32, y: u32) -> Option<u32> {
        let side = self.config.resolution;
        (x < side && y < side).then(|| self.columns[self.kbuffer.column_index(x, y)].crossings)
    }

    /// Voxelize a mesh in its own space.
    pub fn voxelize(&mut self, mesh: &Mesh) -> VoxelizationReport {
        self.voxelize_transformed(mesh, Mat4::IDENTITY)
    }

    /// Voxelize a mesh after applying `model` to its vertices.
    ///
    /// The bounding sphere is carried through `model`, so rigid motions keep the
    /// mesh at the same grid scale. The base level is replaced and every mip rebuilt.
    #[cfg_attr(feature = "profiling-tracy", tracing::instrument(level = "trace", skip_all))]
    pub fn voxelize_transformed(&mut self, mesh: &Mesh, model: Mat4) -> VoxelizationReport {
        let start = Instant::now();
        let mut report = VoxelizationReport {
            triangles: mesh.triangle_count(),
            ..Default::default()
        };

        self.scratch.clear();
        self.crossings = 0;

        let triangles = self.grid_triangles(mesh, model);
        if triangles.is_empty() && !mesh.is_empty() {
            warn!(
                radius = mesh.bounds().radius,
                "degenerate bounding sphere, grid left empty"
            );
        }

        report.skipped_triangles = self.mark_surface(&triangles);
        if self.config.mode == VoxelizeMode::Solid {
            self.resolve_solid(&triangles, &mut report);
        }

        let scratch = &self.scratch;
        self.grid.replace_base(|index| scratch.get(index));

        let base = self.grid.base();
        report.surface_cells = base.count(Occupancy::Surface);
        report.interior_cells = base.count(Occupancy::Interior);
        self.crossings = report.crossings;

        if report.skipped_triangles > 0 {
            debug!(
                skipped = report.skipped_triangles,
                "skipped zero-area triangles"
            );
        }
        debug!(
            mode = %self.config.mode,
            method = ?self.config.method,
            triangles = report.triangles,
            surface = report.surface_cells,
            interior = report.interior_cells,
            crossings = report.crossings,
            passes = report.peel_passes,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "voxelization pass complete"
        );
        report
    }

    fn grid_triangles(&self, mesh: &Mesh, model: Mat4) -> Vec<[Vec3; 3]> {
        let bounds = mesh.bounds();
        let scale = model
            .x_axis
            .truncate()
            .length()
            .max(model.y_axis.truncate().length())
            .max(model.z_axis.truncate().length());
        let center = model.transform_point3(bounds.center);
        let extent = self.config.normalization.extent(bounds.radius * scale);

        let Some(transform) = GridTransform::new(center, extent, self.config.resolution) else {
            return Vec::new();
        };
        (0..mesh.triangle_count())
            .into_par_iter()
            .map(|t| {
                let world = mesh.triangle(t).map(|p| model.transform_point3(p));
                transform.triangle(world)
            })
            .collect()
    }

    /// Rasterize every triangle's surface cells. Returns the number skipped as degenerate.
    #[cfg_attr(feature = "profiling-tracy", tracing::instrument(level = "trace", skip_all))]
    fn mark_surface(&self, triangles: &[[Vec3; 3]]) -> usize {
        let scratch = &self.scratch;
        let edge = self.config.tessellation_edge;
        let method = self.config.method;

        triangles
            .par_iter()
            .map(|&tri| match method {
                ProjectionMethod::DominantAxis => match TriangleProjection::dominant(tri) {
                    Some(projection) => {
                        rasterize_surface(&projection, scratch);
                        false
                    }
                    None => true,
                },
                ProjectionMethod::Tessellated => {
                    if TriangleProjection::dominant(tri).is_none() {
                        return true;
                    }
                    let mut pieces = Vec::new();
                    tessellate(tri, edge, &mut pieces);
                    for piece in pieces {
                        if let Some(projection) = TriangleProjection::dominant(piece) {
                            rasterize_surface(&projection, scratch);
                        }
                    }
                    false
                }
                ProjectionMethod::AxisUnion => !rasterize_union(tri, scratch),
            })
            .filter(|&skipped| skipped)
            .count()
    }

    /// Depth-peel loop: gather crossings into the k-buffer and fill between pairs
    /// until no column overflows or the pass limit is reached.
    #[cfg_attr(feature = "profiling-tracy", tracing::instrument(level = "trace", skip_all))]
    fn resolve_solid(&mut self, triangles: &[[Vec3; 3]], report: &mut VoxelizationReport) {
        self.columns
            .par_iter_mut()
            .for_each(|state| *state = ColumnParity::new());

        let mut pending = self.columns.len();
        while report.peel_passes < self.config.max_peel_passes && pending > 0 {
            report.peel_passes += 1;
            self.kbuffer.clear();

            let kbuffer = &self.kbuffer;
            let columns = &self.columns;
            triangles.par_iter().enumerate().for_each(|(index, tri)| {
                record_crossings(index as u32, tri, kbuffer, columns);
            });

            let scratch = &self.scratch;
            self.columns
                .par_iter_mut()
                .enumerate()
                .for_each(|(column, state)| resolve_interior(column, state, kbuffer, scratch));

            pending = self.columns.par_iter().filter(|state| state.pending).count();
            trace!(pass = report.peel_passes, pending, "depth-peel pass");
        }

        report.crossings = self
            .columns
            .par_iter()
            .map(|state| u64::from(state.crossings))
            .sum();
        report.unresolved_columns = pending;
        report.unpaired_columns = self
            .columns
            .par_iter()
            .filter(|state| !state.pending && state.is_unpaired())
            .count();

        if report.unresolved_columns > 0 {
            warn!(
                columns = report.unresolved_columns,
                passes = report.peel_passes,
                slots = self.kbuffer.slots(),
                "depth peeling hit the pass limit, interior fill is incomplete for these columns"
            );
        }
        if report.unpaired_columns > 0 {
            warn!(
                columns = report.unpaired_columns,
                "odd crossing counts, mesh is likely not closed; trailing spans left empty"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = VoxelizerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resolution, 128);
        assert_eq!(config.kbuffer_slots, 8);
        assert_eq!(config.mode, VoxelizeMode::Surface);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let bad = [
            VoxelizerConfig::new(100),
            VoxelizerConfig::new(0),
            VoxelizerConfig::new(4096),
            VoxelizerConfig::new(8).with_kbuffer_slots(0),
            VoxelizerConfig::new(8).with_max_peel_passes(0),
            VoxelizerConfig::new(8).with_tessellation_edge(0.0),
            VoxelizerConfig::new(8).with_tessellation_edge(f32::NAN),
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
            assert!(Voxelizer::new(config).is_err());
        }
    }

    #[test]
    fn methods_cycle_and_parse() {
        let mut method = ProjectionMethod::DominantAxis;
        for _ in 0..3 {
            method = method.next();
        }
        assert_eq!(method, ProjectionMethod::DominantAxis);
        assert_eq!("union".parse::<ProjectionMethod>().unwrap(), ProjectionMethod::AxisUnion);
        assert!("sideways".parse::<ProjectionMethod>().is_err());
        assert_eq!("cube".parse::<Normalization>().unwrap(), Normalization::InscribedCube);
        assert_eq!(VoxelizeMode::Surface.toggled(), VoxelizeMode::Solid);
    }

    #[test]
    fn inscribed_cube_extent() {
        let radius = 3.0_f32.sqrt();
        assert_eq!(Normalization::InscribedCube.extent(radius), 1.0);
        assert_eq!(Normalization::BoundingSphere.extent(radius), radius);
    }

    #[test]
    fn mode_changes_apply_to_the_next_pass() {
        let mesh = Mesh::cube(1.0);
        let config = VoxelizerConfig::new(8).with_normalization(Normalization::InscribedCube);
        let mut voxelizer = Voxelizer::new(config).unwrap();

        let surface = voxelizer.voxelize(&mesh);
        assert_eq!(surface.interior_cells, 0);
        assert_eq!(voxelizer.kbuffer_crossings(), 0);

        voxelizer.set_mode(VoxelizeMode::Solid);
        let solid = voxelizer.voxelize(&mesh);
        assert_eq!(solid.occupied_cells(), 512);
        assert_eq!(voxelizer.kbuffer_crossings(), 2 * 64);
        assert_eq!(voxelizer.column_crossings(3, 4), Some(2));
        assert_eq!(voxelizer.column_crossings(8, 0), None);

        voxelizer.set_mode(VoxelizeMode::Surface);
        voxelizer.set_method(ProjectionMethod::AxisUnion);
        let union = voxelizer.voxelize(&mesh);
        assert_eq!(union.surface_cells, 296);
        assert_eq!(voxelizer.grid().occupied_count(0), 296);
    }

    #[test]
    fn degenerate_bounds_leave_the_grid_empty() {
        let points = [Vec3::ZERO; 3];
        let mesh = Mesh::from_positions(&points, vec![0, 1, 2]).unwrap();
        assert_eq!(mesh.bounds().radius, 0.0);

        let mut voxelizer = Voxelizer::new(VoxelizerConfig::new(4)).unwrap();
        let report = voxelizer.voxelize(&mesh);
        assert_eq!(report.triangles, 1);
        assert_eq!(report.occupied_cells(), 0);
        assert!(!report.is_degraded());
    }
}
