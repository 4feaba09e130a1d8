//! Dense occupancy grid with a max-pooled mip pyramid.
//!
//! All levels live in one arena. Level 0 is the full-resolution grid and
//! level `i` has side `resolution >> i`. The base level is only ever replaced
//! wholesale by a voxelization pass; coarser levels are derived from it.

use rayon::prelude::*;
use voxelizer_core::constants::MAX_GRID_SIZE;
use voxelizer_core::error::try_alloc;
use voxelizer_core::{CellPos, Error, Occupancy, Result};

#[derive(Clone, Copy, Debug)]
struct LevelInfo {
    side: u32,
    offset: usize,
    len: usize,
}

/// Number of mip levels for a grid of the given resolution: `max(log2(n), 1)`.
#[inline]
pub const fn level_count_for(resolution: u32) -> usize {
    let levels = resolution.trailing_zeros() as usize;
    if levels == 0 {
        1
    } else {
        levels
    }
}

/// Occupancy pyramid owning every level.
#[derive(Debug)]
pub struct GridStore {
    resolution: u32,
    levels: Vec<LevelInfo>,
    cells: Vec<Occupancy>,
    occupied: Vec<usize>,
}

impl GridStore {
    /// Allocate an empty pyramid for a power-of-two resolution.
    pub fn new(resolution: u32) -> Result<Self> {
        validate_resolution(resolution)?;

        let mut levels = Vec::new();
        let mut offset = 0usize;
        for level in 0..level_count_for(resolution) {
            let side = resolution >> level;
            let len = (side as usize).pow(3);
            levels.push(LevelInfo { side, offset, len });
            offset += len;
        }

        let cells = try_alloc("occupancy grid", offset, Occupancy::Empty)?;
        let occupied = vec![0; levels.len()];

        Ok(Self {
            resolution,
            levels,
            cells,
            occupied,
        })
    }

    /// Side length of the base level.
    #[inline]
    pub const fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Number of levels in the pyramid, base included.
    #[inline]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Total bytes held by all levels.
    pub fn size_bytes(&self) -> usize {
        self.cells.len() * std::mem::size_of::<Occupancy>()
    }

    /// Borrow a level, or `None` past the coarsest one.
    pub fn level(&self, index: usize) -> Option<GridLevel<'_>> {
        let info = self.levels.get(index)?;
        Some(GridLevel {
            side: info.side,
            cells: &self.cells[info.offset..info.offset + info.len],
            occupied: self.occupied[index],
        })
    }

    /// Borrow the full-resolution level.
    pub fn base(&self) -> GridLevel<'_> {
        let info = self.levels[0];
        GridLevel {
            side: info.side,
            cells: &self.cells[..info.len],
            occupied: self.occupied[0],
        }
    }

    /// Cached occupied-cell count of a level (0 past the coarsest level).
    pub fn occupied_count(&self, level: usize) -> usize {
        self.occupied.get(level).copied().unwrap_or(0)
    }

    /// Replace the base level with `cell(index)` for every flat index, then rebuild the mips.
    #[cfg_attr(feature = "profiling-tracy", tracing::instrument(level = "trace", skip_all))]
    pub fn replace_base<F>(&mut self, cell: F)
    where
        F: Fn(usize) -> Occupancy + Sync,
    {
        let len = self.levels[0].len;
        self.cells[..len]
            .par_iter_mut()
            .enumerate()
            .for_each(|(index, out)| *out = cell(index));
        self.build_mips();
    }

    /// Regenerate every level above the base from the base and refresh the counts.
    #[cfg_attr(feature = "profiling-tracy", tracing::instrument(level = "trace", skip_all))]
    pub fn build_mips(&mut self) {
        for level in 1..self.levels.len() {
            let fine = self.levels[level - 1];
            let coarse = self.levels[level];
            let (head, tail) = self.cells.split_at_mut(coarse.offset);
            downsample_level_2x(
                &head[fine.offset..fine.offset + fine.len],
                fine.side as usize,
                &mut tail[..coarse.len],
            );
        }

        for (index, info) in self.levels.iter().enumerate() {
            self.occupied[index] = self.cells[info.offset..info.offset + info.len]
                .par_iter()
                .filter(|cell| cell.is_occupied())
                .count();
        }

        tracing::trace!(
            levels = self.levels.len(),
            base_occupied = self.occupied[0],
            "rebuilt mip pyramid"
        );
    }

    /// Reset every level to `Empty`.
    pub fn clear(&mut self) {
        self.cells.par_iter_mut().for_each(|cell| *cell = Occupancy::Empty);
        self.occupied.fill(0);
    }
}

fn validate_resolution(resolution: u32) -> Result<()> {
    if resolution == 0 || !resolution.is_power_of_two() {
        return Err(Error::InvalidConfig(format!(
            "grid resolution must be a power of two, got {resolution}"
        )));
    }
    if resolution > MAX_GRID_SIZE {
        return Err(Error::InvalidConfig(format!(
            "grid resolution {resolution} exceeds the maximum of {MAX_GRID_SIZE}"
        )));
    }
    Ok(())
}

/// Read-only view of one pyramid level.
#[derive(Clone, Copy, Debug)]
pub struct GridLevel<'a> {
    side: u32,
    cells: &'a [Occupancy],
    occupied: usize,
}

impl<'a> GridLevel<'a> {
    /// Side length of this level.
    #[inline]
    pub const fn side(&self) -> u32 {
        self.side
    }

    /// Occupancy at `pos`. Positions outside the level read as `Empty`.
    #[inline]
    pub fn get(&self, pos: CellPos) -> Occupancy {
        if pos.in_bounds(self.side) {
            self.cells[pos.to_index(self.side)]
        } else {
            Occupancy::Empty
        }
    }

    /// Flat x-fastest cell storage.
    #[inline]
    pub const fn cells(&self) -> &'a [Occupancy] {
        self.cells
    }

    /// Number of occupied cells.
    #[inline]
    pub const fn occupied_count(&self) -> usize {
        self.occupied
    }

    /// Number of cells classified exactly as `occupancy`.
    pub fn count(&self, occupancy: Occupancy) -> usize {
        self.cells.par_iter().filter(|&&cell| cell == occupancy).count()
    }

    /// Occupied cells in storage order.
    pub fn iter_occupied(&self) -> impl Iterator<Item = (CellPos, Occupancy)> + 'a {
        let side = self.side;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_occupied())
            .map(move |(index, &cell)| (CellPos::from_index(index, side), cell))
    }
}

/// Max-pool eight children into one coarse cell.
#[inline]
pub fn downsample_cell(children: &[Occupancy; 8]) -> Occupancy {
    children
        .iter()
        .copied()
        .max()
        .unwrap_or(Occupancy::Empty)
}

/// Downsample a dense level by 2x along each axis into `output`.
///
/// `output` must hold `(side / 2)^3` cells. Output z-slices are filled in parallel.
pub fn downsample_level_2x(input: &[Occupancy], side: usize, output: &mut [Occupancy]) {
    debug_assert!(side % 2 == 0, "input side must be even");
    let out_side = side / 2;
    debug_assert_eq!(input.len(), side * side * side);
    debug_assert_eq!(output.len(), out_side * out_side * out_side);

    output
        .par_chunks_mut(out_side * out_side)
        .enumerate()
        .for_each(|(z, slice)| {
            for y in 0..out_side {
                for x in 0..out_side {
                    let mut children = [Occupancy::Empty; 8];
                    for (i, child) in children.iter_mut().enumerate() {
                        let sx = x * 2 + (i & 1);
                        let sy = y * 2 + ((i >> 1) & 1);
                        let sz = z * 2 + ((i >> 2) & 1);
                        *child = input[sx + sy * side + sz * side * side];
                    }
                    slice[x + y * out_side] = downsample_cell(&children);
                }
            }
        });
}
