//! Grid cell coordinates.

use glam::Vec3;

use crate::constants::NORMALIZED_EXTENT;

/// Integer cell position within a cubic grid level.
///
/// Flat storage is x-fastest: `x + y * side + z * side * side`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CellPos {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl CellPos {
    /// Create a new cell position
    #[inline]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Convert to linear index for flat array storage
    #[inline]
    pub const fn to_index(self, side: u32) -> usize {
        let side = side as usize;
        self.x as usize + (self.y as usize) * side + (self.z as usize) * side * side
    }

    /// Create from linear index
    #[inline]
    pub const fn from_index(index: usize, side: u32) -> Self {
        let side = side as usize;
        let x = (index % side) as u32;
        let y = ((index / side) % side) as u32;
        let z = (index / (side * side)) as u32;
        Self { x, y, z }
    }

    /// Returns true if the position lies inside a grid of the given side.
    #[inline]
    pub const fn in_bounds(self, side: u32) -> bool {
        self.x < side && self.y < side && self.z < side
    }

    /// Cell one mip level coarser that contains this cell.
    #[inline]
    pub const fn parent(self) -> Self {
        Self::new(self.x >> 1, self.y >> 1, self.z >> 1)
    }

    /// The eight cells one mip level finer covered by this cell.
    ///
    /// Child `i` has offset `(i & 1, (i >> 1) & 1, (i >> 2) & 1)`.
    pub fn children(self) -> [Self; 8] {
        std::array::from_fn(|i| {
            Self::new(
                (self.x << 1) | (i as u32 & 1),
                (self.y << 1) | ((i as u32 >> 1) & 1),
                (self.z << 1) | ((i as u32 >> 2) & 1),
            )
        })
    }

    /// Center of this cell in normalized `[-1, 1]^3` space for a level of the given side.
    #[inline]
    pub fn normalized_center(self, side: u32) -> Vec3 {
        let cell = NORMALIZED_EXTENT / side as f32;
        (self.to_vec3() + Vec3::splat(0.5)) * cell - Vec3::ONE
    }

    /// Convert to floating point Vec3
    #[inline]
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }
}
