//! Core voxel types.

/// Occupancy code stored per voxel.
///
/// Codes are ordered so that max-pooling keeps the strongest classification:
/// a coarse cell straddling the surface reports `Surface`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Occupancy {
    /// Outside the mesh
    #[default]
    Empty = 0,
    /// Strictly inside a closed mesh (solid mode only)
    Interior = 1,
    /// Touched by at least one triangle
    Surface = 2,
}

impl Occupancy {
    /// Raw code as stored in packed grids.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Decode a packed code. Unknown codes decode as `Empty`.
    #[inline]
    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Interior,
            2 => Self::Surface,
            _ => Self::Empty,
        }
    }

    /// Returns true if this voxel is occupied (surface or interior)
    #[inline]
    pub const fn is_occupied(self) -> bool {
        !matches!(self, Self::Empty)
    }
}

/// Principal axis used as a projection direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    /// All axes in component order.
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    /// Component index of this axis.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Component indices `(u, v)` spanning the plane perpendicular to this axis.
    ///
    /// The pair keeps a right-handed `(u, v, axis)` frame.
    #[inline]
    pub const fn plane_axes(self) -> (usize, usize) {
        match self {
            Self::X => (1, 2),
            Self::Y => (2, 0),
            Self::Z => (0, 1),
        }
    }
}
