//! Bounded per-column crossing list.
//!
//! Each grid column (an `(x, y)` position looking down z) owns `K` slots that
//! keep the `K` smallest crossing keys inserted since the last clear, in
//! ascending order. Keys beyond the `K`th are dropped and flag the column as
//! overflowed so the caller can peel another layer.
//!
//! Insertion is lock-free: a key walks the slots with `fetch_min`, carrying the
//! displaced value forward, so concurrent writers never lose a key that belongs
//! in the first `K`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rayon::prelude::*;
use voxelizer_core::error::try_alloc_with;
use voxelizer_core::{Error, Result};

/// Slot value meaning "no crossing".
pub const EMPTY_KEY: u64 = u64::MAX;

/// Map an `f32` onto a `u32` whose unsigned order matches the float order.
#[inline]
pub fn ordered_depth_bits(depth: f32) -> u32 {
    let bits = depth.to_bits();
    if bits & 0x8000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000
    }
}

/// Inverse of [`ordered_depth_bits`].
#[inline]
pub fn depth_from_ordered_bits(bits: u32) -> f32 {
    if bits & 0x8000_0000 != 0 {
        f32::from_bits(bits & 0x7fff_ffff)
    } else {
        f32::from_bits(!bits)
    }
}

/// Pack a crossing depth and the index of the triangle that produced it.
///
/// The triangle index makes equal depths from different triangles distinct.
#[inline]
pub fn crossing_key(depth: f32, triangle: u32) -> u64 {
    (u64::from(ordered_depth_bits(depth)) << 32) | u64::from(triangle)
}

/// Depth stored in a crossing key.
#[inline]
pub fn key_depth(key: u64) -> f32 {
    depth_from_ordered_bits((key >> 32) as u32)
}

/// Triangle index stored in a crossing key.
#[cfg(test)]
const fn key_triangle(key: u64) -> u32 {
    key as u32
}

/// Fixed-capacity sorted crossing slots for every column of a square grid.
pub struct KBuffer {
    side: u32,
    slots: usize,
    keys: Vec<AtomicU64>,
    overflow: Vec<AtomicBool>,
}

impl KBuffer {
    /// Allocate a cleared buffer for a `side * side` column grid with `slots` per column.
    pub fn new(side: u32, slots: usize) -> Result<Self> {
        if slots == 0 {
            return Err(Error::InvalidConfig(
                "k-buffer needs at least one slot per column".into(),
            ));
        }
        let columns = (side as usize) * (side as usize);
        let len = columns.checked_mul(slots).ok_or(Error::ResourceExhausted {
            what: "k-buffer",
            bytes: usize::MAX,
        })?;

        let keys = try_alloc_with("k-buffer", len, || AtomicU64::new(EMPTY_KEY))?;
        let overflow = try_alloc_with("k-buffer overflow flags", columns, || {
            AtomicBool::new(false)
        })?;

        Ok(Self {
            side,
            slots,
            keys,
            overflow,
        })
    }

    /// Columns per side.
    #[inline]
    pub const fn side(&self) -> u32 {
        self.side
    }

    /// Slots per column.
    #[inline]
    pub const fn slots(&self) -> usize {
        self.slots
    }

    /// Total number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.overflow.len()
    }

    /// Flat column index for `(x, y)`.
    #[inline]
    pub const fn column_index(&self, x: u32, y: u32) -> usize {
        x as usize + y as usize * self.side as usize
    }

    /// Reset every slot to [`EMPTY_KEY`] and clear the overflow flags.
    #[cfg_attr(feature = "profiling-tracy", tracing::instrument(level = "trace", skip_all))]
    pub fn clear(&mut self) {
        self.keys
            .par_iter_mut()
            .for_each(|key| *key.get_mut() = EMPTY_KEY);
        self.overflow
            .par_iter_mut()
            .for_each(|flag| *flag.get_mut() = false);
    }

    /// Insert a key into a column, keeping the slots sorted.
    ///
    /// Returns `false` when some key (this one or a displaced one) fell off the end.
    pub fn insert(&self, column: usize, key: u64) -> bool {
        let base = column * self.slots;
        let mut carry = key;
        for slot in &self.keys[base..base + self.slots] {
            let previous = slot.fetch_min(carry, Ordering::AcqRel);
            if previous == EMPTY_KEY {
                return true;
            }
            carry = carry.max(previous);
        }
        self.overflow[column].store(true, Ordering::Release);
        false
    }

    /// Sorted keys currently stored in a column.
    pub fn column(&self, column: usize) -> impl Iterator<Item = u64> + '_ {
        let base = column * self.slots;
        self.keys[base..base + self.slots]
            .iter()
            .map(|slot| slot.load(Ordering::Acquire))
            .take_while(|&key| key != EMPTY_KEY)
    }

    /// Whether a column dropped keys since the last clear.
    #[inline]
    pub fn column_overflowed(&self, column: usize) -> bool {
        self.overflow[column].load(Ordering::Acquire)
    }

    /// Number of keys stored across all columns.
    pub fn crossing_count(&self) -> usize {
        self.keys
            .par_iter()
            .filter(|slot| slot.load(Ordering::Relaxed) != EMPTY_KEY)
            .count()
    }
}

impl std::fmt::Debug for KBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KBuffer")
            .field("side", &self.side)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}
