//! Error types for the voxelizer.

use thiserror::Error;

/// Workspace-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Grid or k-buffer allocation failed at the requested size
    #[error("Resource exhausted: {what} needs {bytes} bytes")]
    ResourceExhausted { what: &'static str, bytes: usize },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed mesh input
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Allocate a vector of `len` copies of `value`, reporting failure instead of aborting.
pub fn try_alloc<T: Clone>(what: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| Error::ResourceExhausted {
            what,
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
    data.resize(len, value);
    Ok(data)
}

/// Allocate a vector of `len` elements built by `make`, reporting failure instead of aborting.
pub fn try_alloc_with<T>(what: &'static str, len: usize, make: impl FnMut() -> T) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| Error::ResourceExhausted {
            what,
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
    data.resize_with(len, make);
    Ok(data)
}
