//! Screenshot output.

use std::path::{Path, PathBuf};

use image::{ImageBuffer, Rgba};
use thiserror::Error;
use tracing::info;

/// Errors that can occur while rendering or saving previews.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Requested mip level does not exist.
    #[error("Invalid level {level}: grid has {levels} levels")]
    InvalidLevel { level: usize, levels: usize },

    /// Pixel data was the wrong size for the dimensions.
    #[error("Invalid image data")]
    InvalidImageData,

    /// Image encoding failed.
    #[error("Failed to save image: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output path for a frame, replacing `{}` in `pattern` with the frame number.
pub fn output_path(pattern: &str, frame: u64) -> PathBuf {
    PathBuf::from(pattern.replace("{}", &frame.to_string()))
}

/// Save RGBA pixel data (4 bytes per pixel) to an image file.
///
/// The format follows the path's extension. Missing parent directories are created.
pub fn save_png(
    data: Vec<u8>,
    width: u32,
    height: u32,
    path: impl AsRef<Path>,
) -> Result<(), RenderError> {
    let path = path.as_ref();

    let image = ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, data)
        .ok_or(RenderError::InvalidImageData)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    image.save(path)?;

    info!("Screenshot saved: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_substitutes_frame() {
        assert_eq!(output_path("frame_{}.png", 42), PathBuf::from("frame_42.png"));
        assert_eq!(output_path("still.png", 3), PathBuf::from("still.png"));
    }

    #[test]
    fn wrong_size_is_rejected() {
        let err = save_png(vec![0; 7], 2, 2, "unused.png").unwrap_err();
        assert!(matches!(err, RenderError::InvalidImageData));
    }

    #[test]
    fn writes_a_png() {
        let dir = std::env::temp_dir().join(format!("voxelizer-render-{}", std::process::id()));
        let path = dir.join("nested").join("shot.png");
        save_png(vec![255; 4 * 3 * 2], 3, 2, &path).unwrap();
        let loaded = image::open(&path).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (3, 2));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
