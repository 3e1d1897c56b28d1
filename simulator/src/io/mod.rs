//! Path-based image reading and writing.
//!
//! Thin layer over the `image` crate that hands the simulator numeric grids
//! and takes grids back. Float formats (EXR, Radiance HDR) are selected by file
//! extension.

use std::path::{Path, PathBuf};

use image::ImageError;
use log::debug;
use ndarray::Array3;
use thiserror::Error;

use crate::image_proc::image::{dynamic_image_to_grid, grid_to_dynamic_image};

/// Errors from reading or writing image files
#[derive(Debug, Error)]
pub enum ImageIoError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to decode {}: {source}", .path.display())]
    Decode { path: PathBuf, source: ImageError },

    #[error("Failed to encode {}: {source}", .path.display())]
    Encode { path: PathBuf, source: ImageError },

    #[error("Unsupported channel layout for {}: {channels} channels", .path.display())]
    UnsupportedLayout { path: PathBuf, channels: usize },
}

/// Whether the path names a floating point image format
pub fn is_float_format(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "exr" | "hdr"))
        .unwrap_or(false)
}

/// Read an image file into a `(height, width, channels)` grid of 0..255 values.
pub fn read_intensity_grid(path: &Path) -> Result<Array3<f64>, ImageIoError> {
    let img = image::open(path).map_err(|e| match e {
        ImageError::IoError(source) => ImageIoError::Io {
            path: path.to_path_buf(),
            source,
        },
        source => ImageIoError::Decode {
            path: path.to_path_buf(),
            source,
        },
    })?;

    debug!(
        "Decoded {} as {:?} ({}x{})",
        path.display(),
        img.color(),
        img.width(),
        img.height()
    );

    Ok(dynamic_image_to_grid(&img))
}

/// Write a grid of readings to an image file.
///
/// Readings are clamped to `[0, max_value]`. See
/// [`grid_to_dynamic_image`] for the pixel formats chosen.
pub fn write_grid(grid: &Array3<i64>, max_value: i64, path: &Path) -> Result<(), ImageIoError> {
    let img = grid_to_dynamic_image(grid, max_value, is_float_format(path)).ok_or_else(|| {
        ImageIoError::UnsupportedLayout {
            path: path.to_path_buf(),
            channels: grid.dim().2,
        }
    })?;

    img.save(path).map_err(|e| match e {
        ImageError::IoError(source) => ImageIoError::Io {
            path: path.to_path_buf(),
            source,
        },
        source => ImageIoError::Encode {
            path: path.to_path_buf(),
            source,
        },
    })
}
