//! Image processing module for the camera noise simulator
//!
//! Converts between decoded images and numeric grids, and between rendered
//! intensities and the irradiance the sensor model consumes.

pub mod image;
pub mod scaling;

// Re-export key functionality for easier access
pub use image::{dynamic_image_to_grid, grid_to_dynamic_image, linear_to_srgb, srgb_to_linear};
pub use scaling::{intensity_from_irradiance, irradiance_from_intensity};
