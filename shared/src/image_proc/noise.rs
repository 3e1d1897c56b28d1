//! Noise generation utilities for sensor simulation.
//!
//! Provides the two stochastic primitives a sensor model is built from:
//! - Poisson photon noise, replacing each expected count with a Poisson draw
//! - Additive zero-mean Gaussian noise, e.g. for thermal dark current
//!
//! Both operate elementwise on `ndarray` grids of any dimensionality. Cells
//! are visited in logical (row-major) order and every cell draws independently
//! from the caller-supplied generator, so a fixed seed reproduces the output
//! exactly regardless of the input's memory layout.

use ndarray::{Array, ArrayBase, Data, DataMut, Dimension, ShapeError};
use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};
use thiserror::Error;

/// Errors raised by the noise primitives
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NoiseError {
    #[error("Poisson mean {value} at flat index {index} is not a valid rate")]
    InvalidPoissonMean { index: usize, value: f64 },

    #[error("Gaussian standard deviation must be finite and non-negative, got {0}")]
    InvalidStdDev(f64),

    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Apply Poisson arrival statistics to an image of expected counts.
///
/// Each cell's value is used as the mean of an independent Poisson draw.
/// Cells with a mean of exactly zero yield zero without consuming entropy.
///
/// # Arguments
/// * `mean_image` - Expected counts per cell, all finite and non-negative
/// * `rng` - Generator the draws are taken from
///
/// # Returns
/// * `Ok(Array)` with the sampled counts, same shape as the input
/// * `Err(NoiseError::InvalidPoissonMean)` for the first negative, non-finite
///   or unrepresentably large mean
pub fn apply_poisson_photon_noise<S, D, R>(
    mean_image: &ArrayBase<S, D>,
    rng: &mut R,
) -> Result<Array<f64, D>, NoiseError>
where
    S: Data<Elem = f64>,
    D: Dimension,
    R: Rng + ?Sized,
{
    let samples = mean_image
        .iter()
        .enumerate()
        .map(|(index, &mean)| {
            if !mean.is_finite() || mean < 0.0 {
                return Err(NoiseError::InvalidPoissonMean { index, value: mean });
            }
            if mean == 0.0 {
                return Ok(0.0);
            }
            let poisson = Poisson::new(mean)
                .map_err(|_| NoiseError::InvalidPoissonMean { index, value: mean })?;
            Ok(poisson.sample(&mut *rng))
        })
        .collect::<Result<Vec<f64>, NoiseError>>()?;

    Ok(Array::from_shape_vec(mean_image.raw_dim(), samples)?)
}

/// Add independent zero-mean Gaussian noise to every cell in place.
///
/// A standard deviation of zero still consumes one draw per cell, which keeps
/// the generator's position a function of the grid shape alone.
pub fn add_gaussian_noise<S, D, R>(
    image: &mut ArrayBase<S, D>,
    std_dev: f64,
    rng: &mut R,
) -> Result<(), NoiseError>
where
    S: DataMut<Elem = f64>,
    D: Dimension,
    R: Rng + ?Sized,
{
    if !std_dev.is_finite() || std_dev < 0.0 {
        return Err(NoiseError::InvalidStdDev(std_dev));
    }
    let normal = Normal::new(0.0, std_dev).map_err(|_| NoiseError::InvalidStdDev(std_dev))?;

    image
        .iter_mut()
        .for_each(|pixel| *pixel += normal.sample(&mut *rng));

    Ok(())
}
