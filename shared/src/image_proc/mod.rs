//! Image processing primitives shared across crates

pub mod noise;

pub use noise::{add_gaussian_noise, apply_poisson_photon_noise, NoiseError};
