//! Conversion between rendered pixel intensity and sensor irradiance.
//!
//! A renderer that already applied the forward sensor gain produces intensity
//! `I = irradiance * quantum_efficiency * sensitivity`. Dividing by the same
//! gain recovers the expected photon count fed to the noise model.

use ndarray::{Array, ArrayBase, Data, Dimension};

use crate::hardware::sensor::SensorConfig;

/// Estimate irradiance (expected photons) from rendered intensity.
///
/// Elementwise `intensity / (quantum_efficiency * sensitivity)`. The gain is
/// strictly positive for any validated [`SensorConfig`].
pub fn irradiance_from_intensity<S, D>(
    intensity: &ArrayBase<S, D>,
    config: &SensorConfig,
) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let gain = config.gain();
    intensity.mapv(|v| v / gain)
}

/// Noise-free forward scaling, the inverse of [`irradiance_from_intensity`].
pub fn intensity_from_irradiance<S, D>(
    irradiance: &ArrayBase<S, D>,
    config: &SensorConfig,
) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let gain = config.gain();
    irradiance.mapv(|v| v * gain)
}
