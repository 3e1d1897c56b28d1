//! Sensor configuration for the camera noise model
//!
//! A sensor is described by five physical constants. [`SensorParams`] is the
//! plain, serializable record used for config files and CLI overrides;
//! [`SensorConfig`] is the validated, immutable form the noise model accepts.

use std::path::Path;

use ndarray::ShapeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest supported output bit depth; keeps `max_value` well inside `i64`.
pub const MAX_BIT_DEPTH: u32 = 32;

/// Rejected configuration values or irradiance cells.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidInput {
    #[error("Quantum efficiency must be in (0, 1], got {0}")]
    QuantumEfficiency(f64),

    #[error("Sensitivity must be finite and positive, got {0}")]
    Sensitivity(f64),

    #[error("Bit depth must be between 1 and 32, got {0}")]
    BitDepth(u32),

    #[error("Dark noise must be finite and non-negative, got {0}")]
    DarkNoise(f64),

    #[error("Irradiance must be non-negative, got {value} at {index}")]
    NegativeIrradiance { index: String, value: f64 },

    #[error("Irradiance must be finite, got {value} at {index}")]
    NonFiniteIrradiance { index: String, value: f64 },

    #[error("Irradiance {value} at flat index {index} cannot be sampled")]
    UnsampleableIrradiance { index: usize, value: f64 },

    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Raw sensor constants, as read from a config file or the command line.
///
/// Defaults are the reference sensor the model was tuned against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorParams {
    /// Constant offset added to every reading (ADU)
    pub baseline: u32,
    /// ADU per electron
    pub sensitivity: f64,
    /// Output quantization in bits
    pub bit_depth: u32,
    /// Dark current standard deviation in electrons
    pub dark_noise: f64,
    /// Probability an incident photon yields a detected electron
    pub quantum_efficiency: f64,
}

impl Default for SensorParams {
    fn default() -> Self {
        Self {
            baseline: 0,
            sensitivity: 0.6,
            bit_depth: 8,
            dark_noise: 0.015,
            quantum_efficiency: 0.69,
        }
    }
}

impl SensorParams {
    /// Validate into an immutable [`SensorConfig`]
    pub fn validate(self) -> Result<SensorConfig, InvalidInput> {
        SensorConfig::try_from(self)
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Load from JSON file
    ///
    /// Missing fields take their reference defaults. The result is not yet
    /// validated.
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Validated sensor constants, fixed for the lifetime of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    baseline: u32,
    sensitivity: f64,
    bit_depth: u32,
    dark_noise: f64,
    quantum_efficiency: f64,
}

impl SensorConfig {
    /// Create a new sensor configuration, rejecting out-of-range constants
    ///
    /// # Arguments
    /// * `baseline` - Offset added to every reading (ADU)
    /// * `sensitivity` - ADU per electron, > 0
    /// * `bit_depth` - Output bits, 1..=32
    /// * `dark_noise` - Dark current sigma in electrons, >= 0
    /// * `quantum_efficiency` - Photon to electron probability, in (0, 1]
    pub fn new(
        baseline: u32,
        sensitivity: f64,
        bit_depth: u32,
        dark_noise: f64,
        quantum_efficiency: f64,
    ) -> Result<Self, InvalidInput> {
        // NaN fails every comparison so the negated range checks catch it
        if !(quantum_efficiency > 0.0 && quantum_efficiency <= 1.0) {
            return Err(InvalidInput::QuantumEfficiency(quantum_efficiency));
        }
        if !(sensitivity.is_finite() && sensitivity > 0.0) {
            return Err(InvalidInput::Sensitivity(sensitivity));
        }
        if !(1..=MAX_BIT_DEPTH).contains(&bit_depth) {
            return Err(InvalidInput::BitDepth(bit_depth));
        }
        if !(dark_noise.is_finite() && dark_noise >= 0.0) {
            return Err(InvalidInput::DarkNoise(dark_noise));
        }

        Ok(Self {
            baseline,
            sensitivity,
            bit_depth,
            dark_noise,
            quantum_efficiency,
        })
    }

    /// The reference sensor
    pub fn reference() -> Self {
        let p = SensorParams::default();
        Self {
            baseline: p.baseline,
            sensitivity: p.sensitivity,
            bit_depth: p.bit_depth,
            dark_noise: p.dark_noise,
            quantum_efficiency: p.quantum_efficiency,
        }
    }

    pub fn baseline(&self) -> u32 {
        self.baseline
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn bit_depth(&self) -> u32 {
        self.bit_depth
    }

    pub fn dark_noise(&self) -> f64 {
        self.dark_noise
    }

    pub fn quantum_efficiency(&self) -> f64 {
        self.quantum_efficiency
    }

    /// Largest representable reading, `2^bit_depth - 1`
    pub fn max_value(&self) -> i64 {
        (1i64 << self.bit_depth) - 1
    }

    /// Combined photon to ADU gain, `quantum_efficiency * sensitivity`
    pub fn gain(&self) -> f64 {
        self.quantum_efficiency * self.sensitivity
    }

    /// Convert back to the raw, serializable record
    pub fn params(&self) -> SensorParams {
        SensorParams {
            baseline: self.baseline,
            sensitivity: self.sensitivity,
            bit_depth: self.bit_depth,
            dark_noise: self.dark_noise,
            quantum_efficiency: self.quantum_efficiency,
        }
    }
}

impl TryFrom<SensorParams> for SensorConfig {
    type Error = InvalidInput;

    fn try_from(p: SensorParams) -> Result<Self, Self::Error> {
        Self::new(
            p.baseline,
            p.sensitivity,
            p.bit_depth,
            p.dark_noise,
            p.quantum_efficiency,
        )
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self::reference()
    }
}
