//! Command line argument groups shared by the simulator binaries.
//!
//! Sensor constants resolve in three layers: reference defaults, then an
//! optional JSON file, then explicit flags.

use std::path::PathBuf;

use clap::Args;
use log::info;
use thiserror::Error;

use crate::batch::{BatchOptions, FailurePolicy};
use crate::hardware::sensor::{InvalidInput, SensorParams};
use crate::hardware::sensor_noise::{NoiseModelOptions, SensorNoiseModel};

/// Errors resolving the sensor configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load sensor config {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid sensor configuration: {0}")]
    Invalid(#[from] InvalidInput),
}

/// Sensor constant overrides
#[derive(Args, Debug, Clone, Default)]
pub struct SensorArgs {
    /// JSON file with sensor constants; missing fields keep reference values
    #[arg(long)]
    pub sensor_config: Option<PathBuf>,

    /// Quantum efficiency, in (0, 1]
    #[arg(long)]
    pub quantum_efficiency: Option<f64>,

    /// Sensitivity in ADU per electron
    #[arg(long)]
    pub sensitivity: Option<f64>,

    /// Dark noise standard deviation in electrons
    #[arg(long)]
    pub dark_noise: Option<f64>,

    /// Output bit depth
    #[arg(long)]
    pub bit_depth: Option<u32>,

    /// Constant offset added to every reading (ADU)
    #[arg(long)]
    pub baseline: Option<u32>,

    /// Keep negative readings instead of clamping them to zero
    #[arg(long)]
    pub no_lower_clamp: bool,
}

impl SensorArgs {
    /// Merge defaults, config file and flags into raw sensor constants
    pub fn to_params(&self) -> Result<SensorParams, ConfigError> {
        let mut params = match &self.sensor_config {
            Some(path) => {
                info!("Loading sensor config from {}", path.display());
                SensorParams::load_from_file(path).map_err(|source| ConfigError::Load {
                    path: path.clone(),
                    source,
                })?
            }
            None => SensorParams::default(),
        };

        if let Some(qe) = self.quantum_efficiency {
            params.quantum_efficiency = qe;
        }
        if let Some(sensitivity) = self.sensitivity {
            params.sensitivity = sensitivity;
        }
        if let Some(dark_noise) = self.dark_noise {
            params.dark_noise = dark_noise;
        }
        if let Some(bit_depth) = self.bit_depth {
            params.bit_depth = bit_depth;
        }
        if let Some(baseline) = self.baseline {
            params.baseline = baseline;
        }

        Ok(params)
    }

    /// Build the validated noise model
    pub fn to_model(&self) -> Result<SensorNoiseModel, ConfigError> {
        let config = self.to_params()?.validate()?;
        let options = NoiseModelOptions {
            clamp_negative: !self.no_lower_clamp,
        };
        Ok(SensorNoiseModel::with_options(config, options))
    }
}

/// Batch driver options
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Directory to scan for input images
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// File name suffix selecting input images
    #[arg(long, default_value = ".png")]
    pub suffix: String,

    /// Run seed for reproducible noise (random if omitted)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of worker threads
    #[arg(long, default_value_t = num_cpus::get())]
    pub jobs: usize,

    /// Stop at the first file that fails instead of skipping it
    #[arg(long)]
    pub fail_fast: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl BatchArgs {
    pub fn to_options(&self) -> BatchOptions {
        BatchOptions {
            dir: self.dir.clone(),
            suffix: self.suffix.clone(),
            seed: self.seed,
            failure_policy: if self.fail_fast {
                FailurePolicy::Abort
            } else {
                FailurePolicy::Continue
            },
            jobs: Some(self.jobs),
            show_progress: !self.no_progress,
        }
    }
}
