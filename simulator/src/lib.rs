//! Camera sensor noise simulation
//!
//! This crate turns rendered images into statistically realistic raw sensor
//! output. It provides the sensor noise model (shot noise, quantum efficiency,
//! dark current, quantization and saturation), the intensity/irradiance
//! scaling that feeds it, image file adapters and a batch driver for
//! processing whole directories.

pub mod batch;
pub mod hardware;
pub mod image_proc;
pub mod io;
pub mod shared_args;

// Re-exports for easier access
pub use batch::{run_batch, BatchOptions, BatchReport, FailurePolicy};
pub use hardware::sensor::{InvalidInput, SensorConfig, SensorParams};
pub use hardware::sensor_noise::{simulate, NoiseModelOptions, SensorNoiseModel};
pub use image_proc::scaling::{intensity_from_irradiance, irradiance_from_intensity};
