//! Hardware module for sensor configuration and noise modeling

pub mod sensor;
pub mod sensor_noise;

pub use sensor::{InvalidInput, SensorConfig, SensorParams};
pub use sensor_noise::{simulate, NoiseModelOptions, SensorNoiseModel};
