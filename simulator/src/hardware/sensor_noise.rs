//! Camera sensor noise model.
//!
//! Converts a grid of expected photon counts (irradiance) into simulated raw
//! sensor readings. Per cell:
//!
//! 1. **Shot noise**: Poisson draw with the cell's irradiance as mean
//! 2. **Quantum efficiency**: photons scaled by QE to expected electrons
//!    (a deterministic scale, not binomial thinning)
//! 3. **Dark current**: zero-mean Gaussian with sigma `dark_noise`, added in
//!    electrons; may push the signal below zero
//! 4. **Digitization**: `electrons * sensitivity + baseline`, truncated toward
//!    zero (not rounded)
//! 5. **Saturation**: clipped to `2^bit_depth - 1`, and by default to 0 from below
//!
//! All randomness comes from the generator the caller passes in. Draw order
//! is every shot-noise draw in logical order, then every dark-noise draw in
//! the same order.
//!
//! # Lower clamp
//! The reference behavior does not clamp below zero, so strong dark noise on a
//! dark pixel can leak negative readings. [`NoiseModelOptions::clamp_negative`]
//! defaults to `true`; set it to `false` to reproduce the unclamped readings.

use log::debug;
use ndarray::{Array, ArrayBase, Data, Dimension};
use rand::Rng;
use shared::image_proc::noise::{add_gaussian_noise, apply_poisson_photon_noise, NoiseError};

use crate::hardware::sensor::{InvalidInput, SensorConfig};

impl From<NoiseError> for InvalidInput {
    fn from(err: NoiseError) -> Self {
        match err {
            NoiseError::InvalidPoissonMean { index, value } => {
                InvalidInput::UnsampleableIrradiance { index, value }
            }
            NoiseError::InvalidStdDev(sigma) => InvalidInput::DarkNoise(sigma),
            NoiseError::Shape(e) => InvalidInput::Shape(e),
        }
    }
}

/// Behavioral switches for [`SensorNoiseModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseModelOptions {
    /// Clamp digitized readings below zero up to zero
    pub clamp_negative: bool,
}

impl Default for NoiseModelOptions {
    fn default() -> Self {
        Self {
            clamp_negative: true,
        }
    }
}

/// Sensor noise model bound to one validated configuration.
///
/// The model holds no generator and no mutable state, so a single instance can
/// be shared across threads; each caller supplies its own RNG.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorNoiseModel {
    config: SensorConfig,
    options: NoiseModelOptions,
}

impl SensorNoiseModel {
    pub fn new(config: SensorConfig) -> Self {
        Self::with_options(config, NoiseModelOptions::default())
    }

    pub fn with_options(config: SensorConfig, options: NoiseModelOptions) -> Self {
        Self { config, options }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn options(&self) -> NoiseModelOptions {
        self.options
    }

    /// Simulate raw sensor readings for an irradiance grid.
    ///
    /// # Arguments
    /// * `irradiance` - Expected photon count per cell, any dimensionality
    /// * `rng` - Generator all noise draws are taken from
    ///
    /// # Returns
    /// * `Ok(Array<i64, D>)` - Digitized readings, same shape as `irradiance`
    /// * `Err(InvalidInput)` - A negative or non-finite cell was found. Validation
    ///   runs before any draw, so a rejected grid leaves `rng` untouched.
    pub fn simulate<S, D, R>(
        &self,
        irradiance: &ArrayBase<S, D>,
        rng: &mut R,
    ) -> Result<Array<i64, D>, InvalidInput>
    where
        S: Data<Elem = f64>,
        D: Dimension,
        R: Rng + ?Sized,
    {
        validate_irradiance(irradiance)?;

        let mut electrons = apply_poisson_photon_noise(irradiance, rng)?;
        let qe = self.config.quantum_efficiency();
        electrons.mapv_inplace(|photons| photons * qe);

        add_gaussian_noise(&mut electrons, self.config.dark_noise(), rng)?;

        debug!(
            "Simulated {} cells (shape {:?}) with QE {}, sensitivity {}, dark noise {}",
            electrons.len(),
            electrons.shape(),
            qe,
            self.config.sensitivity(),
            self.config.dark_noise()
        );

        Ok(electrons.mapv(|e| self.digitize(e)))
    }

    /// Convert an electron count to a saturated ADU reading.
    ///
    /// The float-to-int cast truncates toward zero, so -1.7 becomes -1 before
    /// any lower clamp is applied.
    pub fn digitize(&self, electrons: f64) -> i64 {
        let adu = electrons * self.config.sensitivity() + self.config.baseline() as f64;
        let reading = (adu as i64).min(self.config.max_value());

        if self.options.clamp_negative {
            reading.max(0)
        } else {
            reading
        }
    }
}

/// Simulate raw sensor readings with the default model options.
///
/// Shorthand for `SensorNoiseModel::new(*config).simulate(irradiance, rng)`.
pub fn simulate<S, D, R>(
    irradiance: &ArrayBase<S, D>,
    config: &SensorConfig,
    rng: &mut R,
) -> Result<Array<i64, D>, InvalidInput>
where
    S: Data<Elem = f64>,
    D: Dimension,
    R: Rng + ?Sized,
{
    SensorNoiseModel::new(*config).simulate(irradiance, rng)
}

fn validate_irradiance<S, D>(irradiance: &ArrayBase<S, D>) -> Result<(), InvalidInput>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    for (index, &value) in irradiance.indexed_iter() {
        if !value.is_finite() {
            return Err(InvalidInput::NonFiniteIrradiance {
                index: format!("{index:?}"),
                value,
            });
        }
        if value < 0.0 {
            return Err(InvalidInput::NegativeIrradiance {
                index: format!("{index:?}"),
                value,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2, Array3};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn scenario_config() -> SensorConfig {
        SensorConfig::new(0, 0.6, 8, 0.015, 0.69).unwrap()
    }

    #[test]
    fn test_single_pixel_scenario() {
        let model = SensorNoiseModel::new(scenario_config());
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let out = model.simulate(&array![[100.0]], &mut rng).unwrap();
        let value = out[[0, 0]];

        // 100 * 0.69 * 0.6 = 41.4, shot noise sigma ~4.1 ADU
        assert!(
            (25..=58).contains(&value),
            "Reading {} far outside the expected band around 41.4",
            value
        );
    }

    #[test]
    fn test_single_pixel_scenario_mean() {
        let model = SensorNoiseModel::new(scenario_config());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let irradiance = array![[100.0]];

        let trials = 4000;
        let total: i64 = (0..trials)
            .map(|_| model.simulate(&irradiance, &mut rng).unwrap()[[0, 0]])
            .sum();
        let mean = total as f64 / trials as f64;

        // Truncation shifts the mean down by roughly half an ADU
        assert!(
            mean > 40.3 && mean < 41.5,
            "Mean reading {} inconsistent with 41.4 minus truncation bias",
            mean
        );
    }

    #[test]
    fn test_saturation_scenario() {
        let model = SensorNoiseModel::new(scenario_config());
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let out = model.simulate(&array![[100000.0]], &mut rng).unwrap();
        assert_eq!(out[[0, 0]], 255);
    }

    #[test]
    fn test_zero_irradiance_gives_baseline() {
        let config = SensorConfig::new(17, 0.6, 8, 0.0, 0.69).unwrap();
        let model = SensorNoiseModel::new(config);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let out = model
            .simulate(&Array3::<f64>::zeros((8, 6, 3)), &mut rng)
            .unwrap();

        assert_eq!(out.dim(), (8, 6, 3));
        assert!(out.iter().all(|&v| v == 17));
    }

    #[test]
    fn test_deterministic_with_seed() {
        let model = SensorNoiseModel::new(scenario_config());
        let irradiance = Array2::from_shape_fn((32, 32), |(i, j)| (i * 32 + j) as f64 * 0.5);

        let mut rng1 = ChaCha8Rng::seed_from_u64(1234);
        let mut rng2 = ChaCha8Rng::seed_from_u64(1234);
        let a = model.simulate(&irradiance, &mut rng1).unwrap();
        let b = model.simulate(&irradiance, &mut rng2).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let model = SensorNoiseModel::new(scenario_config());
        let irradiance = Array2::<f64>::from_elem((32, 32), 200.0);

        let a = model
            .simulate(&irradiance, &mut ChaCha8Rng::seed_from_u64(1))
            .unwrap();
        let b = model
            .simulate(&irradiance, &mut ChaCha8Rng::seed_from_u64(2))
            .unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_repeated_calls_consume_entropy() {
        let model = SensorNoiseModel::new(scenario_config());
        let irradiance = Array2::<f64>::from_elem((16, 16), 150.0);
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let first = model.simulate(&irradiance, &mut rng).unwrap();
        let second = model.simulate(&irradiance, &mut rng).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_range_invariant() {
        let config = SensorConfig::new(5, 2.0, 10, 25.0, 0.8).unwrap();
        let model = SensorNoiseModel::new(config);
        let mut rng = ChaCha8Rng::seed_from_u64(77);

        let irradiance = Array2::from_shape_fn((64, 64), |(i, j)| ((i * 64 + j) as f64).powf(1.3));
        let out = model.simulate(&irradiance, &mut rng).unwrap();

        assert!(out.iter().all(|&v| (0..=1023).contains(&v)));
        assert!(out.iter().any(|&v| v == 1023));
    }

    #[test]
    fn test_expected_output_monotonic_until_saturation() {
        let model = SensorNoiseModel::new(scenario_config());
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let levels = [0.0, 10.0, 50.0, 100.0, 200.0, 400.0, 600.0];
        let means: Vec<f64> = levels
            .iter()
            .map(|&level| {
                let grid = Array2::<f64>::from_elem((40, 40), level);
                let out = model.simulate(&grid, &mut rng).unwrap();
                out.iter().sum::<i64>() as f64 / out.len() as f64
            })
            .collect();

        for pair in means.windows(2) {
            assert!(
                pair[1] >= pair[0],
                "Expected reading decreased: {:?}",
                means
            );
        }

        // Far beyond saturation every cell is pinned to max_value
        let bright = Array2::<f64>::from_elem((40, 40), 2000.0);
        let out = model.simulate(&bright, &mut rng).unwrap();
        assert!(out.iter().all(|&v| v == 255));
    }

    #[test]
    fn test_mean_tracks_gain() {
        let config = SensorConfig::new(0, 1.0, 16, 0.0, 0.5).unwrap();
        let model = SensorNoiseModel::new(config);
        let mut rng = ChaCha8Rng::seed_from_u64(21);

        let grid = Array2::<f64>::from_elem((100, 100), 1000.0);
        let out = model.simulate(&grid, &mut rng).unwrap();
        let mean = out.iter().sum::<i64>() as f64 / out.len() as f64;

        // 1000 photons * 0.5 QE; odd photon counts lose half an ADU to truncation
        assert_relative_eq!(mean, 499.75, epsilon = 0.6);
    }

    #[test]
    fn test_negative_irradiance_rejected() {
        let model = SensorNoiseModel::new(scenario_config());
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let err = model
            .simulate(&array![[1.0, 2.0], [-3.0, 4.0]], &mut rng)
            .unwrap_err();

        assert_eq!(
            err,
            InvalidInput::NegativeIrradiance {
                index: "(1, 0)".to_string(),
                value: -3.0
            }
        );
    }

    #[test]
    fn test_non_finite_irradiance_rejected() {
        let model = SensorNoiseModel::new(scenario_config());
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert!(matches!(
            model.simulate(&array![[f64::NAN]], &mut rng),
            Err(InvalidInput::NonFiniteIrradiance { .. })
        ));
        assert!(matches!(
            model.simulate(&array![[0.0, f64::INFINITY]], &mut rng),
            Err(InvalidInput::NonFiniteIrradiance { .. })
        ));
    }

    #[test]
    fn test_rejected_grid_consumes_no_entropy() {
        let model = SensorNoiseModel::new(scenario_config());
        let good = Array2::<f64>::from_elem((4, 4), 80.0);

        let mut rng = ChaCha8Rng::seed_from_u64(99);
        assert!(model.simulate(&array![[5.0, -1.0]], &mut rng).is_err());
        let after_error = model.simulate(&good, &mut rng).unwrap();

        let fresh = model
            .simulate(&good, &mut ChaCha8Rng::seed_from_u64(99))
            .unwrap();

        assert_eq!(after_error, fresh);
    }

    #[test]
    fn test_digitize_truncates_toward_zero() {
        let config = SensorConfig::new(0, 1.0, 8, 0.0, 1.0).unwrap();
        let unclamped = SensorNoiseModel::with_options(
            config,
            NoiseModelOptions {
                clamp_negative: false,
            },
        );

        assert_eq!(unclamped.digitize(41.9), 41);
        assert_eq!(unclamped.digitize(2.999), 2);
        assert_eq!(unclamped.digitize(-0.7), 0);
        assert_eq!(unclamped.digitize(-1.7), -1);
        assert_eq!(unclamped.digitize(300.0), 255);
    }

    #[test]
    fn test_digitize_applies_sensitivity_then_baseline() {
        let config = SensorConfig::new(10, 0.5, 8, 0.0, 1.0).unwrap();
        let model = SensorNoiseModel::new(config);

        // 7 * 0.5 + 10 = 13.5 -> 13
        assert_eq!(model.digitize(7.0), 13);
        // -30 * 0.5 + 10 = -5 -> clamped
        assert_eq!(model.digitize(-30.0), 0);
    }

    #[test]
    fn test_lower_clamp_versus_reference_behavior() {
        // Heavy dark noise on a dark sensor drives many readings negative
        let config = SensorConfig::new(0, 1.0, 8, 20.0, 0.69).unwrap();
        let irradiance = Array2::<f64>::zeros((32, 32));

        let clamped = SensorNoiseModel::new(config)
            .simulate(&irradiance, &mut ChaCha8Rng::seed_from_u64(4))
            .unwrap();
        let unclamped = SensorNoiseModel::with_options(
            config,
            NoiseModelOptions {
                clamp_negative: false,
            },
        )
        .simulate(&irradiance, &mut ChaCha8Rng::seed_from_u64(4))
        .unwrap();

        assert!(unclamped.iter().any(|&v| v < 0));
        assert!(clamped.iter().all(|&v| v >= 0));

        // The clamp is the only difference between the two behaviors
        for (&c, &u) in clamped.iter().zip(unclamped.iter()) {
            assert_eq!(c, u.max(0));
        }
    }

    #[test]
    fn test_free_function_matches_model() {
        let config = scenario_config();
        let irradiance = Array2::<f64>::from_elem((8, 8), 60.0);

        let a = simulate(&irradiance, &config, &mut ChaCha8Rng::seed_from_u64(12)).unwrap();
        let b = SensorNoiseModel::new(config)
            .simulate(&irradiance, &mut ChaCha8Rng::seed_from_u64(12))
            .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_accepts_array_views() {
        let model = SensorNoiseModel::new(scenario_config());
        let irradiance = Array3::<f64>::from_elem((4, 4, 3), 30.0);
        let channel = irradiance.index_axis(ndarray::Axis(2), 1);

        let out = model
            .simulate(&channel, &mut ChaCha8Rng::seed_from_u64(3))
            .unwrap();
        assert_eq!(out.dim(), (4, 4));
    }
}
