//! Batch processing of every matching image in a directory.
//!
//! For each input `<name>.<ext>` two siblings are written:
//! - `<name>_clean.<ext>`: the decoded image, re-encoded without noise
//! - `<name>_noisy.<ext>`: decode, inverse sensor gain, noise model, encode
//!
//! Files are processed in parallel. Each file gets its own generator seeded
//! from the run seed and the file's position in the sorted input list, so a
//! run is reproducible regardless of thread count or scheduling.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rand::{Rng, RngCore};
use rand_chacha::ChaCha8Rng;
use rayon::ThreadPoolBuilder;
use shared::algo::parallel::{par_map_seeded, try_par_map_seeded};
use thiserror::Error;

use crate::hardware::sensor::InvalidInput;
use crate::hardware::sensor_noise::SensorNoiseModel;
use crate::image_proc::scaling::irradiance_from_intensity;
use crate::io::{read_intensity_grid, write_grid, ImageIoError};

const CLEAN_TAG: &str = "clean";
const NOISY_TAG: &str = "noisy";

/// Readings of the noise-free output are kept on the adapter's 8-bit scale
const CLEAN_MAX_VALUE: i64 = 255;

/// What to do when a single file fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log a warning, record the failure and move on
    #[default]
    Continue,
    /// Stop the run and return the error
    Abort,
}

/// Options for a batch run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Directory scanned for inputs (not recursive)
    pub dir: PathBuf,
    /// File name suffix selecting inputs, e.g. ".png"
    pub suffix: String,
    /// Run seed; drawn at random and logged when `None`
    pub seed: Option<u64>,
    pub failure_policy: FailurePolicy,
    /// Worker threads; `None` lets rayon decide
    pub jobs: Option<usize>,
    pub show_progress: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            suffix: ".png".to_string(),
            seed: None,
            failure_policy: FailurePolicy::default(),
            jobs: None,
            show_progress: false,
        }
    }
}

/// Outputs written for one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub input: PathBuf,
    pub clean: PathBuf,
    pub noisy: PathBuf,
}

/// An input that could not be processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedImage {
    pub input: PathBuf,
    pub error: String,
}

/// Summary of a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Seed the run used, for reproducing it
    pub seed: u64,
    pub processed: Vec<ProcessedImage>,
    pub failed: Vec<FailedImage>,
}

/// Failure while processing one image
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Io(#[from] ImageIoError),

    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
}

/// Errors that end a batch run
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to list {}: {source}", .dir.display())]
    Discovery {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to process {}: {source}", .input.display())]
    Image {
        input: PathBuf,
        source: ProcessError,
    },
}

/// Whether a file stem marks an output this driver produced
fn is_derived_output(path: &Path) -> bool {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| {
            stem.ends_with(&format!("_{CLEAN_TAG}")) || stem.ends_with(&format!("_{NOISY_TAG}"))
        })
        .unwrap_or(false)
}

/// Find input files directly inside `dir` whose names end with `suffix`.
///
/// Files previously written by the driver are skipped. The result is sorted by
/// file name, which fixes each file's seed index.
pub fn discover_inputs(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, BatchError> {
    let discovery_err = |source| BatchError::Discovery {
        dir: dir.to_path_buf(),
        source,
    };

    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(discovery_err)? {
        let path = entry.map_err(discovery_err)?.path();
        if !path.is_file() || is_derived_output(&path) {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.ends_with(suffix))
            .unwrap_or(false);
        if matches {
            inputs.push(path);
        }
    }

    inputs.sort();
    Ok(inputs)
}

/// Sibling path `<stem>_<tag>.<ext>` for an input file
pub fn tagged_output_path(input: &Path, tag: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{stem}_{tag}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{tag}"),
    };
    input.with_file_name(name)
}

/// Process a single input, writing its clean and noisy outputs.
///
/// # Arguments
/// * `input` - Image to read
/// * `model` - Sensor noise model
/// * `rng` - Generator for this image's noise
pub fn process_image<R: Rng + ?Sized>(
    input: &Path,
    model: &SensorNoiseModel,
    rng: &mut R,
) -> Result<ProcessedImage, ProcessError> {
    let intensity = read_intensity_grid(input)?;

    let clean = tagged_output_path(input, CLEAN_TAG);
    write_grid(&intensity.mapv(|v| v as i64), CLEAN_MAX_VALUE, &clean)?;

    let irradiance = irradiance_from_intensity(&intensity, model.config());
    let readings = model.simulate(&irradiance, rng)?;

    let noisy = tagged_output_path(input, NOISY_TAG);
    write_grid(&readings, model.config().max_value(), &noisy)?;

    debug!(
        "Wrote {} and {}",
        clean.display(),
        noisy.display()
    );

    Ok(ProcessedImage {
        input: input.to_path_buf(),
        clean,
        noisy,
    })
}

fn make_progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .map(|s| s.progress_chars("█▉▊▋▌▍▎▏ "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    let pb = ProgressBar::new(len as u64);
    pb.set_style(style);
    pb.set_message("Simulating");
    pb
}

/// Run the noise model over every matching file in a directory.
///
/// # Returns
/// * `Ok(BatchReport)` - Every file was attempted; failures are listed when
///   the policy is [`FailurePolicy::Continue`]
/// * `Err(BatchError)` - Discovery failed, or a file failed under
///   [`FailurePolicy::Abort`]
pub fn run_batch(
    model: &SensorNoiseModel,
    options: &BatchOptions,
) -> Result<BatchReport, BatchError> {
    let inputs = discover_inputs(&options.dir, &options.suffix)?;
    let seed = options.seed.unwrap_or_else(|| rand::rng().next_u64());

    info!(
        "Processing {} file(s) matching '{}' in {} with seed {}",
        inputs.len(),
        options.suffix,
        options.dir.display(),
        seed
    );
    if inputs.is_empty() {
        warn!("No input files found");
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(options.jobs.unwrap_or(0))
        .build()?;
    let progress = make_progress_bar(inputs.len(), options.show_progress);

    let mut report = BatchReport {
        seed,
        ..Default::default()
    };

    match options.failure_policy {
        FailurePolicy::Abort => {
            report.processed = pool.install(|| {
                try_par_map_seeded(&inputs, seed, |_, input, rng: &mut ChaCha8Rng| {
                    let result = process_image(input, model, rng).map_err(|source| {
                        BatchError::Image {
                            input: input.clone(),
                            source,
                        }
                    });
                    progress.inc(1);
                    result
                })
            })?;
        }
        FailurePolicy::Continue => {
            let results = pool.install(|| {
                par_map_seeded(&inputs, seed, |_, input, rng: &mut ChaCha8Rng| {
                    let result = process_image(input, model, rng);
                    progress.inc(1);
                    result
                })
            });

            for (input, result) in inputs.iter().zip(results) {
                match result {
                    Ok(processed) => report.processed.push(processed),
                    Err(e) => {
                        warn!("Skipping {}: {}", input.display(), e);
                        report.failed.push(FailedImage {
                            input: input.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    progress.finish_and_clear();
    info!(
        "Finished: {} processed, {} failed",
        report.processed.len(),
        report.failed.len()
    );

    Ok(report)
}
