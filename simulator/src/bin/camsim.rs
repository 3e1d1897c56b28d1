//! Batch camera noise simulator.
//!
//! Processes every image in a directory whose name ends with the configured
//! suffix and writes a noise-free `<name>_clean.<ext>` and a simulated sensor
//! `<name>_noisy.<ext>` next to each input.
//!
//! # Usage
//!
//! ```bash
//! # All PNGs in the current directory with the reference sensor
//! cargo run --release --bin camsim
//!
//! # EXR renders, fixed seed, 12-bit sensor
//! cargo run --release --bin camsim -- --suffix .exr --seed 42 --bit-depth 12
//!
//! # Constants from a file, with one override
//! cargo run --release --bin camsim -- --sensor-config sensor.json --dark-noise 2.5
//! ```
//!
//! Set `RUST_LOG=info` (or `debug`) for progress logging.

use camsim::batch::run_batch;
use camsim::shared_args::{BatchArgs, SensorArgs};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    sensor: SensorArgs,

    #[command(flatten)]
    batch: BatchArgs,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let model = cli.sensor.to_model()?;
    let config = model.config();
    println!(
        "Sensor: QE {}, sensitivity {} ADU/e-, dark noise {} e-, {} bit, baseline {}",
        config.quantum_efficiency(),
        config.sensitivity(),
        config.dark_noise(),
        config.bit_depth(),
        config.baseline()
    );

    let report = run_batch(&model, &cli.batch.to_options())?;

    println!(
        "Processed {} file(s) with seed {}",
        report.processed.len(),
        report.seed
    );
    for processed in &report.processed {
        println!(
            "  {} -> {}, {}",
            processed.input.display(),
            processed.clean.display(),
            processed.noisy.display()
        );
    }

    if !report.failed.is_empty() {
        for failed in &report.failed {
            eprintln!("  FAILED {}: {}", failed.input.display(), failed.error);
        }
        return Err(format!("{} file(s) failed", report.failed.len()).into());
    }

    Ok(())
}
