//! Detection efficiency as a function of peak flux.
//!
//! Runs many simulated bursts at every point of a log10 peak-flux scan and
//! writes the fraction detected by the trigger to a CSV file.

use std::fs::File;
use std::io::Write;

use burstsim::experiment::{run_single_experiment, ExperimentParams};
use burstsim::shared_args::{RangeArg, SharedSimulationArgs};
use burstsim::Instrument;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

#[derive(Parser, Debug)]
#[command(
    name = "Detection Efficiency",
    about = "Scans burst peak flux and measures the trigger detection fraction",
    long_about = None
)]
struct Args {
    #[command(flatten)]
    shared: SharedSimulationArgs,

    /// log10 peak flux range in erg/s/cm^2 (format: start:stop:step)
    #[arg(long, default_value = "-8.0:-5.0:0.25", allow_hyphen_values = true)]
    log_flux: RangeArg,

    /// Simulated bursts per flux value
    #[arg(long, default_value_t = 20)]
    trials: u32,

    /// Keep the sky position fixed instead of drawing one per trial
    #[arg(long, default_value_t = false)]
    fixed_position: bool,

    /// Output CSV file path
    #[arg(long, default_value = "detection_efficiency.csv")]
    output_csv: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = args.shared.load_config()?;
    let instrument = Instrument::gbm_synthetic();
    let fluxes = args.log_flux.to_pow10_vec();

    println!("Setting up {} experiments...", fluxes.len());
    println!("Using random seed: {}", args.shared.seed);
    let mut master_rng = StdRng::seed_from_u64(args.shared.seed);

    let experiments: Vec<ExperimentParams> = fluxes
        .iter()
        .enumerate()
        .map(|(index, &peak_flux)| ExperimentParams {
            burst: args.shared.burst(format!("scan_{index}")),
            spec: args.shared.flux_spec(peak_flux),
            peak_flux,
            trials: args.trials,
            random_position: !args.fixed_position,
            index,
            seed: master_rng.gen(),
        })
        .collect();

    let pb = ProgressBar::new(experiments.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    pb.set_message("Running experiments");

    let run = |params: &ExperimentParams| {
        let result = run_single_experiment(&instrument, &config, params);
        pb.inc(1);
        result
    };
    let results: Vec<_> = if args.shared.serial {
        experiments.iter().map(run).collect()
    } else {
        experiments.par_iter().map(run).collect()
    };
    pb.finish_with_message("Experiments complete!");

    let mut csv = File::create(&args.output_csv)?;
    writeln!(
        csv,
        "peak_flux,trials,detections,failed_trials,unavailable_tasks,detection_rate,mean_triggered"
    )?;
    println!("\n{:>12} {:>10}", "peak_flux", "detected");
    for result in &results {
        writeln!(
            csv,
            "{:.6e},{},{},{},{},{:.4},{:.3}",
            result.params.peak_flux,
            result.params.trials,
            result.detections,
            result.failed_trials,
            result.unavailable_tasks,
            result.detection_rate(),
            result.mean_triggered_detectors()
        )?;
        println!(
            "{:>12.3e} {:>9.1}%",
            result.params.peak_flux,
            100.0 * result.detection_rate()
        );
    }
    println!("\nWrote results to {}", args.output_csv);

    Ok(())
}
