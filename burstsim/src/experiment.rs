//! Detection efficiency experiments
//!
//! An experiment simulates the same burst many times at one flux level and
//! counts how often the trigger fires. Scanning the flux gives the detection
//! efficiency curve of the instrument.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::burst::{BurstParams, Instrument};
use crate::config::SimulationConfig;
use crate::flux::FluxModelSpec;
use crate::instrument::GeometryProvider;
use crate::parallel::task_seed;
use crate::response::ResponseProvider;
use crate::sampler::BackgroundTemplateProvider;

/// Parameters for a single experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentParams {
    pub burst: BurstParams,
    pub spec: FluxModelSpec,
    /// Peak flux used for every trial (erg/s/cm^2)
    pub peak_flux: f64,
    /// Number of simulated bursts
    pub trials: u32,
    /// Draw a new isotropic sky position for every trial
    pub random_position: bool,
    /// Index of this experiment in the scan
    pub index: usize,
    /// Random seed for reproducible experiments
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResults {
    pub params: ExperimentParams,
    pub detections: u32,
    /// Trials that could not be simulated at all
    pub failed_trials: u32,
    /// Detector tasks that came back unavailable, over all trials
    pub unavailable_tasks: u32,
    /// Triggered detectors summed over trials
    pub triggered_detectors: u32,
}

impl ExperimentResults {
    /// Fraction of completed trials that were detected
    pub fn detection_rate(&self) -> f64 {
        let completed = self.params.trials.saturating_sub(self.failed_trials);
        if completed == 0 {
            return f64::NAN;
        }
        self.detections as f64 / completed as f64
    }

    pub fn mean_triggered_detectors(&self) -> f64 {
        let completed = self.params.trials.saturating_sub(self.failed_trials);
        if completed == 0 {
            return f64::NAN;
        }
        self.triggered_detectors as f64 / completed as f64
    }
}

/// Isotropic sky position as (ra, dec) in degrees.
pub fn random_sky_position<R: Rng + ?Sized>(rng: &mut R) -> (f64, f64) {
    let ra = rng.gen_range(0.0..360.0);
    let sin_dec: f64 = rng.gen_range(-1.0..=1.0);
    (ra, sin_dec.asin().to_degrees())
}

/// Run every trial of one experiment serially.
pub fn run_single_experiment<R, B, G>(
    instrument: &Instrument<R, B, G>,
    config: &SimulationConfig,
    params: &ExperimentParams,
) -> ExperimentResults
where
    R: ResponseProvider,
    B: BackgroundTemplateProvider,
    G: GeometryProvider,
{
    let mut rng = StdRng::seed_from_u64(params.seed);
    let spec = params.spec.with_peak_flux(params.peak_flux);

    let mut results = ExperimentResults {
        params: params.clone(),
        detections: 0,
        failed_trials: 0,
        unavailable_tasks: 0,
        triggered_detectors: 0,
    };

    for trial in 0..params.trials {
        let mut burst = params.burst.clone();
        if params.random_position {
            let (ra, dec) = random_sky_position(&mut rng);
            burst.ra = ra;
            burst.dec = dec;
        }
        let seed = task_seed(rng.gen::<u64>(), trial as usize);

        let simulation = match instrument.simulate_with(&burst, &spec, config, seed, true) {
            Ok(simulation) => simulation,
            Err(e) => {
                log::warn!("Trial {} of experiment {} failed: {}", trial, params.index, e);
                results.failed_trials += 1;
                continue;
            }
        };
        let trigger = simulation.detect(&config.trigger);

        if trigger.is_detected {
            results.detections += 1;
        }
        results.unavailable_tasks += trigger.unavailable_detectors.len() as u32;
        results.triggered_detectors += trigger.triggered_detectors.len() as u32;
    }

    log::debug!(
        "Experiment {}: peak flux {:.3e}, {}/{} detected",
        params.index,
        params.peak_flux,
        results.detections,
        params.trials
    );
    results
}
