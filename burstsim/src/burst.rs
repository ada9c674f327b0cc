//! Burst-level driver.
//!
//! A burst is simulated independently in every detector of an
//! [`Instrument`]: each detector task builds its response, binds the flux
//! model to it, draws a background rate and runs the light-curve pipeline
//! with its own seeded RNG. Failed tasks are kept as
//! [`DetectorOutcome::Unavailable`] so the rest of the burst survives.

use std::sync::Arc;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::error::SimError;
use crate::flux::FluxModelSpec;
use crate::instrument::{DetectorSpec, FixedPointing, GeometryProvider, SkyPosition, GBM_DETECTORS};
use crate::lightcurve::{LightCurve, LightCurveStorage};
use crate::parallel::map_seeded;
use crate::response::{ResponseProvider, SyntheticResponseGenerator};
use crate::sampler::{
    Background, BackgroundTemplateProvider, PowerLawTemplate, SamplingGuard, Source,
};
use crate::trigger::{DetectorData, Trigger, TriggerConfig, TriggerInput, TriggerResult};

/// Where, when and how far away a burst happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurstParams {
    pub name: String,
    /// Redshift
    pub z: f64,
    /// Trigger time the event times are referenced to (s)
    pub t0: f64,
    /// Right ascension (deg)
    pub ra: f64,
    /// Declination (deg)
    pub dec: f64,
    /// Source emission window after T0 (s)
    pub duration: f64,
}

impl Default for BurstParams {
    fn default() -> Self {
        Self {
            name: "SynthGRB".to_string(),
            z: 1.0,
            t0: 0.0,
            ra: 0.0,
            dec: 0.0,
            duration: 1.0,
        }
    }
}

impl BurstParams {
    pub fn validate(&self) -> Result<(), SimError> {
        let check = |ok: bool, name: &'static str, value: f64, bound: &'static str| {
            if ok {
                Ok(())
            } else {
                Err(SimError::InvalidBurst { name, value, bound })
            }
        };
        check(self.z > 0.0 && self.z <= 20.0, "z", self.z, "0 < z <= 20")?;
        check((0.0..=360.0).contains(&self.ra), "ra", self.ra, "0 <= ra <= 360")?;
        check((-90.0..=90.0).contains(&self.dec), "dec", self.dec, "-90 <= dec <= 90")?;
        check(
            self.duration > 0.0 && self.duration.is_finite(),
            "duration",
            self.duration,
            "duration > 0",
        )?;
        check(self.t0.is_finite(), "t0", self.t0, "finite")
    }

    pub fn position(&self) -> SkyPosition {
        SkyPosition::new(self.ra, self.dec)
    }
}

/// Detectors plus the collaborators that describe them.
pub struct Instrument<R = SyntheticResponseGenerator, B = PowerLawTemplate, G = FixedPointing> {
    detectors: Vec<DetectorSpec>,
    responses: R,
    backgrounds: B,
    geometry: G,
}

impl Instrument {
    /// All GBM detectors with synthetic responses and power-law backgrounds.
    pub fn gbm_synthetic() -> Self {
        Self::new(
            GBM_DETECTORS.clone(),
            SyntheticResponseGenerator::default(),
            PowerLawTemplate::default(),
            FixedPointing,
        )
    }
}

impl<R, B, G> Instrument<R, B, G>
where
    R: ResponseProvider,
    B: BackgroundTemplateProvider,
    G: GeometryProvider,
{
    pub fn new(detectors: Vec<DetectorSpec>, responses: R, backgrounds: B, geometry: G) -> Self {
        Self {
            detectors,
            responses,
            backgrounds,
            geometry,
        }
    }

    pub fn detectors(&self) -> &[DetectorSpec] {
        &self.detectors
    }

    pub fn detector(&self, name: &str) -> Result<&DetectorSpec, SimError> {
        self.detectors
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| SimError::UnknownDetector(name.to_string()))
    }

    /// Simulate a burst in every detector, in parallel.
    pub fn simulate(
        &self,
        burst: &BurstParams,
        spec: &FluxModelSpec,
        config: &SimulationConfig,
        seed: u64,
    ) -> Result<BurstSimulation, SimError> {
        self.simulate_with(burst, spec, config, seed, false)
    }

    /// Simulate a burst, optionally running detector tasks serially.
    ///
    /// Invalid burst, model or configuration parameters fail the whole
    /// call; anything that goes wrong inside one detector only marks that
    /// detector unavailable.
    pub fn simulate_with(
        &self,
        burst: &BurstParams,
        spec: &FluxModelSpec,
        config: &SimulationConfig,
        seed: u64,
        serial: bool,
    ) -> Result<BurstSimulation, SimError> {
        burst.validate()?;
        spec.validate()?;
        config.validate()?;
        config.check_source_window(burst.duration)?;

        let position = burst.position();
        let outcomes = map_seeded(&self.detectors, seed, serial, |_, detector, rng| {
            self.simulate_detector(detector, &position, burst, spec, config, rng)
        });

        let detectors: Vec<DetectorResult> = self
            .detectors
            .iter()
            .zip(outcomes)
            .map(|(detector, outcome)| {
                let outcome = match outcome {
                    Ok(storage) => DetectorOutcome::Available(storage),
                    Err(err) => {
                        log::warn!("{}: detector unavailable: {}", detector.name, err);
                        DetectorOutcome::Unavailable {
                            reason: err.to_string(),
                        }
                    }
                };
                DetectorResult {
                    detector: detector.clone(),
                    separation_deg: self.geometry.separation_deg(&position, detector, burst.t0),
                    outcome,
                }
            })
            .collect();

        let simulation = BurstSimulation {
            params: burst.clone(),
            spec: *spec,
            seed,
            detectors,
        };
        log::info!(
            "{}: {} of {} detectors simulated, {} counts in total",
            burst.name,
            simulation.n_available(),
            simulation.detectors.len(),
            simulation.total_counts()
        );
        Ok(simulation)
    }

    fn simulate_detector(
        &self,
        detector: &DetectorSpec,
        position: &SkyPosition,
        burst: &BurstParams,
        spec: &FluxModelSpec,
        config: &SimulationConfig,
        rng: &mut StdRng,
    ) -> Result<LightCurveStorage, SimError> {
        let guard = SamplingGuard::new(&config.sampling);
        let response = Arc::new(self.responses.response(detector, position, burst.t0)?);
        let model = spec.build(&response)?;
        let source = Source::new(0.0, burst.duration, model, burst.z, &config.sampling)?;

        let template = self.backgrounds.template(detector)?;
        let bkg = &config.background;
        let background = Background::new(
            bkg.tstart,
            bkg.tstop,
            bkg.average_rate,
            bkg.rate_sigma,
            template,
            rng,
        )?;

        let light_curve = LightCurve::new(
            detector.name.clone(),
            source,
            background,
            response,
            config.dead_time,
            burst.t0,
        )?;
        Ok(light_curve.process(rng, &guard)?)
    }
}

/// What one detector task produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DetectorOutcome {
    Available(LightCurveStorage),
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorResult {
    pub detector: DetectorSpec,
    /// Angle between the burst and the detector normal at T0 (deg)
    pub separation_deg: f64,
    pub outcome: DetectorOutcome,
}

impl DetectorResult {
    pub fn storage(&self) -> Option<&LightCurveStorage> {
        match &self.outcome {
            DetectorOutcome::Available(storage) => Some(storage),
            DetectorOutcome::Unavailable { .. } => None,
        }
    }
}

/// All detector outcomes for one burst.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurstSimulation {
    pub params: BurstParams,
    pub spec: FluxModelSpec,
    pub seed: u64,
    pub detectors: Vec<DetectorResult>,
}

impl BurstSimulation {
    pub fn detector(&self, name: &str) -> Option<&DetectorResult> {
        self.detectors.iter().find(|d| d.detector.name == name)
    }

    pub fn n_available(&self) -> usize {
        self.detectors
            .iter()
            .filter(|d| d.storage().is_some())
            .count()
    }

    pub fn total_counts(&self) -> usize {
        self.detectors
            .iter()
            .filter_map(DetectorResult::storage)
            .map(LightCurveStorage::n_counts)
            .sum()
    }

    /// Run the trigger over this burst's detectors.
    pub fn detect(&self, config: &TriggerConfig) -> TriggerResult {
        let inputs: Vec<TriggerInput<'_>> = self
            .detectors
            .iter()
            .map(|d| TriggerInput {
                detector: &d.detector.name,
                separation_deg: d.separation_deg,
                can_trigger: d.detector.can_trigger(),
                data: match &d.outcome {
                    DetectorOutcome::Available(storage) => DetectorData::Available(storage),
                    DetectorOutcome::Unavailable { .. } => DetectorData::Unavailable,
                },
            })
            .collect();
        let result = Trigger::new(config).process(&inputs);
        log::info!(
            "{}: detected = {}, triggered {:?}",
            self.params.name,
            result.is_detected,
            result.triggered_detectors
        );
        result
    }
}
