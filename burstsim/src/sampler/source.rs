//! A burst source bound to one detector.

use rand::Rng;

use burst_math::linspace;

use super::energy::{EnergyDraws, EnergySampler};
use super::time::{sample_event_times, ThinningOutcome};
use super::{SamplingError, SamplingGuard};
use crate::config::SamplingConfig;
use crate::flux::{FluxModel, SourceFunction};
use crate::response::ResponseMatrix;

/// Source photons for one detector over `[tstart, tstop]`.
///
/// The model's folded rate drives arrival times; energies are drawn in the
/// source frame and shifted to the observer frame by `1 / (1 + z)`.
#[derive(Debug, Clone)]
pub struct Source<S: SourceFunction = FluxModel> {
    tstart: f64,
    tstop: f64,
    z: f64,
    function: S,
    fmax: f64,
    energy_sampler: EnergySampler,
}

impl<S: SourceFunction> Source<S> {
    pub fn new(
        tstart: f64,
        tstop: f64,
        function: S,
        z: f64,
        settings: &SamplingConfig,
    ) -> Result<Self, SamplingError> {
        if !(tstop > tstart) {
            return Err(SamplingError::InvalidWindow { tstart, tstop });
        }
        if !(z >= 0.0) || !z.is_finite() {
            return Err(SamplingError::InvalidRate {
                name: "redshift",
                value: z,
            });
        }

        let grid = linspace(tstart, tstop, settings.fmax_grid_points);
        let peak = grid
            .iter()
            .map(|&t| function.energy_integrated_evolution(t))
            .fold(0.0f64, f64::max);
        let fmax = peak * settings.fmax_safety_factor;
        let energy_sampler = EnergySampler::for_source(&function, settings);

        log::debug!(
            "source on [{tstart}, {tstop}] s: thinning bound {fmax:.3e} counts/s"
        );

        Ok(Self {
            tstart,
            tstop,
            z,
            function,
            fmax,
            energy_sampler,
        })
    }

    /// Upper bound on the folded count rate used for thinning.
    pub fn fmax(&self) -> f64 {
        self.fmax
    }

    pub fn function(&self) -> &S {
        &self.function
    }

    pub fn window(&self) -> (f64, f64) {
        (self.tstart, self.tstop)
    }

    pub fn redshift(&self) -> f64 {
        self.z
    }

    /// Arrival times of detected source photons.
    pub fn sample_times<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        guard: &SamplingGuard,
    ) -> Result<ThinningOutcome, SamplingError> {
        sample_event_times(
            |t| self.function.energy_integrated_evolution(t),
            self.tstart,
            self.tstop,
            self.fmax,
            rng,
            guard,
        )
    }

    /// Observer-frame photon energies for the given arrival times.
    pub fn sample_photons<R: Rng + ?Sized>(
        &self,
        times: &[f64],
        rng: &mut R,
        guard: &SamplingGuard,
    ) -> Result<EnergyDraws, SamplingError> {
        let mut draws = self
            .energy_sampler
            .sample_all(&self.function, times, rng, guard)?;
        let shift = 1.0 + self.z;
        for e in draws.energies.iter_mut() {
            *e /= shift;
        }
        Ok(draws)
    }

    /// Detector channels for the given photon energies.
    pub fn sample_channels<R: Rng + ?Sized>(
        &self,
        photons: &[f64],
        response: &ResponseMatrix,
        rng: &mut R,
    ) -> Vec<u32> {
        response.digitize_all(photons, rng)
    }
}
