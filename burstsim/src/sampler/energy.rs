//! Photon energies by rejection sampling.
//!
//! For each arrival time the folded spectrum is evaluated on a fixed log grid
//! to find its peak. Candidates are drawn from a power law with the model's
//! index and accepted under an envelope `C (x / E_peak)^α` with `C` a multiple
//! of the peak value. The envelope is not guaranteed to dominate the folded
//! spectrum everywhere; crossings are counted.

use rand::Rng;

use burst_math::{argmax, logspace};

use super::{SamplingError, SamplingGuard};
use crate::config::SamplingConfig;
use crate::flux::SourceFunction;

/// `|α + 1|` below which the power law is drawn in its log-uniform limit.
const LOG_UNIFORM_TOLERANCE: f64 = 1e-12;

/// Attempts between deadline checks.
const DEADLINE_CHECK_INTERVAL: u64 = 4096;

/// Draw one energy from `E^index` on `[emin, emax]` by inverting its CDF.
pub fn sample_power_law<R: Rng + ?Sized>(index: f64, emin: f64, emax: f64, rng: &mut R) -> f64 {
    let u: f64 = rng.gen();
    let k = index + 1.0;
    if k.abs() < LOG_UNIFORM_TOLERANCE {
        return emin * (emax / emin).powf(u);
    }
    let lo = emin.powf(k);
    let hi = emax.powf(k);
    ((hi - lo) * u + lo).powf(1.0 / k)
}

/// Energies drawn for a batch of arrival times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyDraws {
    pub energies: Vec<f64>,
    /// Candidates drawn in total
    pub attempts: u64,
    /// Candidates where the folded spectrum rose above the envelope
    pub envelope_violations: u64,
}

/// Rejection sampler over a source model's band.
#[derive(Debug, Clone)]
pub struct EnergySampler {
    grid: Vec<f64>,
    envelope_factor: f64,
}

impl EnergySampler {
    pub fn new(emin: f64, emax: f64, settings: &SamplingConfig) -> Self {
        Self {
            grid: logspace(emin, emax, settings.energy_grid_points),
            envelope_factor: settings.envelope_factor,
        }
    }

    /// Sampler spanning the band of `source`.
    pub fn for_source<S: SourceFunction + ?Sized>(source: &S, settings: &SamplingConfig) -> Self {
        Self::new(source.emin(), source.emax(), settings)
    }

    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    /// Draw one photon energy at `time`.
    pub fn sample<S, R>(
        &self,
        source: &S,
        time: f64,
        rng: &mut R,
        guard: &SamplingGuard,
        draws: &mut EnergyDraws,
    ) -> Result<f64, SamplingError>
    where
        S: SourceFunction + ?Sized,
        R: Rng + ?Sized,
    {
        let folded = source.folded_spectrum(&self.grid, time);
        let idx = argmax(&folded).ok_or(SamplingError::ZeroFlux { time })?;
        let peak = folded[idx];
        if !(peak > 0.0) {
            return Err(SamplingError::ZeroFlux { time });
        }

        let scale = self.envelope_factor * peak;
        let e_peak = self.grid[idx];
        let alpha = source.index();
        let (emin, emax) = (self.grid[0], self.grid[self.grid.len() - 1]);

        for attempt in 1..=guard.max_rejection_attempts() {
            draws.attempts += 1;
            if attempt % DEADLINE_CHECK_INTERVAL == 0 {
                guard.check_deadline()?;
            }

            let x = sample_power_law(alpha, emin, emax, rng);
            let envelope = scale * (x / e_peak).powf(alpha);
            let f = source.folded_flux(x, time);
            if f > envelope {
                draws.envelope_violations += 1;
            }

            let y = rng.gen::<f64>() * envelope;
            if y <= f {
                return Ok(x);
            }
        }

        Err(SamplingError::RejectionExhausted {
            time,
            attempts: guard.max_rejection_attempts(),
        })
    }

    /// Draw one energy per arrival time.
    pub fn sample_all<S, R>(
        &self,
        source: &S,
        times: &[f64],
        rng: &mut R,
        guard: &SamplingGuard,
    ) -> Result<EnergyDraws, SamplingError>
    where
        S: SourceFunction + ?Sized,
        R: Rng + ?Sized,
    {
        let mut draws = EnergyDraws {
            energies: Vec::with_capacity(times.len()),
            ..Default::default()
        };
        for &t in times {
            let e = self.sample(source, t, rng, guard, &mut draws)?;
            draws.energies.push(e);
        }
        if draws.envelope_violations > 0 {
            log::warn!(
                "energy envelope exceeded on {} of {} candidates",
                draws.envelope_violations,
                draws.attempts
            );
        }
        Ok(draws)
    }
}
