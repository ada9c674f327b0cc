//! Single-pulse bursts with a hard-to-soft evolving cutoff power law.

use serde::{Deserialize, Serialize};

use super::cpl::{cpl_shape, CutoffPowerLaw};
use super::{check_energy_range, check_positive, FluxModelError, SourceFunction};
use crate::response::EffectiveAreaCurve;

/// Norris pulse profile with peak value `amplitude`.
///
/// `A exp(2 sqrt(τr/τd)) exp(-τr/t - t/τd)` for `t > 0`, zero otherwise.
/// The maximum `A` is reached at `t = sqrt(τr τd)`.
pub fn norris_pulse(t: f64, amplitude: f64, trise: f64, tdecay: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    let lambda = (2.0 * (trise / tdecay).sqrt()).exp();
    amplitude * lambda * (-trise / t - t / tdecay).exp()
}

/// Parameters of a Norris-pulse cutoff power law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulsedCplParams {
    /// Energy flux at the pulse peak (erg cm⁻² s⁻¹)
    pub peak_flux: f64,
    /// νFν peak energy at t = 0 (keV)
    pub ep_start: f64,
    /// Peak-energy decay timescale (s)
    pub ep_tau: f64,
    /// Low-energy photon index
    pub alpha: f64,
    /// Pulse rise timescale (s)
    pub trise: f64,
    /// Pulse decay timescale (s)
    pub tdecay: f64,
}

impl PulsedCplParams {
    pub fn validate(&self) -> Result<(), FluxModelError> {
        check_positive("peak_flux", self.peak_flux)?;
        check_positive("ep_start", self.ep_start)?;
        check_positive("ep_tau", self.ep_tau)?;
        check_positive("trise", self.trise)?;
        check_positive("tdecay", self.tdecay)?;
        cpl_shape(self.alpha).map(|_| ())
    }

    /// Peak energy at time `t` (keV).
    pub fn ep_at(&self, t: f64) -> f64 {
        self.ep_start / (1.0 + t.max(0.0) / self.ep_tau)
    }

    /// Energy flux amplitude at time `t` (erg cm⁻² s⁻¹).
    pub fn amplitude_at(&self, t: f64) -> f64 {
        norris_pulse(t, self.peak_flux, self.trise, self.tdecay)
    }
}

/// Cutoff power law following a Norris pulse with a decaying peak energy.
#[derive(Debug, Clone)]
pub struct PulsedCpl {
    params: PulsedCplParams,
    effective_area: EffectiveAreaCurve,
    emin: f64,
    emax: f64,
}

impl PulsedCpl {
    pub fn new(
        params: PulsedCplParams,
        effective_area: EffectiveAreaCurve,
        emin: f64,
        emax: f64,
    ) -> Result<Self, FluxModelError> {
        params.validate()?;
        check_energy_range(emin, emax)?;
        // The starting spectrum must normalize; later ones only soften.
        CutoffPowerLaw::new(params.peak_flux, params.ep_start, params.alpha, emin, emax)?;
        Ok(Self {
            params,
            effective_area,
            emin,
            emax,
        })
    }

    pub fn params(&self) -> &PulsedCplParams {
        &self.params
    }

    /// Normalized spectrum at `t`, or `None` outside the pulse or once the
    /// peak energy has decayed too far to normalize.
    fn spectrum_at(&self, t: f64) -> Option<CutoffPowerLaw> {
        let amplitude = self.params.amplitude_at(t);
        if amplitude <= 0.0 {
            return None;
        }
        CutoffPowerLaw::new(
            amplitude,
            self.params.ep_at(t),
            self.params.alpha,
            self.emin,
            self.emax,
        )
        .ok()
    }
}

impl SourceFunction for PulsedCpl {
    fn emin(&self) -> f64 {
        self.emin
    }

    fn emax(&self) -> f64 {
        self.emax
    }

    fn index(&self) -> f64 {
        self.params.alpha
    }

    fn effective_area(&self) -> &EffectiveAreaCurve {
        &self.effective_area
    }

    fn spectrum(&self, energies: &[f64], time: f64) -> Vec<f64> {
        match self.spectrum_at(time) {
            Some(cpl) => energies.iter().map(|&e| cpl.eval(e)).collect(),
            None => vec![0.0; energies.len()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> PulsedCplParams {
        PulsedCplParams {
            peak_flux: 1e-6,
            ep_start: 400.0,
            ep_tau: 2.0,
            alpha: -0.7,
            trise: 0.1,
            tdecay: 0.5,
        }
    }

    #[test]
    fn test_norris_peak() {
        let tpeak = (0.1f64 * 0.5).sqrt();
        assert_relative_eq!(norris_pulse(tpeak, 3.0, 0.1, 0.5), 3.0, epsilon = 1e-12);
        assert!(norris_pulse(tpeak * 0.5, 3.0, 0.1, 0.5) < 3.0);
        assert!(norris_pulse(tpeak * 2.0, 3.0, 0.1, 0.5) < 3.0);
    }

    #[test]
    fn test_norris_zero_before_onset() {
        assert_eq!(norris_pulse(0.0, 1.0, 0.1, 0.5), 0.0);
        assert_eq!(norris_pulse(-3.0, 1.0, 0.1, 0.5), 0.0);
    }

    #[test]
    fn test_peak_energy_decays() {
        let p = params();
        assert_eq!(p.ep_at(0.0), 400.0);
        assert_relative_eq!(p.ep_at(2.0), 200.0);
        assert!(p.ep_at(10.0) < p.ep_at(1.0));
    }

    #[test]
    fn test_flux_follows_pulse() {
        let area = EffectiveAreaCurve::flat(100.0, 10.0, 1000.0);
        let model = PulsedCpl::new(params(), area, 10.0, 1000.0).unwrap();

        assert_eq!(model.differential_flux(100.0, -1.0), 0.0);
        let tpeak = (0.1f64 * 0.5).sqrt();
        let at_peak = model.energy_integrated_evolution(tpeak);
        let late = model.energy_integrated_evolution(5.0);
        assert!(at_peak > 0.0);
        assert!(late < 0.01 * at_peak);
    }

    #[test]
    fn test_validation_names_parameter() {
        let area = EffectiveAreaCurve::flat(1.0, 10.0, 1000.0);
        let mut bad = params();
        bad.tdecay = 0.0;
        let err = PulsedCpl::new(bad, area, 10.0, 1000.0).unwrap_err();
        assert!(err.to_string().contains("tdecay"), "{err}");
    }
}
