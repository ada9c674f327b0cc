//! Spectral-temporal source models.
//!
//! A source model gives the differential photon flux `N(E, t)` in
//! ph cm⁻² s⁻¹ keV⁻¹. Sampling always works on the *folded* flux, i.e.
//! `N(E, t)` times the detector effective area at `E`, so the folded rate
//! integrated over energy is a count rate in counts/s.
//!
//! Models implement [`SourceFunction`]; the closed set of models shipped with
//! the simulator is the [`FluxModel`] enum, built from a serializable
//! [`FluxModelSpec`].

pub mod cpl;
pub mod pulse;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use burst_math::{linspace, logspace, trap_integrate};

use crate::response::{EffectiveAreaCurve, ResponseMatrix};

pub use cpl::{ConstantCpl, ConstantCplParams, CutoffPowerLaw, KEV_PER_ERG};
pub use pulse::{norris_pulse, PulsedCpl, PulsedCplParams};

/// Log-spaced nodes used to integrate a folded spectrum over energy.
pub const ENERGY_INTEGRATION_POINTS: usize = 75;

/// Linear nodes used to integrate a spectrum over a time interval.
pub const TIME_INTEGRATION_POINTS: usize = 50;

/// Errors raised while building a source model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluxModelError {
    #[error("spectral index alpha = {alpha} is outside [-2, 0)")]
    InvalidIndex { alpha: f64 },

    #[error("parameter {name} = {value} must be positive and finite")]
    NonPositive { name: &'static str, value: f64 },

    #[error("energy range [{emin}, {emax}] keV is empty or invalid")]
    EnergyRange { emin: f64, emax: f64 },

    #[error("spectrum with ep = {ep} keV, alpha = {alpha} cannot be normalized on the model band")]
    Normalization { ep: f64, alpha: f64 },
}

pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<(), FluxModelError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(FluxModelError::NonPositive { name, value })
    }
}

pub(crate) fn check_energy_range(emin: f64, emax: f64) -> Result<(), FluxModelError> {
    if emin > 0.0 && emax.is_finite() && emin < emax {
        Ok(())
    } else {
        Err(FluxModelError::EnergyRange { emin, emax })
    }
}

/// Capability shared by every source model.
///
/// Implementors supply the unfolded spectrum at one time and the bound
/// effective-area curve; everything else has a default built on those two.
pub trait SourceFunction: Send + Sync {
    /// Lower edge of the model band (keV).
    fn emin(&self) -> f64;

    /// Upper edge of the model band (keV).
    fn emax(&self) -> f64;

    /// Low-energy photon index, used to shape the rejection envelope.
    fn index(&self) -> f64;

    /// Effective area the model is folded with.
    fn effective_area(&self) -> &EffectiveAreaCurve;

    /// Unfolded differential photon flux at each energy, at one time.
    fn spectrum(&self, energies: &[f64], time: f64) -> Vec<f64>;

    /// Unfolded flux at a single point.
    fn differential_flux(&self, energy: f64, time: f64) -> f64 {
        self.spectrum(&[energy], time)
            .first()
            .copied()
            .unwrap_or(0.0)
    }

    /// Folded flux at a single point (counts s⁻¹ keV⁻¹).
    fn folded_flux(&self, energy: f64, time: f64) -> f64 {
        self.differential_flux(energy, time) * self.effective_area().at(energy)
    }

    /// Folded flux at each energy, at one time.
    fn folded_spectrum(&self, energies: &[f64], time: f64) -> Vec<f64> {
        let area = self.effective_area();
        self.spectrum(energies, time)
            .into_iter()
            .zip(energies)
            .map(|(f, &e)| f * area.at(e))
            .collect()
    }

    /// Unfolded flux on a `[time, energy]` grid.
    fn evolution(&self, energies: &[f64], times: &[f64]) -> Array2<f64> {
        let mut out = Array2::zeros((times.len(), energies.len()));
        for (mut row, &t) in out.outer_iter_mut().zip(times) {
            for (cell, f) in row.iter_mut().zip(self.spectrum(energies, t)) {
                *cell = f;
            }
        }
        out
    }

    /// Folded flux on a `[time, energy]` grid.
    fn folded_evolution(&self, energies: &[f64], times: &[f64]) -> Array2<f64> {
        let mut out = Array2::zeros((times.len(), energies.len()));
        for (mut row, &t) in out.outer_iter_mut().zip(times) {
            for (cell, f) in row.iter_mut().zip(self.folded_spectrum(energies, t)) {
                *cell = f;
            }
        }
        out
    }

    /// Folded count rate at `time`, integrated over the model band.
    fn energy_integrated_evolution(&self, time: f64) -> f64 {
        let grid = logspace(self.emin(), self.emax(), ENERGY_INTEGRATION_POINTS);
        let folded = self.folded_spectrum(&grid, time);
        trap_integrate(&folded, &grid).unwrap_or(0.0)
    }

    /// Unfolded fluence density at `energy` between `t1` and `t2`.
    fn time_integrated_spectrum(&self, energy: f64, t1: f64, t2: f64) -> f64 {
        let times = linspace(t1, t2, TIME_INTEGRATION_POINTS);
        let values: Vec<f64> = times
            .iter()
            .map(|&t| self.differential_flux(energy, t))
            .collect();
        trap_integrate(&values, &times).unwrap_or(0.0)
    }
}

/// Serializable description of a source model, independent of any detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum FluxModelSpec {
    PulsedCpl(PulsedCplParams),
    ConstantCpl(ConstantCplParams),
}

impl FluxModelSpec {
    /// Check parameters that do not depend on a detector response.
    pub fn validate(&self) -> Result<(), FluxModelError> {
        match self {
            FluxModelSpec::PulsedCpl(p) => p.validate(),
            FluxModelSpec::ConstantCpl(p) => p.validate(),
        }
    }

    /// Bind the model to a detector response, spanning its photon energy range.
    pub fn build(&self, response: &ResponseMatrix) -> Result<FluxModel, FluxModelError> {
        self.build_with(
            response.effective_area().clone(),
            response.emin(),
            response.emax(),
        )
    }

    /// Bind the model to an explicit effective-area curve and band.
    pub fn build_with(
        &self,
        effective_area: EffectiveAreaCurve,
        emin: f64,
        emax: f64,
    ) -> Result<FluxModel, FluxModelError> {
        Ok(match self {
            FluxModelSpec::PulsedCpl(p) => {
                FluxModel::PulsedCpl(PulsedCpl::new(*p, effective_area, emin, emax)?)
            }
            FluxModelSpec::ConstantCpl(p) => {
                FluxModel::ConstantCpl(ConstantCpl::new(*p, effective_area, emin, emax)?)
            }
        })
    }

    /// Copy of this spec with its flux amplitude replaced.
    pub fn with_peak_flux(&self, peak_flux: f64) -> Self {
        match *self {
            FluxModelSpec::PulsedCpl(p) => {
                FluxModelSpec::PulsedCpl(PulsedCplParams { peak_flux, ..p })
            }
            FluxModelSpec::ConstantCpl(p) => {
                FluxModelSpec::ConstantCpl(ConstantCplParams { peak_flux, ..p })
            }
        }
    }
}

/// The source models the simulator ships with.
#[derive(Debug, Clone)]
pub enum FluxModel {
    PulsedCpl(PulsedCpl),
    ConstantCpl(ConstantCpl),
}

impl FluxModel {
    fn inner(&self) -> &dyn SourceFunction {
        match self {
            FluxModel::PulsedCpl(m) => m,
            FluxModel::ConstantCpl(m) => m,
        }
    }
}

impl SourceFunction for FluxModel {
    fn emin(&self) -> f64 {
        self.inner().emin()
    }

    fn emax(&self) -> f64 {
        self.inner().emax()
    }

    fn index(&self) -> f64 {
        self.inner().index()
    }

    fn effective_area(&self) -> &EffectiveAreaCurve {
        self.inner().effective_area()
    }

    fn spectrum(&self, energies: &[f64], time: f64) -> Vec<f64> {
        self.inner().spectrum(energies, time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Flat spectrum `N(E) = rate / (emax - emin)` with unit area.
    struct FlatSource {
        rate: f64,
        area: EffectiveAreaCurve,
    }

    impl SourceFunction for FlatSource {
        fn emin(&self) -> f64 {
            10.0
        }
        fn emax(&self) -> f64 {
            100.0
        }
        fn index(&self) -> f64 {
            -1.0
        }
        fn effective_area(&self) -> &EffectiveAreaCurve {
            &self.area
        }
        fn spectrum(&self, energies: &[f64], _time: f64) -> Vec<f64> {
            vec![self.rate / 90.0; energies.len()]
        }
    }

    #[test]
    fn test_default_integrals() {
        let src = FlatSource {
            rate: 45.0,
            area: EffectiveAreaCurve::flat(2.0, 10.0, 100.0),
        };
        assert_relative_eq!(src.energy_integrated_evolution(0.0), 90.0, epsilon = 1e-9);
        assert_relative_eq!(src.time_integrated_spectrum(50.0, 0.0, 4.0), 2.0, epsilon = 1e-12);
        assert_relative_eq!(src.folded_flux(20.0, 0.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_evolution_layout() {
        let src = FlatSource {
            rate: 90.0,
            area: EffectiveAreaCurve::flat(3.0, 10.0, 100.0),
        };
        let energies = [10.0, 20.0, 30.0];
        let times = [0.0, 1.0];
        let ev = src.evolution(&energies, &times);
        let folded = src.folded_evolution(&energies, &times);
        assert_eq!(ev.dim(), (2, 3));
        assert_eq!(ev[[1, 2]], 1.0);
        assert_eq!(folded[[0, 1]], 3.0);
    }

    #[test]
    fn test_spec_builds_against_response() {
        let spec = FluxModelSpec::ConstantCpl(ConstantCplParams {
            peak_flux: 1e-7,
            ep: 300.0,
            alpha: -0.8,
        });
        let area = EffectiveAreaCurve::flat(50.0, 8.0, 1000.0);
        let model = spec.build_with(area, 8.0, 1000.0).unwrap();
        assert_eq!(model.emin(), 8.0);
        assert_eq!(model.index(), -0.8);
        assert!(model.energy_integrated_evolution(0.0) > 0.0);

        let brighter = spec.with_peak_flux(2e-7).build_with(
            EffectiveAreaCurve::flat(50.0, 8.0, 1000.0),
            8.0,
            1000.0,
        );
        assert_relative_eq!(
            brighter.unwrap().energy_integrated_evolution(0.0),
            2.0 * model.energy_integrated_evolution(0.0),
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_spec_json_is_tagged() {
        let spec = FluxModelSpec::PulsedCpl(PulsedCplParams {
            peak_flux: 1e-6,
            ep_start: 500.0,
            ep_tau: 1.0,
            alpha: -0.66,
            trise: 0.1,
            tdecay: 0.5,
        });
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains(r#""model":"pulsed_cpl""#), "{json}");
        let back: FluxModelSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
